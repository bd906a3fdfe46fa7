//! Session reuse through the cache

mod common;

use std::sync::Arc;

use common::ScriptedTransport;
use sectoken_openpgp::{KeyType, Pin, SessionCache};

#[test]
fn test_connected_session_is_reused() {
    let cache = SessionCache::new();
    let transport = ScriptedTransport::default().with_bring_up().shared();

    let first = cache.session_for(&transport, Some(Pin::from("123456")));
    first.lock().connect_if_necessary().unwrap();

    // No PIN matches any cached PIN
    let second = cache.session_for(&transport, None);
    assert!(Arc::ptr_eq(&first, &second));

    let third = cache.session_for(&transport, Some(Pin::from("123456")));
    assert!(Arc::ptr_eq(&first, &third));

    // Reuse does not talk to the card
    second.lock().connect_if_necessary().unwrap();
    assert_eq!(transport.lock().sent.len(), 3);
    assert_eq!(
        second.lock().key_fingerprint(KeyType::Signature),
        Some(&[0x11; 20][..])
    );
}

#[test]
fn test_different_pin_creates_new_session() {
    let cache = SessionCache::new();
    let transport = ScriptedTransport::default().with_bring_up().shared();

    let first = cache.session_for(&transport, Some(Pin::from("123456")));
    first.lock().connect_if_necessary().unwrap();

    let second = cache.session_for(&transport, Some(Pin::from("654321")));
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(second.lock().cached_pin(), Some(&Pin::from("654321")));
    assert!(!second.lock().is_connected());

    // The replacement is what the cache holds now
    assert!(Arc::ptr_eq(&cache.cached().unwrap(), &second));
}

#[test]
fn test_different_transport_creates_new_session() {
    let cache = SessionCache::new();
    let transport = ScriptedTransport::default().with_bring_up().shared();
    let other = ScriptedTransport::default().with_bring_up().shared();

    let first = cache.session_for(&transport, None);
    first.lock().connect_if_necessary().unwrap();

    let second = cache.session_for(&other, None);
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(second.lock().transport(), &other));
}

#[test]
fn test_invalidate() {
    let cache = SessionCache::new();
    let transport = ScriptedTransport::default().with_bring_up().shared();

    let first = cache.session_for(&transport, None);
    first.lock().connect_if_necessary().unwrap();

    cache.invalidate();
    assert!(cache.cached().is_none());

    let second = cache.session_for(&transport, None);
    assert!(!Arc::ptr_eq(&first, &second));
    // The old handle stays usable
    assert!(first.lock().is_connected());
}

#[test]
fn test_teardown_prevents_reuse() {
    let cache = SessionCache::new();
    let transport = ScriptedTransport::default().with_bring_up().shared();

    let first = cache.session_for(&transport, None);
    first.lock().connect_if_necessary().unwrap();
    first.lock().teardown();

    let second = cache.session_for(&transport, None);
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(transport.lock().connected);
}
