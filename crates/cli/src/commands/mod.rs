//! Command implementations

use std::error::Error;

use sectoken_apdu_transport_pcsc::PcscTransport;
use sectoken_openpgp::{
    KeyType, Pin, PinClass, SessionCache, SharedSession, SharedTransport, TokenInfo,
};
use tracing::debug;

use crate::utils::parse_hex;

type Cache = SessionCache<PcscTransport>;
type Transport = SharedTransport<PcscTransport>;

fn connected_session(
    cache: &Cache,
    transport: &Transport,
    pin: Option<&str>,
) -> Result<SharedSession<PcscTransport>, Box<dyn Error>> {
    let session = cache.session_for(transport, pin.map(Pin::from));
    let connected = session.lock().connect_if_necessary();
    if let Err(e) = connected {
        if e.is_card_state_lost() {
            cache.invalidate();
        }
        return Err(e.into());
    }
    Ok(session)
}

/// Print token information
pub fn info_command(cache: &Cache, transport: &Transport) -> Result<(), Box<dyn Error>> {
    let session = connected_session(cache, transport, None)?;
    let mut session = session.lock();

    let info = session.token_info()?;
    print_info(&info);

    if let Some(caps) = session.openpgp_capabilities() {
        println!("Capabilities:");
        println!("  Extended length: {}", caps.card_capabilities().has_extended_length());
        println!("  Command chaining: {}", caps.card_capabilities().has_chaining());
        println!("  Key import: {}", caps.has_key_import());
        println!("  GET CHALLENGE: {}", caps.has_get_challenge());
        match caps.secure_messaging_scheme() {
            Some(scheme) => println!("  Secure messaging: {scheme}"),
            None => println!("  Secure messaging: not supported"),
        }
        println!(
            "  PW1 valid for multiple signatures: {}",
            caps.is_pw1_valid_for_multiple_signatures()
        );
    }

    Ok(())
}

fn print_info(info: &TokenInfo) {
    println!("Token: {} over {}", info.token_type, info.transport_type);
    println!("AID: {}", hex::encode_upper(&info.aid));
    if let Some(serial) = info.serial_number() {
        println!("Serial number: {serial}");
    }
    println!("Cardholder: {}", info.user_id);
    println!("URL: {}", info.url);
    println!(
        "PIN retries: PW1 {}, PW3 {}",
        info.pw1_retry_counter, info.pw3_retry_counter
    );
    println!("Life cycle management: {}", info.has_life_cycle_management);

    let slots = [KeyType::Signature, KeyType::Encryption, KeyType::Authentication];
    for (key_type, fingerprint) in slots.iter().zip(&info.fingerprints) {
        if fingerprint.iter().all(|b| *b == 0) {
            println!("{key_type:?} key: not present");
        } else {
            println!("{key_type:?} key: {}", hex::encode_upper(fingerprint));
        }
    }
}

/// Verify PW1 (for other operations) or PW3
pub fn verify_pin_command(
    cache: &Cache,
    transport: &Transport,
    pin: &str,
    admin: bool,
) -> Result<(), Box<dyn Error>> {
    if admin {
        let session = connected_session(cache, transport, None)?;
        session.lock().verify_admin_pin(&Pin::from(pin))?;
        println!("{} verified", PinClass::Admin);
    } else {
        let session = connected_session(cache, transport, Some(pin))?;
        session.lock().verify_pin_for_other()?;
        println!("{} verified", PinClass::Other);
    }
    Ok(())
}

/// Sign a DigestInfo
pub fn sign_command(
    cache: &Cache,
    transport: &Transport,
    data: &str,
    pin: &str,
) -> Result<(), Box<dyn Error>> {
    let digest_info = parse_hex(data)?;
    debug!(len = digest_info.len(), "Signing");

    let session = connected_session(cache, transport, Some(pin))?;
    let signature = session.lock().calculate_signature(&digest_info)?;

    println!("Signature: {}", hex::encode(&signature));
    Ok(())
}

/// Decipher a session key
pub fn decipher_command(
    cache: &Cache,
    transport: &Transport,
    data: &str,
    pin: &str,
) -> Result<(), Box<dyn Error>> {
    let encrypted = parse_hex(data)?;
    debug!(len = encrypted.len(), "Deciphering");

    let session = connected_session(cache, transport, Some(pin))?;
    let plaintext = session.lock().decipher(&encrypted)?;

    println!("Session key: {}", hex::encode(&plaintext));
    Ok(())
}
