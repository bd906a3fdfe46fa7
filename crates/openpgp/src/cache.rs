//! Reuse of a live session across operations
//!
//! The cache holds at most one session. Callers ask for a session for a
//! transport and an optional PIN; the cached one is handed back only while it
//! is still connected, still allowed to persist, bound to the same transport
//! and compatible with the PIN.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::config::SessionConfig;
use crate::factory::{CommandFactory, OpenPgpCommandFactory};
use crate::pin::Pin;
use crate::secure_messaging::SecureMessagingProvider;
use crate::session::Session;
use crate::transport::{SharedTransport, TokenTransport};

/// Session shared between the cache and its users
pub type SharedSession<T> = Arc<Mutex<Session<T>>>;

/// Single-slot session cache
#[derive(Debug)]
pub struct SessionCache<T: TokenTransport> {
    slot: Mutex<Option<SharedSession<T>>>,
    factory: Arc<dyn CommandFactory>,
    config: SessionConfig,
    secure_messaging_provider: Option<Arc<dyn SecureMessagingProvider>>,
}

impl<T: TokenTransport> Default for SessionCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TokenTransport> SessionCache<T> {
    /// Create an empty cache producing sessions with default settings
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            factory: Arc::new(OpenPgpCommandFactory),
            config: SessionConfig::default(),
            secure_messaging_provider: None,
        }
    }

    /// Command factory for new sessions
    pub fn with_factory(mut self, factory: Arc<dyn CommandFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Configuration for new sessions
    pub const fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Secure messaging provider for new sessions
    pub fn with_secure_messaging_provider(
        mut self,
        provider: Arc<dyn SecureMessagingProvider>,
    ) -> Self {
        self.secure_messaging_provider = Some(provider);
        self
    }

    /// Cached session if reusable, otherwise a fresh unconnected one
    ///
    /// A fresh session replaces whatever was cached. A `None` PIN matches any
    /// cached PIN.
    pub fn session_for(
        &self,
        transport: &SharedTransport<T>,
        pin: Option<Pin>,
    ) -> SharedSession<T> {
        let mut slot = self.slot.lock();

        if let Some(cached) = slot.as_ref() {
            if cached.lock().is_reusable_for(transport, pin.as_ref()) {
                debug!("Reusing cached session");
                return Arc::clone(cached);
            }
        }

        debug!("Creating new session");
        let mut session = Session::new(Arc::clone(transport), pin)
            .with_factory(Arc::clone(&self.factory))
            .with_config(self.config);
        if let Some(provider) = &self.secure_messaging_provider {
            session = session.with_secure_messaging_provider(Arc::clone(provider));
        }

        let session = Arc::new(Mutex::new(session));
        *slot = Some(Arc::clone(&session));
        session
    }

    /// Currently cached session, reusable or not
    pub fn cached(&self) -> Option<SharedSession<T>> {
        self.slot.lock().clone()
    }

    /// Drop the cached session; holders keep their handle
    pub fn invalidate(&self) {
        if self.slot.lock().take().is_some() {
            debug!("Cached session invalidated");
        }
    }
}
