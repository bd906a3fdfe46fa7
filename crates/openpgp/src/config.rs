//! Session configuration

/// Tunables for [`Session`](crate::Session) bring-up and exchanges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Upper bound on GET RESPONSE rounds per exchange
    pub max_get_response_rounds: usize,

    /// Probe vendor applets (Fidesmo) when the transport cannot name the token
    pub probe_vendor_applets: bool,

    /// Try to establish secure messaging when the card advertises it
    pub establish_secure_messaging: bool,

    /// Fail bring-up when secure messaging cannot be established
    pub require_secure_messaging: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_get_response_rounds: 256,
            probe_vendor_applets: true,
            establish_secure_messaging: true,
            require_secure_messaging: false,
        }
    }
}

impl SessionConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the GET RESPONSE round limit
    pub const fn with_max_get_response_rounds(mut self, rounds: usize) -> Self {
        self.max_get_response_rounds = rounds;
        self
    }

    /// Set whether vendor applets are probed
    pub const fn with_probe_vendor_applets(mut self, probe: bool) -> Self {
        self.probe_vendor_applets = probe;
        self
    }

    /// Set whether secure messaging is attempted
    pub const fn with_establish_secure_messaging(mut self, establish: bool) -> Self {
        self.establish_secure_messaging = establish;
        self
    }

    /// Set whether secure messaging is mandatory
    pub const fn with_require_secure_messaging(mut self, require: bool) -> Self {
        self.require_secure_messaging = require;
        self
    }
}
