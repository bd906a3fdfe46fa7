//! OpenPGP card session
//!
//! A [`Session`] binds one shared transport to one selected OpenPGP
//! application. Every exchange goes through [`Session::communicate`], which
//! picks the framing, follows `61 XX` continuations and applies secure
//! messaging when it is established.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use sectoken_apdu_core::{CardTransport, Command, Response, ResultExt, StatusWord};
use tracing::{debug, instrument, trace, warn};

use crate::config::SessionConfig;
use crate::constants::{FIDESMO_APPS_AID_PREFIX, FINGERPRINT_LENGTH, tags};
use crate::factory::{CommandFactory, OpenPgpCommandFactory};
use crate::info::{TokenInfo, parse_holder_name};
use crate::pin::{Pin, PinClass, PinEvent, PinState, PinStates};
use crate::secure_messaging::{
    ApduChannel, SecureMessaging, SecureMessagingError, SecureMessagingProvider,
};
use crate::transport::{SharedTransport, TokenTransport};
use crate::types::{CardCapabilities, KeyType, OpenPgpCapabilities, TokenType};
use crate::{Error, Result, SecureMessagingStage};

/// Result of sending a command chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Every segment went out; carries the response to the final one
    Completed(Response),
    /// A non-final segment was rejected and the rest were not sent
    Aborted {
        /// 1-based index of the rejected segment
        step: usize,
        /// Number of segments in the chain
        total: usize,
        /// Status word of the rejected segment
        status: StatusWord,
    },
}

/// Send chained segments in order, stopping at the first rejected one
///
/// Non-final segments must answer `90 00`. An empty chain is an error since
/// there is nothing to send.
pub fn transmit_chain<T>(transport: &mut T, chain: &[Command]) -> Result<ChainOutcome>
where
    T: CardTransport + ?Sized,
{
    let total = chain.len();
    let Some((last, segments)) = chain.split_last() else {
        return Err(Error::CannotTransmit);
    };

    for (index, segment) in segments.iter().enumerate() {
        let response = transport.transmit(segment)?;
        if !response.is_success() {
            return Ok(ChainOutcome::Aborted {
                step: index + 1,
                total,
                status: response.status(),
            });
        }
    }

    Ok(ChainOutcome::Completed(transport.transmit(last)?))
}

/// Live binding between a transport and the OpenPGP application on a token
#[derive(Debug)]
pub struct Session<T: TokenTransport> {
    transport: SharedTransport<T>,
    factory: Arc<dyn CommandFactory>,
    config: SessionConfig,
    secure_messaging_provider: Option<Arc<dyn SecureMessagingProvider>>,

    token_type: Option<TokenType>,
    card_capabilities: Option<CardCapabilities>,
    openpgp_capabilities: Option<OpenPgpCapabilities>,
    secure_messaging: Option<Box<dyn SecureMessaging>>,
    pins: PinStates,
    cached_pin: Option<Pin>,
}

impl<T: TokenTransport> Session<T> {
    /// Create a session on a shared transport, optionally caching a PIN
    ///
    /// Nothing is sent until [`Session::connect_if_necessary`].
    pub fn new(transport: SharedTransport<T>, pin: Option<Pin>) -> Self {
        Self {
            transport,
            factory: Arc::new(OpenPgpCommandFactory),
            config: SessionConfig::default(),
            secure_messaging_provider: None,
            token_type: None,
            card_capabilities: None,
            openpgp_capabilities: None,
            secure_messaging: None,
            pins: PinStates::default(),
            cached_pin: pin,
        }
    }

    /// Use a different command factory
    pub fn with_factory(mut self, factory: Arc<dyn CommandFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Use a different configuration
    pub const fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Establish secure messaging through this provider when offered
    pub fn with_secure_messaging_provider(
        mut self,
        provider: Arc<dyn SecureMessagingProvider>,
    ) -> Self {
        self.secure_messaging_provider = Some(provider);
        self
    }

    /// Shared transport of this session
    pub const fn transport(&self) -> &SharedTransport<T> {
        &self.transport
    }

    /// Bring the session up unless it already is
    pub fn connect_if_necessary(&mut self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }
        self.connect_to_device()
    }

    /// Full bring-up: open, identify, select, read capabilities
    ///
    /// If anything fails after the transport opened, both capability
    /// descriptors are left unset.
    pub fn connect_to_device(&mut self) -> Result<()> {
        debug!("Connecting to token");
        {
            let mut transport = self.transport.lock();
            if !transport.is_connected() {
                transport.connect().context("Failed to connect to token")?;
            }
        }

        // Whatever was negotiated with an earlier card state is void
        self.clear_secure_messaging();
        self.pins.reset();

        // Safe baseline until the card tells us more
        self.card_capabilities = Some(CardCapabilities::default());
        self.openpgp_capabilities = None;

        let result = self.bring_up();
        if result.is_err() {
            self.card_capabilities = None;
            self.openpgp_capabilities = None;
        }
        result
    }

    fn bring_up(&mut self) -> Result<()> {
        let token_type = self.determine_token_type()?;
        debug!(%token_type, "Token type determined");
        self.token_type = Some(token_type);

        let select = self.factory.select_file_openpgp();
        let response = self.communicate(&select)?;
        if !response.is_success() {
            return Err(Error::card("Initialization failed", response.status()));
        }

        self.refresh_connection_capabilities()?;
        self.pins.reset();
        self.establish_secure_messaging()?;

        debug!("Token connected");
        Ok(())
    }

    /// Identify the token, probing vendor applets if the transport cannot
    pub fn determine_token_type(&mut self) -> Result<TokenType> {
        let reported = self.transport.lock().token_type_if_available();
        if let Some(token_type) = reported {
            return Ok(token_type);
        }

        if !self.config.probe_vendor_applets {
            return Ok(TokenType::Unknown);
        }

        let probe = self.factory.select_file(&FIDESMO_APPS_AID_PREFIX);
        let response = self.communicate(&probe)?;
        if response.is_success() {
            Ok(TokenType::Fidesmo)
        } else {
            Ok(TokenType::Unknown)
        }
    }

    /// Re-read Application Related Data and replace both descriptors
    pub fn refresh_connection_capabilities(&mut self) -> Result<()> {
        let data = self.get_data(0x00, tags::APPLICATION_RELATED_DATA as u8)?;
        let capabilities = OpenPgpCapabilities::from_application_related_data(&data)?;
        self.set_connection_capabilities(capabilities);
        Ok(())
    }

    /// Install capability descriptors
    pub fn set_connection_capabilities(&mut self, capabilities: OpenPgpCapabilities) {
        trace!(?capabilities, "Connection capabilities");
        self.card_capabilities = Some(capabilities.card_capabilities());
        self.openpgp_capabilities = Some(capabilities);
    }

    fn establish_secure_messaging(&mut self) -> Result<()> {
        let offered = self
            .openpgp_capabilities
            .as_ref()
            .is_some_and(OpenPgpCapabilities::has_scp11b_secure_messaging);

        if !self.config.establish_secure_messaging || !offered {
            return self.secure_messaging_fallback(SecureMessagingError::Unavailable);
        }

        let (Some(provider), Some(capabilities)) = (
            self.secure_messaging_provider.clone(),
            self.openpgp_capabilities.clone(),
        ) else {
            debug!("Token offers SCP11b but no secure messaging provider is configured");
            return self.secure_messaging_fallback(SecureMessagingError::Unavailable);
        };

        match provider.establish(self, &capabilities) {
            Ok(secure_messaging) => {
                debug!("Secure messaging established");
                self.set_secure_messaging(secure_messaging);
                Ok(())
            }
            Err(error) => {
                warn!(%error, "Secure messaging establishment failed");
                self.clear_secure_messaging();
                self.secure_messaging_fallback(error)
            }
        }
    }

    fn secure_messaging_fallback(&self, source: SecureMessagingError) -> Result<()> {
        if self.config.require_secure_messaging {
            return Err(Error::SecureMessaging {
                stage: SecureMessagingStage::Establish,
                source,
            });
        }
        Ok(())
    }

    /// Exchange one logical command with the token
    ///
    /// The transport stays locked for the whole exchange, including every
    /// chain segment and GET RESPONSE round.
    #[instrument(level = "debug", skip(self, command), fields(ins = command.ins))]
    pub fn communicate(&mut self, command: &Command) -> Result<Response> {
        let command = self.wrap_command(command)?;

        let transport = Arc::clone(&self.transport);
        let mut transport = transport.lock();
        let response = self
            .transmit_command(&mut *transport, &command)
            .and_then(|response| self.collect_response(&mut *transport, response));
        drop(transport);

        let response = match response {
            Err(e) if e.is_card_state_lost() => {
                warn!(error = %e, "Token lost its state, dropping session state");
                self.forget_card_state();
                return Err(e);
            }
            other => other?,
        };

        trace!(
            status = %response.status(),
            len = response.data().len(),
            "Exchange complete"
        );

        self.unwrap_response(response)
    }

    fn wrap_command(&mut self, command: &Command) -> Result<Command> {
        let wrapped = match self.secure_messaging.as_mut() {
            Some(secure_messaging) if secure_messaging.is_established() => {
                secure_messaging.encrypt_and_sign(command)
            }
            _ => return Ok(command.clone()),
        };

        wrapped.map_err(|source| {
            self.clear_secure_messaging();
            Error::SecureMessaging {
                stage: SecureMessagingStage::Wrap,
                source,
            }
        })
    }

    fn unwrap_response(&mut self, response: Response) -> Result<Response> {
        let unwrapped = match self.secure_messaging.as_mut() {
            Some(secure_messaging) if secure_messaging.is_established() => {
                secure_messaging.verify_and_decrypt(response)
            }
            _ => return Ok(response),
        };

        unwrapped.map_err(|source| {
            self.clear_secure_messaging();
            Error::SecureMessaging {
                stage: SecureMessagingStage::Unwrap,
                source,
            }
        })
    }

    fn transmit_command(&self, transport: &mut T, command: &Command) -> Result<Response> {
        let capabilities = self.card_capabilities.unwrap_or_default();

        if capabilities.has_extended_length() {
            Ok(transport.transmit(command)?)
        } else if self.factory.is_suitable_for_short_apdu(command) {
            Ok(transport.transmit(&self.factory.create_short_apdu(command))?)
        } else if capabilities.has_chaining() {
            let chain = self.factory.create_chained_apdus(command);
            match transmit_chain(transport, &chain)? {
                ChainOutcome::Completed(response) => Ok(response),
                ChainOutcome::Aborted {
                    step,
                    total,
                    status,
                } => Err(Error::ChainAborted {
                    step,
                    total,
                    status,
                }),
            }
        } else {
            Err(Error::CannotTransmit)
        }
    }

    fn collect_response(&self, transport: &mut T, response: Response) -> Result<Response> {
        let (data, mut status) = response.into_parts();
        let mut buffer = BytesMut::from(data.as_ref());
        let mut rounds = 0;

        while let Some(remaining) = status.remaining_bytes() {
            if rounds == self.config.max_get_response_rounds {
                return Err(Error::ContinuationLimit { rounds });
            }
            rounds += 1;
            debug!(remaining, rounds, "Fetching remaining response bytes");

            let response = transport.transmit(&self.factory.get_response(remaining))?;
            buffer.extend_from_slice(response.data());
            status = response.status();
        }

        Ok(Response::new(buffer.freeze(), status))
    }

    fn get_data(&mut self, p1: u8, p2: u8) -> Result<Bytes> {
        let command = self.factory.get_data(p1, p2);
        let response = self.communicate(&command)?;
        if !response.is_success() {
            return Err(Error::card("Failed to get data", response.status()));
        }
        Ok(response.into_parts().0)
    }

    fn verify_cached_pin(&mut self, class: PinClass) -> Result<()> {
        if self.pins.state(class).is_verified() {
            return Ok(());
        }
        let pin = self.cached_pin.clone().ok_or(Error::MissingPin(class))?;
        self.verify(class, &pin)
    }

    fn verify(&mut self, class: PinClass, pin: &Pin) -> Result<()> {
        let command = self.factory.verify_pin(class, pin.as_bytes());
        let response = self.communicate(&command)?;
        if !response.is_success() {
            return Err(Error::card("Bad PIN", response.status()));
        }
        self.pins.apply(class, PinEvent::Verified);
        debug!(%class, "PIN verified");
        Ok(())
    }

    /// Verify the cached PIN as PW1 for signing (no-op when verified)
    pub fn verify_pin_for_signature(&mut self) -> Result<()> {
        self.verify_cached_pin(PinClass::Signature)
    }

    /// Verify the cached PIN as PW1 for other operations (no-op when verified)
    pub fn verify_pin_for_other(&mut self) -> Result<()> {
        self.verify_cached_pin(PinClass::Other)
    }

    /// Verify PW3 with an explicit admin PIN (no-op when verified)
    pub fn verify_admin_pin(&mut self, admin_pin: &Pin) -> Result<()> {
        if self.pins.state(PinClass::Admin).is_verified() {
            return Ok(());
        }
        self.verify(PinClass::Admin, admin_pin)
    }

    /// Drop PW1 signature verification if the token allows one signature only
    pub fn invalidate_single_use_pw1(&mut self) {
        let valid_for_multiple_signatures = self
            .openpgp_capabilities
            .as_ref()
            .is_some_and(OpenPgpCapabilities::is_pw1_valid_for_multiple_signatures);
        self.pins.apply(
            PinClass::Signature,
            PinEvent::SignatureUsed {
                valid_for_multiple_signatures,
            },
        );
    }

    /// Drop PW3 verification without talking to the token
    pub fn invalidate_pw3(&mut self) {
        self.pins.apply(PinClass::Admin, PinEvent::Invalidated);
    }

    /// Verification state of a PIN class
    pub const fn pin_state(&self, class: PinClass) -> PinState {
        self.pins.state(class)
    }

    /// Sign a DigestInfo (or raw hash) with the signature key
    ///
    /// Uses the cached PIN. On single-signature tokens PW1 is invalidated
    /// after the attempt, whatever its outcome.
    pub fn calculate_signature(&mut self, digest_info: &[u8]) -> Result<Bytes> {
        self.verify_pin_for_signature()?;

        let command = self.factory.compute_digital_signature(digest_info);
        let response = self.communicate(&command);
        self.invalidate_single_use_pw1();

        let response = response?;
        if !response.is_success() {
            return Err(Error::card("Failed to sign", response.status()));
        }
        Ok(response.into_parts().0)
    }

    /// Decipher a session key with the decryption key
    pub fn decipher(&mut self, encrypted: &[u8]) -> Result<Bytes> {
        self.verify_pin_for_other()?;

        let command = self.factory.decipher(encrypted);
        let response = self.communicate(&command)?;
        if !response.is_success() {
            return Err(Error::card("Failed to decipher", response.status()));
        }
        Ok(response.into_parts().0)
    }

    /// Concatenated fingerprints of all key slots, if known
    pub fn fingerprints(&self) -> Option<&[u8]> {
        self.openpgp_capabilities
            .as_ref()
            .and_then(OpenPgpCapabilities::fingerprints)
    }

    /// Fingerprint of one key slot
    pub fn key_fingerprint(&self, key_type: KeyType) -> Option<&[u8]> {
        let start = key_type.index() * FINGERPRINT_LENGTH;
        self.fingerprints()?.get(start..start + FINGERPRINT_LENGTH)
    }

    /// PW status bytes, if known
    pub fn pw_status_bytes(&self) -> Option<&[u8]> {
        self.openpgp_capabilities
            .as_ref()
            .and_then(OpenPgpCapabilities::pw_status_bytes)
    }

    /// Application identifier, if known
    pub fn aid(&self) -> Option<&[u8]> {
        self.openpgp_capabilities
            .as_ref()
            .map(OpenPgpCapabilities::aid)
    }

    /// Capability descriptor of the card, if connected
    pub const fn card_capabilities(&self) -> Option<CardCapabilities> {
        self.card_capabilities
    }

    /// Capability descriptor of the OpenPGP application, if connected
    pub const fn openpgp_capabilities(&self) -> Option<&OpenPgpCapabilities> {
        self.openpgp_capabilities.as_ref()
    }

    /// Public key URL (`5F50`)
    pub fn url(&mut self) -> Result<String> {
        let [p1, p2] = tags::URL.to_be_bytes();
        let data = self.get_data(p1, p2)?;
        Ok(String::from_utf8_lossy(&data).trim().to_string())
    }

    /// Cardholder name from cardholder related data (`65`)
    pub fn user_id(&mut self) -> Result<String> {
        let [p1, p2] = tags::CARDHOLDER_RELATED_DATA.to_be_bytes();
        let data = self.get_data(p1, p2)?;
        Ok(parse_holder_name(&data))
    }

    /// Snapshot of what the token reports about itself
    pub fn token_info(&mut self) -> Result<TokenInfo> {
        if self.openpgp_capabilities.is_none() {
            return Err(Error::NotConnected);
        }

        let fingerprints = self
            .fingerprints()
            .map(|raw| {
                raw.chunks_exact(FINGERPRINT_LENGTH)
                    .filter_map(|chunk| <[u8; FINGERPRINT_LENGTH]>::try_from(chunk).ok())
                    .collect()
            })
            .unwrap_or_default();
        let aid = self.aid().map(<[u8]>::to_vec).unwrap_or_default();
        let user_id = self.user_id()?;
        let url = self.url()?;

        let pw_status = self
            .pw_status_bytes()
            .ok_or(Error::InvalidData("Missing PW status bytes"))?;
        let (Some(&pw1_retry_counter), Some(&pw3_retry_counter)) =
            (pw_status.get(4), pw_status.get(6))
        else {
            return Err(Error::InvalidData("PW status bytes too short"));
        };

        let has_life_cycle_management = self
            .card_capabilities
            .is_some_and(|caps| caps.has_life_cycle_management());

        Ok(TokenInfo {
            transport_type: self.transport.lock().transport_type(),
            token_type: self.token_type.clone().unwrap_or(TokenType::Unknown),
            fingerprints,
            aid,
            user_id,
            url,
            pw1_retry_counter,
            pw3_retry_counter,
            has_life_cycle_management,
        })
    }

    /// Transport allows reuse and no secure messaging is bound to this session
    pub fn is_persistent_connection_allowed(&self) -> bool {
        self.transport.lock().is_persistent_connection_allowed()
            && !self.is_secure_messaging_established()
    }

    /// Transport is connected and bring-up has completed
    pub fn is_connected(&self) -> bool {
        self.openpgp_capabilities.is_some() && self.transport.lock().is_connected()
    }

    /// Token type resolved at bring-up
    pub const fn token_type(&self) -> Option<&TokenType> {
        self.token_type.as_ref()
    }

    /// PIN cached for re-verification
    pub const fn cached_pin(&self) -> Option<&Pin> {
        self.cached_pin.as_ref()
    }

    /// Install a secure messaging session, clearing any previous one
    pub fn set_secure_messaging(&mut self, secure_messaging: Box<dyn SecureMessaging>) {
        self.clear_secure_messaging();
        self.secure_messaging = Some(secure_messaging);
    }

    /// Wipe and drop the secure messaging session
    pub fn clear_secure_messaging(&mut self) {
        if let Some(mut secure_messaging) = self.secure_messaging.take() {
            secure_messaging.clear_session();
        }
    }

    /// A secure messaging session is active
    pub fn is_secure_messaging_established(&self) -> bool {
        self.secure_messaging
            .as_ref()
            .is_some_and(|secure_messaging| secure_messaging.is_established())
    }

    /// Whether the cache may hand this session out for `transport` and `pin`
    pub(crate) fn is_reusable_for(&self, transport: &SharedTransport<T>, pin: Option<&Pin>) -> bool {
        Arc::ptr_eq(&self.transport, transport)
            && self.is_connected()
            && self.is_persistent_connection_allowed()
            && pin.is_none_or(|pin| self.cached_pin.as_ref() == Some(pin))
    }

    /// Forget everything learned from the token; the transport is left as is
    pub fn teardown(&mut self) {
        debug!("Tearing down session");
        self.forget_card_state();
        self.cached_pin = None;
    }

    // The cached PIN survives so a later bring-up can verify again
    fn forget_card_state(&mut self) {
        self.clear_secure_messaging();
        self.pins.reset();
        self.card_capabilities = None;
        self.openpgp_capabilities = None;
        self.token_type = None;
    }
}

impl<T: TokenTransport> ApduChannel for Session<T> {
    fn exchange(&mut self, command: &Command) -> Result<Response> {
        self.communicate(command)
    }
}
