//! Scripted transport and toy secure messaging for unit tests

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use hex_literal::hex;
use sectoken_apdu_core::{CardTransport, Command, Response, TransportError};

use crate::pin::Pin;
use crate::secure_messaging::{
    ApduChannel, SecureMessaging, SecureMessagingError, SecureMessagingProvider,
};
use crate::session::Session;
use crate::transport::{SharedTransport, TokenTransport, share};
use crate::types::{OpenPgpCapabilities, TokenType, TransportType};

/// What the simulated card advertises
#[derive(Debug, Clone, Copy)]
pub(crate) struct CardProfile {
    pub(crate) extended_length: bool,
    pub(crate) chaining: bool,
    pub(crate) pw1_valid_for_multiple_signatures: bool,
    pub(crate) secure_messaging: Option<u8>,
}

impl Default for CardProfile {
    fn default() -> Self {
        Self {
            extended_length: true,
            chaining: true,
            pw1_valid_for_multiple_signatures: false,
            secure_messaging: None,
        }
    }
}

fn tlv(tag: &[u8], value: &[u8]) -> Vec<u8> {
    assert!(value.len() < 0x80);
    let mut out = tag.to_vec();
    out.push(value.len() as u8);
    out.extend_from_slice(value);
    out
}

/// Application Related Data (`6E`) for a profile
pub(crate) fn application_related_data(profile: &CardProfile) -> Vec<u8> {
    let mut card_capabilities = 0u8;
    if profile.chaining {
        card_capabilities |= 0x80;
    }
    if profile.extended_length {
        card_capabilities |= 0x40;
    }
    let historical = [0x00, 0x73, 0x00, 0x00, card_capabilities, 0x05, 0x90, 0x00];

    let sm_flag = if profile.secure_messaging.is_some() { 0x80 } else { 0x00 };
    let extended_capabilities = [
        0x7D | sm_flag,
        profile.secure_messaging.unwrap_or(0),
        0x00,
        0xFF,
        0x04,
        0xC0,
        0x00,
        0xFF,
        0x00,
        0xFF,
    ];
    let pw_status = [
        u8::from(profile.pw1_valid_for_multiple_signatures),
        0x7F,
        0x7F,
        0x7F,
        0x03,
        0x00,
        0x03,
    ];
    let mut fingerprints = vec![0x11; 20];
    fingerprints.extend_from_slice(&[0x22; 20]);
    fingerprints.extend_from_slice(&[0x33; 20]);

    let mut discretionary = tlv(&[0xC0], &extended_capabilities);
    discretionary.extend(tlv(&[0xC4], &pw_status));
    discretionary.extend(tlv(&[0xC5], &fingerprints));

    let mut inner = tlv(&[0x4F], &hex!("D2760001240103040006123456780000"));
    inner.extend(tlv(&[0x5F, 0x52], &historical));
    inner.extend(tlv(&[0x73], &discretionary));

    tlv(&[0x6E], &inner)
}

/// Responses for a bring-up that probes vendor applets: probe, SELECT, GET DATA
pub(crate) fn bring_up_responses(profile: &CardProfile) -> Vec<Vec<u8>> {
    let mut ard = application_related_data(profile);
    ard.extend_from_slice(&hex!("9000"));
    vec![hex!("6A82").to_vec(), hex!("9000").to_vec(), ard]
}

/// Session brought up against a scripted card
pub(crate) fn connected_session(
    profile: &CardProfile,
    pin: Option<&str>,
) -> (Session<MockTransport>, SharedTransport<MockTransport>) {
    let transport = share(MockTransport::new().respond_all(bring_up_responses(profile)));
    let mut session = Session::new(Arc::clone(&transport), pin.map(Pin::from));
    session.connect_if_necessary().unwrap();
    (session, transport)
}

/// Transport answering from a queue of raw responses
#[derive(Debug)]
pub(crate) struct MockTransport {
    responses: VecDeque<Result<Bytes, TransportError>>,
    pub(crate) sent: Vec<Bytes>,
    pub(crate) connected: bool,
    pub(crate) persistent: bool,
    pub(crate) token_type: Option<TokenType>,
    pub(crate) connect_calls: usize,
    fail_connect: bool,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self {
            responses: VecDeque::new(),
            sent: Vec::new(),
            connected: false,
            persistent: true,
            token_type: None,
            connect_calls: 0,
            fail_connect: false,
        }
    }

    pub(crate) fn connected(mut self) -> Self {
        self.connected = true;
        self
    }

    pub(crate) fn failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    pub(crate) fn with_token_type(mut self, token_type: TokenType) -> Self {
        self.token_type = Some(token_type);
        self
    }

    pub(crate) fn respond(mut self, raw: &[u8]) -> Self {
        self.push_response(raw);
        self
    }

    pub(crate) fn respond_all(mut self, responses: Vec<Vec<u8>>) -> Self {
        self.respond_all_in_place(responses);
        self
    }

    pub(crate) fn respond_all_in_place(&mut self, responses: Vec<Vec<u8>>) {
        for raw in responses {
            self.push_response(&raw);
        }
    }

    pub(crate) fn push_response(&mut self, raw: &[u8]) {
        self.responses.push_back(Ok(Bytes::copy_from_slice(raw)));
    }

    pub(crate) fn fail_next(&mut self, error: TransportError) {
        self.responses.push_front(Err(error));
    }

    pub(crate) fn sent_commands(&self) -> Vec<Command> {
        self.sent
            .iter()
            .map(|raw| Command::from_bytes(raw).unwrap())
            .collect()
    }
}

impl CardTransport for MockTransport {
    type Error = TransportError;

    fn connect(&mut self) -> Result<(), Self::Error> {
        self.connect_calls += 1;
        if self.fail_connect {
            return Err(TransportError::NoCard);
        }
        self.connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn reset(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, Self::Error> {
        if !self.connected {
            return Err(TransportError::Connection);
        }
        let response = self
            .responses
            .pop_front()
            .unwrap_or(Err(TransportError::Transmission))?;
        self.sent.push(Bytes::copy_from_slice(command));
        Ok(response)
    }
}

impl TokenTransport for MockTransport {
    fn transport_type(&self) -> TransportType {
        TransportType::UsbCcid
    }

    fn is_persistent_connection_allowed(&self) -> bool {
        self.persistent
    }

    fn token_type_if_available(&self) -> Option<TokenType> {
        self.token_type.clone()
    }
}

fn checksum(key: u8, data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, b| acc.wrapping_add(*b)) ^ key
}

/// XOR `plaintext` with `key` and append the one-byte MAC
pub(crate) fn xor_seal(key: u8, plaintext: &[u8]) -> Vec<u8> {
    let mut sealed: Vec<u8> = plaintext.iter().map(|b| b ^ key).collect();
    sealed.push(checksum(key, &sealed));
    sealed
}

/// Toy secure messaging: XOR cipher, additive checksum MAC
#[derive(Debug)]
pub(crate) struct XorSecureMessaging {
    key: u8,
    fail_wrap: bool,
    cleared: Arc<AtomicBool>,
}

impl XorSecureMessaging {
    pub(crate) fn new(key: u8) -> Self {
        Self {
            key,
            fail_wrap: false,
            cleared: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn failing_wrap(mut self) -> Self {
        self.fail_wrap = true;
        self
    }

    pub(crate) fn cleared_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cleared)
    }
}

impl SecureMessaging for XorSecureMessaging {
    fn is_established(&self) -> bool {
        !self.cleared.load(Ordering::SeqCst)
    }

    fn encrypt_and_sign(&mut self, command: &Command) -> Result<Command, SecureMessagingError> {
        if self.fail_wrap {
            return Err(SecureMessagingError::Cipher("key schedule failed".into()));
        }
        Ok(command
            .clone()
            .with_class(command.cla | 0x0C)
            .with_data(xor_seal(self.key, command.data())))
    }

    fn verify_and_decrypt(&mut self, response: Response) -> Result<Response, SecureMessagingError> {
        let (data, status) = response.into_parts();
        let Some((&mac, ciphertext)) = data.split_last() else {
            return Err(SecureMessagingError::Malformed("missing MAC"));
        };
        if checksum(self.key, ciphertext) != mac {
            return Err(SecureMessagingError::MacMismatch);
        }
        let plaintext: Vec<u8> = ciphertext.iter().map(|b| b ^ self.key).collect();
        Ok(Response::new(plaintext, status))
    }

    fn clear_session(&mut self) {
        self.cleared.store(true, Ordering::SeqCst);
    }
}

/// Provider running a one-command handshake
#[derive(Debug)]
pub(crate) struct MockProvider {
    key: u8,
}

impl MockProvider {
    pub(crate) const fn new(key: u8) -> Self {
        Self { key }
    }
}

impl SecureMessagingProvider for MockProvider {
    fn establish(
        &self,
        channel: &mut dyn ApduChannel,
        _capabilities: &OpenPgpCapabilities,
    ) -> Result<Box<dyn SecureMessaging>, SecureMessagingError> {
        let handshake = Command::new(0x00, 0x88, 0x01, 0x01);
        let response = channel
            .exchange(&handshake)
            .map_err(|e| SecureMessagingError::Channel(Box::new(e)))?;
        if !response.is_success() {
            return Err(SecureMessagingError::Handshake(format!(
                "card answered {}",
                response.status()
            )));
        }
        Ok(Box::new(XorSecureMessaging::new(self.key)))
    }
}
