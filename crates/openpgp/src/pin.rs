//! PIN verification state
//!
//! Each PIN class moves between [`PinState::Unverified`] and
//! [`PinState::Verified`] only through [`PinState::transition`].

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// PIN classes of an OpenPGP card, by VERIFY reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinClass {
    /// PW1 for PSO:COMPUTE DIGITAL SIGNATURE (`81`)
    Signature,
    /// PW1 for decryption and other operations (`82`)
    Other,
    /// PW3, the admin PIN (`83`)
    Admin,
}

impl PinClass {
    /// VERIFY P2 reference of this class
    pub const fn reference(self) -> u8 {
        match self {
            Self::Signature => 0x81,
            Self::Other => 0x82,
            Self::Admin => 0x83,
        }
    }
}

impl fmt::Display for PinClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signature => write!(f, "PW1 (signature)"),
            Self::Other => write!(f, "PW1 (other)"),
            Self::Admin => write!(f, "PW3 (admin)"),
        }
    }
}

/// Verification state of one PIN class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PinState {
    /// No successful VERIFY since selection, or invalidated since
    #[default]
    Unverified,
    /// The card accepted the PIN
    Verified,
}

/// Something that happened to a PIN class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinEvent {
    /// VERIFY succeeded
    Verified,
    /// A PSO:CDS used the signature PIN
    SignatureUsed {
        /// PW status byte 0 allows several signatures per verification
        valid_for_multiple_signatures: bool,
    },
    /// The caller dropped the verification (e.g. after a destructive operation)
    Invalidated,
}

impl PinState {
    /// The single transition function for every PIN class
    pub const fn transition(self, class: PinClass, event: PinEvent) -> Self {
        match (class, event) {
            (_, PinEvent::Verified) => Self::Verified,
            (
                PinClass::Signature,
                PinEvent::SignatureUsed {
                    valid_for_multiple_signatures: false,
                },
            ) => Self::Unverified,
            (_, PinEvent::Invalidated) => Self::Unverified,
            _ => self,
        }
    }

    /// Shorthand for `self == PinState::Verified`
    pub const fn is_verified(self) -> bool {
        matches!(self, Self::Verified)
    }
}

/// States of the three PIN classes of one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PinStates {
    signature: PinState,
    other: PinState,
    admin: PinState,
}

impl PinStates {
    fn slot(&mut self, class: PinClass) -> &mut PinState {
        match class {
            PinClass::Signature => &mut self.signature,
            PinClass::Other => &mut self.other,
            PinClass::Admin => &mut self.admin,
        }
    }

    /// Current state of a class
    pub const fn state(&self, class: PinClass) -> PinState {
        match class {
            PinClass::Signature => self.signature,
            PinClass::Other => self.other,
            PinClass::Admin => self.admin,
        }
    }

    /// Apply an event to a class and return the new state
    pub fn apply(&mut self, class: PinClass, event: PinEvent) -> PinState {
        let slot = self.slot(class);
        *slot = slot.transition(class, event);
        *slot
    }

    /// Back to all unverified, as after a fresh SELECT
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A PIN value, wiped from memory on drop
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Pin(Vec<u8>);

impl Pin {
    /// Wrap raw PIN bytes
    pub fn new(pin: impl Into<Vec<u8>>) -> Self {
        Self(pin.into())
    }

    /// PIN bytes as sent in VERIFY
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for Pin {
    fn from(pin: &str) -> Self {
        Self::new(pin.as_bytes())
    }
}

impl From<String> for Pin {
    fn from(pin: String) -> Self {
        Self::new(pin.into_bytes())
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pin(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_from_any_state() {
        for class in [PinClass::Signature, PinClass::Other, PinClass::Admin] {
            assert_eq!(
                PinState::Unverified.transition(class, PinEvent::Verified),
                PinState::Verified
            );
            assert_eq!(
                PinState::Verified.transition(class, PinEvent::Verified),
                PinState::Verified
            );
        }
    }

    #[test]
    fn test_single_use_signature_pin() {
        let single_use = PinEvent::SignatureUsed {
            valid_for_multiple_signatures: false,
        };
        let multi_use = PinEvent::SignatureUsed {
            valid_for_multiple_signatures: true,
        };

        assert_eq!(
            PinState::Verified.transition(PinClass::Signature, single_use),
            PinState::Unverified
        );
        assert_eq!(
            PinState::Verified.transition(PinClass::Signature, multi_use),
            PinState::Verified
        );
        // Signing never touches the other classes
        assert_eq!(
            PinState::Verified.transition(PinClass::Other, single_use),
            PinState::Verified
        );
    }

    #[test]
    fn test_pin_states_are_independent() {
        let mut states = PinStates::default();
        states.apply(PinClass::Signature, PinEvent::Verified);
        states.apply(PinClass::Admin, PinEvent::Verified);

        assert_eq!(
            states.apply(PinClass::Admin, PinEvent::Invalidated),
            PinState::Unverified
        );
        assert!(states.state(PinClass::Signature).is_verified());
        assert!(!states.state(PinClass::Other).is_verified());

        states.reset();
        assert_eq!(states, PinStates::default());
    }

    #[test]
    fn test_pin_debug_is_redacted() {
        let pin = Pin::from("123456");
        assert_eq!(format!("{pin:?}"), "Pin(<redacted>)");
        assert_eq!(pin.as_bytes(), b"123456");
        assert_eq!(pin, Pin::new(b"123456".to_vec()));
    }
}
