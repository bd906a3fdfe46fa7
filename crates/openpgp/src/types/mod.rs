//! Token and capability types

mod card_capabilities;
mod openpgp_capabilities;
mod token;

pub use card_capabilities::CardCapabilities;
pub use openpgp_capabilities::{OpenPgpCapabilities, SecureMessagingScheme};
pub use token::{KeyType, TokenType, TransportType};

use iso7816_tlv::ber::{Tlv, Value};

/// Depth-first search for a primitive data object, descending into templates
pub(crate) fn find_primitive<'a>(tlvs: &'a [Tlv], tag: &[u8]) -> Option<&'a [u8]> {
    tlvs.iter().find_map(|tlv| match tlv.value() {
        Value::Primitive(value) if tlv.tag().to_bytes() == tag => Some(value.as_slice()),
        Value::Constructed(children) => find_primitive(children, tag),
        Value::Primitive(_) => None,
    })
}
