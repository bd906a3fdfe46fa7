//! Command APDU factory for the OpenPGP card application
//!
//! The session never assembles instruction bytes itself; it asks a
//! [`CommandFactory`] and only decides how the result is framed.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use sectoken_apdu_core::Command;
use sectoken_apdu_core::command::{CLA_CHAINING, MAX_SHORT_NC};

use crate::constants::{MAX_EXTENDED_NE, MAX_SHORT_NE, OPENPGP_AID, ins};
use crate::pin::PinClass;

const CLA: u8 = 0x00;

/// Builds the command APDUs of OpenPGP card 3.x
///
/// Every method has a default implementation; implementors override only
/// what their token does differently.
pub trait CommandFactory: Send + Sync + fmt::Debug {
    /// SELECT the OpenPGP application
    fn select_file_openpgp(&self) -> Command {
        self.select_file(&OPENPGP_AID)
    }

    /// SELECT by (partial) application identifier
    fn select_file(&self, aid: &[u8]) -> Command {
        Command::new_with_data(CLA, ins::SELECT, 0x04, 0x00, aid.to_vec())
    }

    /// GET DATA for the data object `p1 p2`
    fn get_data(&self, p1: u8, p2: u8) -> Command {
        Command::new_with_le(CLA, ins::GET_DATA, p1, p2, MAX_EXTENDED_NE)
    }

    /// GET RESPONSE for the `sw2` bytes announced by a `61 XX` status
    fn get_response(&self, sw2: u8) -> Command {
        let ne = if sw2 == 0 { MAX_SHORT_NE } else { sw2 as u32 };
        Command::new_with_le(CLA, ins::GET_RESPONSE, 0x00, 0x00, ne)
    }

    /// VERIFY for the given PIN class
    fn verify_pin(&self, class: PinClass, pin: &[u8]) -> Command {
        match class {
            PinClass::Signature => self.verify_pw1_for_signature(pin),
            PinClass::Other => self.verify_pw1_for_other(pin),
            PinClass::Admin => self.verify_pw3(pin),
        }
    }

    /// VERIFY PW1 for signing
    fn verify_pw1_for_signature(&self, pin: &[u8]) -> Command {
        verify(PinClass::Signature, pin)
    }

    /// VERIFY PW1 for decryption and other operations
    fn verify_pw1_for_other(&self, pin: &[u8]) -> Command {
        verify(PinClass::Other, pin)
    }

    /// VERIFY PW3
    fn verify_pw3(&self, pin: &[u8]) -> Command {
        verify(PinClass::Admin, pin)
    }

    /// PSO:COMPUTE DIGITAL SIGNATURE over a DigestInfo (or raw hash for ECC)
    fn compute_digital_signature(&self, data: &[u8]) -> Command {
        Command::new_with_data_and_le(CLA, ins::PSO, 0x9E, 0x9A, data.to_vec(), MAX_EXTENDED_NE)
    }

    /// PSO:DECIPHER, prefixing the RSA padding indicator byte
    fn decipher(&self, data: &[u8]) -> Command {
        let mut payload = BytesMut::with_capacity(data.len() + 1);
        payload.put_u8(0x00);
        payload.put_slice(data);
        Command::new_with_data_and_le(CLA, ins::PSO, 0x80, 0x86, payload.freeze(), MAX_EXTENDED_NE)
    }

    /// The command fits short APDU limits once Ne is clamped
    fn is_suitable_for_short_apdu(&self, command: &Command) -> bool {
        command.nc() <= MAX_SHORT_NC
    }

    /// Same command with Ne clamped to the short maximum
    fn create_short_apdu(&self, command: &Command) -> Command {
        let mut short = command.clone();
        short.le = command.le.map(|ne| ne.min(MAX_SHORT_NE));
        short
    }

    /// Split the command data into chained short APDUs
    ///
    /// Every segment but the last has the chaining bit set in CLA and no Le;
    /// the last segment carries the original CLA and the clamped Ne.
    fn create_chained_apdus(&self, command: &Command) -> Vec<Command> {
        let data = command.data.clone().unwrap_or_default();
        if data.len() <= MAX_SHORT_NC {
            return vec![self.create_short_apdu(command)];
        }

        let segments = data.len().div_ceil(MAX_SHORT_NC);
        (0..segments)
            .map(|index| {
                let start = index * MAX_SHORT_NC;
                let end = (start + MAX_SHORT_NC).min(data.len());
                let chunk: Bytes = data.slice(start..end);
                if index + 1 < segments {
                    Command::new_with_data(
                        command.cla | CLA_CHAINING,
                        command.ins,
                        command.p1,
                        command.p2,
                        chunk,
                    )
                } else {
                    Command {
                        data: Some(chunk),
                        ..self.create_short_apdu(command)
                    }
                }
            })
            .collect()
    }
}

fn verify(class: PinClass, pin: &[u8]) -> Command {
    Command::new_with_data(CLA, ins::VERIFY, 0x00, class.reference(), pin.to_vec())
}

/// Factory with the stock OpenPGP card encodings
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenPgpCommandFactory;

impl CommandFactory for OpenPgpCommandFactory {}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_select_and_get_data() {
        let factory = OpenPgpCommandFactory;
        assert_eq!(
            factory.select_file_openpgp().to_bytes().as_ref(),
            &hex!("00A4040006D27600012401")
        );
        assert_eq!(
            factory.select_file(&hex!("A000000617")).to_bytes().as_ref(),
            &hex!("00A4040005A000000617")
        );
        assert_eq!(
            factory.get_data(0x00, 0x6E).to_bytes().as_ref(),
            &hex!("00CA006E000000")
        );
    }

    #[test]
    fn test_get_response() {
        let factory = OpenPgpCommandFactory;
        assert_eq!(factory.get_response(0x05).to_bytes().as_ref(), &hex!("00C0000005"));
        assert_eq!(factory.get_response(0x00).to_bytes().as_ref(), &hex!("00C0000000"));
    }

    #[test]
    fn test_verify_references() {
        let factory = OpenPgpCommandFactory;
        assert_eq!(
            factory.verify_pw1_for_signature(b"123456").to_bytes().as_ref(),
            &hex!("0020008106313233343536")
        );
        assert_eq!(factory.verify_pin(PinClass::Other, b"123456").p2, 0x82);
        assert_eq!(factory.verify_pw3(b"12345678").p2, 0x83);
    }

    #[test]
    fn test_pso_commands() {
        let factory = OpenPgpCommandFactory;
        let cds = factory.compute_digital_signature(&[0xAA; 32]);
        assert_eq!((cds.ins, cds.p1, cds.p2), (0x2A, 0x9E, 0x9A));
        assert_eq!(cds.nc(), 32);

        let dec = factory.decipher(&[0xBB; 3]);
        assert_eq!((dec.p1, dec.p2), (0x80, 0x86));
        assert_eq!(dec.data(), &hex!("00BBBBBB"));
    }

    #[test]
    fn test_short_apdu_conversion() {
        let factory = OpenPgpCommandFactory;
        let get_data = factory.get_data(0x00, 0x6E);
        assert!(get_data.is_extended());
        assert!(factory.is_suitable_for_short_apdu(&get_data));

        let short = factory.create_short_apdu(&get_data);
        assert!(!short.is_extended());
        assert_eq!(short.to_bytes().as_ref(), &hex!("00CA006E00"));

        let long = factory.compute_digital_signature(&[0x01; 256]);
        assert!(!factory.is_suitable_for_short_apdu(&long));
    }

    #[test]
    fn test_chained_apdus() {
        let factory = OpenPgpCommandFactory;
        let data: Vec<u8> = (0..600u32).map(|i| i as u8).collect();
        let command = factory.compute_digital_signature(&data);
        let chain = factory.create_chained_apdus(&command);

        assert_eq!(chain.len(), 3);
        assert_eq!(chain[0].cla, 0x10);
        assert_eq!(chain[1].cla, 0x10);
        assert_eq!(chain[2].cla, 0x00);
        assert_eq!(chain[0].nc(), 255);
        assert_eq!(chain[1].nc(), 255);
        assert_eq!(chain[2].nc(), 90);
        assert!(chain[0].le.is_none());
        assert_eq!(chain[2].le, Some(256));
        assert!(chain.iter().all(|segment| !segment.is_extended()));

        let joined: Vec<u8> = chain.iter().flat_map(|s| s.data().to_vec()).collect();
        assert_eq!(joined, data);
    }
}
