//! Utility functions for PC/SC operations

/// Match an ATR against a pattern with an optional mask
///
/// If a mask is provided, only the bits set in the mask are compared.
pub(crate) fn match_atr(atr: &[u8], pattern: &[u8], mask: Option<&[u8]>) -> bool {
    if pattern.len() > atr.len() {
        return false;
    }

    match mask {
        Some(mask) if mask.len() < pattern.len() => false,
        Some(mask) => pattern
            .iter()
            .zip(atr)
            .zip(mask)
            .all(|((p, a), m)| (a & m) == (p & m)),
        None => atr.starts_with(pattern),
    }
}

/// ATR synthesised by PC/SC for ISO 14443-4 cards: `3B 8n 80 01 ...`
pub(crate) fn is_contactless_atr(atr: &[u8]) -> bool {
    matches!(atr, [0x3B, t0, 0x80, 0x01, ..] if t0 & 0xF0 == 0x80)
}

/// Reader drivers name their contactless slot after the field interface
pub(crate) fn is_contactless_reader_name(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    ["contactless", "picc", "nfc"]
        .iter()
        .any(|marker| name.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Yubikey 5 NFC over the contact interface
    const ATR: [u8; 8] = [0x3B, 0xFD, 0x13, 0x00, 0x00, 0x81, 0x31, 0xFE];

    #[test]
    fn test_match_atr_prefix() {
        assert!(match_atr(&ATR, &[0x3B, 0xFD], None));
        assert!(!match_atr(&ATR, &[0x3B, 0xFC], None));
        assert!(!match_atr(&[0x3B], &[0x3B, 0xFD], None));
    }

    #[test]
    fn test_match_atr_with_mask() {
        assert!(match_atr(&ATR, &[0x3B, 0xF0], Some(&[0xFF, 0xF0])));
        assert!(!match_atr(&ATR, &[0x3B, 0xE0], Some(&[0xFF, 0xF0])));
        // Mask shorter than pattern never matches
        assert!(!match_atr(&ATR, &[0x3B, 0xFD], Some(&[0xFF])));
    }

    #[test]
    fn test_contactless_detection() {
        assert!(!is_contactless_atr(&ATR));
        assert!(is_contactless_atr(&[0x3B, 0x88, 0x80, 0x01, 0x00]));
        assert!(!is_contactless_atr(&[0x3B, 0x88, 0x80]));

        assert!(is_contactless_reader_name("OMNIKEY CardMan 5x21-CL 0 PICC"));
        assert!(is_contactless_reader_name("SCM Microsystems SCL3711 NFC"));
        assert!(!is_contactless_reader_name("Yubico YubiKey OTP+FIDO+CCID 00 00"));
    }
}
