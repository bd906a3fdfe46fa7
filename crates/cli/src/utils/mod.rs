//! Utility functions for the CLI

pub mod reader;

use std::error::Error;

/// Parse a hex argument, tolerating a `0x` prefix and whitespace
pub fn parse_hex(input: &str) -> Result<Vec<u8>, Box<dyn Error>> {
    let cleaned: String = input
        .trim()
        .trim_start_matches("0x")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    Ok(hex::decode(cleaned)?)
}
