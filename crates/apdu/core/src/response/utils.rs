//! Utility functions for APDU response handling

use crate::response::error::ResponseError;
use crate::response::status::StatusWord;
use tracing::debug;

/// Split a raw APDU response into its status word bytes and payload
///
/// # Errors
/// Returns an error if the data is too short to contain a status word.
pub fn extract_response_parts(data: &[u8]) -> Result<((u8, u8), &[u8]), ResponseError> {
    match data {
        [payload @ .., sw1, sw2] => Ok(((*sw1, *sw2), payload)),
        _ => {
            debug!("Response too short: {} bytes", data.len());
            Err(ResponseError::Incomplete)
        }
    }
}

/// Like [`extract_response_parts`], returning a [`StatusWord`]
pub fn extract_status_and_payload(data: &[u8]) -> Result<(StatusWord, &[u8]), ResponseError> {
    let ((sw1, sw2), payload) = extract_response_parts(data)?;
    Ok((StatusWord::new(sw1, sw2), payload))
}
