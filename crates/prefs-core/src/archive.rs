//! Binary archive of raw values
//!
//! Archived values are bincode encodings of [`RawValue`]. Values holding an
//! opaque object cannot be archived; both directions report failure as
//! `None` after logging it.

use crate::error::Result;
use crate::value::RawValue;

/// Encode a raw value, returning the error on failure
pub fn try_archive(value: &RawValue) -> Result<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

/// Decode a raw value, returning the error on failure
pub fn try_unarchive(data: &[u8]) -> Result<RawValue> {
    Ok(bincode::deserialize(data)?)
}

/// Encode a raw value into a binary blob
pub fn archive(value: &RawValue) -> Option<Vec<u8>> {
    try_archive(value)
        .map_err(|e| tracing::warn!("Failed to archive {} value: {}", value.kind(), e))
        .ok()
}

/// Decode a binary blob produced by [`archive`]
pub fn unarchive(data: &[u8]) -> Option<RawValue> {
    try_unarchive(data)
        .map_err(|e| tracing::warn!("Failed to unarchive {} bytes: {}", data.len(), e))
        .ok()
}
