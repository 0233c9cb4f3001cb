//! Address validation and canonicalisation.
//!
//! Every lookup keys on a canonical [`Ipv4Addr`]. Raw text from console
//! logs or list files goes through [`parse_ipv4`] before any I/O.

use crate::error::CheckError;
use std::net::{IpAddr, Ipv4Addr};

/// Parse a raw address into its canonical IPv4 form.
///
/// Accepts surrounding whitespace and square brackets, plus IPv4-mapped
/// IPv6 (`::ffff:a.b.c.d`). Everything else, including native IPv6,
/// is rejected with [`CheckError::InvalidAddress`].
pub fn parse_ipv4(raw: &str) -> Result<Ipv4Addr, CheckError> {
    let trimmed = raw
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']');

    match trimmed.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => Ok(v4),
        Ok(IpAddr::V6(v6)) => v6
            .to_ipv4_mapped()
            .ok_or_else(|| CheckError::InvalidAddress(raw.to_string())),
        Err(_) => Err(CheckError::InvalidAddress(raw.to_string())),
    }
}
