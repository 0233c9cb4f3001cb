//! IPv4 ranges and the ban/allow list line format.
//!
//! A list line holds one of
//!
//! - a single address: `1.2.3.4`
//! - a CIDR block: `10.0.0.0/24`
//! - an explicit inclusive range: `10.0.0.5 - 10.0.0.9`
//!
//! optionally followed by `# reason text`. Blank lines and comment-only
//! lines carry no entry.
//!
//! CIDR blocks cover their usable hosts only: for prefixes shorter than
//! /31 the network and broadcast addresses are left out.

use ipnet::Ipv4Net;
use regex::Regex;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

static LIST_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([\s0-9./-]+)\s*(#\s*(.*\S)\s*)?$").expect("list line pattern is valid")
});

/// Range and list-line parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("malformed address or range: {0:?}")]
    Malformed(String),

    #[error("range lower bound {lower} is above upper bound {upper}")]
    Inverted { lower: Ipv4Addr, upper: Ipv4Addr },
}

impl RangeError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::Inverted { .. } => "inverted",
        }
    }
}

/// Inclusive IPv4 range `lower..=upper`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IpRange {
    lower: Ipv4Addr,
    upper: Ipv4Addr,
}

impl IpRange {
    /// Build a range; fails when `lower > upper`.
    pub fn new(lower: Ipv4Addr, upper: Ipv4Addr) -> Result<Self, RangeError> {
        if lower > upper {
            return Err(RangeError::Inverted { lower, upper });
        }
        Ok(Self { lower, upper })
    }

    /// Range covering exactly one address.
    pub fn single(ip: Ipv4Addr) -> Self {
        Self {
            lower: ip,
            upper: ip,
        }
    }

    pub fn lower(&self) -> Ipv4Addr {
        self.lower
    }

    pub fn upper(&self) -> Ipv4Addr {
        self.upper
    }

    #[inline]
    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        self.lower <= ip && ip <= self.upper
    }

    /// Number of addresses covered (at least 1).
    pub fn size(&self) -> u64 {
        u64::from(u32::from(self.upper)) - u64::from(u32::from(self.lower)) + 1
    }
}

// Stores work on bounds; expansion is for checking cover sets in tests.
#[cfg(test)]
impl IpRange {
    /// Iterate every covered address in ascending order.
    pub fn addresses(&self) -> impl Iterator<Item = Ipv4Addr> {
        (u32::from(self.lower)..=u32::from(self.upper)).map(Ipv4Addr::from)
    }
}

impl From<Ipv4Net> for IpRange {
    fn from(net: Ipv4Net) -> Self {
        let net = net.trunc();
        if net.prefix_len() >= 31 {
            return Self {
                lower: net.network(),
                upper: net.broadcast(),
            };
        }
        Self {
            lower: Ipv4Addr::from(u32::from(net.network()) + 1),
            upper: Ipv4Addr::from(u32::from(net.broadcast()) - 1),
        }
    }
}

impl FromStr for IpRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let malformed = || RangeError::Malformed(s.to_string());

        if let Some((lo, hi)) = s.split_once('-') {
            let lower = lo.trim().parse().map_err(|_| malformed())?;
            let upper = hi.trim().parse().map_err(|_| malformed())?;
            return Self::new(lower, upper);
        }
        if s.contains('/') {
            let net: Ipv4Net = s.parse().map_err(|_| malformed())?;
            return Ok(net.into());
        }
        s.parse().map(Self::single).map_err(|_| malformed())
    }
}

impl fmt::Display for IpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lower == self.upper {
            write!(f, "{}", self.lower)
        } else {
            write!(f, "{}-{}", self.lower, self.upper)
        }
    }
}

/// All usable host addresses of a CIDR block.
#[cfg(test)]
pub fn ips_from_cidr(cidr: &str) -> Result<Vec<Ipv4Addr>, RangeError> {
    let net: Ipv4Net = cidr
        .trim()
        .parse()
        .map_err(|_| RangeError::Malformed(cidr.to_string()))?;
    Ok(IpRange::from(net).addresses().collect())
}

/// All addresses from `lower` to `upper`, both included.
#[cfg(test)]
pub fn ips_from_range(lower: &str, upper: &str) -> Result<Vec<Ipv4Addr>, RangeError> {
    let lo = lower
        .trim()
        .parse()
        .map_err(|_| RangeError::Malformed(lower.to_string()))?;
    let hi = upper
        .trim()
        .parse()
        .map_err(|_| RangeError::Malformed(upper.to_string()))?;
    Ok(IpRange::new(lo, hi)?.addresses().collect())
}

/// One parsed list-file line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub range: IpRange,
    /// Text after `#`, trimmed; empty when absent.
    pub reason: String,
}

/// Parse one list-file line.
///
/// Returns `Ok(None)` for blank and comment-only lines.
pub fn parse_list_line(line: &str) -> Result<Option<ListEntry>, RangeError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let caps = LIST_LINE
        .captures(line)
        .ok_or_else(|| RangeError::Malformed(trimmed.to_string()))?;
    let range = caps
        .get(1)
        .map(|m| m.as_str())
        .unwrap_or_default()
        .parse()?;
    let reason = caps
        .get(3)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    Ok(Some(ListEntry { range, reason }))
}
