//! Security primitives for vpnsentry.
//!
//! - **Address**: canonical IPv4 validation before any lookup
//! - **Ranges**: inclusive IPv4 ranges, CIDR expansion, list-file lines
//! - **Rate Limiting**: sliding-window admission per reputation provider

pub mod address;
pub mod ranges;
pub mod rate_limit;

pub use address::parse_ipv4;
pub use ranges::{IpRange, ListEntry, parse_list_line};
pub use rate_limit::RateLimiter;
