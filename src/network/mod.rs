//! Network module.
//!
//! Contains the per-server Supervisor and the join enforcement tasks it spawns.

pub mod enforce;
mod supervisor;

pub use enforce::BanPolicy;
pub use supervisor::Supervisor;
