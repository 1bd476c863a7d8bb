//! Outbound messaging: the messenger port and the delivery policy on top of it.

pub mod delivery;
pub mod port;
pub mod types;
