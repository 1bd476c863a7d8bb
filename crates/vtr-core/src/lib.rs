//! Core of the VK wall → Telegram relay.
//!
//! This crate is framework-agnostic. The VK API and the Telegram Bot API live
//! behind ports (traits) implemented in adapter crates.

pub mod config;
pub mod domain;
pub mod driver;
pub mod errors;
pub mod formatting;
pub mod guard;
pub mod listener;
pub mod logging;
pub mod messaging;
pub mod ports;
pub mod post;
pub mod relay;
pub mod store;
pub mod team;

pub use errors::{Error, Result};
