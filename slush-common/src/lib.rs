//! # Slushwave Common Library
//!
//! Shared code for the Slushwave services:
//! - Error type shared by configuration and storage helpers
//! - Configuration loading and root folder resolution
//! - Event types (SlushEvent enum) and the broadcast EventBus
//! - Server-Sent Events helpers

pub mod config;
pub mod error;
pub mod events;
pub mod sse;

pub use error::{Error, Result};
