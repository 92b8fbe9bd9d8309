//! GCM Core Types
//!
//! Shared types for Android push dispatch over Firebase Cloud Messaging:
//! configuration, device records, message bodies, gateway response
//! classification and recipient chunking.

mod chunk;
mod config;
mod device;
mod error;
mod message;
mod response;

pub use chunk::*;
pub use config::*;
pub use device::*;
pub use error::*;
pub use message::*;
pub use response::*;
