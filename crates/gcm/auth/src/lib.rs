//! GCM Authentication
//!
//! OAuth2 bearer tokens for the FCM v1 API, minted from a Google service
//! account key and cached until shortly before they expire.

mod error;
mod key;
mod service_account;
mod traits;

pub use error::AuthError;
pub use key::ServiceAccountKey;
pub use service_account::ServiceAccountAuth;
pub use traits::*;
