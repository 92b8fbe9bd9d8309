//! Dispatch errors.

/// Error raised while dispatching to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GcmError {
    /// The gateway rejected the message with an error that deactivating the
    /// device does not resolve. Carries the raw gateway response.
    #[error("{0}")]
    Gateway(String),

    /// Non-success HTTP status with a body that is not a recognised gateway error.
    #[error("gateway returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
}
