//! Dispatch traits.

use gcm_core::{Payload, SendOptions};

/// Sends notifications to registration ids.
#[trait_variant::make(Send)]
pub trait Dispatcher: Send + Sync {
    /// Send to one registration id and return the raw gateway response.
    async fn send_single(
        &self,
        registration_id: &str,
        payload: &Payload,
        options: &SendOptions,
    ) -> color_eyre::eyre::Result<String>;

    /// Send to many registration ids, one request each, grouped into chunks.
    ///
    /// Returns the raw responses per chunk. The first error aborts the rest.
    async fn send_bulk(
        &self,
        registration_ids: &[String],
        payload: &Payload,
        options: &SendOptions,
    ) -> color_eyre::eyre::Result<Vec<Vec<String>>>;
}
