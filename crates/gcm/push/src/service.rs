//! Device-level push service.

use color_eyre::eyre::WrapErr as _;
use gcm_core::{Payload, SendOptions};
use gcm_storage::DeviceStore;

use crate::Dispatcher;

/// Push service that resolves devices from the store before dispatching.
pub struct PushService<S, D> {
    store: S,
    dispatcher: D,
}

impl<S, D> PushService<S, D>
where
    S: DeviceStore,
    D: Dispatcher,
{
    /// Create a new push service.
    pub fn new(store: S, dispatcher: D) -> Self {
        Self { store, dispatcher }
    }

    /// Send to every active device.
    pub async fn send_to_active(
        &self,
        payload: &Payload,
        options: &SendOptions,
    ) -> color_eyre::eyre::Result<Vec<Vec<String>>> {
        let ids = self
            .store
            .active_registration_ids()
            .wrap_err("failed to load active devices")?;

        if ids.is_empty() {
            tracing::info!("no active devices to notify");
            return Ok(Vec::new());
        }

        tracing::info!(devices = ids.len(), "sending to active devices");

        self.dispatcher.send_bulk(&ids, payload, options).await
    }

    /// Send to a registered device, refusing inactive or unknown ids.
    pub async fn send_to_device(
        &self,
        registration_id: &str,
        payload: &Payload,
        options: &SendOptions,
    ) -> color_eyre::eyre::Result<String> {
        if !self.store.has_active(registration_id)? {
            color_eyre::eyre::bail!("no active device with registration id {}", registration_id);
        }

        self.dispatcher
            .send_single(registration_id, payload, options)
            .await
    }
}
