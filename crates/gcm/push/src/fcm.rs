//! FCM v1 dispatcher.

use color_eyre::eyre::WrapErr as _;
use gcm_auth::{ServiceAccountAuth, TokenSource};
use gcm_core::{
    Config, GatewayResponse, GcmError, Payload, SendOptions, SendRequest, chunk_count, chunks,
};
use gcm_storage::DeviceStore;

use crate::{Dispatcher, apply_canonical_id};

/// Dispatcher talking to the FCM v1 HTTP API.
///
/// Each registration id gets its own request; requests are issued one after
/// another. Gateway responses are applied to the device store as they arrive.
pub struct FcmDispatcher<S, T> {
    config: Config,
    store: S,
    tokens: T,
    http: reqwest::Client,
}

impl<S: DeviceStore> FcmDispatcher<S, ServiceAccountAuth> {
    /// Build a dispatcher from configuration, loading the service account key
    /// named there.
    pub fn from_config(config: Config, store: S) -> color_eyre::eyre::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().wrap_err("failed to build HTTP client")?;

        let tokens = ServiceAccountAuth::from_file(
            config.credentials_file()?,
            config.firebase.scope.clone(),
            http.clone(),
        )?;

        tracing::info!(
            project_id = %tokens.project_id(),
            max_recipients = config.firebase.max_recipients.get(),
            "FCM dispatcher ready"
        );

        Ok(Self::new(config, store, tokens, http))
    }
}

impl<S, T> FcmDispatcher<S, T> {
    /// Create a dispatcher from its parts.
    pub fn new(config: Config, store: S, tokens: T, http: reqwest::Client) -> Self {
        Self {
            config,
            store,
            tokens,
            http,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: DeviceStore, T: TokenSource> FcmDispatcher<S, T> {
    /// Apply the response policy for a request sent to `registration_id`.
    fn handle_response(
        &self,
        registration_id: &str,
        status: reqwest::StatusCode,
        raw: String,
    ) -> color_eyre::eyre::Result<String> {
        match GatewayResponse::classify(&raw) {
            GatewayResponse::Delivered { canonical_id } => {
                if let Some(canonical_id) = canonical_id {
                    apply_canonical_id(&self.store, &canonical_id, registration_id)?;
                }
            }
            GatewayResponse::Dead(reason) => {
                tracing::warn!(
                    registration_id = %registration_id,
                    reason = %reason,
                    "deactivating device"
                );
                self.store
                    .deactivate(registration_id)
                    .wrap_err("failed to deactivate device")?;
            }
            GatewayResponse::Rejected => {
                tracing::error!(
                    registration_id = %registration_id,
                    status = status.as_u16(),
                    response = %raw,
                    "gateway rejected message"
                );
                return Err(GcmError::Gateway(raw).into());
            }
            GatewayResponse::Unrecognized => {
                if !status.is_success() {
                    return Err(GcmError::Http {
                        status: status.as_u16(),
                        body: raw,
                    }
                    .into());
                }
            }
        }

        Ok(raw)
    }
}

impl<S: DeviceStore, T: TokenSource> Dispatcher for FcmDispatcher<S, T> {
    async fn send_single(
        &self,
        registration_id: &str,
        payload: &Payload,
        options: &SendOptions,
    ) -> color_eyre::eyre::Result<String> {
        let token = self.tokens.access_token().await?;
        let url = self.config.send_url(self.tokens.project_id());
        let body = SendRequest::new(registration_id, payload, options);

        tracing::debug!(registration_id = %registration_id, url = %url, "sending message");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .wrap_err("FCM send request failed")?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .wrap_err("failed to read FCM response")?;

        self.handle_response(registration_id, status, raw)
    }

    async fn send_bulk(
        &self,
        registration_ids: &[String],
        payload: &Payload,
        options: &SendOptions,
    ) -> color_eyre::eyre::Result<Vec<Vec<String>>> {
        let max = self.config.firebase.max_recipients;
        let mut results = Vec::with_capacity(chunk_count(registration_ids.len(), max));

        for (index, chunk) in chunks(registration_ids, max).enumerate() {
            tracing::debug!(chunk = index, size = chunk.len(), "sending chunk");

            let mut responses = Vec::with_capacity(chunk.len());
            for registration_id in chunk {
                responses.push(self.send_single(registration_id, payload, options).await?);
            }
            results.push(responses);
        }

        tracing::info!(
            recipients = registration_ids.len(),
            chunks = results.len(),
            "bulk send complete"
        );

        Ok(results)
    }
}
