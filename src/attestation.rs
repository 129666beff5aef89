//! Client for the external attestation authority.

use alloy_primitives::{hex, Bytes, B256};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument, trace};

/// The decoded response from the attestation endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AttestationResponse {
    pub status: String,
    #[serde(default)]
    pub attestation: Option<Bytes>,
}

impl AttestationResponse {
    /// True when the attestation is ready to submit: status is `"complete"`
    /// and the attestation payload is present and non-empty.
    pub fn is_ready(&self) -> bool {
        self.status == "complete" && self.attestation.as_ref().is_some_and(|a| !a.is_empty())
    }
}

/// Abstracts the HTTP call to the attestation authority so the poller can be
/// tested against a fake.
#[async_trait]
pub trait AttestationClient: Send + Sync {
    /// Fetches the current attestation status for `message_hash`. Any
    /// transport or parse failure is folded into a not-ready response by the
    /// caller — per the external interface, "all other responses, including
    /// HTTP errors, are treated as not yet ready."
    async fn get_attestation(&self, message_hash: B256) -> Option<AttestationResponse>;
}

/// Production client for Circle-style Iris attestation APIs.
pub struct HttpAttestationClient {
    base_url: url::Url,
    client: reqwest::Client,
}

impl HttpAttestationClient {
    pub fn new(base_url: url::Url, client: reqwest::Client) -> Self {
        Self { base_url, client }
    }

    fn attestation_url(&self, message_hash: B256) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), hex::encode(message_hash))
    }
}

#[async_trait]
impl AttestationClient for HttpAttestationClient {
    #[instrument(skip(self), fields(message_hash = %message_hash))]
    async fn get_attestation(&self, message_hash: B256) -> Option<AttestationResponse> {
        let url = self.attestation_url(message_hash);
        trace!(url = %url, "requesting attestation");

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "attestation request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            debug!(status = %response.status(), "attestation endpoint returned a non-success status");
            return None;
        }

        match response.json::<AttestationResponse>().await {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                debug!(error = %e, "attestation response was not valid JSON for the expected shape");
                None
            }
        }
    }
}
