//! Device registration and activation.
//!
//! Two calls against the backend: `register` announces the device and its
//! push token, `confirm_device` exchanges an operator-issued activation
//! code for a registration id and secret key. The secret key is persisted
//! into the key store before the confirmation result is returned, so the
//! key is durable by the time the caller can act on the registration.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use cotrace_core::{KeyStore, Registration};

use crate::error::{ClientError, Result};
use crate::transport::{join_endpoint, ApiRequest, HttpMethod, HttpTransport};

/// The fields exchanged for a registration during activation.
#[derive(Debug, Clone)]
pub struct DeviceConfirmation {
    /// One-time activation code issued out of band.
    pub activation_code: String,
    /// Push notification token for this device.
    pub push_token: String,
    /// Device hardware model.
    pub device_model: String,
    /// Operating system version.
    pub device_os_version: String,
}

/// Client for the device registration endpoints.
pub struct ResidentApi<T> {
    base_url: Url,
    transport: T,
    key_store: Arc<KeyStore>,
}

impl<T: HttpTransport> ResidentApi<T> {
    /// Create a new registration client.
    pub fn new(base_url: Url, transport: T, key_store: Arc<KeyStore>) -> Self {
        Self {
            base_url,
            transport,
            key_store,
        }
    }

    /// Announce the device and its push token to the backend.
    ///
    /// Idempotent from the caller's perspective; safe to retry. The
    /// response body is ignored beyond its status.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the backend is unreachable or
    /// rejects the request.
    pub async fn register(&self, push_token: &str) -> Result<()> {
        let request = ApiRequest {
            method: HttpMethod::Post,
            url: join_endpoint(&self.base_url, "api/devices/registrations")?,
            body: json!({ "pushToken": push_token }),
        };
        self.transport.send(request).await?;
        debug!("device registration announced");
        Ok(())
    }

    /// Exchange an activation code for a registration and secret key.
    ///
    /// On success the secret key is stored before the registration is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns a transport error on network failure, a malformed-response
    /// error when the success body misses `id` or `secretKey`, or a
    /// storage error if the key cannot be persisted.
    pub async fn confirm_device(&self, confirmation: &DeviceConfirmation) -> Result<Registration> {
        let request = ApiRequest {
            method: HttpMethod::Post,
            url: join_endpoint(&self.base_url, "api/devices")?,
            body: json!({
                "activationCode": confirmation.activation_code,
                "pushToken": confirmation.push_token,
                "deviceModel": confirmation.device_model,
                "deviceOSVersion": confirmation.device_os_version,
            }),
        };
        let response = self.transport.send(request).await?;

        let id = response
            .get("id")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| ClientError::MalformedResponse {
                reason: "missing field 'id'".to_string(),
            })?;
        let id: Uuid = id.parse().map_err(|_| ClientError::MalformedResponse {
            reason: format!("'id' is not a valid identifier: {id}"),
        })?;
        let secret_key = response
            .get("secretKey")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| ClientError::MalformedResponse {
                reason: "missing field 'secretKey'".to_string(),
            })?;

        // Key durability precedes the success outcome.
        self.key_store.put_key(secret_key)?;
        info!("device confirmed, secret key provisioned");

        Ok(Registration::new(id))
    }
}
