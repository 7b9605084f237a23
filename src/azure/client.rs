//! Azure Resource Manager HTTP client.
//!
//! This module provides the HTTP client for the slice of the ARM REST API
//! the stack uses, plus the two data-plane blob operations (block blob
//! upload and static-website service properties) authorized by a
//! short-lived account SAS.

use reqwest::{header, Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::{AzureError, Result, StratusError};

/// ARM endpoint for the public cloud.
const ARM_ENDPOINT: &str = "https://management.azure.com";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Maximum number of retries for transient failures.
const MAX_RETRIES: u32 = 3;

/// Delay between retries in milliseconds.
const RETRY_DELAY_MS: u64 = 1000;

/// Azure Resource Manager API client.
#[derive(Debug, Clone)]
pub struct ArmClient {
    /// HTTP client.
    client: Client,
    /// ARM bearer token.
    token: String,
    /// Target subscription id.
    subscription_id: String,
    /// ARM endpoint, overridable for tests.
    endpoint: String,
}

/// Error envelope returned by ARM on failure.
#[derive(Debug, serde::Deserialize)]
struct ArmErrorEnvelope {
    error: Option<ArmErrorBody>,
}

/// Error body inside the ARM envelope.
#[derive(Debug, serde::Deserialize)]
struct ArmErrorBody {
    code: Option<String>,
    message: Option<String>,
}

impl ArmClient {
    /// Creates a new ARM client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(token: &str, subscription_id: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| AzureError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            token: token.to_string(),
            subscription_id: subscription_id.to_string(),
            endpoint: ARM_ENDPOINT.to_string(),
        })
    }

    /// Overrides the ARM endpoint. Used by tests to point at a mock server.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Returns the subscription id this client targets.
    #[must_use]
    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// Builds the full URL for a subscription-scoped resource path.
    fn resource_url(&self, path: &str, api_version: &str) -> String {
        format!(
            "{}/subscriptions/{}{path}?api-version={api_version}",
            self.endpoint, self.subscription_id
        )
    }

    /// Creates or updates a resource (`PUT` is an upsert on ARM).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be
    /// decoded.
    pub async fn put_resource<B: Serialize + Sync, R: DeserializeOwned>(
        &self,
        path: &str,
        api_version: &str,
        body: &B,
    ) -> Result<R> {
        let url = self.resource_url(path, api_version);
        let response = self
            .execute(Method::PUT, &url, Some(serde_json::to_value(body).map_err(
                |e| AzureError::invalid_response(format!("Failed to encode request: {e}")),
            )?))
            .await?;
        Self::decode(response).await
    }

    /// Creates or updates a resource, discarding the response body.
    ///
    /// ARM answers long-running creates with `202 Accepted` and an empty
    /// body; callers poll the resource afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn put_resource_accepted<B: Serialize + Sync>(
        &self,
        path: &str,
        api_version: &str,
        body: &B,
    ) -> Result<()> {
        let url = self.resource_url(path, api_version);
        self.execute(Method::PUT, &url, Some(serde_json::to_value(body).map_err(
            |e| AzureError::invalid_response(format!("Failed to encode request: {e}")),
        )?))
        .await?;
        Ok(())
    }

    /// Reads a resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails; a 404 maps to
    /// [`AzureError::ResourceNotFound`].
    pub async fn get_resource<R: DeserializeOwned>(
        &self,
        path: &str,
        api_version: &str,
    ) -> Result<R> {
        let url = self.resource_url(path, api_version);
        let response = self.execute(Method::GET, &url, None).await?;
        Self::decode(response).await
    }

    /// Invokes a POST action on a resource (e.g. `listKeys`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be
    /// decoded.
    pub async fn post_action<B: Serialize + Sync, R: DeserializeOwned>(
        &self,
        path: &str,
        action: &str,
        api_version: &str,
        body: &B,
    ) -> Result<R> {
        let url = self.resource_url(&format!("{path}/{action}"), api_version);
        let response = self
            .execute(Method::POST, &url, Some(serde_json::to_value(body).map_err(
                |e| AzureError::invalid_response(format!("Failed to encode request: {e}")),
            )?))
            .await?;
        Self::decode(response).await
    }

    /// Deletes a resource. ARM answers 200/202 (accepted, async delete)
    /// or 204 (already gone); all are treated as success.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete_resource(&self, path: &str, api_version: &str) -> Result<()> {
        let url = self.resource_url(path, api_version);
        self.execute(Method::DELETE, &url, None).await?;
        Ok(())
    }

    /// Uploads a block blob to the data plane. The URL must already carry
    /// a SAS token authorizing the write.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload fails.
    pub async fn put_blob(&self, url: &str, content: Vec<u8>, content_type: &str) -> Result<()> {
        debug!("Uploading blob ({} bytes)", content.len());

        let response = self
            .client
            .put(url)
            .header("x-ms-blob-type", "BlockBlob")
            .header(header::CONTENT_TYPE, content_type)
            .body(content)
            .send()
            .await
            .map_err(|e| AzureError::network(format!("Blob upload failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(StratusError::Azure(AzureError::api_error(
            status.as_u16(),
            format!("Blob upload rejected: {body}"),
        )))
    }

    /// Sets the blob service properties enabling static-website hosting.
    /// The URL must already carry a SAS token authorizing the write; the
    /// body is the service-properties XML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn put_service_properties(&self, url: &str, body: String) -> Result<()> {
        let response = self
            .client
            .put(url)
            .header(header::CONTENT_TYPE, "application/xml")
            .body(body)
            .send()
            .await
            .map_err(|e| AzureError::network(format!("Service properties update failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(StratusError::Azure(AzureError::api_error(
            status.as_u16(),
            format!("Service properties rejected: {body}"),
        )))
    }

    /// Executes an ARM request with bounded retry for transient failures.
    async fn execute(
        &self,
        method: Method,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                debug!("Retry attempt {attempt} of {MAX_RETRIES}");
                tokio::time::sleep(Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt)))
                    .await;
            }

            match self.execute_once(method.clone(), url, body.as_ref()).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if e.is_retryable() {
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            StratusError::Azure(AzureError::network("Max retries exceeded"))
        }))
    }

    /// Executes a single ARM request, mapping error statuses.
    async fn execute_once(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response> {
        trace!("ARM request: {method} {url}");

        let mut request = self
            .client
            .request(method, url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token));

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AzureError::network(format!("Request failed: {e}")))?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or_default();
            let retry_after = if retry_after == 0 { 30 } else { retry_after };

            return Err(StratusError::Azure(AzureError::RateLimited {
                retry_after_secs: retry_after,
            }));
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(StratusError::Azure(AzureError::AuthenticationFailed {
                message: String::from("Invalid or expired ARM token"),
            }));
        }

        if status == StatusCode::NOT_FOUND {
            return Err(StratusError::Azure(AzureError::ResourceNotFound {
                resource: url.to_string(),
            }));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = Self::extract_arm_error(&body)
                .unwrap_or_else(|| Self::truncate_body(&body));

            if status == StatusCode::CONFLICT {
                return Err(StratusError::Azure(AzureError::NameConflict {
                    name: url.to_string(),
                    message,
                }));
            }

            return Err(StratusError::Azure(AzureError::api_error(
                status.as_u16(),
                message,
            )));
        }

        Ok(response)
    }

    /// Decodes a successful ARM response body.
    async fn decode<R: DeserializeOwned>(response: reqwest::Response) -> Result<R> {
        response.json().await.map_err(|e| {
            StratusError::Azure(AzureError::invalid_response(format!(
                "Failed to parse response: {e}"
            )))
        })
    }

    /// Extracts `error.code: error.message` from an ARM error envelope.
    fn extract_arm_error(body: &str) -> Option<String> {
        let envelope: ArmErrorEnvelope = serde_json::from_str(body).ok()?;
        let error = envelope.error?;

        match (error.code, error.message) {
            (Some(code), Some(message)) => Some(format!("{code}: {message}")),
            (None, Some(message)) => Some(message),
            (Some(code), None) => Some(code),
            (None, None) => None,
        }
    }

    /// Truncates an opaque error body for display.
    fn truncate_body(body: &str) -> String {
        const MAX: usize = 200;
        if body.len() > MAX {
            format!("{}...", &body[..MAX])
        } else {
            body.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> ArmClient {
        ArmClient::new("test-token", "sub-id")
            .unwrap()
            .with_endpoint(server.uri())
    }

    #[tokio::test]
    async fn test_get_resource_success() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/subscriptions/sub-id/resourceGroups/demo-rg"))
            .and(query_param("api-version", "2022-09-01"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "demo-rg",
                "location": "eastus"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let group: crate::azure::ResourceGroup = client
            .get_resource("/resourceGroups/demo-rg", "2022-09-01")
            .await
            .unwrap();

        assert_eq!(group.name, "demo-rg");
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_auth_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let result: Result<serde_json::Value> =
            client.get_resource("/resourceGroups/x", "2022-09-01").await;

        assert!(matches!(
            result,
            Err(StratusError::Azure(AzureError::AuthenticationFailed { .. }))
        ));
    }

    #[tokio::test]
    async fn test_conflict_maps_to_name_conflict() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
                "error": { "code": "StorageAccountAlreadyTaken", "message": "Name unavailable" }
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let result: Result<serde_json::Value> = client
            .put_resource(
                "/providers/Microsoft.Storage/storageAccounts/sa123",
                "2023-01-01",
                &serde_json::json!({}),
            )
            .await;

        match result {
            Err(StratusError::Azure(AzureError::NameConflict { message, .. })) => {
                assert!(message.contains("StorageAccountAlreadyTaken"));
            }
            other => panic!("expected name conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_not_found_maps_to_resource_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let result: Result<serde_json::Value> =
            client.get_resource("/resourceGroups/gone", "2022-09-01").await;

        assert!(matches!(
            result,
            Err(StratusError::Azure(AzureError::ResourceNotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_server_error_is_terminal() {
        let server = MockServer::start().await;

        // 5xx is not classified as retryable, so exactly one request lands.
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let result: Result<serde_json::Value> =
            client.get_resource("/resourceGroups/x", "2022-09-01").await;

        assert!(matches!(
            result,
            Err(StratusError::Azure(AzureError::ApiRequestFailed { status: 500, .. }))
        ));
    }

    #[tokio::test]
    async fn test_delete_accepts_async_delete() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        let client = test_client(&server);
        client
            .delete_resource("/resourceGroups/demo-rg", "2022-09-01")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_put_blob_sends_block_blob_header() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/webcontainer/website.zip"))
            .and(header("x-ms-blob-type", "BlockBlob"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let url = format!("{}/webcontainer/website.zip?sas=token", server.uri());
        client
            .put_blob(&url, b"zip-bytes".to_vec(), "application/zip")
            .await
            .unwrap();
    }
}
