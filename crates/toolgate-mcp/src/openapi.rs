// crates/toolgate-mcp/src/openapi.rs
// ============================================================================
// Module: OpenAPI Client
// Description: Outbound signed HTTP client for the internal backend.
// Purpose: Forward tool invocations as signed JSON POSTs.
// Dependencies: reqwest, serde_json
// ============================================================================

//! ## Overview
//! The OpenAPI client forwards a tool invocation to the internal backend.
//! Each call signs the common parameters (signature method, a fresh nonce,
//! the access key), appends them to the target URL as a query string, and
//! POSTs the tool arguments as a JSON body. Calls are synchronous with a
//! bounded timeout; non-2xx responses surface as a backend error carrying
//! the status code and raw body, never retried.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::blocking::Client;
use thiserror::Error;

use crate::signing::PARAM_ACCESS_KEY_ID;
use crate::signing::PARAM_SIGNATURE;
use crate::signing::PARAM_SIGNATURE_METHOD;
use crate::signing::PARAM_SIGNATURE_NONCE;
use crate::signing::SIGNATURE_METHOD;
use crate::signing::SigningError;
use crate::signing::compose_string_to_sign;
use crate::signing::generate_nonce;
use crate::signing::sign_string;
use crate::signing::sorted_params_str;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default timeout for forwarded backend calls.
pub const DEFAULT_OPENAPI_TIMEOUT_SECS: u64 = 120;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Outbound backend call failures.
#[derive(Debug, Error)]
pub enum OpenApiError {
    /// The backend answered with a non-2xx status.
    #[error("backend returned status {status}: {body}")]
    Server {
        /// HTTP status code returned by the backend.
        status: u16,
        /// Raw response body returned by the backend.
        body: String,
    },
    /// The request could not be completed.
    #[error("failed to request open api endpoint: {0}")]
    Client(String),
    /// Signing the common parameters failed.
    #[error(transparent)]
    Signing(#[from] SigningError),
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Signed HTTP client bound to one backend host and caller identity.
#[derive(Debug)]
pub struct OpenApiClient {
    /// Backend host and port.
    host: String,
    /// Caller access key identifier.
    access_key: String,
    /// Caller shared secret.
    secret_key: String,
    /// HTTP client with the bounded call timeout.
    client: Client,
}

impl OpenApiClient {
    /// Builds a client for one backend host and caller identity.
    ///
    /// # Errors
    ///
    /// Returns [`OpenApiError`] when the HTTP client cannot be constructed.
    pub fn new(
        host: impl Into<String>,
        timeout: Duration,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Result<Self, OpenApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|_| OpenApiError::Client("http client build failed".to_string()))?;
        Ok(Self {
            host: host.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            client,
        })
    }

    /// Sends a signed JSON POST to the backend and returns the raw body.
    ///
    /// # Errors
    ///
    /// Returns [`OpenApiError::Server`] for non-2xx responses and
    /// [`OpenApiError::Client`] when the call cannot be completed.
    pub fn post_json(&self, uri: &str, content: &str) -> Result<String, OpenApiError> {
        let common_params = self.common_params()?;
        let url = self.full_url(uri, &common_params);
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json; charset=utf-8")
            .body(content.to_string())
            .send()
            .map_err(|err| map_send_error(&self.host, &err))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|_| OpenApiError::Client("backend response read failed".to_string()))?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(OpenApiError::Server {
                status: status.as_u16(),
                body,
            })
        }
    }

    /// Builds the signed common parameters for one call.
    fn common_params(&self) -> Result<BTreeMap<String, String>, OpenApiError> {
        let mut params = BTreeMap::new();
        params.insert(PARAM_SIGNATURE_METHOD.to_string(), SIGNATURE_METHOD.to_string());
        params.insert(PARAM_SIGNATURE_NONCE.to_string(), generate_nonce());
        params.insert(PARAM_ACCESS_KEY_ID.to_string(), self.access_key.clone());

        let string_to_sign = compose_string_to_sign(&params);
        let signature = sign_string(&string_to_sign, &self.secret_key)?;
        params.insert(PARAM_SIGNATURE.to_string(), signature);
        Ok(params)
    }

    /// Composes the full URL with the signed query string.
    fn full_url(&self, uri: &str, common_params: &BTreeMap<String, String>) -> String {
        format!("http://{}{}?{}", self.host, uri, sorted_params_str(common_params))
    }
}

/// Maps reqwest send errors to stable client error messages.
fn map_send_error(host: &str, error: &reqwest::Error) -> OpenApiError {
    if error.is_timeout() {
        OpenApiError::Client(format!("request to open api endpoint ({host}) timed out"))
    } else {
        OpenApiError::Client(format!("failed to request open api endpoint ({host})"))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use std::time::Duration;

    use super::*;
    use crate::signing::signatures_match;

    #[test]
    fn common_params_carry_a_verifiable_signature() {
        let client =
            OpenApiClient::new("127.0.0.1:8111", Duration::from_secs(1), "ak-1", "sk-1").unwrap();
        let params = client.common_params().unwrap();
        assert_eq!(params.get(PARAM_SIGNATURE_METHOD).unwrap(), SIGNATURE_METHOD);
        assert_eq!(params.get(PARAM_ACCESS_KEY_ID).unwrap(), "ak-1");

        let mut to_verify = params.clone();
        let supplied = to_verify.remove(PARAM_SIGNATURE).unwrap();
        let expected = sign_string(&compose_string_to_sign(&to_verify), "sk-1").unwrap();
        assert!(signatures_match(&supplied, &expected));
    }

    #[test]
    fn full_url_joins_host_uri_and_query() {
        let client =
            OpenApiClient::new("127.0.0.1:8111", Duration::from_secs(1), "ak-1", "sk-1").unwrap();
        let mut params = BTreeMap::new();
        params.insert("B".to_string(), "2".to_string());
        params.insert("A".to_string(), "1".to_string());
        assert_eq!(
            client.full_url("/api/echo", &params),
            "http://127.0.0.1:8111/api/echo?A=1&B=2"
        );
    }
}
