//! Transport seam between the protocol client and a relay server.
//!
//! [`RelayTransport`] is the request/response boundary: paths and JSON
//! bodies in, JSON bodies or typed errors out. [`HttpTransport`] is the
//! production implementation (blocking HTTP with timeouts); the in-memory
//! relay in [`crate::memory`] implements the same trait for tests.

use std::time::Duration;

use serde_json::Value;

use vaultlink_protocol::{ErrorBody, RelayError, CODE_ALIAS_TAKEN, CODE_NOT_FOUND};

/// One blocking request/response exchange with a relay server.
///
/// Implementations map relay-reported failures to [`RelayError`] with the
/// machine-readable code preserved, and network-level failures to the
/// transient `Connection`/`Timeout` variants.
pub trait RelayTransport {
    fn get(&self, path: &str) -> Result<Value, RelayError>;
    fn post(&self, path: &str, body: &Value) -> Result<Value, RelayError>;
}

/// Map a relay error body to the typed taxonomy. Codes without a
/// dedicated variant keep their code in `RelayError::Relay`.
pub(crate) fn server_error(code: &str, message: String) -> RelayError {
    match code {
        CODE_ALIAS_TAKEN => RelayError::AliasTaken(message),
        CODE_NOT_FOUND => RelayError::NotFound(message),
        _ => RelayError::Relay {
            code: code.to_string(),
            message,
        },
    }
}

/// Blocking HTTP transport with connect and request timeouts.
pub struct HttpTransport {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(
        base_url: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, RelayError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| RelayError::Connection(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn handle(&self, resp: reqwest::blocking::Response) -> Result<Value, RelayError> {
        let status = resp.status();
        if status.is_success() {
            return resp
                .json::<Value>()
                .map_err(|e| RelayError::Connection(format!("invalid relay response: {}", e)));
        }
        let text = resp.text().unwrap_or_default();
        match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => Err(server_error(&body.code, body.message)),
            // Relay sent a non-JSON error; keep the HTTP status as code.
            Err(_) => Err(RelayError::Relay {
                code: status.as_u16().to_string(),
                message: text,
            }),
        }
    }

    fn network_error(e: reqwest::Error) -> RelayError {
        if e.is_timeout() {
            RelayError::Timeout(e.to_string())
        } else {
            RelayError::Connection(e.to_string())
        }
    }
}

impl RelayTransport for HttpTransport {
    fn get(&self, path: &str) -> Result<Value, RelayError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(Self::network_error)?;
        self.handle(resp)
    }

    fn post(&self, path: &str, body: &Value) -> Result<Value, RelayError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(Self::network_error)?;
        self.handle(resp)
    }
}
