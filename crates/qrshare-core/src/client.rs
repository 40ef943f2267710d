use std::sync::Arc;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::error::{Result, ShareError};
use crate::model::{HealthBundle, QrSession, ScanPayload, ScanRequest, SessionStatus, ShareRequest};
use crate::token::AuthTokenProvider;

#[derive(Debug, Clone, Copy)]
pub struct ClientOptions {
    /// Send the bearer token on `POST /api/qr/generate`. Cancel, status and
    /// scan always authenticate.
    pub attach_auth_on_generate: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            attach_auth_on_generate: true,
        }
    }
}

/// HTTP client for the QR sharing endpoints under `/api/qr`.
pub struct QrSessionClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn AuthTokenProvider>,
    options: ClientOptions,
}

impl QrSessionClient {
    pub fn new(
        base_url: &str,
        tokens: impl AuthTokenProvider + 'static,
        options: ClientOptions,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))?;
        if base_url.cannot_be_a_base() {
            return Err(ShareError::configuration(format!(
                "Server URL cannot be used as a base: {base_url}"
            )));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            tokens: Arc::new(tokens),
            options,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn options(&self) -> ClientOptions {
        self.options
    }

    fn api_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ShareError::configuration("Server URL cannot be used as a base"))?
            .pop_if_empty()
            .extend(["api", "qr"])
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url, authenticated: bool) -> Result<RequestBuilder> {
        let req = self
            .http
            .request(method, url)
            .header("Accept", "application/json");
        if !authenticated {
            return Ok(req);
        }
        let token = self
            .tokens
            .token()
            .ok_or_else(|| ShareError::auth("Not logged in: no bearer token available"))?;
        Ok(req.bearer_auth(token))
    }

    /// Ask the backend for a new share session.
    ///
    /// The request is validated before anything is sent.
    pub async fn request_session(&self, req: ShareRequest) -> Result<QrSession> {
        req.validate()?;
        let url = self.api_url(&["generate"])?;
        tracing::debug!(%url, data_types = req.data_types.len(), "requesting QR session");

        let resp = self
            .request(Method::POST, url, self.options.attach_auth_on_generate)?
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = error_message(resp).await;
            tracing::warn!(status = status.as_u16(), %message, "QR generation failed");
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ShareError::auth(message),
                _ => ShareError::server(status.as_u16(), message),
            });
        }

        let session: QrSession = decode_json(resp).await?;
        tracing::info!(session_id = %session.session_id, expires_at = %session.expires_at, "QR session created");
        Ok(session)
    }

    /// Delete a share session. A session that is already gone comes back as
    /// [`ShareError::SessionNotFound`].
    pub async fn cancel_session(&self, session_id: &str) -> Result<()> {
        let url = self.api_url(&["session", session_id])?;
        let resp = self.request(Method::DELETE, url, true)?.send().await?;

        let status = resp.status();
        if status.is_success() {
            tracing::info!(session_id, "QR session cancelled");
            return Ok(());
        }
        let message = error_message(resp).await;
        tracing::warn!(session_id, status = status.as_u16(), %message, "QR session cancel failed");
        Err(match status {
            StatusCode::NOT_FOUND => ShareError::session_not_found(session_id),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ShareError::auth(message),
            _ => ShareError::server(status.as_u16(), message),
        })
    }

    pub async fn session_status(&self, session_id: &str) -> Result<SessionStatus> {
        let url = self.api_url(&["session", session_id, "status"])?;
        let resp = self.request(Method::GET, url, true)?.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = error_message(resp).await;
            return Err(match status {
                StatusCode::NOT_FOUND => ShareError::session_not_found(session_id),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ShareError::auth(message),
                _ => ShareError::server(status.as_u16(), message),
            });
        }

        // The status endpoint may answer with plain text.
        let body = resp.text().await?;
        let value = serde_json::from_str(&body).unwrap_or(Value::String(body));
        Ok(SessionStatus(value))
    }

    /// Exchange a decoded QR payload for the shared health records.
    pub async fn submit_scan(&self, payload: &ScanPayload) -> Result<HealthBundle> {
        if payload.is_blank() {
            return Err(ShareError::validation("QR data cannot be blank"));
        }
        let url = self.api_url(&["scan"])?;
        let resp = self
            .request(Method::POST, url, true)?
            .json(&ScanRequest {
                qr_data: payload.as_str(),
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = error_message(resp).await;
            tracing::warn!(status = status.as_u16(), %message, "scan rejected");
            return Err(ShareError::scan_rejected(message));
        }

        let bundle: HealthBundle = decode_json(resp).await?;
        tracing::info!(entries = bundle.len(), "scan resolved to bundle");
        Ok(bundle)
    }
}

async fn decode_json<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let body = resp.text().await?;
    serde_json::from_str(&body)
        .map_err(|e| ShareError::invalid_response(format!("Failed to parse response JSON: {e}")))
}

/// Best human-readable message out of an error response.
async fn error_message(resp: Response) -> String {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();

    if let Ok(json) = serde_json::from_str::<Value>(&body) {
        if let Some(message) = json.get("message").and_then(|v| v.as_str()) {
            return message.to_string();
        }
        if json.get("resourceType").and_then(|v| v.as_str()) == Some("OperationOutcome")
            && let Some(issues) = json.get("issue").and_then(|v| v.as_array())
        {
            let msgs: Vec<&str> = issues
                .iter()
                .filter_map(|i| i.get("diagnostics").and_then(|d| d.as_str()))
                .collect();
            if !msgs.is_empty() {
                return msgs.join("; ");
            }
        }
    }

    if !body.trim().is_empty() {
        return body;
    }
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::MemoryTokenStore;

    fn client(base: &str) -> QrSessionClient {
        QrSessionClient::new(base, MemoryTokenStore::new(), ClientOptions::default()).unwrap()
    }

    #[test]
    fn test_api_url_joins_segments() {
        let c = client("http://localhost:8080/");
        assert_eq!(
            c.api_url(&["generate"]).unwrap().as_str(),
            "http://localhost:8080/api/qr/generate"
        );
    }

    #[test]
    fn test_api_url_keeps_base_path_and_escapes_ids() {
        let c = client("https://example.org/health");
        assert_eq!(
            c.api_url(&["session", "a b/c", "status"]).unwrap().as_str(),
            "https://example.org/health/api/qr/session/a%20b%2Fc/status"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = QrSessionClient::new("not a url", MemoryTokenStore::new(), ClientOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, ShareError::UrlError(_)));

        let err = QrSessionClient::new("mailto:a@b.c", MemoryTokenStore::new(), ClientOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, ShareError::Configuration(_)));
    }

    #[test]
    fn test_missing_token_is_auth_error() {
        let c = client("http://localhost:8080");
        let url = c.api_url(&["scan"]).unwrap();
        let err = c.request(Method::POST, url, true).err().unwrap();
        assert!(matches!(err, ShareError::Auth(_)));
    }
}
