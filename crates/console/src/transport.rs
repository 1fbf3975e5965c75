//! Transport layer: every API call goes through here.
//!
//! Outbound, the session credential is attached as a bearer header. Inbound,
//! the response is classified by [`cardkey_core::classify`] and the result is
//! settled: data is handed back, failures are reported once to the notifier,
//! and only the HTTP-status fallback may clear the session (401) or force a
//! navigation (401, 403).

use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use cardkey_core::{classify, ApiError, ApiResult, Inbound};

use crate::config::{ConsoleConfig, NavigationPaths};
use crate::navigation::{Navigator, Notifier};
use crate::session::SessionStore;

/// Opaque payload returned without envelope parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binary {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// What a settled call resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Data(Value),
    Binary(Binary),
}

#[derive(Clone)]
pub struct Transport {
    inner: Arc<Inner>,
}

struct Inner {
    client: reqwest::Client,
    base_url: String,
    session: SessionStore,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    paths: NavigationPaths,
}

impl core::fmt::Debug for Transport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Transport")
            .field("base_url", &self.inner.base_url)
            .field("session", &self.inner.session)
            .finish_non_exhaustive()
    }
}

impl Transport {
    pub fn new(
        config: &ConsoleConfig,
        session: SessionStore,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::request_config(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                base_url: config.api_base_url.trim_end_matches('/').to_string(),
                session,
                navigator,
                notifier,
                paths: config.paths.clone(),
            }),
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.inner.base_url, path.trim_start_matches('/'))
    }

    /// Outbound stage: build a request and attach the credential if any.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self.inner.client.request(method, self.url(path));
        match self.inner.session.token() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.json(self.request(Method::GET, path)).await
    }

    pub async fn get_with_query<Q, T>(&self, path: &str, query: &Q) -> ApiResult<T>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.json(self.request(Method::GET, path).query(query)).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.json(self.request(Method::POST, path).json(body)).await
    }

    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.json(self.request(Method::POST, path)).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.json(self.request(Method::PUT, path).json(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.json(self.request(Method::DELETE, path)).await
    }

    /// Download an opaque payload (export, image, pdf).
    pub async fn get_binary(&self, path: &str) -> ApiResult<Binary> {
        match self.execute(self.request(Method::GET, path), true).await? {
            Payload::Binary(binary) => Ok(binary),
            Payload::Data(_) => Err(self.report(ApiError::invalid_response(
                "expected a binary payload",
            ))),
        }
    }

    async fn json<T: DeserializeOwned>(&self, req: RequestBuilder) -> ApiResult<T> {
        match self.execute(req, false).await? {
            Payload::Data(data) => serde_json::from_value(data).map_err(|e| {
                self.report(ApiError::invalid_response(format!(
                    "unexpected `data` shape: {e}"
                )))
            }),
            Payload::Binary(binary) => Err(self.report(ApiError::invalid_response(format!(
                "unexpected binary payload ({})",
                binary.content_type.as_deref().unwrap_or("unknown type")
            )))),
        }
    }

    /// Send a request and settle its response.
    pub async fn execute(&self, req: RequestBuilder, expect_binary: bool) -> ApiResult<Payload> {
        let request = req
            .build()
            .map_err(|e| self.report(ApiError::request_config(e.to_string())))?;
        let method = request.method().clone();
        let path = request.url().path().to_string();

        let response = match self.inner.client.execute(request).await {
            Ok(response) => response,
            Err(e) if e.is_builder() => {
                return Err(self.report(ApiError::request_config(e.to_string())));
            }
            Err(e) => return Err(self.report(ApiError::network(e.to_string()))),
        };

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| self.report(ApiError::network(e.to_string())))?;

        let inbound = classify(status, content_type.as_deref(), body.to_vec(), expect_binary);
        tracing::debug!(%method, path = %path, status, outcome = outcome_name(&inbound), "response classified");

        match inbound {
            Inbound::Binary {
                content_type,
                bytes,
            } => Ok(Payload::Binary(Binary {
                content_type,
                bytes,
            })),
            Inbound::Data(data) => Ok(Payload::Data(data)),
            Inbound::Rejected(err) => Err(self.report(err)),
            Inbound::Fallback { status, detail } => Err(self.report(self.fallback(status, detail))),
        }
    }

    /// HTTP-status handling for responses without a usable envelope.
    fn fallback(&self, status: u16, detail: Option<String>) -> ApiError {
        match status {
            401 => {
                self.inner.session.clear();
                self.inner.navigator.navigate(&self.inner.paths.login);
                ApiError::Unauthorized
            }
            403 => {
                self.inner.navigator.navigate(&self.inner.paths.forbidden);
                ApiError::Forbidden
            }
            _ => ApiError::Status {
                status,
                message: detail.unwrap_or_else(|| {
                    StatusCode::from_u16(status)
                        .ok()
                        .and_then(|s| s.canonical_reason())
                        .unwrap_or("request failed")
                        .to_string()
                }),
            },
        }
    }

    /// Emit the single notification for a failed call.
    fn report(&self, err: ApiError) -> ApiError {
        tracing::warn!(code = err.code(), error = %err, "api call failed");
        self.inner.notifier.error(&err.notice());
        err
    }
}

fn outcome_name(inbound: &Inbound) -> &'static str {
    match inbound {
        Inbound::Binary { .. } => "binary",
        Inbound::Data(_) => "data",
        Inbound::Rejected(_) => "rejected",
        Inbound::Fallback { .. } => "fallback",
    }
}
