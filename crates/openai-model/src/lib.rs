//! A model provider for OpenAI-compatible chat completion APIs.

#[macro_use]
extern crate tracing;

mod config;
mod io;
mod proto;
mod response;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use intellibot_model::{
    ErrorKind, ModelProvider, ModelProviderError, ModelRequest,
};
use mime::Mime;
use reqwest::{Client, Response, StatusCode, header};

pub use config::{OpenAIConfig, OpenAIConfigBuilder};
use io::{Chunks, Sse};
use response::OpenAIResponse;

/// Error type for [`OpenAIProvider`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    fn from_transport(err: reqwest::Error) -> Self {
        let kind = if err.is_connect() || err.is_timeout() {
            ErrorKind::Unavailable
        } else {
            ErrorKind::Other
        };
        Self::new(err.to_string(), kind)
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// OpenAI-compatible model provider.
#[derive(Clone, Debug)]
pub struct OpenAIProvider {
    client: Client,
    config: Arc<OpenAIConfig>,
}

impl OpenAIProvider {
    /// Creates a new `OpenAIProvider` with the given configuration.
    #[inline]
    pub fn new(config: OpenAIConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }

    /// Returns the configuration of this provider.
    #[inline]
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    /// Verifies that the endpoint is reachable and accepts the API key.
    ///
    /// This lists the available models, which costs no tokens.
    pub fn check_credentials(
        &self,
    ) -> impl Future<Output = Result<(), Error>> + Send + 'static {
        let resp_fut = self
            .client
            .get(self.config.endpoint("/models"))
            .bearer_auth(&self.config.api_key)
            .send();

        async move {
            let resp = resp_fut.await.map_err(Error::from_transport)?;
            ensure_success(resp).await?;
            Ok(())
        }
    }
}

impl ModelProvider for OpenAIProvider {
    type Error = Error;
    type Response = OpenAIResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let openai_req = proto::create_request(req, &self.config);
        debug!(
            "sending {} messages with {} tools to `{}`",
            req.messages.len(),
            req.tools.len(),
            self.config.model
        );
        let resp_fut = self
            .client
            .post(self.config.endpoint("/chat/completions"))
            .bearer_auth(&self.config.api_key)
            .header(header::ACCEPT, "text/event-stream")
            .json(&openai_req)
            .send();

        async move {
            let resp = resp_fut.await.map_err(Error::from_transport)?;
            let resp = ensure_success(resp).await?;

            let content_type = resp
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            if !is_event_stream(content_type) {
                return Err(Error::new(
                    format!("unexpected content type: {content_type:?}"),
                    ErrorKind::Other,
                ));
            }

            let chunks = Chunks::from_response(resp);
            let sse = Sse::new(chunks);
            Ok(OpenAIResponse::from_sse(sse))
        }
    }
}

async fn ensure_success(resp: Response) -> Result<Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(status_error(status, &body))
}

fn status_error(status: StatusCode, body: &str) -> Error {
    let detail = serde_json::from_str::<proto::ErrorBody>(body)
        .map(|body| body.error.message)
        .unwrap_or_else(|_| body.trim().to_owned());
    let message = if detail.is_empty() {
        format!("server responded with {status}")
    } else {
        format!("server responded with {status}: {detail}")
    };
    Error::new(message, kind_for_status(status))
}

fn kind_for_status(status: StatusCode) -> ErrorKind {
    match status.as_u16() {
        401 | 403 => ErrorKind::Unauthorized,
        429 => ErrorKind::RateLimitExceeded,
        500..=599 => ErrorKind::Unavailable,
        _ => ErrorKind::Other,
    }
}

fn is_event_stream(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|v| v.parse::<Mime>().ok())
        .is_some_and(|m| {
            m.essence_str() == mime::TEXT_EVENT_STREAM.essence_str()
        })
}
