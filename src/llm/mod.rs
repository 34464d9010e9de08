pub mod gemini;
pub mod prompt;
pub mod provider;

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;
use tracing::{info, warn};

use crate::analysis::Mode;
use crate::image::DataUri;

/// Text fragments from a model, in arrival order.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, ModelError>> + Send>>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("{0} environment variable is missing")]
    MissingApiKey(&'static str),

    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model API error ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("malformed model response: {0}")]
    InvalidResponse(String),

    #[error("no candidate models configured")]
    NoCandidates,

    #[error("all candidate models failed; last was {model}: {message}")]
    Exhausted { model: String, message: String },
}

/// Everything needed for one multimodal completion call.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub mode: Mode,
    pub system: String,
    pub prompt: String,
    pub images: Vec<DataUri>,
}

/// A hosted model API that can stream a completion for one model id.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Fails fast when the client has no credential to call with.
    fn ensure_credentials(&self) -> Result<(), ModelError>;

    /// Start streaming. Returning `Ok` means the model accepted the request;
    /// later failures arrive as items of the stream.
    async fn stream_generate(
        &self,
        model: &str,
        request: &AnalysisRequest,
    ) -> Result<TextStream, ModelError>;
}

/// A started stream and the candidate that produced it.
pub struct ModelStream {
    pub model: String,
    pub stream: TextStream,
}

/// Tries candidate models in order until one starts streaming.
#[derive(Clone)]
pub struct Gateway {
    client: Arc<dyn ModelClient>,
    candidates: Vec<String>,
}

impl Gateway {
    pub fn new(client: Arc<dyn ModelClient>, candidates: Vec<String>) -> Self {
        Self { client, candidates }
    }

    pub fn ensure_credentials(&self) -> Result<(), ModelError> {
        self.client.ensure_credentials()
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Once a candidate has started, no other model is tried even if its
    /// stream fails later. When every candidate fails the last error wins.
    pub async fn stream(&self, request: &AnalysisRequest) -> Result<ModelStream, ModelError> {
        self.client.ensure_credentials()?;

        let mut last_error: Option<(String, ModelError)> = None;
        for model in &self.candidates {
            info!(model = %model, mode = %request.mode, "attempting model");
            match self.client.stream_generate(model, request).await {
                Ok(stream) => {
                    info!(model = %model, "model accepted request, streaming");
                    return Ok(ModelStream {
                        model: model.clone(),
                        stream,
                    });
                }
                Err(err) => {
                    warn!(model = %model, error = %err, "model failed, trying next candidate");
                    last_error = Some((model.clone(), err));
                }
            }
        }

        Err(match last_error {
            Some((model, err)) => ModelError::Exhausted {
                model,
                message: err.to_string(),
            },
            None => ModelError::NoCandidates,
        })
    }
}


#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::testing::{request, Script, ScriptedClient};
    use super::*;

    fn candidates() -> Vec<String> {
        vec!["primary".into(), "fallback-1".into(), "fallback-2".into()]
    }

    #[tokio::test]
    async fn first_success_wins() {
        let client = Arc::new(
            ScriptedClient::new()
                .with("primary", Script::Stream(vec![Ok("hi".into())]))
                .with("fallback-1", Script::Stream(vec![Ok("nope".into())])),
        );
        let gateway = Gateway::new(client.clone(), candidates());

        let started = gateway.stream(&request()).await.unwrap();
        assert_eq!(started.model, "primary");
        assert_eq!(client.calls(), vec!["primary"]);
    }

    #[tokio::test]
    async fn falls_through_failures_in_order() {
        let client = Arc::new(
            ScriptedClient::new()
                .with("primary", Script::Reject("quota exceeded".into()))
                .with("fallback-2", Script::Stream(vec![Ok("ok".into())])),
        );
        let gateway = Gateway::new(client.clone(), candidates());

        let started = gateway.stream(&request()).await.unwrap();
        assert_eq!(started.model, "fallback-2");
        assert_eq!(client.calls(), vec!["primary", "fallback-1", "fallback-2"]);

        let text: Vec<String> = started.stream.map(|r| r.unwrap()).collect().await;
        assert_eq!(text, vec!["ok"]);
    }

    #[tokio::test]
    async fn all_failing_reports_last_error() {
        let client = Arc::new(
            ScriptedClient::new().with("fallback-2", Script::Reject("overloaded".into())),
        );
        let gateway = Gateway::new(client, candidates());

        let err = gateway.stream(&request()).await.err().unwrap();
        match err {
            ModelError::Exhausted { model, message } => {
                assert_eq!(model, "fallback-2");
                assert!(message.contains("overloaded"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn mid_stream_failure_is_not_retried() {
        let client = Arc::new(
            ScriptedClient::new()
                .with(
                    "primary",
                    Script::Stream(vec![Ok("part".into()), Err("connection reset".into())]),
                )
                .with("fallback-1", Script::Stream(vec![Ok("other".into())])),
        );
        let gateway = Gateway::new(client.clone(), candidates());

        let started = gateway.stream(&request()).await.unwrap();
        let items: Vec<_> = started.stream.collect().await;
        assert_eq!(items.len(), 2);
        assert!(items[1].is_err());
        assert_eq!(client.calls(), vec!["primary"]);
    }

    #[tokio::test]
    async fn missing_credentials_short_circuit() {
        let client = Arc::new(ScriptedClient::unconfigured());
        let gateway = Gateway::new(client.clone(), candidates());

        let err = gateway.stream(&request()).await.err().unwrap();
        assert!(matches!(err, ModelError::MissingApiKey(_)));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn empty_candidate_list() {
        let gateway = Gateway::new(Arc::new(ScriptedClient::new()), Vec::new());
        let err = gateway.stream(&request()).await.err().unwrap();
        assert!(matches!(err, ModelError::NoCandidates));
    }
}
