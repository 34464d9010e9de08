use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::provider::{self, short_model_name};
use super::{AnalysisRequest, ModelClient, ModelError, TextStream};
use crate::config::ModelConfig;
use crate::framing::LineBuffer;

/// Request body for `models/{model}:streamGenerateContent`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Request<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    Image {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

/// Gemini error response shape.
#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Streaming client for the Gemini generative language API.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    max_output_tokens: u32,
    temperature: f32,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, config: &ModelConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_output_tokens: config.max_output_tokens,
            temperature: config.temperature,
        }
    }

    /// Key from `GOOGLE_GENERATIVE_AI_API_KEY`, possibly absent.
    pub fn from_env(config: &ModelConfig) -> Self {
        Self::new(provider::api_key_from_env(), config)
    }

    fn body<'a>(&self, request: &'a AnalysisRequest) -> Request<'a> {
        let mut parts = vec![Part::Text {
            text: &request.prompt,
        }];
        parts.extend(request.images.iter().map(|image| Part::Image {
            inline_data: InlineData {
                mime_type: &image.mime,
                data: &image.payload,
            },
        }));

        Request {
            system_instruction: Content {
                role: None,
                parts: vec![Part::Text {
                    text: &request.system,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts,
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.max_output_tokens,
                temperature: self.temperature,
            },
        }
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    fn ensure_credentials(&self) -> Result<(), ModelError> {
        match self.api_key {
            Some(_) => Ok(()),
            None => Err(ModelError::MissingApiKey(provider::API_KEY_ENV)),
        }
    }

    async fn stream_generate(
        &self,
        model: &str,
        request: &AnalysisRequest,
    ) -> Result<TextStream, ModelError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ModelError::MissingApiKey(provider::API_KEY_ENV))?;

        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url,
            short_model_name(model)
        );

        let mut response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&self.body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), &body));
        }

        let model = model.to_string();
        let stream = async_stream::stream! {
            let mut decoder = SseDecoder::default();
            loop {
                match response.chunk().await {
                    Ok(Some(chunk)) => {
                        for event in decoder.push(&chunk) {
                            match event_text(&event) {
                                Ok(Some(text)) => yield Ok(text),
                                Ok(None) => {}
                                Err(err) => {
                                    yield Err(err);
                                    return;
                                }
                            }
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        yield Err(ModelError::from(err));
                        return;
                    }
                }
            }
            for event in decoder.finish() {
                match event_text(&event) {
                    Ok(Some(text)) => yield Ok(text),
                    Ok(None) => {}
                    Err(err) => yield Err(err),
                }
            }
            debug!(model = %model, "upstream stream finished");
        };

        Ok(Box::pin(stream))
    }
}

fn status_error(status: u16, body: &str) -> ModelError {
    let message = match serde_json::from_str::<ErrorResponse>(body) {
        Ok(err) => err.error.message,
        Err(_) => body.chars().take(500).collect(),
    };
    ModelError::Status { status, message }
}

/// Collects `data:` lines into server-sent events.
#[derive(Debug, Default)]
pub struct SseDecoder {
    lines: LineBuffer,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let lines = self.lines.push(chunk);
        let mut events = Vec::new();
        for line in lines {
            self.feed(&line, &mut events);
        }
        events
    }

    pub fn finish(&mut self) -> Vec<String> {
        let mut events = Vec::new();
        if let Some(line) = self.lines.finish() {
            self.feed(&line, &mut events);
        }
        self.dispatch(&mut events);
        events
    }

    fn feed(&mut self, line: &str, events: &mut Vec<String>) {
        if line.is_empty() {
            self.dispatch(events);
        } else if let Some(data) = line.strip_prefix("data:") {
            self.data.push(data.strip_prefix(' ').unwrap_or(data).to_string());
        }
    }

    fn dispatch(&mut self, events: &mut Vec<String>) {
        if !self.data.is_empty() {
            events.push(self.data.join("\n"));
            self.data.clear();
        }
    }
}

/// Pull generated text out of one streamed `GenerateContentResponse`.
fn event_text(data: &str) -> Result<Option<String>, ModelError> {
    let json: Value = serde_json::from_str(data)
        .map_err(|e| ModelError::InvalidResponse(format!("{e}: {}", truncate(data, 200))))?;

    if let Some(message) = json
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
    {
        return Err(ModelError::Status {
            status: json["error"]["code"].as_u64().unwrap_or(500) as u16,
            message: message.to_string(),
        });
    }

    let text: String = json
        .get("candidates")
        .and_then(|c| c.as_array())
        .into_iter()
        .flatten()
        .filter_map(|candidate| candidate.pointer("/content/parts"))
        .filter_map(|parts| parts.as_array())
        .flatten()
        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
        .collect();

    Ok((!text.is_empty()).then_some(text))
}

fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

/// One entry from the model listing endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input_token_limit: Option<u64>,
    #[serde(default)]
    pub output_token_limit: Option<u64>,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    pub fn short_name(&self) -> &str {
        short_model_name(&self.name)
    }

    pub fn supports_generate_content(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|m| m == "generateContent")
    }

    /// Heuristic: the listing has no explicit vision flag.
    pub fn likely_supports_vision(&self) -> bool {
        let name = self.name.to_lowercase();
        let description = self.description.as_deref().unwrap_or("").to_lowercase();
        name.contains("flash")
            || name.contains("pro")
            || ["multimodal", "vision", "image"]
                .iter()
                .any(|word| description.contains(word))
            || self.input_token_limit.is_some_and(|limit| limit > 30_000)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelInfo>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// List models that support `generateContent`, following pagination.
pub async fn list_models(api_key: &str, config: &ModelConfig) -> Result<Vec<ModelInfo>, ModelError> {
    let http = reqwest::Client::new();
    let url = format!("{}/models", config.base_url.trim_end_matches('/'));

    let mut models = Vec::new();
    let mut page_token: Option<String> = None;
    loop {
        let mut query = vec![("pageSize", "1000".to_string())];
        if let Some(token) = &page_token {
            query.push(("pageToken", token.clone()));
        }

        let response = http
            .get(&url)
            .header("x-goog-api-key", api_key)
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(status_error(status.as_u16(), &body));
        }

        let page: ModelList = serde_json::from_str(&body)
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;
        models.extend(page.models.into_iter().filter(|m| m.supports_generate_content()));

        match page.next_page_token.filter(|t| !t.is_empty()) {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    Ok(models)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Mode;
    use crate::image::DataUri;

    fn client() -> GeminiClient {
        GeminiClient::new(Some("key".into()), &ModelConfig::default())
    }

    #[test]
    fn body_has_text_then_images() {
        let request = AnalysisRequest {
            mode: Mode::Compare,
            system: "be brief".into(),
            prompt: "compare".into(),
            images: vec![
                DataUri::from_bytes(b"a", Some("image/png")).unwrap(),
                DataUri::from_bytes(b"b", None).unwrap(),
            ],
        };
        let client = client();
        let json = serde_json::to_value(client.body(&request)).unwrap();

        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "be brief");
        assert!(json["systemInstruction"].get("role").is_none());
        let parts = &json["contents"][0]["parts"];
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(parts[0]["text"], "compare");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["inlineData"]["data"], "YQ==");
        assert_eq!(parts[2]["inlineData"]["mimeType"], "image/jpeg");
        assert!(json["generationConfig"]["maxOutputTokens"].as_u64().unwrap() > 0);
    }

    #[test]
    fn missing_key_is_reported() {
        let client = GeminiClient::new(None, &ModelConfig::default());
        assert!(matches!(
            client.ensure_credentials(),
            Err(ModelError::MissingApiKey(_))
        ));
        assert!(self::client().ensure_credentials().is_ok());
    }

    #[test]
    fn sse_events_across_chunks() {
        let mut decoder = SseDecoder::default();
        let mut events = decoder.push(b"data: {\"a\":");
        assert!(events.is_empty());
        events.extend(decoder.push(b"1}\r\n\r\ndata: {\"b\":2}\r\n"));
        assert_eq!(events, vec![r#"{"a":1}"#]);
        events.extend(decoder.push(b"\r\n: comment\n"));
        assert_eq!(events, vec![r#"{"a":1}"#, r#"{"b":2}"#]);
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn sse_finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: {\"c\":3}").is_empty());
        assert_eq!(decoder.finish(), vec![r#"{"c":3}"#]);
    }

    #[test]
    fn text_from_candidates() {
        let data = r#"{"candidates":[{"content":{"parts":[{"text":"HEAD"},{"text":"LINE: "}],"role":"model"}}]}"#;
        assert_eq!(event_text(data).unwrap().as_deref(), Some("HEADLINE: "));
    }

    #[test]
    fn events_without_text() {
        let data = r#"{"candidates":[{"finishReason":"STOP"}],"usageMetadata":{"promptTokenCount":5}}"#;
        assert_eq!(event_text(data).unwrap(), None);
    }

    #[test]
    fn error_event() {
        let data = r#"{"error":{"code":503,"message":"The model is overloaded."}}"#;
        match event_text(data) {
            Err(ModelError::Status { status, message }) => {
                assert_eq!(status, 503);
                assert!(message.contains("overloaded"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn malformed_event() {
        assert!(matches!(
            event_text("not json"),
            Err(ModelError::InvalidResponse(_))
        ));
    }

    #[test]
    fn status_error_prefers_api_message() {
        let err = status_error(429, r#"{"error":{"code":429,"message":"Quota exceeded"}}"#);
        assert_eq!(err.to_string(), "model API error (429): Quota exceeded");
        let err = status_error(502, "<html>bad gateway</html>");
        assert!(err.to_string().contains("bad gateway"));
    }

    #[test]
    fn model_info_filters() {
        let json = r#"{
            "name": "models/gemini-2.5-flash",
            "displayName": "Gemini 2.5 Flash",
            "inputTokenLimit": 1048576,
            "supportedGenerationMethods": ["generateContent", "countTokens"]
        }"#;
        let info: ModelInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.short_name(), "gemini-2.5-flash");
        assert!(info.supports_generate_content());
        assert!(info.likely_supports_vision());

        let embed: ModelInfo = serde_json::from_str(
            r#"{"name":"models/text-embedding-004","inputTokenLimit":2048,"supportedGenerationMethods":["embedContent"]}"#,
        )
        .unwrap();
        assert!(!embed.supports_generate_content());
        assert!(!embed.likely_supports_vision());
    }
}
