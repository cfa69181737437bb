use async_trait::async_trait;
use core_types::{
    ApiConfig, AssistantApi, ChatMessage, GeneratedImage, ImageRequest, RequestError,
    TranscriptionRequest,
};
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde_json::{Value, json};
use tracing::{debug, warn};

pub const TRANSCRIPTION_MODEL: &str = "whisper-1";

/// `AssistantApi` over an OpenAI-compatible HTTP API. One request per call;
/// no retries and the transport's default timeout.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
}

impl Default for OpenAiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenAiClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    pub fn with_http(http: reqwest::Client) -> Self {
        Self { http }
    }

    fn authorized(
        &self,
        builder: RequestBuilder,
        config: &ApiConfig,
    ) -> Result<RequestBuilder, RequestError> {
        let api_key = config.api_key.trim();
        if api_key.is_empty() {
            return Err(RequestError::MissingApiKey);
        }
        Ok(builder.bearer_auth(api_key))
    }

    async fn post_json(
        &self,
        config: &ApiConfig,
        path: &str,
        body: Value,
    ) -> Result<Value, RequestError> {
        let url = config.endpoint(path);
        let request = self.authorized(self.http.post(&url), config)?.json(&body);
        let response = request.send().await.map_err(transport_error)?;
        read_json(response).await
    }
}

#[async_trait]
impl AssistantApi for OpenAiClient {
    async fn complete(
        &self,
        config: &ApiConfig,
        messages: &[ChatMessage],
    ) -> Result<String, RequestError> {
        debug!(
            model = %config.model,
            messages = messages.len(),
            max_tokens = config.max_tokens,
            "requesting chat completion"
        );
        let payload = self
            .post_json(config, "chat/completions", chat_body(config, messages))
            .await?;
        let content = parse_chat_completion(&payload)?;
        if content.is_empty() {
            warn!(model = %config.model, "empty completion content");
        }
        Ok(content)
    }

    async fn generate_images(
        &self,
        config: &ApiConfig,
        request: &ImageRequest,
    ) -> Result<Vec<GeneratedImage>, RequestError> {
        debug!(size = %request.size, count = request.count, "requesting images");
        let payload = self
            .post_json(config, "images/generations", image_body(request))
            .await?;
        parse_images(&payload)
    }

    async fn transcribe(
        &self,
        config: &ApiConfig,
        request: &TranscriptionRequest,
    ) -> Result<String, RequestError> {
        debug!(
            bytes = request.audio.bytes.len(),
            language = request.language.as_deref().unwrap_or("auto"),
            "requesting transcription"
        );
        let part = Part::bytes(request.audio.bytes.clone())
            .file_name(request.audio.file_name.clone())
            .mime_str(&request.audio.mime_type)
            .map_err(|err| RequestError::Transport(format!("invalid audio mime type: {err}")))?;
        let mut form = Form::new()
            .part("file", part)
            .text("model", TRANSCRIPTION_MODEL);
        if let Some(language) = &request.language {
            form = form.text("language", language.clone());
        }

        let url = config.endpoint("audio/transcriptions");
        let response = self
            .authorized(self.http.post(&url), config)?
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;
        let payload = read_json(response).await?;
        payload
            .get("text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| RequestError::Malformed("transcription has no `text`".to_string()))
    }

    async fn fetch_image(&self, image: &GeneratedImage) -> Result<Vec<u8>, RequestError> {
        let response = self
            .http
            .get(&image.url)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), &text));
        }
        let bytes = response.bytes().await.map_err(transport_error)?;
        Ok(bytes.to_vec())
    }
}

fn transport_error(err: reqwest::Error) -> RequestError {
    RequestError::Transport(err.to_string())
}

async fn read_json(response: Response) -> Result<Value, RequestError> {
    let status = response.status();
    let text = response.text().await.map_err(transport_error)?;
    if !status.is_success() {
        warn!(status = status.as_u16(), "provider request failed");
        return Err(status_error(status.as_u16(), &text));
    }
    serde_json::from_str(&text).map_err(|err| RequestError::Malformed(err.to_string()))
}

/// Prefers the provider's `error.message`, falling back to the raw body.
fn status_error(status: u16, body: &str) -> RequestError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string());
    RequestError::Status { status, message }
}

fn chat_body(config: &ApiConfig, messages: &[ChatMessage]) -> Value {
    json!({
        "model": config.model,
        "max_tokens": config.max_tokens,
        "messages": messages,
    })
}

fn image_body(request: &ImageRequest) -> Value {
    json!({
        "prompt": request.prompt,
        "n": request.count,
        "size": request.size.as_str(),
    })
}

fn parse_chat_completion(payload: &Value) -> Result<String, RequestError> {
    let choice = payload
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .ok_or_else(|| RequestError::Malformed("completion has no choices".to_string()))?;
    Ok(choice
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string())
}

fn parse_images(payload: &Value) -> Result<Vec<GeneratedImage>, RequestError> {
    let data = payload
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| RequestError::Malformed("image response has no `data`".to_string()))?;
    Ok(data
        .iter()
        .filter_map(|item| item.get("url").and_then(Value::as_str))
        .map(|url| GeneratedImage {
            url: url.to_string(),
        })
        .collect())
}
