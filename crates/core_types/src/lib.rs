use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub type PrefixId = Uuid;

pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Assistant,
    System,
    Function,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Function => "function",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            "function" => Ok(Role::Function),
            other => Err(format!("unknown role `{other}`")),
        }
    }
}

/// One role-tagged message as sent to the provider.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A prefix entry prepended to requests while `active` is set.
///
/// Entries are still edited by position, but carry a stable id so that a
/// persisted list can be addressed without index-shift surprises.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct PrefixMessage {
    #[serde(default = "PrefixId::new_v4")]
    pub id: PrefixId,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

impl PrefixMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: PrefixId::new_v4(),
            role,
            content: content.into(),
            active: true,
        }
    }

    pub fn blank() -> Self {
        Self::new(Role::User, String::new())
    }

    pub fn to_chat_message(&self) -> ChatMessage {
        ChatMessage::new(self.role, self.content.clone())
    }
}

/// Everything a single provider call needs besides the payload itself.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
}

impl ApiConfig {
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash, Default)]
pub enum ImageSize {
    #[serde(rename = "256x256")]
    Small,
    #[serde(rename = "512x512")]
    Medium,
    #[default]
    #[serde(rename = "1024x1024")]
    Large,
}

impl ImageSize {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageSize::Small => "256x256",
            ImageSize::Medium => "512x512",
            ImageSize::Large => "1024x1024",
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageSize {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "256x256" => Ok(ImageSize::Small),
            "512x512" => Ok(ImageSize::Medium),
            "1024x1024" => Ok(ImageSize::Large),
            other => Err(format!("unsupported image size `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ImageRequest {
    pub prompt: String,
    pub size: ImageSize,
    pub count: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct GeneratedImage {
    pub url: String,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TranscriptionRequest {
    pub audio: AudioClip,
    pub language: Option<String>,
}

impl TranscriptionRequest {
    pub fn new(audio: AudioClip, language: &str) -> Self {
        let language = language.trim();
        Self {
            audio,
            language: (!language.is_empty()).then(|| language.to_string()),
        }
    }
}

#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum RequestError {
    #[error("no API key configured")]
    MissingApiKey,
    #[error("request could not be sent: {0}")]
    Transport(String),
    #[error("provider returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

impl RequestError {
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            RequestError::MissingApiKey | RequestError::Status { status: 401 | 403, .. }
        )
    }
}

/// The provider seam: one request per call, the caller awaits the full
/// response.
#[async_trait]
pub trait AssistantApi: Send + Sync {
    async fn complete(
        &self,
        config: &ApiConfig,
        messages: &[ChatMessage],
    ) -> Result<String, RequestError>;

    async fn generate_images(
        &self,
        config: &ApiConfig,
        request: &ImageRequest,
    ) -> Result<Vec<GeneratedImage>, RequestError>;

    async fn transcribe(
        &self,
        config: &ApiConfig,
        request: &TranscriptionRequest,
    ) -> Result<String, RequestError>;

    async fn fetch_image(&self, image: &GeneratedImage) -> Result<Vec<u8>, RequestError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_lowercase() {
        let text = serde_json::to_string(&ChatMessage::system("be brief")).expect("json");
        assert_eq!(text, r#"{"role":"system","content":"be brief"}"#);
        assert_eq!("Function".parse::<Role>(), Ok(Role::Function));
    }

    #[test]
    fn legacy_prefix_without_id_gets_one() {
        let entry: PrefixMessage =
            serde_json::from_str(r#"{"role":"system","content":"x","active":false}"#)
                .expect("prefix");
        assert!(!entry.id.is_nil());
        assert!(!entry.active);
    }

    #[test]
    fn blank_language_is_omitted() {
        let clip = AudioClip {
            bytes: vec![1, 2, 3],
            file_name: "a.webm".to_string(),
            mime_type: "audio/webm".to_string(),
        };
        assert_eq!(TranscriptionRequest::new(clip.clone(), "  ").language, None);
        assert_eq!(
            TranscriptionRequest::new(clip, "fr").language.as_deref(),
            Some("fr")
        );
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let config = ApiConfig {
            base_url: "http://localhost:1/v1/".to_string(),
            api_key: "k".to_string(),
            model: "m".to_string(),
            max_tokens: 1,
        };
        assert_eq!(
            config.endpoint("/chat/completions"),
            "http://localhost:1/v1/chat/completions"
        );
    }

    #[test]
    fn unauthorized_status_is_auth_error() {
        let err = RequestError::Status {
            status: 401,
            message: "bad key".to_string(),
        };
        assert!(err.is_auth());
        assert!(!RequestError::Malformed("x".to_string()).is_auth());
    }
}
