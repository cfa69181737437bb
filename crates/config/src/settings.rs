use core_types::{ApiConfig, DEFAULT_API_BASE_URL};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::prefix::{PrefixEdit, PrefixList};

pub const CURRENT_SCHEMA_VERSION: u32 = 2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub enum MetaKey {
    AltKey,
    #[default]
    CtrlKey,
    MetaKey,
    ShiftKey,
}

impl MetaKey {
    pub fn label(self) -> &'static str {
        match self {
            MetaKey::AltKey => "alt",
            MetaKey::CtrlKey => "ctrl",
            MetaKey::MetaKey => "meta",
            MetaKey::ShiftKey => "shift",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "altKey" | "alt" => Some(MetaKey::AltKey),
            "ctrlKey" | "ctrl" => Some(MetaKey::CtrlKey),
            "metaKey" | "meta" => Some(MetaKey::MetaKey),
            "shiftKey" | "shift" => Some(MetaKey::ShiftKey),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum ValidationError {
    #[error("max tokens must be a positive integer, got `{0}`")]
    MaxTokens(String),
    #[error("{field} cannot be empty")]
    EmptyPath { field: &'static str },
    #[error("{field} cannot be blank")]
    Blank { field: &'static str },
    #[error("prefix index {index} out of range for {len} entries")]
    PrefixIndex { index: usize, len: usize },
}

/// The persisted plugin record. Missing fields fall back to defaults when
/// deserialized, so partial records merge over the compiled-in values.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AssistantSettings {
    pub schema_version: u32,

    pub api_key: String,
    pub api_base_url: String,
    pub model_name: String,
    pub max_tokens: u32,
    /// ISO-639-1 hint for speech input; blank lets the provider detect it.
    pub language: String,

    pub replace_selection: bool,
    pub always_show_prompt_with_answer: bool,
    pub prompt_prefix: PrefixList,

    pub always_save_chat_history: bool,
    pub chat_history_path: String,
    pub chat_history_template: String,
    pub chat_prefix: PrefixList,
    pub send_on_enter: bool,
    pub meta_key: MetaKey,

    pub img_folder: String,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            api_key: String::new(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            model_name: "gpt-3.5-turbo".to_string(),
            max_tokens: 500,
            language: String::new(),
            replace_selection: true,
            always_show_prompt_with_answer: false,
            prompt_prefix: PrefixList::default(),
            always_save_chat_history: true,
            chat_history_path: "/ai/history/".to_string(),
            chat_history_template: String::new(),
            chat_prefix: PrefixList::default(),
            send_on_enter: false,
            meta_key: MetaKey::CtrlKey,
            img_folder: "AiAssistant/Assets".to_string(),
        }
    }
}

/// One edit coming from a settings-page control. Text inputs carry the raw
/// string so validation happens in one place.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum SettingChange {
    ApiKey(String),
    ApiBaseUrl(String),
    ModelName(String),
    MaxTokens(String),
    Language(String),
    ReplaceSelection(bool),
    ShowPromptWithAnswer(bool),
    SaveChatHistory(bool),
    ChatHistoryPath(String),
    ChatHistoryTemplate(String),
    SendOnEnter(bool),
    MetaKey(MetaKey),
    ImageFolder(String),
    PromptPrefix(PrefixEdit),
    ChatPrefix(PrefixEdit),
}

impl AssistantSettings {
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.api_base_url.clone(),
            api_key: self.api_key.clone(),
            model: self.model_name.clone(),
            max_tokens: self.max_tokens,
        }
    }

    /// Applies a change in place. On error `self` is left as it was.
    pub fn apply(&mut self, change: SettingChange) -> Result<(), ValidationError> {
        match change {
            SettingChange::ApiKey(value) => self.api_key = value.trim().to_string(),
            SettingChange::ApiBaseUrl(value) => {
                self.api_base_url = non_blank(&value, "api base url")?
                    .trim_end_matches('/')
                    .to_string();
            }
            SettingChange::ModelName(value) => {
                self.model_name = non_blank(&value, "model name")?.to_string();
            }
            SettingChange::MaxTokens(raw) => self.max_tokens = parse_max_tokens(&raw)?,
            SettingChange::Language(value) => self.language = value.trim().to_string(),
            SettingChange::ReplaceSelection(value) => self.replace_selection = value,
            SettingChange::ShowPromptWithAnswer(value) => {
                self.always_show_prompt_with_answer = value;
            }
            SettingChange::SaveChatHistory(value) => self.always_save_chat_history = value,
            SettingChange::ChatHistoryPath(raw) => {
                self.chat_history_path = folder_path(&raw, "chat history path")?;
            }
            SettingChange::ChatHistoryTemplate(value) => {
                self.chat_history_template = value.trim().to_string();
            }
            SettingChange::SendOnEnter(value) => self.send_on_enter = value,
            SettingChange::MetaKey(value) => self.meta_key = value,
            SettingChange::ImageFolder(raw) => {
                self.img_folder = folder_path(&raw, "image folder")?;
            }
            SettingChange::PromptPrefix(edit) => self.prompt_prefix.apply(edit)?,
            SettingChange::ChatPrefix(edit) => self.chat_prefix.apply(edit)?,
        }
        Ok(())
    }
}

pub fn parse_max_tokens(raw: &str) -> Result<u32, ValidationError> {
    match raw.trim().parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ValidationError::MaxTokens(raw.to_string())),
    }
}

fn folder_path(raw: &str, field: &'static str) -> Result<String, ValidationError> {
    let path = raw.trim().trim_end_matches('/');
    if path.is_empty() {
        return Err(ValidationError::EmptyPath { field });
    }
    Ok(path.to_string())
}

fn non_blank<'a>(value: &'a str, field: &'static str) -> Result<&'a str, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Blank { field });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use core_types::Role;

    use super::*;

    #[test]
    fn partial_record_merges_over_defaults() {
        let settings: AssistantSettings =
            serde_json::from_str(r#"{"apiKey":"sk-1","maxTokens":64,"metaKey":"altKey"}"#)
                .expect("parse");
        assert_eq!(settings.api_key, "sk-1");
        assert_eq!(settings.max_tokens, 64);
        assert_eq!(settings.meta_key, MetaKey::AltKey);
        assert_eq!(settings.model_name, "gpt-3.5-turbo");
        assert_eq!(settings.img_folder, "AiAssistant/Assets");
        assert!(settings.replace_selection);
    }

    #[test]
    fn rejects_non_positive_or_non_numeric_token_counts() {
        let mut settings = AssistantSettings::default();
        settings
            .apply(SettingChange::MaxTokens("256".to_string()))
            .expect("valid");
        for raw in ["0", "-5", "abc", "", "12abc"] {
            let err = settings
                .apply(SettingChange::MaxTokens(raw.to_string()))
                .expect_err("must reject");
            assert_eq!(err, ValidationError::MaxTokens(raw.to_string()));
            assert_eq!(settings.max_tokens, 256);
        }
    }

    #[test]
    fn folder_paths_drop_trailing_slashes_and_reject_empty() {
        let mut settings = AssistantSettings::default();
        settings
            .apply(SettingChange::ImageFolder("Assets/img///".to_string()))
            .expect("valid");
        assert_eq!(settings.img_folder, "Assets/img");

        let err = settings
            .apply(SettingChange::ImageFolder("///".to_string()))
            .expect_err("empty");
        assert_eq!(
            err,
            ValidationError::EmptyPath {
                field: "image folder"
            }
        );
        assert_eq!(settings.img_folder, "Assets/img");

        settings
            .apply(SettingChange::ChatHistoryPath("/notes/chat/".to_string()))
            .expect("valid");
        assert_eq!(settings.chat_history_path, "/notes/chat");
    }

    #[test]
    fn template_change_does_not_touch_history_path() {
        let mut settings = AssistantSettings::default();
        settings
            .apply(SettingChange::ChatHistoryTemplate("tpl/chat.md".to_string()))
            .expect("valid");
        assert_eq!(settings.chat_history_template, "tpl/chat.md");
        assert_eq!(settings.chat_history_path, "/ai/history/");
    }

    #[test]
    fn prefix_edits_route_to_the_right_list() {
        let mut settings = AssistantSettings::default();
        settings
            .apply(SettingChange::ChatPrefix(PrefixEdit::Add))
            .expect("add");
        settings
            .apply(SettingChange::ChatPrefix(PrefixEdit::SetRole {
                index: 0,
                role: Role::System,
            }))
            .expect("role");
        assert_eq!(settings.chat_prefix.len(), 1);
        assert!(settings.prompt_prefix.is_empty());
        assert_eq!(settings.chat_prefix.active_messages()[0].role, Role::System);
    }

    #[test]
    fn api_config_reflects_current_values() {
        let mut settings = AssistantSettings::default();
        settings
            .apply(SettingChange::ModelName("gpt-4".to_string()))
            .expect("model");
        settings
            .apply(SettingChange::ApiBaseUrl("http://localhost:8080/v1/".to_string()))
            .expect("url");
        let api = settings.api_config();
        assert_eq!(api.model, "gpt-4");
        assert_eq!(api.base_url, "http://localhost:8080/v1");
        assert_eq!(api.max_tokens, 500);
        assert!(
            settings
                .apply(SettingChange::ModelName("  ".to_string()))
                .is_err()
        );
    }

    #[test]
    fn meta_key_uses_host_key_names() {
        let text = serde_json::to_string(&MetaKey::ShiftKey).expect("json");
        assert_eq!(text, "\"shiftKey\"");
        assert_eq!(MetaKey::parse("meta"), Some(MetaKey::MetaKey));
        assert_eq!(MetaKey::parse("hyper"), None);
    }
}
