use anyhow::{Context, Result, bail};
use config::{AssistantSettings, MetaKey, PrefixEdit, SettingChange};
use core_types::Role;

/// Maps a `settings.json` key and a raw value onto a validated change.
pub fn parse_setting(field: &str, value: &str) -> Result<SettingChange> {
    let change = match field {
        "apiKey" => SettingChange::ApiKey(value.to_string()),
        "apiBaseUrl" => SettingChange::ApiBaseUrl(value.to_string()),
        "modelName" => SettingChange::ModelName(value.to_string()),
        "maxTokens" => SettingChange::MaxTokens(value.to_string()),
        "language" => SettingChange::Language(value.to_string()),
        "replaceSelection" => SettingChange::ReplaceSelection(parse_flag(field, value)?),
        "alwaysShowPromptWithAnswer" => {
            SettingChange::ShowPromptWithAnswer(parse_flag(field, value)?)
        }
        "alwaysSaveChatHistory" => SettingChange::SaveChatHistory(parse_flag(field, value)?),
        "chatHistoryPath" => SettingChange::ChatHistoryPath(value.to_string()),
        "chatHistoryTemplate" => SettingChange::ChatHistoryTemplate(value.to_string()),
        "sendOnEnter" => SettingChange::SendOnEnter(parse_flag(field, value)?),
        "metaKey" => match MetaKey::parse(value) {
            Some(key) => SettingChange::MetaKey(key),
            None => bail!("unknown modifier `{value}` (expected alt, ctrl, meta or shift)"),
        },
        "imgFolder" => SettingChange::ImageFolder(value.to_string()),
        other => bail!("unknown setting `{other}`"),
    };
    Ok(change)
}

fn parse_flag(field: &str, value: &str) -> Result<bool> {
    value
        .trim()
        .parse::<bool>()
        .with_context(|| format!("`{field}` expects true or false, got `{value}`"))
}

pub fn parse_role(value: &str) -> Result<Role> {
    value.parse::<Role>().map_err(anyhow::Error::msg)
}

/// Wraps a prefix edit for the chat list or the prompt list.
pub fn prefix_change(list: &str, edit: PrefixEdit) -> Result<SettingChange> {
    match list {
        "chat" => Ok(SettingChange::ChatPrefix(edit)),
        "prompt" => Ok(SettingChange::PromptPrefix(edit)),
        other => bail!("unknown prefix list `{other}` (expected chat or prompt)"),
    }
}

/// Pretty JSON of the settings with the key reduced to its last four chars.
pub fn render_settings(settings: &AssistantSettings) -> Result<String> {
    let mut shown = settings.clone();
    shown.api_key = mask_key(&shown.api_key);
    serde_json::to_string_pretty(&shown).context("failed to render settings")
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{tail}", "*".repeat(chars.len() - 4))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_fields_map_to_changes() {
        assert!(matches!(
            parse_setting("maxTokens", "64").expect("max tokens"),
            SettingChange::MaxTokens(raw) if raw == "64"
        ));
        assert!(matches!(
            parse_setting("sendOnEnter", "true").expect("flag"),
            SettingChange::SendOnEnter(true)
        ));
        assert!(matches!(
            parse_setting("metaKey", "altKey").expect("modifier"),
            SettingChange::MetaKey(MetaKey::AltKey)
        ));
    }

    #[test]
    fn bad_input_is_rejected_before_the_store() {
        assert!(parse_setting("sendOnEnter", "yes").is_err());
        assert!(parse_setting("metaKey", "hyper").is_err());
        assert!(parse_setting("colour", "blue").is_err());
        assert!(prefix_change("notes", PrefixEdit::Add).is_err());
    }

    #[test]
    fn rendered_settings_hide_the_key() {
        let settings = AssistantSettings {
            api_key: "sk-secret-1234".to_string(),
            ..AssistantSettings::default()
        };
        let rendered = render_settings(&settings).expect("render");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("**********1234"));
        assert_eq!(mask_key("abc"), "***");
    }
}
