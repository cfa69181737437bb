use std::sync::Arc;

use config::{PrefixList, SettingsManager};
use core_types::{ApiConfig, AssistantApi, ChatMessage};

use crate::host::Host;

/// The collaborators a panel or popup needs, passed in explicitly.
#[derive(Clone)]
pub struct AssistantContext {
    pub settings: Arc<SettingsManager>,
    pub api: Arc<dyn AssistantApi>,
    pub host: Arc<dyn Host>,
}

impl AssistantContext {
    pub fn new(
        settings: Arc<SettingsManager>,
        api: Arc<dyn AssistantApi>,
        host: Arc<dyn Host>,
    ) -> Self {
        Self {
            settings,
            api,
            host,
        }
    }
}

/// A request a view has committed to but not yet sent.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub config: ApiConfig,
    pub messages: Vec<ChatMessage>,
}

/// Active prefix entries in list order, then the user's prompt.
pub fn assemble_request(prefix: &PrefixList, prompt: &str) -> Vec<ChatMessage> {
    let mut messages = prefix.active_messages();
    messages.push(ChatMessage::user(prompt));
    messages
}
