use std::sync::Arc;

use config::SettingsManager;
use core_types::AssistantApi;
use tracing::{debug, info};

mod commands;
mod context;
mod history;
mod host;
mod keys;
mod media;
mod panel;
mod popup;
#[cfg(test)]
mod testing;

pub use commands::{CommandId, CommandSpec};
pub use context::{AssistantContext, PendingRequest, assemble_request};
pub use history::{EntryKind, History, HistoryEntry};
pub use host::{Editor, Host, NoticeId};
pub use keys::{Key, KeyEvent, should_submit};
pub use media::{FormError, ImageForm, ImageGenerator, MAX_IMAGES, MediaError, SpeechToText};
pub use panel::{ChatPanel, PanelState};
pub use popup::{PopupState, PromptPopup, insertion_text};

/// What a command produced for the host to present.
pub enum CommandOutcome {
    ChatOpened,
    PromptOpened,
    PromptClosed,
    ImageGenerator(ImageGenerator),
    SpeechToText(SpeechToText),
    NoActiveEditor,
}

/// Composition root: owns at most one chat panel and one prompt popup and
/// hands every view the same settings, API client and host.
pub struct AssistantPlugin {
    ctx: AssistantContext,
    panel: Option<ChatPanel>,
    popup: Option<PromptPopup>,
}

impl AssistantPlugin {
    pub fn new(
        settings: Arc<SettingsManager>,
        api: Arc<dyn AssistantApi>,
        host: Arc<dyn Host>,
    ) -> Self {
        Self {
            ctx: AssistantContext::new(settings, api, host),
            panel: None,
            popup: None,
        }
    }

    pub fn context(&self) -> &AssistantContext {
        &self.ctx
    }

    pub fn on_load(&mut self) {
        for command in CommandId::ALL {
            self.ctx.host.register_command(command.spec());
        }
        info!(commands = CommandId::ALL.len(), "assistant loaded");
    }

    pub fn run_command(&mut self, command: CommandId) -> CommandOutcome {
        debug!(command = %command, "running command");
        if command.requires_editor() && self.ctx.host.active_editor().is_none() {
            return CommandOutcome::NoActiveEditor;
        }
        match command {
            CommandId::ChatMode => {
                self.activate_chat_view();
                CommandOutcome::ChatOpened
            }
            CommandId::PromptMode => {
                if self.toggle_prompt() {
                    CommandOutcome::PromptOpened
                } else {
                    CommandOutcome::PromptClosed
                }
            }
            CommandId::ImageGenerator => CommandOutcome::ImageGenerator(self.image_generator()),
            CommandId::SpeechToText => CommandOutcome::SpeechToText(self.speech_to_text()),
        }
    }

    /// Replaces any open chat panel with a fresh one.
    pub fn activate_chat_view(&mut self) -> &mut ChatPanel {
        if let Some(mut previous) = self.panel.take() {
            previous.close();
        }
        self.panel.insert(ChatPanel::new(self.ctx.clone()))
    }

    /// Dismisses an open popup, or opens one. Returns whether a popup is now
    /// open.
    pub fn toggle_prompt(&mut self) -> bool {
        match self.popup.take() {
            Some(mut popup) if popup.is_open() => {
                popup.dismiss();
                false
            }
            _ => {
                self.popup = Some(PromptPopup::new(self.ctx.clone()));
                true
            }
        }
    }

    pub fn image_generator(&self) -> ImageGenerator {
        ImageGenerator::new(self.ctx.clone())
    }

    pub fn speech_to_text(&self) -> SpeechToText {
        SpeechToText::new(self.ctx.clone())
    }

    pub fn chat_panel_mut(&mut self) -> Option<&mut ChatPanel> {
        self.panel.as_mut().filter(|panel| panel.is_open())
    }

    pub fn prompt_popup_mut(&mut self) -> Option<&mut PromptPopup> {
        if self.popup.as_ref().is_some_and(|popup| !popup.is_open()) {
            self.popup = None;
        }
        self.popup.as_mut()
    }

    pub fn on_unload(&mut self) {
        if let Some(panel) = self.panel.as_mut() {
            panel.close();
        }
        if let Some(popup) = self.popup.as_mut() {
            popup.dismiss();
        }
        self.popup = None;
        info!("assistant unloaded");
    }
}
