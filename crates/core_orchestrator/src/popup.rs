use std::time::Duration;

use core_types::RequestError;
use tracing::{debug, warn};

use crate::context::{AssistantContext, PendingRequest, assemble_request};
use crate::host::NoticeId;
use crate::keys::{KeyEvent, should_submit};

pub(crate) const QUERY_NOTICE: Duration = Duration::from_secs(50);
pub(crate) const QUERY_NOTICE_TEXT: &str = "Querying the assistant...";

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PopupState {
    Editing,
    AwaitingResponse,
    Dismissed,
}

/// Single-shot prompt overlay anchored to the active document.
pub struct PromptPopup {
    ctx: AssistantContext,
    input: String,
    state: PopupState,
    query_notice: Option<NoticeId>,
}

impl PromptPopup {
    pub fn new(ctx: AssistantContext) -> Self {
        Self {
            ctx,
            input: String::new(),
            state: PopupState::Editing,
            query_notice: None,
        }
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        if self.input_enabled() {
            self.input = text.into();
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn state(&self) -> PopupState {
        self.state
    }

    pub fn input_enabled(&self) -> bool {
        self.state == PopupState::Editing
    }

    pub fn is_open(&self) -> bool {
        self.state != PopupState::Dismissed
    }

    pub fn dismiss(&mut self) {
        self.hide_query_notice();
        self.state = PopupState::Dismissed;
    }

    /// The popup has no send-on-enter mode: Enter always needs the configured
    /// modifier.
    pub async fn handle_key(&mut self, event: &KeyEvent) -> bool {
        let meta_key = self.ctx.settings.read(|settings| settings.meta_key);
        if !should_submit(event, false, meta_key) {
            return false;
        }
        self.submit().await
    }

    /// Sends the prompt and writes the answer into the active editor. Returns
    /// whether the answer was inserted.
    pub async fn submit(&mut self) -> bool {
        let Some(pending) = self.begin_submit() else {
            return false;
        };
        let result = self
            .ctx
            .api
            .complete(&pending.config, &pending.messages)
            .await;
        self.finish(result)
    }

    /// Locks the input and raises the querying notice. The prompt text stays
    /// in the input so a failed request can be retried as is.
    pub fn begin_submit(&mut self) -> Option<PendingRequest> {
        if !self.input_enabled() {
            return None;
        }
        let prompt = self.input.trim();
        if prompt.is_empty() {
            return None;
        }
        let (config, messages) = self.ctx.settings.read(|settings| {
            (
                settings.api_config(),
                assemble_request(&settings.prompt_prefix, prompt),
            )
        });

        self.state = PopupState::AwaitingResponse;
        self.query_notice = Some(self.ctx.host.notice(QUERY_NOTICE_TEXT, Some(QUERY_NOTICE)));
        debug!(messages = messages.len(), "popup prompt submitted");
        Some(PendingRequest { config, messages })
    }

    /// Applies the answer to the active editor. Returns whether it was
    /// inserted; otherwise the popup is editable again.
    pub fn finish(&mut self, result: Result<String, RequestError>) -> bool {
        if self.state != PopupState::AwaitingResponse {
            return false;
        }
        self.hide_query_notice();

        let answer = match result {
            Ok(answer) => answer,
            Err(err) => {
                warn!(error = %err, auth = err.is_auth(), "popup request failed");
                self.ctx
                    .host
                    .notice(&format!("Querying failed: {err}"), None);
                self.state = PopupState::Editing;
                return false;
            }
        };

        let Some(editor) = self.ctx.host.active_editor() else {
            self.ctx
                .host
                .notice("No active note to insert the answer into", None);
            self.state = PopupState::Editing;
            return false;
        };
        let (show_prompt, replace_selection) = self.ctx.settings.read(|settings| {
            (
                settings.always_show_prompt_with_answer,
                settings.replace_selection,
            )
        });
        let text = insertion_text(
            self.input.trim(),
            &answer,
            show_prompt,
            replace_selection,
            &editor.selection(),
        );
        editor.replace_selection(&text);
        self.dismiss();
        true
    }

    fn hide_query_notice(&mut self) {
        if let Some(notice) = self.query_notice.take() {
            self.ctx.host.hide_notice(notice);
        }
    }
}

/// What ends up in the note for one answer.
pub fn insertion_text(
    prompt: &str,
    answer: &str,
    show_prompt: bool,
    replace_selection: bool,
    selection: &str,
) -> String {
    let body = if show_prompt {
        format!("Prompt: {prompt}\n Answer: {answer}")
    } else {
        answer.to_string()
    };
    if replace_selection || selection.is_empty() {
        body
    } else {
        format!("{selection}\n{}", body.trim())
    }
}
