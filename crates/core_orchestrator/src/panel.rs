use core_types::RequestError;
use tracing::{debug, info, warn};

use crate::context::{AssistantContext, PendingRequest, assemble_request};
use crate::history::History;
use crate::host::NoticeId;
use crate::keys::{KeyEvent, should_submit};
use crate::popup::{QUERY_NOTICE, QUERY_NOTICE_TEXT};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PanelState {
    Idle,
    AwaitingResponse,
}

/// The persistent chat side view: an input line over an append-only history.
pub struct ChatPanel {
    ctx: AssistantContext,
    input: String,
    state: PanelState,
    history: History,
    open: bool,
    query_notice: Option<NoticeId>,
}

impl ChatPanel {
    pub fn new(ctx: AssistantContext) -> Self {
        Self {
            ctx,
            input: String::new(),
            state: PanelState::Idle,
            history: History::default(),
            open: true,
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

    pub fn input_enabled(&self) -> bool {
        self.open && self.state == PanelState::Idle
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Submits when the key matches the configured trigger. Returns whether a
    /// request went out.
    pub async fn handle_key(&mut self, event: &KeyEvent) -> bool {
        let (send_on_enter, meta_key) = self
            .ctx
            .settings
            .read(|settings| (settings.send_on_enter, settings.meta_key));
        if !should_submit(event, send_on_enter, meta_key) {
            return false;
        }
        self.submit().await
    }

    pub async fn submit(&mut self) -> bool {
        let Some(pending) = self.begin_submit() else {
            return false;
        };
        let result = self
            .ctx
            .api
            .complete(&pending.config, &pending.messages)
            .await;
        self.finish(result);
        true
    }

    /// Moves the prompt into the history and locks the input until `finish`.
    pub fn begin_submit(&mut self) -> Option<PendingRequest> {
        if !self.input_enabled() {
            return None;
        }
        let prompt = self.input.trim().to_string();
        if prompt.is_empty() {
            return None;
        }

        let (config, messages) = self.ctx.settings.read(|settings| {
            (
                settings.api_config(),
                assemble_request(&settings.chat_prefix, &prompt),
            )
        });
        self.history.push_prompt(prompt);
        self.input.clear();
        self.state = PanelState::AwaitingResponse;
        self.query_notice = Some(self.ctx.host.notice(QUERY_NOTICE_TEXT, Some(QUERY_NOTICE)));
        debug!(messages = messages.len(), "chat prompt submitted");
        Some(PendingRequest { config, messages })
    }

    pub fn finish(&mut self, result: Result<String, RequestError>) {
        self.state = PanelState::Idle;
        if let Some(notice) = self.query_notice.take() {
            self.ctx.host.hide_notice(notice);
        }
        if !self.open {
            debug!("dropping response for a closed chat panel");
            return;
        }
        match result {
            Ok(answer) => self.history.push_response(answer),
            Err(err) => {
                warn!(error = %err, auth = err.is_auth(), "chat request failed");
                self.ctx
                    .host
                    .notice(&format!("Querying failed: {err}"), None);
            }
        }
    }

    /// Copies one history line, like double-clicking it in the view.
    pub fn copy_entry(&self, index: usize) -> bool {
        let Some(entry) = self.history.get(index) else {
            return false;
        };
        self.ctx.host.copy_to_clipboard(&entry.content);
        self.ctx.host.notice("Copied content to clipboard", None);
        true
    }

    pub fn close(&mut self) {
        if self.open {
            info!(entries = self.history.len(), "chat panel closed");
        }
        self.open = false;
    }
}

#[cfg(test)]
mod tests {
    use config::{AssistantSettings, MetaKey, PrefixEdit, SettingChange};
    use core_types::{ChatMessage, PrefixMessage, Role};

    use super::*;
    use crate::history::EntryKind;
    use crate::testing::{Fixture, RecordingHost};

    fn settings_with_chat_prefix() -> AssistantSettings {
        let mut settings = AssistantSettings::default();
        settings.send_on_enter = false;
        settings.meta_key = MetaKey::CtrlKey;
        settings
            .chat_prefix
            .push(PrefixMessage::new(Role::System, "You are a librarian."));
        settings
            .chat_prefix
            .push(PrefixMessage::new(Role::User, "disabled example"));
        settings.chat_prefix.toggle_at(1).expect("toggle");
        settings
            .chat_prefix
            .push(PrefixMessage::new(Role::Assistant, "Understood."));
        settings
    }

    #[tokio::test]
    async fn enter_alone_does_not_submit_without_send_on_enter() {
        let fixture = Fixture::new(settings_with_chat_prefix(), RecordingHost::default());
        let mut panel = ChatPanel::new(fixture.context());
        panel.set_input("Where is the atlas?");

        assert!(!panel.handle_key(&KeyEvent::enter()).await);
        assert!(fixture.api.chat_requests.lock().is_empty());
        assert_eq!(panel.input(), "Where is the atlas?");
        assert!(panel.history().is_empty());
    }

    #[tokio::test]
    async fn ctrl_enter_sends_active_prefix_then_prompt() {
        let fixture = Fixture::new(settings_with_chat_prefix(), RecordingHost::default());
        fixture.api.reply(Ok("Second shelf."));
        let mut panel = ChatPanel::new(fixture.context());
        panel.set_input("Where is the atlas?");

        let ctrl_enter = KeyEvent::enter().with_modifier(MetaKey::CtrlKey);
        assert!(panel.handle_key(&ctrl_enter).await);

        let requests = fixture.api.chat_requests.lock().clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0],
            vec![
                ChatMessage::system("You are a librarian."),
                ChatMessage::assistant("Understood."),
                ChatMessage::user("Where is the atlas?"),
            ]
        );
        assert_eq!(panel.input(), "");
        assert_eq!(panel.state(), PanelState::Idle);
        let kinds: Vec<_> = panel.history().entries().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EntryKind::Prompt, EntryKind::Response]);
        assert_eq!(
            panel.history().last().map(|e| e.content.as_str()),
            Some("Second shelf.")
        );
    }

    #[tokio::test]
    async fn send_on_enter_accepts_plain_enter() {
        let mut settings = AssistantSettings::default();
        settings.send_on_enter = true;
        let fixture = Fixture::new(settings, RecordingHost::default());
        fixture.api.reply(Ok("hi"));
        let mut panel = ChatPanel::new(fixture.context());
        panel.set_input("hello");

        assert!(panel.handle_key(&KeyEvent::enter()).await);
        assert_eq!(fixture.api.chat_requests.lock().len(), 1);
    }

    #[tokio::test]
    async fn failed_request_re_enables_input_without_adding_a_response() {
        let fixture = Fixture::new(AssistantSettings::default(), RecordingHost::default());
        fixture.api.reply(Err(RequestError::Status {
            status: 500,
            message: "upstream exploded".to_string(),
        }));
        let mut panel = ChatPanel::new(fixture.context());
        panel.set_input("Will this work?");

        assert!(panel.submit().await);
        assert!(panel.input_enabled());
        assert_eq!(panel.state(), PanelState::Idle);
        assert_eq!(panel.history().len(), 1);
        assert_eq!(
            panel.history().last().map(|e| e.kind),
            Some(EntryKind::Prompt)
        );
        let notices = fixture.host.visible_notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].contains("upstream exploded"));
    }

    #[tokio::test]
    async fn input_is_locked_while_awaiting() {
        let fixture = Fixture::new(AssistantSettings::default(), RecordingHost::default());
        let mut panel = ChatPanel::new(fixture.context());
        panel.set_input("first");
        let pending = panel.begin_submit().expect("pending");
        assert_eq!(pending.messages.len(), 1);
        assert!(!panel.input_enabled());

        panel.set_input("second");
        assert_eq!(panel.input(), "");
        assert!(panel.begin_submit().is_none());
        assert!(!panel.submit().await);

        assert_eq!(fixture.host.visible_notices(), vec![QUERY_NOTICE_TEXT]);

        panel.finish(Ok("done".to_string()));
        assert!(panel.input_enabled());
        assert_eq!(panel.history().len(), 2);
        assert!(fixture.host.visible_notices().is_empty());
    }

    #[test]
    fn blank_input_is_not_submitted() {
        let fixture = Fixture::new(AssistantSettings::default(), RecordingHost::default());
        let mut panel = ChatPanel::new(fixture.context());
        panel.set_input("   \n");
        assert!(panel.begin_submit().is_none());
        assert!(panel.history().is_empty());
    }

    #[test]
    fn response_after_close_is_dropped() {
        let fixture = Fixture::new(AssistantSettings::default(), RecordingHost::default());
        let mut panel = ChatPanel::new(fixture.context());
        panel.set_input("slow question");
        panel.begin_submit().expect("pending");
        panel.close();

        panel.finish(Err(RequestError::Transport("timed out".to_string())));
        assert_eq!(panel.history().len(), 1);
        assert_eq!(fixture.host.notices(), vec![QUERY_NOTICE_TEXT]);
        assert!(fixture.host.visible_notices().is_empty());
        assert!(!panel.input_enabled());
    }

    #[test]
    fn prefix_toggle_applies_to_the_next_request() {
        let fixture = Fixture::new(settings_with_chat_prefix(), RecordingHost::default());
        let mut panel = ChatPanel::new(fixture.context());

        fixture
            .settings
            .apply(SettingChange::ChatPrefix(PrefixEdit::Toggle { index: 0 }))
            .expect("toggle");
        panel.set_input("q");
        let pending = panel.begin_submit().expect("pending");
        assert_eq!(
            pending.messages,
            vec![ChatMessage::assistant("Understood."), ChatMessage::user("q")]
        );
    }

    #[test]
    fn copy_entry_uses_clipboard_and_notice() {
        let fixture = Fixture::new(AssistantSettings::default(), RecordingHost::default());
        let mut panel = ChatPanel::new(fixture.context());
        panel.set_input("copy me");
        panel.begin_submit().expect("pending");

        assert!(panel.copy_entry(0));
        assert!(!panel.copy_entry(5));
        assert_eq!(fixture.host.clipboard.lock().clone(), vec!["copy me"]);
        assert_eq!(
            fixture.host.visible_notices(),
            vec![QUERY_NOTICE_TEXT, "Copied content to clipboard"]
        );
    }
}
