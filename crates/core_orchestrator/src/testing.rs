use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use config::{AssistantSettings, SettingsManager};
use core_types::{
    ApiConfig, AssistantApi, ChatMessage, GeneratedImage, ImageRequest, RequestError,
    TranscriptionRequest,
};
use parking_lot::Mutex;

use crate::commands::CommandSpec;
use crate::context::AssistantContext;
use crate::host::{Editor, Host, NoticeId};

#[derive(Default)]
pub struct ScriptedApi {
    pub completions: Mutex<VecDeque<Result<String, RequestError>>>,
    pub images: Mutex<VecDeque<Result<Vec<GeneratedImage>, RequestError>>>,
    pub transcriptions: Mutex<VecDeque<Result<String, RequestError>>>,
    pub chat_requests: Mutex<Vec<Vec<ChatMessage>>>,
    pub image_requests: Mutex<Vec<ImageRequest>>,
    pub transcription_requests: Mutex<Vec<TranscriptionRequest>>,
}

impl ScriptedApi {
    pub fn reply(&self, result: Result<&str, RequestError>) {
        self.completions
            .lock()
            .push_back(result.map(str::to_string));
    }
}

#[async_trait]
impl AssistantApi for ScriptedApi {
    async fn complete(
        &self,
        _config: &ApiConfig,
        messages: &[ChatMessage],
    ) -> Result<String, RequestError> {
        self.chat_requests.lock().push(messages.to_vec());
        self.completions
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(RequestError::Transport("no scripted reply".to_string())))
    }

    async fn generate_images(
        &self,
        _config: &ApiConfig,
        request: &ImageRequest,
    ) -> Result<Vec<GeneratedImage>, RequestError> {
        self.image_requests.lock().push(request.clone());
        self.images
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(RequestError::Transport("no scripted images".to_string())))
    }

    async fn transcribe(
        &self,
        _config: &ApiConfig,
        request: &TranscriptionRequest,
    ) -> Result<String, RequestError> {
        self.transcription_requests.lock().push(request.clone());
        self.transcriptions
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(RequestError::Transport("no scripted text".to_string())))
    }

    async fn fetch_image(&self, image: &GeneratedImage) -> Result<Vec<u8>, RequestError> {
        Ok(image.url.as_bytes().to_vec())
    }
}

#[derive(Default)]
pub struct BufferEditor {
    pub selection: Mutex<String>,
    pub writes: Mutex<Vec<String>>,
}

impl Editor for BufferEditor {
    fn selection(&self) -> String {
        self.selection.lock().clone()
    }

    fn replace_selection(&self, text: &str) {
        self.writes.lock().push(text.to_string());
        self.selection.lock().clear();
    }
}

#[derive(Default)]
pub struct RecordingHost {
    pub editor: Option<Arc<BufferEditor>>,
    pub notices: Mutex<Vec<String>>,
    pub hidden: Mutex<Vec<NoticeId>>,
    pub clipboard: Mutex<Vec<String>>,
    pub files: Mutex<BTreeMap<String, Vec<u8>>>,
    pub commands: Mutex<Vec<CommandSpec>>,
    pub fail_writes: bool,
}

impl RecordingHost {
    pub fn with_editor() -> Self {
        Self {
            editor: Some(Arc::new(BufferEditor::default())),
            ..Self::default()
        }
    }

    pub fn editor_writes(&self) -> Vec<String> {
        self.editor
            .as_ref()
            .map(|editor| editor.writes.lock().clone())
            .unwrap_or_default()
    }

    pub fn notices(&self) -> Vec<String> {
        self.notices.lock().clone()
    }

    /// Notices that were shown and not hidden again.
    pub fn visible_notices(&self) -> Vec<String> {
        let hidden = self.hidden.lock();
        self.notices
            .lock()
            .iter()
            .enumerate()
            .filter(|(index, _)| !hidden.contains(&NoticeId(*index as u64)))
            .map(|(_, message)| message.clone())
            .collect()
    }
}

impl Host for RecordingHost {
    fn notice(&self, message: &str, _duration: Option<Duration>) -> NoticeId {
        let mut notices = self.notices.lock();
        notices.push(message.to_string());
        NoticeId(notices.len() as u64 - 1)
    }

    fn hide_notice(&self, id: NoticeId) {
        self.hidden.lock().push(id);
    }

    fn active_editor(&self) -> Option<Arc<dyn Editor>> {
        self.editor
            .clone()
            .map(|editor| editor as Arc<dyn Editor>)
    }

    fn copy_to_clipboard(&self, text: &str) {
        self.clipboard.lock().push(text.to_string());
    }

    fn write_binary(&self, path: &str, bytes: &[u8]) -> Result<()> {
        if self.fail_writes {
            bail!("vault is read-only");
        }
        self.files.lock().insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    fn register_command(&self, command: CommandSpec) {
        self.commands.lock().push(command);
    }
}

pub struct Fixture {
    pub api: Arc<ScriptedApi>,
    pub host: Arc<RecordingHost>,
    pub settings: Arc<SettingsManager>,
}

impl Fixture {
    pub fn new(settings: AssistantSettings, host: RecordingHost) -> Self {
        Self {
            api: Arc::new(ScriptedApi::default()),
            host: Arc::new(host),
            settings: Arc::new(SettingsManager::detached(settings)),
        }
    }

    pub fn context(&self) -> AssistantContext {
        AssistantContext::new(self.settings.clone(), self.api.clone(), self.host.clone())
    }
}
