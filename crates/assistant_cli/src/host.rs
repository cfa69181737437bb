use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use core_orchestrator::{CommandSpec, Editor, Host, NoticeId};
use parking_lot::Mutex;
use tracing::{debug, info};

/// An in-memory note standing in for the host's active editor.
#[derive(Default)]
pub struct ScratchDocument {
    text: Mutex<String>,
    selection: Mutex<String>,
}

impl ScratchDocument {
    pub fn with_selection(selection: impl Into<String>) -> Self {
        let selection = selection.into();
        Self {
            text: Mutex::new(selection.clone()),
            selection: Mutex::new(selection),
        }
    }

    pub fn text(&self) -> String {
        self.text.lock().clone()
    }
}

impl Editor for ScratchDocument {
    fn selection(&self) -> String {
        self.selection.lock().clone()
    }

    fn replace_selection(&self, replacement: &str) {
        let mut selection = self.selection.lock();
        let mut text = self.text.lock();
        if !selection.is_empty() && text.ends_with(selection.as_str()) {
            let keep = text.len() - selection.len();
            text.truncate(keep);
        }
        text.push_str(replacement);
        selection.clear();
    }
}

/// Terminal host: notices go to stderr, files land under the vault root.
pub struct TerminalHost {
    vault: PathBuf,
    document: Arc<ScratchDocument>,
    commands: Mutex<Vec<CommandSpec>>,
    next_notice: AtomicU64,
}

impl TerminalHost {
    pub fn new(vault: impl Into<PathBuf>, document: Arc<ScratchDocument>) -> Self {
        Self {
            vault: vault.into(),
            document,
            commands: Mutex::new(Vec::new()),
            next_notice: AtomicU64::new(0),
        }
    }

    pub fn document(&self) -> &ScratchDocument {
        &self.document
    }

    pub fn commands(&self) -> Vec<CommandSpec> {
        self.commands.lock().clone()
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.vault.join(Path::new(path.trim_start_matches('/')))
    }
}

impl Host for TerminalHost {
    fn notice(&self, message: &str, duration: Option<Duration>) -> NoticeId {
        let id = NoticeId(self.next_notice.fetch_add(1, Ordering::Relaxed));
        debug!(id = id.0, ttl_ms = duration.map(|d| d.as_millis() as u64), "notice");
        eprintln!("[notice] {message}");
        id
    }

    // Printed lines cannot be taken back; the log keeps the lifetime.
    fn hide_notice(&self, id: NoticeId) {
        debug!(id = id.0, "notice hidden");
    }

    fn active_editor(&self) -> Option<Arc<dyn Editor>> {
        Some(self.document.clone() as Arc<dyn Editor>)
    }

    fn copy_to_clipboard(&self, text: &str) {
        info!(chars = text.len(), "copied to clipboard");
        println!("{text}");
    }

    fn write_binary(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&target, bytes)
            .with_context(|| format!("failed to write {}", target.display()))?;
        Ok(())
    }

    fn register_command(&self, command: CommandSpec) {
        self.commands.lock().push(command);
    }
}
