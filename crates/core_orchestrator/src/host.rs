use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::commands::CommandSpec;

/// Handle to a shown notice, used to take it down early.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct NoticeId(pub u64);

/// The document the user is currently editing.
pub trait Editor: Send + Sync {
    fn selection(&self) -> String;
    fn replace_selection(&self, text: &str);
}

/// Capabilities the embedding application lends to the assistant. Every
/// panel and popup receives this explicitly instead of reaching for a global
/// plugin handle.
pub trait Host: Send + Sync {
    /// Shows a transient toast. `None` uses the host's default duration.
    fn notice(&self, message: &str, duration: Option<Duration>) -> NoticeId;

    /// Hides a notice before its duration runs out. Unknown or already
    /// expired ids are ignored.
    fn hide_notice(&self, id: NoticeId);

    fn active_editor(&self) -> Option<Arc<dyn Editor>>;

    fn copy_to_clipboard(&self, text: &str);

    /// Writes a file relative to the host's vault root, creating folders as
    /// needed.
    fn write_binary(&self, path: &str, bytes: &[u8]) -> Result<()>;

    fn register_command(&self, command: CommandSpec);
}
