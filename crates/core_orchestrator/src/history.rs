use chrono::{DateTime, Local};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum EntryKind {
    Prompt,
    Response,
}

impl EntryKind {
    pub fn label(self) -> &'static str {
        match self {
            EntryKind::Prompt => "prompt",
            EntryKind::Response => "ai-response",
        }
    }
}

/// One rendered line of the chat panel. Lives only as long as the panel.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub kind: EntryKind,
    pub content: String,
    pub timestamp: DateTime<Local>,
}

impl HistoryEntry {
    pub fn timestamp_label(&self) -> String {
        self.timestamp.format("%H:%M").to_string()
    }
}

#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn push_prompt(&mut self, content: impl Into<String>) {
        self.push(EntryKind::Prompt, content.into());
    }

    pub fn push_response(&mut self, content: impl Into<String>) {
        self.push(EntryKind::Response, content.into());
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, kind: EntryKind, content: String) {
        self.entries.push(HistoryEntry {
            kind,
            content,
            timestamp: Local::now(),
        });
    }
}
