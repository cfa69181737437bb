use core_types::{ChatMessage, PrefixId, PrefixMessage, Role};
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Ordered prefix messages. Position is the ordinal; ids stay stable across
/// edits.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(transparent)]
pub struct PrefixList(Vec<PrefixMessage>);

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PrefixEdit {
    Add,
    Remove { index: usize },
    Toggle { index: usize },
    SetRole { index: usize, role: Role },
    SetContent { index: usize, content: String },
}

impl PrefixList {
    pub fn new(entries: Vec<PrefixMessage>) -> Self {
        Self(entries)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn entries(&self) -> &[PrefixMessage] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<&PrefixMessage> {
        self.0.get(index)
    }

    /// Appends a blank, active user entry and returns its id.
    pub fn add_blank(&mut self) -> PrefixId {
        let entry = PrefixMessage::blank();
        let id = entry.id;
        self.0.push(entry);
        id
    }

    pub fn push(&mut self, entry: PrefixMessage) {
        self.0.push(entry);
    }

    pub fn remove_at(&mut self, index: usize) -> Result<PrefixMessage, ValidationError> {
        self.check_index(index)?;
        Ok(self.0.remove(index))
    }

    /// Flips `active` on one entry and returns the new value.
    pub fn toggle_at(&mut self, index: usize) -> Result<bool, ValidationError> {
        let entry = self.entry_mut(index)?;
        entry.active = !entry.active;
        Ok(entry.active)
    }

    pub fn set_role_at(&mut self, index: usize, role: Role) -> Result<(), ValidationError> {
        self.entry_mut(index)?.role = role;
        Ok(())
    }

    pub fn set_content_at(
        &mut self,
        index: usize,
        content: impl Into<String>,
    ) -> Result<(), ValidationError> {
        self.entry_mut(index)?.content = content.into();
        Ok(())
    }

    pub fn apply(&mut self, edit: PrefixEdit) -> Result<(), ValidationError> {
        match edit {
            PrefixEdit::Add => {
                self.add_blank();
            }
            PrefixEdit::Remove { index } => {
                self.remove_at(index)?;
            }
            PrefixEdit::Toggle { index } => {
                self.toggle_at(index)?;
            }
            PrefixEdit::SetRole { index, role } => self.set_role_at(index, role)?,
            PrefixEdit::SetContent { index, content } => self.set_content_at(index, content)?,
        }
        Ok(())
    }

    /// Active entries in list order, ready to go in front of a prompt.
    pub fn active_messages(&self) -> Vec<ChatMessage> {
        self.0
            .iter()
            .filter(|entry| entry.active)
            .map(PrefixMessage::to_chat_message)
            .collect()
    }

    fn entry_mut(&mut self, index: usize) -> Result<&mut PrefixMessage, ValidationError> {
        self.check_index(index)?;
        Ok(&mut self.0[index])
    }

    fn check_index(&self, index: usize) -> Result<(), ValidationError> {
        if index >= self.0.len() {
            return Err(ValidationError::PrefixIndex {
                index,
                len: self.0.len(),
            });
        }
        Ok(())
    }
}

impl FromIterator<PrefixMessage> for PrefixList {
    fn from_iter<I: IntoIterator<Item = PrefixMessage>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
