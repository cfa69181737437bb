use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum CommandId {
    ChatMode,
    PromptMode,
    ImageGenerator,
    SpeechToText,
}

impl CommandId {
    pub const ALL: [CommandId; 4] = [
        CommandId::ChatMode,
        CommandId::PromptMode,
        CommandId::ImageGenerator,
        CommandId::SpeechToText,
    ];

    pub fn id(self) -> &'static str {
        match self {
            CommandId::ChatMode => "chat-mode",
            CommandId::PromptMode => "prompt-mode",
            CommandId::ImageGenerator => "img-generator",
            CommandId::SpeechToText => "speech-to-text",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CommandId::ChatMode => "Open Assistant Chat",
            CommandId::PromptMode => "Open Assistant Prompt",
            CommandId::ImageGenerator => "Open Image Generator",
            CommandId::SpeechToText => "Open Speech to Text",
        }
    }

    /// Editor commands are only offered while a document is active.
    pub fn requires_editor(self) -> bool {
        matches!(self, CommandId::ImageGenerator | CommandId::SpeechToText)
    }

    pub fn spec(self) -> CommandSpec {
        CommandSpec {
            id: self,
            name: self.name(),
            requires_editor: self.requires_editor(),
        }
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for CommandId {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        CommandId::ALL
            .into_iter()
            .find(|command| command.id() == value.trim())
            .ok_or_else(|| format!("unknown command `{value}`"))
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct CommandSpec {
    pub id: CommandId,
    pub name: &'static str,
    pub requires_editor: bool,
}
