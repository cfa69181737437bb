use config::MetaKey;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Key {
    Enter,
    Character(String),
}

/// A key release as reported by the host input widget.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct KeyEvent {
    pub key: Key,
    pub alt: bool,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            alt: false,
            ctrl: false,
            meta: false,
            shift: false,
        }
    }

    pub fn enter() -> Self {
        Self::new(Key::Enter)
    }

    pub fn with_modifier(mut self, modifier: MetaKey) -> Self {
        match modifier {
            MetaKey::AltKey => self.alt = true,
            MetaKey::CtrlKey => self.ctrl = true,
            MetaKey::MetaKey => self.meta = true,
            MetaKey::ShiftKey => self.shift = true,
        }
        self
    }

    pub fn modifier_held(&self, modifier: MetaKey) -> bool {
        match modifier {
            MetaKey::AltKey => self.alt,
            MetaKey::CtrlKey => self.ctrl,
            MetaKey::MetaKey => self.meta,
            MetaKey::ShiftKey => self.shift,
        }
    }
}

/// Enter submits when `send_on_enter` is set, otherwise only together with
/// the configured modifier.
pub fn should_submit(event: &KeyEvent, send_on_enter: bool, meta_key: MetaKey) -> bool {
    event.key == Key::Enter && (send_on_enter || event.modifier_held(meta_key))
}
