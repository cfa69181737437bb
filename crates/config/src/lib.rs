use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, info, warn};

mod prefix;
mod settings;

pub use prefix::{PrefixEdit, PrefixList};
pub use settings::{
    AssistantSettings, CURRENT_SCHEMA_VERSION, MetaKey, SettingChange, ValidationError,
    parse_max_tokens,
};

const SETTINGS_FILE: &str = "settings.json";
const LEGACY_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("failed to persist settings: {0:#}")]
    Storage(anyhow::Error),
}

pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join(SETTINGS_FILE),
        }
    }

    pub fn from_default_location() -> Result<Self> {
        let mut dir = dirs::config_dir().context("failed to resolve config_dir")?;
        dir.push("ai-assistant");
        Ok(Self::from_dir(dir))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted record merged over defaults. A missing file yields
    /// the defaults without touching disk.
    pub fn load(&self) -> Result<AssistantSettings> {
        if !self.path.exists() {
            return Ok(AssistantSettings::default());
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let mut value: serde_json::Value =
            serde_json::from_str(&raw).context("failed to parse settings json")?;
        if let Some(object) = value.as_object_mut() {
            object
                .entry("schemaVersion")
                .or_insert_with(|| LEGACY_SCHEMA_VERSION.into());
        }
        let mut settings: AssistantSettings =
            serde_json::from_value(value).context("settings json has an unexpected shape")?;
        self.migrate(&mut settings);
        Ok(settings)
    }

    pub fn load_or_init(&self) -> Result<AssistantSettings> {
        let settings = self.load()?;
        self.save(&settings)?;
        Ok(settings)
    }

    pub fn save(&self, settings: &AssistantSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let text =
            serde_json::to_string_pretty(settings).context("failed to serialize settings")?;
        fs::write(&self.path, text)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }

    fn migrate(&self, settings: &mut AssistantSettings) {
        if settings.schema_version >= CURRENT_SCHEMA_VERSION {
            return;
        }

        warn!(
            from = settings.schema_version,
            to = CURRENT_SCHEMA_VERSION,
            "migrating settings schema"
        );

        // v1 records had no prefix ids; deserialization already assigned
        // fresh ones, so the bump makes them stick on the next save.
        if settings.model_name.trim().is_empty() {
            settings.model_name = AssistantSettings::default().model_name;
        }
        if settings.max_tokens == 0 {
            settings.max_tokens = AssistantSettings::default().max_tokens;
        }
        settings.schema_version = CURRENT_SCHEMA_VERSION;
    }
}

/// Live settings shared by every panel and popup. Changes are validated on a
/// copy and persisted before they become visible.
pub struct SettingsManager {
    store: Option<SettingsStore>,
    current: RwLock<AssistantSettings>,
}

impl SettingsManager {
    pub fn open(store: SettingsStore) -> Result<Self> {
        let settings = store.load_or_init()?;
        info!(path = %store.path().display(), "settings loaded");
        Ok(Self {
            store: Some(store),
            current: RwLock::new(settings),
        })
    }

    /// Settings that live only in memory, for hosts that persist elsewhere.
    pub fn detached(settings: AssistantSettings) -> Self {
        Self {
            store: None,
            current: RwLock::new(settings),
        }
    }

    pub fn snapshot(&self) -> AssistantSettings {
        self.current.read().clone()
    }

    pub fn read<R>(&self, f: impl FnOnce(&AssistantSettings) -> R) -> R {
        f(&self.current.read())
    }

    pub fn apply(&self, change: SettingChange) -> Result<(), UpdateError> {
        let mut current = self.current.write();
        let mut next = current.clone();
        next.apply(change)?;
        if let Some(store) = &self.store {
            store.save(&next).map_err(UpdateError::Storage)?;
        }
        *current = next;
        Ok(())
    }
}
