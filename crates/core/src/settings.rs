use serde::{Deserialize, Serialize};

use crate::Result;
use crate::library::ITEMS_KEY;
use crate::store::{self, KeyValueStore};

/// Store key of the settings record
pub const SETTINGS_KEY: &str = "settings";

/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// User preferences, stored as one record and replaced wholesale on save
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Whether saves go through the AI advisor
    pub use_ai_parsing: bool,
    /// Reader theme preference (stored for the UI, unused by the pipeline)
    pub dark_mode: bool,
    /// API key for the advisor endpoint
    pub openai_api_key: String,
    /// Model name sent to the advisor
    pub openai_model: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            use_ai_parsing: false,
            dark_mode: false,
            openai_api_key: String::new(),
            openai_model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl Settings {
    /// AI parsing is switched on and a key is configured
    pub fn ai_enabled(&self) -> bool {
        self.use_ai_parsing && !self.openai_api_key.trim().is_empty()
    }

    /// Configured model, or [`DEFAULT_MODEL`] when blank
    pub fn model(&self) -> &str {
        let model = self.openai_model.trim();
        if model.is_empty() { DEFAULT_MODEL } else { model }
    }

    /// Read settings, falling back to defaults when none are stored
    pub async fn load(store: &dyn KeyValueStore) -> Result<Self> {
        Ok(store::load(store, SETTINGS_KEY).await?.unwrap_or_default())
    }

    /// Replace the stored settings record
    pub async fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        store::save(store, SETTINGS_KEY, self).await
    }
}

/// First-run setup: an empty item list and default settings, leaving existing records alone
pub async fn initialize(store: &dyn KeyValueStore) -> Result<()> {
    if store.get(ITEMS_KEY).await?.is_none() {
        store.set(ITEMS_KEY, serde_json::Value::Array(Vec::new())).await?;
    }
    if store.get(SETTINGS_KEY).await?.is_none() {
        Settings::default().save(store).await?;
    }
    Ok(())
}
