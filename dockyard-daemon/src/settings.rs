//! Runtime settings document.
//!
//! A small JSON document of operator-tunable values that survive a
//! daemon restart but can be changed at runtime, unlike
//! `dockyard.toml` which is read once at startup. The document lives
//! at the path named by `general.settings_file` and is re-read on
//! every access, so the file is the single source of truth.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use dockyard_core::DockyardError;
use dockyard_core::error::ConfigError;

/// Themes the frontend is allowed to request.
const VALID_THEMES: [&str; 2] = ["light", "dark"];

/// The runtime settings document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsDocument {
    /// Root directory the stack registry operates under.
    pub stack_root: String,
    /// Port the frontend is served on.
    pub frontend_port: u16,
    /// Frontend theme (light, dark).
    pub theme: String,
}

impl Default for SettingsDocument {
    fn default() -> Self {
        Self {
            stack_root: std::env::var("STACK_ROOT")
                .unwrap_or_else(|_| "/mnt/storage/yaml".to_owned()),
            frontend_port: 18675,
            theme: "light".to_owned(),
        }
    }
}

impl SettingsDocument {
    fn validate(&self) -> Result<(), DockyardError> {
        if !VALID_THEMES.contains(&self.theme.as_str()) {
            return Err(DockyardError::Validation(format!(
                "invalid theme {:?}, expected one of: {}",
                self.theme,
                VALID_THEMES.join(", ")
            )));
        }
        if self.stack_root.is_empty() {
            return Err(DockyardError::Validation(
                "stack_root must not be empty".to_owned(),
            ));
        }
        if self.frontend_port == 0 {
            return Err(DockyardError::Validation(
                "frontend_port must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Partial update to the settings document. `None` fields keep their
/// current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsPatch {
    pub stack_root: Option<String>,
    pub frontend_port: Option<u16>,
    pub theme: Option<String>,
}

/// Loads and persists the settings document.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the document. A missing file yields the defaults.
    pub async fn load(&self) -> Result<SettingsDocument, DockyardError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SettingsDocument::default());
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content).map_err(|e| {
            DockyardError::Config(ConfigError::ParseFailed {
                reason: format!("settings file {}: {e}", self.path.display()),
            })
        })
    }

    /// Writes the document, creating parent directories as needed.
    pub async fn save(&self, document: &SettingsDocument) -> Result<(), DockyardError> {
        document.validate()?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(document)
            .map_err(|e| DockyardError::Engine(format!("settings serialization failed: {e}")))?;
        tokio::fs::write(&self.path, content).await?;
        debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }

    /// Applies a partial update, validates, and persists the result.
    pub async fn update(&self, patch: SettingsPatch) -> Result<SettingsDocument, DockyardError> {
        let mut document = self.load().await?;
        if let Some(stack_root) = patch.stack_root {
            document.stack_root = stack_root;
        }
        if let Some(frontend_port) = patch.frontend_port {
            document.frontend_port = frontend_port;
        }
        if let Some(theme) = patch.theme {
            document.theme = theme;
        }
        self.save(&document).await?;
        Ok(document)
    }
}
