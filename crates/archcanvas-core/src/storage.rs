//! On-disk diagrams and settings.
//!
//! Each diagram is a `<name>.canvas.json` file in the data directory
//! (`$ARCHCANVAS_HOME`, else `~/.archcanvas`). Settings live next to them in
//! `settings.json`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::settings::EngineSettings;
use crate::{Diagram, Error, Result};

const EXTENSION: &str = ".canvas.json";
const HOME_ENV: &str = "ARCHCANVAS_HOME";

/// Resolve the data directory.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".archcanvas")
}

#[derive(Debug, Clone)]
pub struct DiagramDir {
    root: PathBuf,
}

impl DiagramDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn open_default() -> Self {
        Self::new(data_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Names are single path components; anything that could leave the
    /// data directory is refused.
    fn path_for(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(Error::InvalidName(name.to_string()));
        }
        Ok(self.root.join(format!("{}{}", name, EXTENSION)))
    }

    /// List all diagram names (without extension), sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(vec![]);
        }
        let mut names: Vec<String> = fs::read_dir(&self.root)?
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let name = entry.file_name().to_string_lossy().to_string();
                name.strip_suffix(EXTENSION).map(|n| n.to_string())
            })
            .filter(|n| !n.starts_with('.'))
            .collect();
        names.sort();
        Ok(names)
    }

    pub fn read_raw(&self, name: &str) -> Result<String> {
        let path = self.path_for(name)?;
        if !path.exists() {
            return Err(Error::DiagramNotFound(name.to_string()));
        }
        Ok(fs::read_to_string(&path)?)
    }

    pub fn read(&self, name: &str) -> Result<Diagram> {
        let raw = self.read_raw(name)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write through a temp file and rename, so watchers never observe a
    /// half-written diagram.
    pub fn write_raw(&self, name: &str, data: &str) -> Result<()> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.root)?;
        let tmp = self.root.join(format!(".{}{}.tmp", name, EXTENSION));
        fs::write(&tmp, data)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn write(&self, name: &str, diagram: &Diagram) -> Result<()> {
        let json = serde_json::to_string_pretty(diagram)?;
        self.write_raw(name, &json)
    }

    /// Delete a diagram by name. Missing diagrams are not an error.
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_for(name)?;
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    fn settings_path(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    /// Missing or unreadable settings fall back to defaults.
    pub fn read_settings(&self) -> EngineSettings {
        let path = self.settings_path();
        if !path.exists() {
            return EngineSettings::default();
        }
        match fs::read_to_string(&path)
            .map_err(Error::from)
            .and_then(|s| serde_json::from_str(&s).map_err(Error::from))
        {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable settings");
                EngineSettings::default()
            }
        }
    }

    pub fn write_settings(&self, settings: &EngineSettings) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        let json = serde_json::to_string_pretty(settings)?;
        fs::write(self.settings_path(), json)?;
        Ok(())
    }
}
