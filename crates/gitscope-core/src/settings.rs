use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{GitScopeError, Result};

const DEFAULT_SETTINGS_FILENAME: &str = "settings.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateFormat {
    #[serde(rename = "Date & Time")]
    DateAndTime,
    #[serde(rename = "Date Only")]
    DateOnly,
    #[serde(rename = "Relative")]
    Relative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphStyle {
    Rounded,
    Angular,
}

/// Client-scoped presentation settings plus the known repository list.
/// Read-only to the core: consumed to seed defaults and answer `loadRepos`,
/// never written back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewSettings {
    pub auto_center_commit_details_view: bool,
    pub date_format: DateFormat,
    pub graph_colours: Vec<String>,
    pub graph_style: GraphStyle,
    pub initial_load_commits: usize,
    pub load_more_commits: usize,
    pub repos: Vec<String>,
    pub show_current_branch_by_default: bool,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            auto_center_commit_details_view: true,
            date_format: DateFormat::DateAndTime,
            graph_colours: [
                "#0085d9", "#d9008f", "#00d90a", "#d98500", "#a300d9", "#ff0000",
            ]
            .into_iter()
            .map(ToString::to_string)
            .collect(),
            graph_style: GraphStyle::Rounded,
            initial_load_commits: 300,
            load_more_commits: 75,
            repos: Vec::new(),
            show_current_branch_by_default: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_location() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("dev", "GitScope", "gitscope")
            .ok_or_else(|| GitScopeError::State("cannot resolve project directories".to_string()))?;
        Ok(project_dirs.config_dir().join(DEFAULT_SETTINGS_FILENAME))
    }

    pub fn default_store() -> Result<Self> {
        Ok(Self {
            path: Self::default_location()?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<ViewSettings> {
        if !self.path.exists() {
            return Ok(ViewSettings::default());
        }
        let text = fs::read_to_string(&self.path)
            .map_err(|source| GitScopeError::io("reading settings file", source))?;
        serde_json::from_str(&text)
            .map_err(|e| GitScopeError::State(format!("invalid settings json: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::{DateFormat, GraphStyle, SettingsStore, ViewSettings};

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = TempDir::new().expect("tempdir");
        let store = SettingsStore::at(tmp.path().join("settings.json"));
        let settings = store.load().expect("load settings");
        assert_eq!(settings, ViewSettings::default());
        assert_eq!(settings.initial_load_commits, 300);
    }

    #[test]
    fn partial_file_fills_unset_fields() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("settings.json");
        fs::write(
            &path,
            r#"{"dateFormat": "Relative", "graphStyle": "angular", "repos": ["/work/repo"]}"#,
        )
        .expect("write settings");

        let settings = SettingsStore::at(path).load().expect("load settings");
        assert_eq!(settings.date_format, DateFormat::Relative);
        assert_eq!(settings.graph_style, GraphStyle::Angular);
        assert_eq!(settings.repos, vec!["/work/repo"]);
        assert_eq!(settings.load_more_commits, 75);
    }

    #[test]
    fn invalid_json_is_a_state_error() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("settings.json");
        fs::write(&path, "{not json").expect("write settings");
        assert!(SettingsStore::at(path).load().is_err());
    }
}
