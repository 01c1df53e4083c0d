use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::models::SheetLayout;

pub const ENV_DEFAULT_DIVISION: &str = "CONSOLIDATOR_DEFAULT_DIVISION";
pub const ENV_DEFAULT_IA: &str = "CONSOLIDATOR_DEFAULT_IA";
pub const ENV_OUTPUT_DIR: &str = "CONSOLIDATOR_OUTPUT_DIR";
pub const ENV_LAYOUT: &str = "CONSOLIDATOR_LAYOUT";

/// Runtime settings read from the environment (and `.env`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub default_division: String,
    pub default_ia: String,
    pub output_dir: Option<PathBuf>,
    pub layout_path: Option<PathBuf>,
}

impl Settings {
    /// Load `.env` (explicit path first, else the working directory) and read settings.
    /// A missing `.env` is not an error.
    pub fn load(env_file: Option<&Path>) -> Self {
        match env_file {
            Some(path) if path.exists() => {
                let _ = dotenvy::from_path(path);
            }
            _ => {
                let _ = dotenvy::dotenv();
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Self {
            default_division: non_empty(ENV_DEFAULT_DIVISION).unwrap_or_default(),
            default_ia: non_empty(ENV_DEFAULT_IA).unwrap_or_default(),
            output_dir: non_empty(ENV_OUTPUT_DIR).map(PathBuf::from),
            layout_path: non_empty(ENV_LAYOUT).map(PathBuf::from),
        }
    }

    /// The configured layout file, else the built-in layout.
    pub fn layout(&self) -> Result<SheetLayout, ConfigError> {
        match &self.layout_path {
            Some(path) => SheetLayout::from_json_file(path),
            None => Ok(SheetLayout::default()),
        }
    }

    /// Configured output directory, else Downloads, else Desktop, else the working directory.
    pub fn resolve_output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .or_else(dirs::download_dir)
            .or_else(dirs::desktop_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn reads_and_trims_values() {
        let settings = Settings::from_lookup(lookup(&[
            (ENV_DEFAULT_DIVISION, " 4 "),
            (ENV_DEFAULT_IA, "San Isidro IA"),
            (ENV_OUTPUT_DIR, "/tmp/out"),
            (ENV_LAYOUT, "   "),
        ]));
        assert_eq!(settings.default_division, "4");
        assert_eq!(settings.default_ia, "San Isidro IA");
        assert_eq!(settings.output_dir, Some(PathBuf::from("/tmp/out")));
        assert_eq!(settings.layout_path, None);
        assert_eq!(settings.resolve_output_dir(), PathBuf::from("/tmp/out"));
    }

    #[test]
    fn missing_layout_path_uses_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.layout().unwrap(), SheetLayout::default());
    }

    #[test]
    fn loads_layout_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.json");
        std::fs::write(&path, r#"{ "account": { "anchor": "lot details" } }"#).unwrap();
        let settings = Settings {
            layout_path: Some(path),
            ..Settings::default()
        };
        let layout = settings.layout().unwrap();
        assert_eq!(layout.account.anchor, "lot details");
        assert_eq!(layout.soa, crate::models::SoaLayout::default());
    }

    #[test]
    fn bad_layout_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.json");
        std::fs::write(&path, "{ not json").unwrap();
        let settings = Settings {
            layout_path: Some(path),
            ..Settings::default()
        };
        assert!(matches!(settings.layout(), Err(ConfigError::LayoutParse { .. })));
        let missing = Settings {
            layout_path: Some(PathBuf::from("/definitely/not/here.json")),
            ..Settings::default()
        };
        assert!(matches!(missing.layout(), Err(ConfigError::LayoutRead { .. })));
    }
}
