use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub paths: Option<PathsConfig>,
    pub extraction: Option<ExtractionConfig>,
    pub llm: Option<LlmConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    pub rulebook_path: Option<String>,
    pub output_directory: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Maximum matched pages per parameter (the matcher's top-K bound).
    pub max_pages_per_parameter: Option<usize>,
    pub max_tokens_per_page: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    pub model_name: Option<String>,
    pub retry_attempts: Option<u32>,
    pub timeout_secs: Option<u64>,
}

/// Platform config directory path: `<config_dir>/tendersift/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tendersift").join("config.toml"))
}

/// Load config by cascading CWD `.tendersift.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(&PathBuf::from(".tendersift.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &PathBuf) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        paths: Some(PathsConfig {
            rulebook_path: overlay
                .paths
                .as_ref()
                .and_then(|p| p.rulebook_path.clone())
                .or_else(|| base.paths.as_ref().and_then(|p| p.rulebook_path.clone())),
            output_directory: overlay
                .paths
                .as_ref()
                .and_then(|p| p.output_directory.clone())
                .or_else(|| base.paths.as_ref().and_then(|p| p.output_directory.clone())),
        }),
        extraction: Some(ExtractionConfig {
            max_pages_per_parameter: overlay
                .extraction
                .as_ref()
                .and_then(|e| e.max_pages_per_parameter)
                .or_else(|| {
                    base.extraction
                        .as_ref()
                        .and_then(|e| e.max_pages_per_parameter)
                }),
            max_tokens_per_page: overlay
                .extraction
                .as_ref()
                .and_then(|e| e.max_tokens_per_page)
                .or_else(|| base.extraction.as_ref().and_then(|e| e.max_tokens_per_page)),
        }),
        llm: Some(LlmConfig {
            model_name: overlay
                .llm
                .as_ref()
                .and_then(|l| l.model_name.clone())
                .or_else(|| base.llm.as_ref().and_then(|l| l.model_name.clone())),
            retry_attempts: overlay
                .llm
                .as_ref()
                .and_then(|l| l.retry_attempts)
                .or_else(|| base.llm.as_ref().and_then(|l| l.retry_attempts)),
            timeout_secs: overlay
                .llm
                .as_ref()
                .and_then(|l| l.timeout_secs)
                .or_else(|| base.llm.as_ref().and_then(|l| l.timeout_secs)),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_toml() {
        let config = ConfigFile {
            paths: Some(PathsConfig {
                rulebook_path: Some("config/keywords.json".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: ConfigFile = toml::from_str(&toml_str).unwrap();
        assert_eq!(
            parsed.paths.unwrap().rulebook_path.unwrap(),
            "config/keywords.json"
        );
    }

    #[test]
    fn absent_field_deserializes_as_none() {
        let toml_str = "[llm]\nmodel_name = \"gemini-2.0-flash\"\n";
        let parsed: ConfigFile = toml::from_str(toml_str).unwrap();
        assert!(parsed.llm.as_ref().unwrap().retry_attempts.is_none());
        assert_eq!(
            parsed.llm.unwrap().model_name.unwrap(),
            "gemini-2.0-flash"
        );
    }

    #[test]
    fn merge_overlay_wins() {
        let base = ConfigFile {
            extraction: Some(ExtractionConfig {
                max_pages_per_parameter: Some(3),
                max_tokens_per_page: Some(4000),
            }),
            ..Default::default()
        };
        let overlay = ConfigFile {
            extraction: Some(ExtractionConfig {
                max_pages_per_parameter: Some(5),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = merge(base, overlay);
        let extraction = merged.extraction.unwrap();
        assert_eq!(extraction.max_pages_per_parameter, Some(5));
        assert_eq!(extraction.max_tokens_per_page, Some(4000));
    }

    #[test]
    fn merge_base_preserved_when_overlay_absent() {
        let base = ConfigFile {
            llm: Some(LlmConfig {
                model_name: Some("gemini-2.0-flash".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = merge(base, ConfigFile::default());
        assert_eq!(
            merged.llm.unwrap().model_name.unwrap(),
            "gemini-2.0-flash"
        );
    }
}
