//! Configuration file loading with environment variable overrides.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::params::{validate_max_count, validate_quality, validate_size};
use crate::prompt::PromptConfig;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// API key configuration.
    #[serde(default)]
    pub keys: KeysConfig,

    /// Provider and pipeline settings, pinned per deployment.
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Style preset texts that override or extend the built-in ones.
    #[serde(default)]
    pub presets: BTreeMap<String, String>,
}

/// API key configuration.
#[derive(Debug, Default, Deserialize)]
pub struct KeysConfig {
    /// `OpenAI` API key.
    pub openai: Option<String>,
}

/// Provider and pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Image model identifier.
    pub model: String,
    /// Vision model used to describe source images.
    pub describe_model: String,
    /// Provider API base URL.
    pub api_base: String,
    /// Fixed output size.
    pub size: String,
    /// Fixed quality tier.
    pub quality: String,
    /// Maximum images per synthesis request.
    pub synthesis_max_count: u32,
    /// Maximum images per edit request.
    pub edit_max_count: u32,
    /// Whether the negative-constraints block is appended.
    pub negative_block: bool,
    /// Keep the built-in presets and aliases; when false, `[presets]`
    /// replaces them outright.
    pub builtin_presets: bool,
    /// Maximum characters kept from an unstructured error body.
    pub excerpt_limit: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            model: "gpt-image-1".to_string(),
            describe_model: "gpt-4o-mini".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            size: "1024x1024".to_string(),
            quality: "high".to_string(),
            synthesis_max_count: 8,
            edit_max_count: 5,
            negative_block: true,
            builtin_presets: true,
            excerpt_limit: 300,
        }
    }
}

impl PipelineSettings {
    /// Validate the pinned provider parameters.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid setting.
    pub fn validate(&self) -> Result<(), String> {
        validate_size(&self.size)?;
        validate_quality(&self.quality)?;
        validate_max_count("synthesis_max_count", self.synthesis_max_count)?;
        validate_max_count("edit_max_count", self.edit_max_count)?;
        if self.excerpt_limit == 0 {
            return Err("excerpt_limit must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from the given path, or return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed or holds
    /// invalid pipeline settings.
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))?;
        config.pipeline.validate().map_err(|e| format!("Invalid config {}: {e}", path.display()))?;
        Ok(config)
    }

    /// Get the `OpenAI` API key, preferring environment variable.
    ///
    /// Stray `export ` or `OPENAI_API_KEY=` prefixes are removed.
    #[must_use]
    pub fn openai_key(&self) -> Option<String> {
        std::env::var("OPENAI_API_KEY")
            .ok()
            .or_else(|| self.keys.openai.clone())
            .map(|raw| cleanse_key(&raw))
            .filter(|key| !key.is_empty())
    }

    /// Prompt tables with configured preset overrides applied.
    #[must_use]
    pub fn prompt_config(&self) -> PromptConfig {
        let presets = self.presets.iter().map(|(k, v)| (k.as_str(), v.as_str()));
        let prompts = if self.pipeline.builtin_presets {
            PromptConfig::default().extend_presets(presets)
        } else {
            PromptConfig::with_presets(presets)
        };
        prompts.negative_block(self.pipeline.negative_block)
    }
}

/// Strip prefixes commonly pasted along with a key.
fn cleanse_key(raw: &str) -> String {
    let mut key = raw.trim();
    key = strip_prefix_ignore_case(key, "export").map_or(key, str::trim_start);
    if let Some(rest) = strip_prefix_ignore_case(key, "OPENAI_API_KEY") {
        if let Some(value) = rest.trim_start().strip_prefix('=') {
            key = value;
        }
    }
    key.trim().to_string()
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    let rest = &s[prefix.len()..];
    // "export" must be followed by whitespace to count as the shell keyword
    if prefix == "export" && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest)
}

/// Discover the config file path using the resolution order:
/// 1. Explicit path (from `--config` flag)
/// 2. `STYLEGEN_CONFIG` environment variable
/// 3. `~/.config/stylegen/config.toml`
#[must_use]
pub fn discover_config_path(explicit: Option<&str>) -> PathBuf {
    if let Some(p) = explicit {
        return PathBuf::from(p);
    }

    if let Ok(p) = std::env::var("STYLEGEN_CONFIG") {
        return PathBuf::from(p);
    }

    default_config_path()
}

/// Default config path: `~/.config/stylegen/config.toml`.
fn default_config_path() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".config/stylegen/config.toml")
    } else {
        PathBuf::from("stylegen.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.keys.openai.is_none());
        assert!(config.presets.is_empty());
        assert_eq!(config.pipeline.model, "gpt-image-1");
        assert_eq!(config.pipeline.size, "1024x1024");
        assert_eq!(config.pipeline.quality, "high");
        assert_eq!(config.pipeline.synthesis_max_count, 8);
        assert_eq!(config.pipeline.edit_max_count, 5);
        assert!(config.pipeline.negative_block);
        assert_eq!(config.pipeline.excerpt_limit, 300);
    }

    #[test]
    fn load_nonexistent_returns_defaults() {
        let config = Config::load(Path::new("/nonexistent/path/config.toml")).unwrap();
        assert_eq!(config.pipeline.model, "gpt-image-1");
    }

    #[test]
    fn load_valid_toml() {
        let dir = std::env::temp_dir().join("stylegen_config_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            r#"
[keys]
openai = "sk-test-openai-key"

[pipeline]
quality = "medium"
edit_max_count = 3
negative_block = false

[presets]
noir = "Black and white film noir."
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.keys.openai.as_deref(), Some("sk-test-openai-key"));
        assert_eq!(config.pipeline.quality, "medium");
        assert_eq!(config.pipeline.edit_max_count, 3);
        assert_eq!(config.pipeline.synthesis_max_count, 8);
        assert!(!config.pipeline.negative_block);

        let prompts = config.prompt_config();
        assert_eq!(prompts.resolve_preset("noir"), Some("Black and white film noir."));
        assert!(prompts.resolve_preset("chibi").is_some());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn presets_can_replace_builtins() {
        let config: Config = toml::from_str(
            "[pipeline]\nbuiltin_presets = false\n\n[presets]\nnoir = \"Film noir.\"\n",
        )
        .unwrap();
        let prompts = config.prompt_config();
        assert_eq!(prompts.resolve_preset("noir"), Some("Film noir."));
        assert_eq!(prompts.resolve_preset("chibi"), None);
        assert_eq!(prompts.resolve_preset("1"), None);
    }

    #[test]
    fn load_invalid_toml() {
        let dir = std::env::temp_dir().join("stylegen_config_bad_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").unwrap();

        assert!(Config::load(&path).is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_rejects_invalid_settings() {
        let dir = std::env::temp_dir().join("stylegen_config_invalid_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[pipeline]\nsize = \"512x512\"\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(err.contains("Unsupported size"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn cleanse_strips_pasted_prefixes() {
        assert_eq!(cleanse_key("sk-abc"), "sk-abc");
        assert_eq!(cleanse_key("  sk-abc \n"), "sk-abc");
        assert_eq!(cleanse_key("export OPENAI_API_KEY=sk-abc"), "sk-abc");
        assert_eq!(cleanse_key("OPENAI_API_KEY = sk-abc"), "sk-abc");
        assert_eq!(cleanse_key("Export  openai_api_key=sk-abc"), "sk-abc");
        assert_eq!(cleanse_key("exported-key"), "exported-key");
    }

    #[test]
    fn discover_explicit_path() {
        let path = discover_config_path(Some("/tmp/my-config.toml"));
        assert_eq!(path, PathBuf::from("/tmp/my-config.toml"));
    }
}
