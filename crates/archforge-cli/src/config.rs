use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use archforge_core::{ModelSettings, ProviderSettings};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchforgeConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub gemini: Option<GeminiConfig>,
    #[serde(default)]
    pub groq: Option<GroqConfig>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .field("model", &self.model)
            .finish()
    }
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GroqConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_groq_model")]
    pub model: String,
}

impl std::fmt::Debug for GroqConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .field("model", &self.model)
            .finish()
    }
}

fn default_groq_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptsConfig {
    /// Directory of `<key>.txt` template overrides.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn mask_secret(secret: &str) -> String {
    if secret.len() > 7 {
        format!("{}...{}", &secret[..3], &secret[secret.len() - 4..])
    } else {
        "***".to_string()
    }
}

/// Default config directory: `~/.archforge`
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".archforge")
}

/// Load the config file, falling back to environment variables for keys
/// that are not set in the file.
pub fn load(path: Option<&PathBuf>) -> Result<ArchforgeConfig> {
    let path = path
        .cloned()
        .unwrap_or_else(|| config_dir().join("config.toml"));

    let mut config: ArchforgeConfig = if path.exists() {
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?
    } else {
        warn!("no config file at {}, using environment only", path.display());
        ArchforgeConfig::default()
    };

    apply_env_fallbacks(&mut config);
    Ok(config)
}

fn apply_env_fallbacks(config: &mut ArchforgeConfig) {
    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        let entry = config.providers.gemini.get_or_insert_with(|| GeminiConfig {
            api_key: String::new(),
            model: default_gemini_model(),
        });
        if entry.api_key.is_empty() {
            entry.api_key = key;
        }
    }
    if let Ok(key) = std::env::var("GROQ_API_KEY") {
        let entry = config.providers.groq.get_or_insert_with(|| GroqConfig {
            api_key: String::new(),
            model: default_groq_model(),
        });
        if entry.api_key.is_empty() {
            entry.api_key = key;
        }
    }
}

impl ArchforgeConfig {
    /// Map to the core's dependency-injected provider settings, dropping
    /// entries without a usable key.
    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            gemini: self
                .providers
                .gemini
                .as_ref()
                .filter(|c| !c.api_key.is_empty())
                .map(|c| ModelSettings {
                    api_key: c.api_key.clone(),
                    model: c.model.clone(),
                }),
            groq: self
                .providers
                .groq
                .as_ref()
                .filter(|c| !c.api_key.is_empty())
                .map(|c| ModelSettings {
                    api_key: c.api_key.clone(),
                    model: c.model.clone(),
                }),
        }
    }
}

/// Load `<key>.txt` template overrides from `dir` into `store`.
pub fn load_prompt_overrides(
    store: &mut archforge_core::TemplateStore,
    dir: &Path,
) -> Result<usize> {
    let mut loaded = 0;
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read prompt dir: {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("txt") {
            continue;
        }
        let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let template = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read template: {}", path.display()))?;
        store.insert(key, template);
        loaded += 1;
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let raw = r#"
            [providers.gemini]
            api_key = "gm-key"

            [providers.groq]
            api_key = "gq-key"
            model = "llama-3.3-70b-versatile"
        "#;
        let config: ArchforgeConfig = toml::from_str(raw).unwrap();
        let settings = config.provider_settings();
        assert_eq!(settings.gemini.unwrap().model, "gemini-2.5-flash");
        assert_eq!(settings.groq.unwrap().model, "llama-3.3-70b-versatile");
    }

    #[test]
    fn test_empty_key_drops_provider() {
        let raw = r#"
            [providers.gemini]
            api_key = ""
        "#;
        let config: ArchforgeConfig = toml::from_str(raw).unwrap();
        assert!(config.provider_settings().gemini.is_none());
    }

    #[test]
    fn test_debug_masks_keys() {
        let config = GeminiConfig {
            api_key: "gm-very-secret-key".to_string(),
            model: default_gemini_model(),
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains("gm-"));
    }

    #[test]
    fn test_prompt_overrides_loaded_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("chat.txt"), "custom: {input}").unwrap();
        std::fs::write(dir.path().join("notes.md"), "ignored").unwrap();

        let mut store = archforge_core::TemplateStore::builtin();
        let loaded = load_prompt_overrides(&mut store, dir.path()).unwrap();
        assert_eq!(loaded, 1);
        assert_eq!(store.render("chat", "hi").unwrap(), "custom: hi");
    }
}
