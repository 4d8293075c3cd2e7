use anyhow::Context;
use serde::{Deserialize, Serialize};
use w3g_replays::DecoderOptions;

use crate::texts::Locale;

/// Viewer configuration, loadable from a TOML file.
///
/// All fields default to their standard values. CLI flags override config file values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Output language. Taken from the environment when unset.
    pub locale: Option<Locale>,
    pub decoder: DecoderOptions,
    pub show_players: bool,
    pub show_chat: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            locale: None,
            decoder: DecoderOptions::default(),
            show_players: true,
            show_chat: true,
        }
    }
}

impl ViewerConfig {
    /// Load config from a TOML file.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn resolved_locale(&self) -> Locale {
        self.locale.unwrap_or_else(Locale::from_env)
    }

    /// Generate a commented default TOML config string.
    pub fn generate_default_toml() -> &'static str {
        r#"# w3gview configuration
# Pass with --config <path>.

# Output language: "en" or "zh". Detected from LANG when omitted.
# locale = "en"

# Print one block per player
show_players = true

# Print the chat log
show_chat = true

[decoder]
# Fail on unknown action opcodes instead of skipping them
strict_actions = false

# Block compression wrapper: "raw", "zlib" or "auto"
block_encoding = "auto"
"#
    }
}
