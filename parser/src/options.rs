use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// How each compressed block's payload is wrapped.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockEncoding {
    /// Bare DEFLATE stream.
    Raw,
    /// DEFLATE inside a zlib header/trailer.
    Zlib,
    /// Zlib when the block starts with a valid zlib header, raw otherwise.
    #[default]
    Auto,
}

/// Knobs for a single decode. Loadable from a config file table; every
/// field falls back to its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[builder(default)]
#[serde(default)]
pub struct DecoderOptions {
    /// Reject unknown action opcodes instead of treating them as zero-length.
    pub strict_actions: bool,
    pub block_encoding: BlockEncoding,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            strict_actions: false,
            block_encoding: BlockEncoding::Auto,
        }
    }
}

impl DecoderOptions {
    pub fn strict() -> Self {
        Self {
            strict_actions: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_fills_defaults() {
        let options = DecoderOptionsBuilder::default()
            .strict_actions(true)
            .build()
            .unwrap();
        assert!(options.strict_actions);
        assert_eq!(options.block_encoding, BlockEncoding::Auto);
    }

    #[test]
    fn deserializes_partial_table() {
        let options: DecoderOptions =
            serde_json::from_str(r#"{ "block_encoding": "zlib" }"#).unwrap();
        assert_eq!(options.block_encoding, BlockEncoding::Zlib);
        assert!(!options.strict_actions);
    }
}
