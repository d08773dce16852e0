use crate::error::InternalError;
use serde::Deserialize;

///
/// EngineConfig
///
/// Session policy knobs. Loaded from TOML or built in code; unknown keys are
/// rejected so typos surface at startup instead of silently defaulting.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Emit `[debug]` lines for iterator construction and compilation.
    pub debug: bool,

    /// Debug-log any sort/hash materialization larger than this many ids.
    pub materialize_warn_rows: Option<usize>,

    /// Compile node-level unions as `unionall(...).asSet()` instead of plain `unionall`.
    pub distinct_union_as_set: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debug: false,
            materialize_warn_rows: None,
            distinct_union_as_set: true,
        }
    }
}

impl EngineConfig {
    /// Parse a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, InternalError> {
        toml::from_str(text)
            .map_err(|err| InternalError::config_internal(format!("invalid engine config: {err}")))
    }

    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorOrigin;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = EngineConfig::from_toml_str("").expect("empty config should parse");

        assert_eq!(config, EngineConfig::default());
        assert!(config.distinct_union_as_set);
    }

    #[test]
    fn toml_overrides_selected_fields() {
        let config = EngineConfig::from_toml_str(
            "debug = true\nmaterialize_warn_rows = 1000\ndistinct_union_as_set = false\n",
        )
        .expect("config should parse");

        assert!(config.debug);
        assert_eq!(config.materialize_warn_rows, Some(1000));
        assert!(!config.distinct_union_as_set);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = EngineConfig::from_toml_str("verbose = true\n")
            .expect_err("unknown key must be rejected");

        assert_eq!(err.origin, ErrorOrigin::Config);
    }
}
