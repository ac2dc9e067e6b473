use log::Level;
use serde::{Deserialize, Serialize};

fn default_capacity_hint() -> u32 {
    128
}

fn default_log_level() -> String {
    String::from("info")
}

/// Node options, passed by the host as the worklet's `processorOptions`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    /// Largest block the host will ever request, handed to the unit's `init`.
    #[serde(default = "default_capacity_hint")]
    pub capacity_hint: u32,
    /// Console log level (`error`, `warn`, `info`, `debug`, `trace`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            capacity_hint: default_capacity_hint(),
            log_level: default_log_level(),
        }
    }
}

impl NodeConfig {
    /// Parsed log level, `Info` if unrecognised.
    pub fn level(&self) -> Level {
        parse_level(&self.log_level)
    }
}

/// Parses a log level name, falling back to `Info`.
pub fn parse_level(level: &str) -> Level {
    level.parse().unwrap_or(Level::Info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_fields_use_defaults() {
        let config: NodeConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config, NodeConfig::default());
        assert_eq!(config.capacity_hint, 128);
        assert_eq!(config.level(), Level::Info);
    }

    #[test]
    fn reads_processor_options() {
        let config: NodeConfig =
            serde_json::from_value(json!({"capacityHint": 256, "logLevel": "debug"})).unwrap();
        assert_eq!(config.capacity_hint, 256);
        assert_eq!(config.level(), Level::Debug);
    }

    #[test]
    fn unknown_level_falls_back_to_info() {
        let config = NodeConfig {
            log_level: String::from("loud"),
            ..NodeConfig::default()
        };
        assert_eq!(config.level(), Level::Info);
    }

    #[test]
    fn level_names_are_case_insensitive() {
        assert_eq!(parse_level("WARN"), Level::Warn);
        assert_eq!(parse_level("trace"), Level::Trace);
        assert_eq!(parse_level(""), Level::Info);
    }
}
