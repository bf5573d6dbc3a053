//! # Configuration Strings
//!
//! Providers and processors are configured with flat `k=v;k2=v2` strings.
//! Getters accept a list of alternative keys (`["retrycount", "rc"]`) and
//! fall back to a default.

use std::collections::HashMap;

/// Parsed `k=v;...` configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigMap {
    entries: HashMap<String, String>,
}

impl ConfigMap {
    /// Parse a configuration string. Empty segments and segments without
    /// `=` are skipped; keys and values are trimmed.
    #[must_use]
    pub fn parse(config: &str) -> Self {
        let entries = config
            .split(';')
            .filter_map(|seg| {
                let (k, v) = seg.split_once('=')?;
                let k = k.trim();
                (!k.is_empty()).then(|| (k.to_string(), v.trim().to_string()))
            })
            .collect();
        Self { entries }
    }

    /// First value found under any of `keys`.
    #[must_use]
    pub fn get(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .find_map(|k| self.entries.get(*k))
            .map(String::as_str)
    }

    /// String value or `default`.
    #[must_use]
    pub fn get_str(&self, keys: &[&str], default: &str) -> String {
        self.get(keys).unwrap_or(default).to_string()
    }

    /// Integer value or `default`; unparsable values read as `default`.
    #[must_use]
    pub fn get_int(&self, keys: &[&str], default: i64) -> i64 {
        self.get(keys)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Boolean value (`true/false/1/0/yes/no`) or `default`.
    #[must_use]
    pub fn get_bool(&self, keys: &[&str], default: bool) -> bool {
        match self.get(keys).map(str::to_ascii_lowercase).as_deref() {
            Some("true" | "1" | "yes") => true,
            Some("false" | "0" | "no") => false,
            _ => default,
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries were parsed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse a `k=v;...` string into a plain map.
#[must_use]
pub fn config_to_dict(config: &str) -> HashMap<String, String> {
    ConfigMap::parse(config).entries
}
