use crate::config::{parse_duration, LogFormat, LogSpanEvents, ReportFormat};
use anyhow::Context;
use bwprobe_core::{defaults, PolicyOverrides};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

const DEFAULT_CONFIG_FILE: &str = "bwprobe.toml";

/// Read the config from `bwprobe.toml` in the current directory.
///
/// Returns the parsed `Some(ConfigFile)` if the config file exists, `None` otherwise.
pub fn read_default_config_file() -> anyhow::Result<Option<ConfigFile>> {
    let path = Path::new(DEFAULT_CONFIG_FILE);
    if path.exists() {
        Ok(Some(read_config_file(path)?))
    } else {
        Ok(None)
    }
}

/// Read the config from the given path.
pub fn read_config_file<P: AsRef<Path>>(path: P) -> anyhow::Result<ConfigFile> {
    let contents = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("config file not found: {}", path.as_ref().display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("invalid config file: {}", path.as_ref().display()))
}

/// The config file.
///
/// Probing settings may be given in the `main`, `server` and `app.<name>`
/// scopes, a setting in a narrower scope overrides the same setting in a
/// broader one.
#[derive(Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigFile {
    pub bwprobe: Option<ConfigBwprobe>,
    pub main: Option<ConfigScope>,
    pub server: Option<ConfigScope>,
    pub app: Option<HashMap<String, ConfigScope>>,
    pub link: Option<ConfigLink>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            bwprobe: Some(ConfigBwprobe::default()),
            main: Some(ConfigScope::default()),
            server: None,
            app: None,
            link: Some(ConfigLink::default()),
        }
    }
}

impl ConfigFile {
    /// The policy settings of every scope merged from broadest to narrowest.
    ///
    /// An `app` with no scope of its own inherits the `server` scope.
    pub fn policy_overrides(&self, app: Option<&str>) -> PolicyOverrides {
        let main = self
            .main
            .as_ref()
            .map(PolicyOverrides::from)
            .unwrap_or_default();
        let server = self
            .server
            .as_ref()
            .map(PolicyOverrides::from)
            .unwrap_or_default();
        let app = app
            .and_then(|name| self.app.as_ref().and_then(|apps| apps.get(name)))
            .map(PolicyOverrides::from)
            .unwrap_or_default();
        app.merge(&server.merge(&main))
    }
}

#[derive(Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigBwprobe {
    pub report_format: Option<ReportFormat>,
    pub log_format: Option<LogFormat>,
    pub log_filter: Option<String>,
    pub log_span_events: Option<LogSpanEvents>,
}

impl Default for ConfigBwprobe {
    fn default() -> Self {
        Self {
            report_format: Some(super::constants::DEFAULT_REPORT_FORMAT),
            log_format: Some(super::constants::DEFAULT_LOG_FORMAT),
            log_filter: Some(String::from(super::constants::DEFAULT_LOG_FILTER)),
            log_span_events: Some(super::constants::DEFAULT_LOG_SPAN_EVENTS),
        }
    }
}

/// Probing settings for a single scope.
///
/// Each duration accepts `off`, a bare number of milliseconds or a
/// `humantime` duration such as `800ms` or `2s`.
#[derive(Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigScope {
    #[serde(default)]
    #[serde(deserialize_with = "duration_deser")]
    pub latency_min: Option<Duration>,
    #[serde(default)]
    #[serde(deserialize_with = "duration_deser")]
    pub latency_max: Option<Duration>,
    #[serde(default)]
    #[serde(deserialize_with = "duration_deser")]
    pub latency_undef: Option<Duration>,
    #[serde(default)]
    #[serde(deserialize_with = "duration_deser")]
    pub test_time: Option<Duration>,
}

impl Default for ConfigScope {
    fn default() -> Self {
        Self {
            latency_min: Some(defaults::DEFAULT_LATENCY_MIN),
            latency_max: Some(defaults::DEFAULT_LATENCY_MAX),
            latency_undef: Some(defaults::DEFAULT_LATENCY_UNDEFINED),
            test_time: Some(defaults::DEFAULT_TEST_DURATION),
        }
    }
}

impl From<&ConfigScope> for PolicyOverrides {
    fn from(scope: &ConfigScope) -> Self {
        Self {
            latency_min: scope.latency_min,
            latency_max: scope.latency_max,
            latency_undefined: scope.latency_undef,
            test_duration: scope.test_time,
        }
    }
}

/// The simulated link.
#[derive(Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigLink {
    #[serde(default)]
    #[serde(deserialize_with = "duration_deser")]
    pub latency: Option<Duration>,
    pub bandwidth: Option<u64>,
    pub relay: Option<bool>,
}

impl Default for ConfigLink {
    fn default() -> Self {
        Self {
            latency: Some(super::constants::DEFAULT_LINK_LATENCY),
            bandwidth: Some(super::constants::DEFAULT_LINK_BANDWIDTH),
            relay: Some(super::constants::DEFAULT_LINK_RELAY),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Millis(u64),
    Text(String),
}

fn duration_deser<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match RawDuration::deserialize(deserializer)? {
        RawDuration::Millis(millis) => Ok(Some(Duration::from_millis(millis))),
        RawDuration::Text(text) => parse_duration(&text)
            .map_err(serde::de::Error::custom)
            .map(Some),
    }
}
