//! Layered configuration.
//!
//! A run is configured by stacking flat key/value [`Config`] layers, where a
//! later layer overrides an earlier one key by key:
//!
//! 1. Repository defaults ([`Config::defaults`]).
//! 2. User preferences persisted in `~/.haystack/config.yaml`.
//! 3. Snapshots of previous steps (ex. the database and sample configs used by `analyse`).
//! 4. Command-line flags of the current invocation.

pub mod setup;
pub mod user;

use crate::context::Context;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use indoc::formatdoc;
use itertools::Itertools;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::Path;

#[doc(inline)]
pub use user::UserConfig;

/// Repository defaults, shipped with the binary.
pub const DEFAULT_CONFIG: &str = include_str!("../../config/config.yaml");

/// Keys whose values are filesystem paths, handed to the workflow as absolute paths.
pub const PATH_KEYS: &[&str] = &["genome_cache_folder"];

// ----------------------------------------------------------------------------
// Config
// ----------------------------------------------------------------------------

/// A flat configuration layer, mapping keys to YAML values.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Config(BTreeMap<String, Value>);

impl Config {
    /// Returns an empty layer.
    pub fn new() -> Self {
        Config(BTreeMap::new())
    }

    /// Returns the repository defaults.
    pub fn defaults() -> Result<Self, Report> {
        Config::from_yaml(DEFAULT_CONFIG).wrap_err("Failed to parse the repository default config.")
    }

    /// Parse a layer from a YAML document. An empty document is an empty layer.
    pub fn from_yaml(yaml: &str) -> Result<Self, Report> {
        match serde_yaml::from_str::<Value>(yaml)? {
            Value::Null => Ok(Config::new()),
            value => Ok(serde_yaml::from_value(value)?),
        }
    }

    /// Convert a serializable value (ex. command-line arguments) into a layer.
    ///
    /// Keys with a null value (ex. flags that were not given) are left out, so
    /// that they do not override earlier layers.
    pub fn from_serialize<T>(value: &T) -> Result<Self, Report>
    where
        T: Serialize + Debug,
    {
        let value = serde_yaml::to_value(value)
            .wrap_err_with(|| eyre!("Failed to convert to a config layer: {value:?}"))?;
        let mut config: Config = serde_yaml::from_value(value)?;
        config.0.retain(|_, v| !v.is_null());
        Ok(config)
    }

    /// Convert the layer into a typed value.
    pub fn to_typed<T>(&self) -> Result<T, Report>
    where
        T: DeserializeOwned,
    {
        let value = serde_yaml::to_value(self)?;
        Ok(serde_yaml::from_value(value)?)
    }

    /// Read a layer from a YAML file.
    pub fn read<P>(path: P) -> Result<Self, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let yaml = std::fs::read_to_string(&path).wrap_err_with(|| eyre!("Failed to read config: {path:?}"))?;
        Config::from_yaml(&yaml).wrap_err_with(|| eyre!("Failed to parse config: {path:?}"))
    }

    /// Write the layer to a YAML file, creating parent directories as needed.
    pub fn write<P>(&self, path: P) -> Result<(), Report>
    where
        P: AsRef<Path> + Debug,
    {
        crate::utils::create_parent_dir(&path)?;
        let yaml = serde_yaml::to_string(self).wrap_err_with(|| eyre!("Failed to serialize config: {self:?}"))?;
        std::fs::write(&path, yaml).wrap_err_with(|| eyre!("Failed to write config: {path:?}"))?;
        Ok(())
    }

    /// Write the layer to `path` unless the file already exists.
    ///
    /// Returns true if the file was written.
    pub fn write_new<P>(&self, path: P) -> Result<bool, Report>
    where
        P: AsRef<Path> + Debug,
    {
        if path.as_ref().exists() {
            return Ok(false);
        }
        self.write(path)?;
        Ok(true)
    }

    /// Override the keys of this layer with the keys of `other`.
    pub fn update(&mut self, other: &Config) {
        self.0.extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    /// Stack `layers` in order, later layers win.
    pub fn merge(layers: &[&Config]) -> Config {
        let mut config = Config::new();
        layers.iter().for_each(|layer| config.update(layer));
        config
    }

    /// The entries whose `(key, value)` pair is not found in `defaults`.
    pub fn non_default(&self, defaults: &Config) -> Config {
        let entries = self.0.iter().filter(|(k, v)| defaults.0.get(*k) != Some(*v));
        Config(entries.map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    /// Expand the [`PATH_KEYS`] (`~`, relative paths) against the invocation context.
    pub fn resolve_paths(&mut self, context: &Context) {
        for key in PATH_KEYS {
            if let Some(Value::String(path)) = self.0.get_mut(*key) {
                let resolved = context.resolve(path.as_str());
                *path = resolved.to_string_lossy().into_owned();
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Set `key` to a serializable value.
    pub fn insert<V>(&mut self, key: &str, value: V) -> Result<(), Report>
    where
        V: Serialize,
    {
        self.0.insert(key.to_string(), serde_yaml::to_value(value)?);
        Ok(())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

/// Render a config value the way a user would type it, on a single line.
///
/// ```rust
/// use haystack::config::{display_value, Config};
///
/// let config = Config::from_yaml("genera: [Yersinia, Salmonella]").unwrap();
/// assert_eq!(display_value(config.get("genera").unwrap()), "[Yersinia, Salmonella]");
/// ```
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Sequence(items) => format!("[{}]", items.iter().map(display_value).join(", ")),
        Value::Mapping(entries) => {
            let mut entries = entries.iter().map(|(k, v)| format!("{}: {}", display_value(k), display_value(v)));
            format!("{{{}}}", entries.join(", "))
        }
        Value::Tagged(tagged) => display_value(&tagged.value),
        value => serde_yaml::to_string(value).map(|s| s.trim_end().to_string()).unwrap_or_default(),
    }
}

// ----------------------------------------------------------------------------
// Layer Resolution
// ----------------------------------------------------------------------------

/// Read the persisted user preferences, which must exist.
pub fn read_user(context: &Context) -> Result<Config, Report> {
    let path = context.user_config_path();
    if !path.exists() {
        return Err(eyre!("No user config was found at {path:?}")).suggestion(formatdoc!(
            "Please run `haystack config` first in order to set up your email address
             and the desired path for storing the downloaded genomes."
        ));
    }
    Config::read(&path)
}

/// Repository defaults overridden by the user preferences, with absolute paths.
pub fn resolve_user(context: &Context) -> Result<Config, Report> {
    let defaults = Config::defaults()?;
    let user = read_user(context)?;
    let mut config = Config::merge(&[&defaults, &user]);
    config.resolve_paths(context);
    Ok(config)
}
