//! # Plugin Request Specs
//!
//! Un `TransformSpec` identifica un plugin richiesto e le sue opzioni.
//!
//! ## Sorgenti delle opzioni:
//! - `--plugin=webp` → plugin senza opzioni
//! - `--plugin.webp.quality=95` → frammento, normalizzato in `webp.quality=95`
//! - JSON: `"webp"` oppure `["webp", {"quality": 95}]`
//!
//! ## Merge:
//! Frammenti con lo stesso nome vengono fusi in un solo spec; l'ordine è quello
//! della prima apparizione di ciascun nome. Gli oggetti annidati si fondono in
//! profondità, per il resto vince l'ultimo valore.

use crate::error::{ImageminError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Option bag carried by a plugin request
pub type PluginOptions = Map<String, Value>;

/// One requested plugin and its configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PluginEntry", into = "PluginEntry")]
pub struct TransformSpec {
    pub name: String,
    pub options: PluginOptions,
}

/// JSON shape of a plugin entry: `"name"` or `["name", {options}]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum PluginEntry {
    Name(String),
    WithOptions(String, PluginOptions),
}

impl From<PluginEntry> for TransformSpec {
    fn from(entry: PluginEntry) -> Self {
        match entry {
            PluginEntry::Name(name) => TransformSpec::new(name),
            PluginEntry::WithOptions(name, options) => TransformSpec { name, options },
        }
    }
}

impl From<TransformSpec> for PluginEntry {
    fn from(spec: TransformSpec) -> Self {
        if spec.options.is_empty() {
            PluginEntry::Name(spec.name)
        } else {
            PluginEntry::WithOptions(spec.name, spec.options)
        }
    }
}

impl TransformSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: PluginOptions::new(),
        }
    }

    pub fn with_option(mut self, key: &str, value: Value) -> Self {
        self.options.insert(key.to_string(), value);
        self
    }

    /// Parse a `--plugin` value: `name`, `name.key=value` or `name.key`
    ///
    /// Keys may be dotted to address nested objects (`webp.resize.width=10`).
    /// Values are read as JSON when they parse as JSON, otherwise as strings.
    /// A key without a value is a boolean switch set to `true`.
    pub fn parse_flag(raw: &str) -> Result<Self> {
        let (path, value) = match raw.split_once('=') {
            Some((path, value)) => (path, Some(value)),
            None => (raw, None),
        };

        let mut segments = path.split('.');
        let name = segments.next().unwrap_or_default().trim();
        if name.is_empty() {
            return Err(ImageminError::Config(format!("Invalid plugin flag `{}`", raw)));
        }

        let keys: Vec<&str> = segments.collect();
        if keys.iter().any(|key| key.is_empty()) {
            return Err(ImageminError::Config(format!("Invalid plugin flag `{}`", raw)));
        }
        if keys.is_empty() {
            if value.is_some() {
                return Err(ImageminError::Config(format!(
                    "Plugin flag `{}` sets a value without an option name",
                    raw
                )));
            }
            return Ok(Self::new(name));
        }

        let leaf = match value {
            Some(text) => serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())),
            None => Value::Bool(true),
        };

        let nested = keys
            .iter()
            .rev()
            .fold(leaf, |inner, key| {
                let mut map = Map::new();
                map.insert(key.to_string(), inner);
                Value::Object(map)
            });

        let options = match nested {
            Value::Object(map) => map,
            _ => PluginOptions::new(),
        };

        Ok(Self {
            name: name.to_string(),
            options,
        })
    }
}

/// Merge fragments by name, keeping first-seen order
pub fn merge_specs(specs: &[TransformSpec]) -> Vec<TransformSpec> {
    let mut merged: Vec<TransformSpec> = Vec::new();

    for spec in specs {
        match merged.iter_mut().find(|existing| existing.name == spec.name) {
            Some(existing) => merge_options(&mut existing.options, &spec.options),
            None => merged.push(spec.clone()),
        }
    }

    merged
}

fn merge_options(target: &mut PluginOptions, incoming: &PluginOptions) {
    for (key, value) in incoming {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(update)) => merge_options(existing, update),
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Typed, validating access to a plugin's options
pub struct OptionReader<'a> {
    plugin: &'a str,
    options: &'a PluginOptions,
}

impl<'a> OptionReader<'a> {
    pub fn new(spec: &'a TransformSpec) -> Self {
        Self {
            plugin: &spec.name,
            options: &spec.options,
        }
    }

    pub fn plugin(&self) -> &str {
        self.plugin
    }

    pub fn bool(&self, key: &str) -> Result<Option<bool>> {
        match self.options.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(flag)) => Ok(Some(*flag)),
            Some(Value::String(text)) if text == "true" || text == "false" => Ok(Some(text == "true")),
            Some(other) => Err(self.type_error(key, "a boolean", other)),
        }
    }

    /// Integer option constrained to `min..=max`
    pub fn integer(&self, key: &str, min: u64, max: u64) -> Result<Option<u64>> {
        let value = match self.options.get(key) {
            None | Some(Value::Null) => return Ok(None),
            Some(value) => value,
        };

        let number = value
            .as_u64()
            .or_else(|| value.as_str().and_then(|text| text.parse().ok()))
            .ok_or_else(|| self.type_error(key, "a whole number", value))?;

        if number < min || number > max {
            return Err(ImageminError::invalid_options(
                self.plugin,
                format!("`{}` must be between {} and {}, got {}", key, min, max, number),
            ));
        }
        Ok(Some(number))
    }

    pub fn float(&self, value: &Value, key: &str) -> Result<f64> {
        value
            .as_f64()
            .ok_or_else(|| self.type_error(key, "a number", value))
    }

    pub fn string(&self, key: &str) -> Result<Option<&'a str>> {
        match self.options.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(text)) => Ok(Some(text.as_str())),
            Some(other) => Err(self.type_error(key, "a string", other)),
        }
    }

    /// String option restricted to a fixed set of choices
    pub fn choice(&self, key: &str, choices: &[&str]) -> Result<Option<&'a str>> {
        match self.string(key)? {
            Some(text) if !choices.contains(&text) => Err(ImageminError::invalid_options(
                self.plugin,
                format!("`{}` must be one of {}, got `{}`", key, choices.join(", "), text),
            )),
            other => Ok(other),
        }
    }

    pub fn raw(&self, key: &str) -> Option<&'a Value> {
        self.options.get(key).filter(|value| !value.is_null())
    }

    fn type_error(&self, key: &str, expected: &str, got: &Value) -> ImageminError {
        ImageminError::invalid_options(self.plugin, format!("`{}` must be {}, got {}", key, expected, got))
    }
}
