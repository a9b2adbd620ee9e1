//! # Runtime Configuration
//!
//! A [`Configuration`] maps node names to a [`ConfigEntry`]: which adapter a
//! source or target opens, plus the options handed to that adapter.
//!
//! Entries are applied by [`Workflow::prepare`](crate::Workflow::prepare)
//! before a run and released by [`Workflow::reset`](crate::Workflow::reset)
//! after it.
//!
//! ```rust,no_run
//! use gibbon::io::{CsvSource, StdOut};
//! use gibbon::{ConfigEntry, Configuration};
//!
//! let mut config = Configuration::new();
//! config.add_configuration(
//!   "src",
//!   ConfigEntry::new()
//!     .with_source(CsvSource)
//!     .with_option("filename", "people.csv"),
//! );
//! config.entry("tgt").set_target(StdOut);
//! ```

use crate::error::ConfigurationError;
use crate::io::{AdapterOptions, SourceFactory, TargetFactory};
use crate::transformation::Transformation;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Runtime parameters of one node.
#[derive(Clone, Default)]
pub struct ConfigEntry {
  source: Option<Arc<dyn SourceFactory>>,
  target: Option<Arc<dyn TargetFactory>>,
  options: AdapterOptions,
}

impl fmt::Debug for ConfigEntry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ConfigEntry")
      .field("source", &self.source.as_ref().map(|s| s.name()))
      .field("target", &self.target.as_ref().map(|t| t.name()))
      .field("options", &self.options)
      .finish()
  }
}

impl ConfigEntry {
  /// Creates an empty entry.
  pub fn new() -> Self {
    Self::default()
  }

  /// Sets the source adapter.
  #[must_use]
  pub fn with_source(mut self, source: impl SourceFactory + 'static) -> Self {
    self.set_source(source);
    self
  }

  /// Sets the target adapter.
  #[must_use]
  pub fn with_target(mut self, target: impl TargetFactory + 'static) -> Self {
    self.set_target(target);
    self
  }

  /// Sets one adapter option.
  #[must_use]
  pub fn with_option(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
    self.set_option(key, value);
    self
  }

  /// Sets the source adapter in place.
  pub fn set_source(&mut self, source: impl SourceFactory + 'static) -> &mut Self {
    self.source = Some(Arc::new(source));
    self
  }

  /// Sets the target adapter in place.
  pub fn set_target(&mut self, target: impl TargetFactory + 'static) -> &mut Self {
    self.target = Some(Arc::new(target));
    self
  }

  /// Sets one adapter option in place.
  pub fn set_option(&mut self, key: &str, value: impl Into<serde_json::Value>) -> &mut Self {
    self.options.insert(key.to_string(), value.into());
    self
  }

  /// Source adapter, if any.
  pub fn source(&self) -> Option<&Arc<dyn SourceFactory>> {
    self.source.as_ref()
  }

  /// Target adapter, if any.
  pub fn target(&self) -> Option<&Arc<dyn TargetFactory>> {
    self.target.as_ref()
  }

  /// Adapter options.
  pub fn options(&self) -> &AdapterOptions {
    &self.options
  }

  /// Overlays `other` on this entry: adapters it names replace ours, its
  /// options are added to ours, replacing those with the same key.
  pub fn merge(&mut self, other: ConfigEntry) {
    if other.source.is_some() {
      self.source = other.source;
    }
    if other.target.is_some() {
      self.target = other.target;
    }
    self.options.extend(other.options);
  }
}

/// Per-node runtime configuration.
#[derive(Debug, Default)]
pub struct Configuration {
  entries: HashMap<String, ConfigEntry>,
}

impl Configuration {
  /// Creates an empty configuration.
  pub fn new() -> Self {
    Self::default()
  }

  /// Stores `entry` for `name`. An existing entry is superseded: `entry` is
  /// merged over it and a warning is logged. Returns `true` in that case.
  pub fn add_configuration(&mut self, name: &str, entry: ConfigEntry) -> bool {
    match self.entries.get_mut(name) {
      Some(existing) => {
        warn!(node = %name, "configuration superseded");
        existing.merge(entry);
        true
      }
      None => {
        self.entries.insert(name.to_string(), entry);
        false
      }
    }
  }

  /// Entry for `name`, created empty if missing.
  pub fn entry(&mut self, name: &str) -> &mut ConfigEntry {
    self.entries.entry(name.to_string()).or_default()
  }

  /// Entry for `name`.
  pub fn get(&self, name: &str) -> Option<&ConfigEntry> {
    self.entries.get(name)
  }

  /// Whether an entry exists for `name`.
  pub fn contains(&self, name: &str) -> bool {
    self.entries.contains_key(name)
  }

  /// Applies the entry for `node`, or an empty configuration when there is
  /// none. Nodes that take no configuration are fine without an entry.
  pub fn set_configuration(&self, node: &mut Transformation) -> Result<(), ConfigurationError> {
    let entry = self.entries.get(node.name());
    match node.configure(entry) {
      Err(ConfigurationError::NotConfigurable(_)) if entry.is_none() => Ok(()),
      Err(e) => Err(e),
      Ok(()) => {
        debug!(node = %node.name(), "configured");
        Ok(())
      }
    }
  }

  /// Resets `node` and discards its entry.
  pub fn reset_configuration(&mut self, node: &mut Transformation) {
    node.reset();
    self.entries.remove(node.name());
  }
}
