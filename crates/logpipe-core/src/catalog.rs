//! Name to constructor tables for filters, formatters and handlers.
//!
//! Configuration refers to components by type name. A [`CapabilityCatalog`]
//! is built explicitly at startup, filled with constructors and passed by
//! reference to whatever turns configuration into pipelines.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{LogError, LogResult};
use crate::event::ProcessIdentity;
use crate::filter::Filter;
use crate::formatter::Formatter;
use crate::handler::Handler;

/// Untyped constructor parameters, as parsed from a configuration file.
pub type Params = Map<String, Value>;

/// Builds one component from the process identity and its parameters.
pub type Constructor<T> =
    Arc<dyn Fn(&ProcessIdentity, &Params) -> LogResult<Arc<T>> + Send + Sync>;

/// Name to constructor table for one capability kind.
pub struct Catalog<T: ?Sized> {
    kind: &'static str,
    constructors: BTreeMap<String, Constructor<T>>,
}

impl<T: ?Sized> Catalog<T> {
    /// Creates an empty catalog for `kind` (used in error messages).
    #[must_use]
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            constructors: BTreeMap::new(),
        }
    }

    /// Registers a constructor, replacing any previous one under `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(&ProcessIdentity, &Params) -> LogResult<Arc<T>> + Send + Sync + 'static,
    {
        self.constructors.insert(name.into(), Arc::new(constructor));
    }

    /// Builds a fresh instance registered under `name`.
    pub fn resolve(
        &self,
        name: &str,
        identity: &ProcessIdentity,
        params: &Params,
    ) -> LogResult<Arc<T>> {
        let constructor =
            self.constructors
                .get(name)
                .ok_or_else(|| LogError::UnknownCapability {
                    kind: self.kind,
                    name: name.to_string(),
                })?;
        constructor(identity, params)
    }

    /// Returns true when `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    /// Capability kind of this catalog.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

impl<T: ?Sized> fmt::Debug for Catalog<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog")
            .field("kind", &self.kind)
            .field("names", &self.names())
            .finish()
    }
}

/// One catalog per capability kind.
#[derive(Debug)]
pub struct CapabilityCatalog {
    /// Filter constructors.
    pub filters: Catalog<dyn Filter>,
    /// Formatter constructors.
    pub formatters: Catalog<dyn Formatter>,
    /// Handler constructors.
    pub handlers: Catalog<dyn Handler>,
}

impl CapabilityCatalog {
    /// Creates empty catalogs.
    #[must_use]
    pub fn new() -> Self {
        Self {
            filters: Catalog::new("filter"),
            formatters: Catalog::new("formatter"),
            handlers: Catalog::new("handler"),
        }
    }
}

impl Default for CapabilityCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::LevelFilter;
    use crate::level::Level;

    #[test]
    fn resolve_builds_fresh_instances() {
        let mut catalog = CapabilityCatalog::new();
        catalog.filters.register("LogLevelFilter", |_, params| {
            let level = params
                .get("level")
                .and_then(Value::as_str)
                .unwrap_or("INFO")
                .parse::<Level>()
                .map_err(|e| LogError::InvalidParameters {
                    kind: "filter",
                    name: "LogLevelFilter".into(),
                    reason: e.to_string(),
                })?;
            Ok(Arc::new(LevelFilter::with_level(level)) as Arc<dyn Filter>)
        });

        let identity = ProcessIdentity::default();
        let mut params = Params::new();
        params.insert("level".into(), Value::from("debug"));
        let a = catalog.filters.resolve("LogLevelFilter", &identity, &params).unwrap();
        let b = catalog.filters.resolve("LogLevelFilter", &identity, &params).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));

        params.insert("level".into(), Value::from("loud"));
        assert!(matches!(
            catalog.filters.resolve("LogLevelFilter", &identity, &params),
            Err(LogError::InvalidParameters { .. })
        ));
    }

    #[test]
    fn unknown_names_are_reported_with_kind() {
        let catalog = CapabilityCatalog::new();
        let err = catalog
            .handlers
            .resolve("Kafka", &ProcessIdentity::default(), &Params::new())
            .err()
            .unwrap();
        assert_eq!(
            err,
            LogError::UnknownCapability {
                kind: "handler",
                name: "Kafka".into()
            }
        );
        assert!(catalog.handlers.names().is_empty());
        assert_eq!(catalog.formatters.kind(), "formatter");
    }
}
