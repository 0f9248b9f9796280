//! Turning a [`LoggingConfig`] into registered loggers.

use std::path::Path;

use logpipe_core::logging::{debug, info, targets};
use logpipe_core::{
    CapabilityCatalog, LogError, LogResult, Logger, LoggerRegistry, ProcessIdentity,
};

use crate::components::BuiltinCatalog;
use crate::error::{ConfigError, ConfigResult};
use crate::model::{LoggerConfig, LoggingConfig};

/// Builds one logger from its config. Handlers are not opened.
pub fn build_logger(
    config: &LoggerConfig,
    catalog: &CapabilityCatalog,
    identity: &ProcessIdentity,
) -> LogResult<Logger> {
    let filter = catalog
        .filters
        .resolve(&config.filter.kind, identity, &config.filter.params)?;
    let formatter =
        catalog
            .formatters
            .resolve(&config.formatter.kind, identity, &config.formatter.params)?;
    let handlers = config
        .handlers
        .iter()
        .map(|handler| catalog.handlers.resolve(&handler.kind, identity, &handler.params))
        .collect::<LogResult<Vec<_>>>()?;
    Logger::builder()
        .filter(filter)
        .formatter(formatter)
        .handlers(handlers)
        .swap_order(config.swap_order)
        .build()
}

/// Builds every logger in `config`, in name order, stopping at the first error.
pub fn build_loggers(
    config: &LoggingConfig,
    catalog: &CapabilityCatalog,
    identity: &ProcessIdentity,
) -> ConfigResult<Vec<(String, Logger)>> {
    config
        .loggers
        .iter()
        .map(|(name, logger)| {
            build_logger(logger, catalog, identity)
                .map(|built| (name.clone(), built))
                .map_err(|source| ConfigError::Logger {
                    name: name.clone(),
                    source,
                })
        })
        .collect()
}

/// Registers the loggers of `config` using the builtin components.
///
/// See [`setup_loggers_with`].
pub fn setup_loggers(registry: &LoggerRegistry, config: &LoggingConfig) -> ConfigResult<Vec<String>> {
    setup_loggers_with(registry, config, &CapabilityCatalog::with_builtins())
}

/// Registers the loggers of `config`, resolving component types in `catalog`.
///
/// Every logger is built before any is registered, so a bad component leaves
/// the registry untouched. Names already present in the registry are
/// rejected up front for the same reason. Returns the registered names.
pub fn setup_loggers_with(
    registry: &LoggerRegistry,
    config: &LoggingConfig,
    catalog: &CapabilityCatalog,
) -> ConfigResult<Vec<String>> {
    let built = build_loggers(config, catalog, registry.identity())?;
    if let Some((name, _)) = built.iter().find(|(name, _)| registry.contains(name)) {
        return Err(ConfigError::Logger {
            name: name.clone(),
            source: LogError::AlreadyRegistered(name.clone()),
        });
    }

    let mut names = Vec::with_capacity(built.len());
    for (name, logger) in built {
        registry
            .insert(&name, logger)
            .map_err(|source| ConfigError::Logger {
                name: name.clone(),
                source,
            })?;
        debug!(target: targets::CONFIG, "Registered logger {}", name);
        names.push(name);
    }
    info!(target: targets::CONFIG, "Configured {} logger(s)", names.len());
    Ok(names)
}

/// Reads `path` and registers its loggers using the builtin components.
pub fn load_config(registry: &LoggerRegistry, path: impl AsRef<Path>) -> ConfigResult<Vec<String>> {
    let path = path.as_ref();
    let config = LoggingConfig::from_path(path)?;
    debug!(target: targets::CONFIG, "Loaded {}", path.display());
    setup_loggers(registry, &config)
}
