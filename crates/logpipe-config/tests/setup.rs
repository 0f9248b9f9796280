//! Loading config files into a registry.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use logpipe_config::{
    BuiltinCatalog, ComponentConfig, ConfigError, LoggerConfig, LoggingConfig, load_config,
    setup_loggers, setup_loggers_with,
};
use logpipe_core::testing::RecordingHandler;
use logpipe_core::{
    CapabilityCatalog, Handler, LevelFilter, LogError, Logger, LoggerRegistry, ProcessIdentity,
    StandardFormatter,
};

fn registry() -> LoggerRegistry {
    let default = Logger::builder()
        .filter(Arc::new(LevelFilter::new()))
        .formatter(Arc::new(StandardFormatter::new()))
        .handler(Arc::new(RecordingHandler::new()))
        .build()
        .unwrap();
    LoggerRegistry::new(ProcessIdentity::new(99, "cfghost", "cfgtest"), default)
}

fn file_logger_toml(dir: &Path) -> String {
    format!(
        r#"
[loggers.app.filter]
type = "LogLevelFilter"
level = "notice"

[loggers.app.formatter]
type = "StandardFormatter"
layout = "%(loggerName) %(logLevel) %(message)"
append_newline = true

[[loggers.app.handlers]]
type = "RotationFileHandler"
dir_path = "{}"
file_name = "app.log"
"#,
        dir.display()
    )
}

#[test]
fn toml_file_drives_a_working_pipeline() {
    let logs = tempfile::tempdir().unwrap();
    let config_dir = tempfile::tempdir().unwrap();
    let path = config_dir.path().join("logging.toml");
    fs::write(&path, file_logger_toml(logs.path())).unwrap();

    let registry = registry();
    let names = load_config(&registry, &path).unwrap();
    assert_eq!(names, vec!["app".to_string()]);
    assert!(registry.contains("app"));

    let group = registry.get_logger("app");
    group.error("disk full");
    group.info("dropped by threshold");
    group.notice("recovered");
    group.flush();

    let written = fs::read_to_string(logs.path().join("app.log")).unwrap();
    assert_eq!(written, "app ERROR disk full\napp NOTICE recovered\n");
}

#[test]
fn yaml_and_json_files_load_too() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = dir.path().join("logging.yml");
    fs::write(
        &yaml,
        "loggers:\n  a:\n    filter: {type: LogLevelFilter}\n    formatter: {type: JsonFormatter}\n    handlers:\n      - type: ConsoleHandler\n",
    )
    .unwrap();
    let json = dir.path().join("logging.jsn");
    fs::write(
        &json,
        r#"{"loggers": {"b": {"filter": {"type": "LogLevelFilter"}, "formatter": {"type": "StandardFormatter"}, "handlers": [{"type": "ConsoleHandler", "target": "stderr"}]}}}"#,
    )
    .unwrap();

    let registry = registry();
    load_config(&registry, &yaml).unwrap();
    load_config(&registry, &json).unwrap();
    assert_eq!(registry.names(), vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn unsupported_extension_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logging.ini");
    fs::write(&path, "").unwrap();

    let err = load_config(&registry(), &path).unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedExtension(ext) if ext == ".ini"));
}

#[test]
fn missing_file_reports_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_config(&registry(), dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn one_bad_logger_registers_nothing() {
    let mut config = LoggingConfig::default();
    let good = LoggerConfig {
        filter: ComponentConfig::new("LogLevelFilter"),
        formatter: ComponentConfig::new("StandardFormatter"),
        handlers: vec![ComponentConfig::new("ConsoleHandler")],
        swap_order: Default::default(),
    };
    let mut bad = good.clone();
    bad.handlers = vec![ComponentConfig::new("CarrierPigeonHandler")];
    config.loggers.insert("good".into(), good);
    config.loggers.insert("zbad".into(), bad);

    let registry = registry();
    let err = setup_loggers(&registry, &config).unwrap_err();
    match err {
        ConfigError::Logger { name, source } => {
            assert_eq!(name, "zbad");
            assert_eq!(
                source,
                LogError::UnknownCapability {
                    kind: "handler",
                    name: "CarrierPigeonHandler".into()
                }
            );
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(registry.names().is_empty());
}

#[test]
fn empty_handler_list_is_rejected() {
    let mut config = LoggingConfig::default();
    config.loggers.insert(
        "mute".into(),
        LoggerConfig {
            filter: ComponentConfig::new("LogLevelFilter"),
            formatter: ComponentConfig::new("JsonFormatter"),
            handlers: Vec::new(),
            swap_order: Default::default(),
        },
    );
    let err = setup_loggers(&registry(), &config).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Logger { source: LogError::EmptyHandlers, .. }
    ));
}

#[test]
fn existing_name_is_rejected_before_registering() {
    let registry = registry();
    let mut config = LoggingConfig::default();
    let logger = LoggerConfig {
        filter: ComponentConfig::new("LogLevelFilter"),
        formatter: ComponentConfig::new("StandardFormatter"),
        handlers: vec![ComponentConfig::new("ConsoleHandler")],
        swap_order: Default::default(),
    };
    config.loggers.insert("a".into(), logger.clone());
    setup_loggers(&registry, &config).unwrap();

    config.loggers.insert("b".into(), logger);
    let err = setup_loggers(&registry, &config).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Logger { ref name, source: LogError::AlreadyRegistered(_) } if name == "a"
    ));
    assert!(!registry.contains("b"));
}

#[test]
fn custom_catalog_entries_are_resolved() {
    let recorder = Arc::new(RecordingHandler::new());
    let mut catalog = CapabilityCatalog::with_builtins();
    let shared = Arc::clone(&recorder);
    catalog
        .handlers
        .register("Recorder", move |_, _| Ok(Arc::clone(&shared) as Arc<dyn Handler>));

    let mut config = LoggingConfig::default();
    config.loggers.insert(
        "custom".into(),
        LoggerConfig {
            filter: ComponentConfig::new("LogLevelFilter").with_param("level", "debug"),
            formatter: ComponentConfig::new("StandardFormatter")
                .with_param("layout", "%(message)"),
            handlers: vec![ComponentConfig::new("Recorder")],
            swap_order: Default::default(),
        },
    );

    let registry = registry();
    setup_loggers_with(&registry, &config, &catalog).unwrap();
    assert_eq!(recorder.open_count(), 1);

    registry.get_logger("custom").debug("visible");
    assert_eq!(recorder.lines(), vec!["visible".to_string()]);
}
