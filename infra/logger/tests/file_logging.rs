use evreg_domain::config::LoggingConfig;
use evreg_logger::{LevelFilter, Logger, LoggerError};
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

// Each test binary owns one global subscriber, so the whole lifecycle lives in one test.
#[test]
fn configured_file_logging_writes_json_and_rejects_second_init()
-> Result<(), Box<dyn std::error::Error>> {
    let tmp_dir = tempdir()?;
    let log_dir = tmp_dir.path().join("logs");

    let config = LoggingConfig {
        level: "info".to_owned(),
        directory: Some(log_dir.clone()),
        json: true,
        ..LoggingConfig::default()
    };

    let logger = Logger::from_config("evreg-file-logging", &config)?.console(false).init()?;
    assert!(logger.guard().is_some(), "file output should hold a worker guard");

    tracing::info!(seats = 3, "registration admitted");

    let err = Logger::builder("evreg-second").level(LevelFilter::INFO).init().unwrap_err();
    assert!(matches!(err, LoggerError::Subscriber { .. }));

    std::thread::sleep(Duration::from_millis(30));
    drop(logger);

    let log_file = fs::read_dir(&log_dir)?
        .flatten()
        .map(|entry| entry.path())
        .find(|path| path.extension().and_then(|ext| ext.to_str()) == Some("log"))
        .expect("log file should be created");

    let contents = fs::read_to_string(&log_file)?;
    let line = contents.lines().next().expect("one log line");
    assert!(line.starts_with('{'), "file output should be JSON: {line}");
    assert!(line.contains("registration admitted"));

    Ok(())
}
