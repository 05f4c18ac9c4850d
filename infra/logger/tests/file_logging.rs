use mora_domain::config::LogConfig;
use mora_logger::Logger;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn json_file_logging_writes_structured_lines() -> Result<(), Box<dyn std::error::Error>> {
    let tmp_dir = tempdir()?;
    let log_dir = tmp_dir.path().join("logs");

    let config = LogConfig {
        console: false,
        directory: Some(log_dir.clone()),
        json: true,
        ..LogConfig::default()
    };
    let logger = Logger::from_config("mora-file-logging", &config)?;
    assert!(logger.writes_files());
    assert_eq!(logger.directory(), Some(log_dir.as_path()));

    tracing::info!(module = "custom_image", passes = 2, "Negotiation settled");

    std::thread::sleep(Duration::from_millis(30));
    drop(logger);

    let log_file = fs::read_dir(&log_dir)?
        .flatten()
        .map(|entry| entry.path())
        .find(|path| path.extension().and_then(|ext| ext.to_str()) == Some("log"))
        .expect("log file should be created");

    let contents = fs::read_to_string(&log_file)?;
    let line = contents
        .lines()
        .find(|line| line.contains("Negotiation settled"))
        .expect("event should be written");
    assert!(line.starts_with('{'), "expected a JSON line, got: {line}");
    assert!(line.contains("\"module\":\"custom_image\""), "got: {line}");

    Ok(())
}
