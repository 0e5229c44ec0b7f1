use sbox_logger::Logger;
use serial_test::serial;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

#[test]
#[serial]
fn file_logging_creates_log_file() -> Result<(), Box<dyn std::error::Error>> {
    let tmp_dir = tempdir()?;
    let log_dir = tmp_dir.path().join("logs");

    let logger = Logger::builder()
        .name("sbox-file-logging")
        .console(false)
        .path(&log_dir)
        .json(true)
        .level_str("info")?
        .init()?;
    assert!(logger.has_file_output());

    tracing::info!(account_id = "acct-1", "account unlocked");

    std::thread::sleep(Duration::from_millis(30));
    drop(logger);

    let log_file = fs::read_dir(&log_dir)?
        .flatten()
        .map(|entry| entry.path())
        .find(|path| path.extension().and_then(|ext| ext.to_str()) == Some("log"))
        .expect("log file should be created");

    let content = fs::read_to_string(&log_file)?;
    assert!(content.contains("account unlocked"));
    assert!(content.contains("acct-1"));

    Ok(())
}
