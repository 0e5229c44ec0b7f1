use sbox::domain::config::LoggingConfig;
use sbox::init_logging;
use sbox_logger::LoggerError;
use serial_test::serial;

#[test]
#[serial]
fn logging_installs_once() {
    let dir = tempfile::tempdir().unwrap();
    let config = LoggingConfig {
        name: "strongbox-test".to_owned(),
        level: "debug".to_owned(),
        console: false,
        path: Some(dir.path().to_path_buf()),
        json: true,
        env_filter: Some("sbox_kernel=trace".to_owned()),
    };

    let logger = init_logging(&config).unwrap();
    assert_eq!(logger.name(), "strongbox-test");

    let again = init_logging(&config).unwrap_err();
    assert!(matches!(again, LoggerError::Subscriber { .. }));
}

#[test]
#[serial]
fn unknown_level_is_rejected_before_installing() {
    let config = LoggingConfig { level: "loud".to_owned(), ..LoggingConfig::default() };

    let err = init_logging(&config).unwrap_err();

    assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
}
