use std::fs;

use pretty_assertions::assert_eq;
use tempfile::tempdir;
use twdl_core::{AppConfig, EmptyManifestPolicy, HttpStatus};
use twdl_engine::{
    ensure_output_dir, AtomicFileWriter, ConfigStore, CsvErrorLog, RowStatus, ERROR_LOG_FILENAME,
};

#[test]
fn atomic_writer_replaces_existing_files() {
    let dir = tempdir().unwrap();
    let writer = AtomicFileWriter::new(dir.path());
    writer.write("A1.jpg", b"first").unwrap();
    let path = writer.write("A1.jpg", b"second").unwrap();

    assert_eq!(path, dir.path().join("A1.jpg"));
    assert_eq!(fs::read(&path).unwrap(), b"second");
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn output_dir_is_created() {
    let dir = tempdir().unwrap();
    let nested = dir.path().join("a").join("b");
    ensure_output_dir(&nested).unwrap();
    assert!(nested.is_dir());
}

#[test]
fn error_log_appends_quoted_rows_with_crlf() {
    let dir = tempdir().unwrap();
    let log = CsvErrorLog::in_directory(dir.path());
    log.append("https://t.co/a", "https://x.com/u/status/1", RowStatus::Failed, "said \"no\"")
        .unwrap();
    log.append(
        "https://pbs.twimg.com/media/A.jpg:large",
        "https://pbs.twimg.com/media/A?format=jpg",
        RowStatus::Http(HttpStatus::OutOfBand),
        "connection reset",
    )
    .unwrap();

    assert_eq!(log.path(), dir.path().join(ERROR_LOG_FILENAME));
    assert_eq!(
        fs::read_to_string(log.path()).unwrap(),
        concat!(
            "\"https://t.co/a\",\"https://x.com/u/status/1\",\"-\",\"said \"\"no\"\"\"\r\n",
            "\"https://pbs.twimg.com/media/A.jpg:large\",\"https://pbs.twimg.com/media/A?format=jpg\",\"-\",\"connection reset\"\r\n",
        )
    );
}

#[test]
fn config_store_defaults_when_missing_or_broken() {
    let dir = tempdir().unwrap();
    let store = ConfigStore::new(dir.path().join("twdl.json"));
    let config = store.load();
    assert_eq!(config.timer.timeout, 5000);

    fs::write(store.path(), "{ not json").unwrap();
    assert_eq!(store.load().timer.initial_delay, 100);
}

#[test]
fn config_store_round_trips_and_keeps_unknown_keys() {
    let dir = tempdir().unwrap();
    let store = ConfigStore::new(dir.path().join("twdl.json"));
    fs::write(
        store.path(),
        format!(
            r#"{{"destinationDirectory": {:?}, "timer": {{"timeout": 9000, "emptyManifest": "accept"}}, "theme": "dark"}}"#,
            dir.path().display().to_string()
        ),
    )
    .unwrap();

    let mut config: AppConfig = store.load();
    assert_eq!(config.destination_directory, dir.path());
    assert_eq!(config.timer.timeout, 9000);
    assert_eq!(config.timer.period, 125);
    assert_eq!(config.timer.empty_manifest, EmptyManifestPolicy::Accept);

    config.development_mode = true;
    store.save(&config).unwrap();
    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
    assert_eq!(saved["theme"], "dark");
    assert_eq!(saved["developmentMode"], true);
}

#[test]
fn config_store_falls_back_when_destination_is_not_a_directory() {
    let dir = tempdir().unwrap();
    let store = ConfigStore::new(dir.path().join("twdl.json"));
    fs::write(
        store.path(),
        r#"{"destinationDirectory": "/definitely/not/here"}"#,
    )
    .unwrap();

    let config = store.load();
    assert_eq!(config.destination_directory, std::env::current_dir().unwrap());
}
