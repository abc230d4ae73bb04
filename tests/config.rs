use std::fs;

use assert_matches::assert_matches;

use match_mate::config::{Config, ConfigLoader};
use match_mate::error::MatchError;
use match_mate::feed::FeedSettings;

#[test]
fn resolves_file_with_overrides() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("match-mate.json");
    fs::write(
        &path,
        r#"{
            "base_url": "http://localhost:8080",
            "page_size": 20,
            "batch_size": 15,
            "timeout_secs": 5,
            "data_dir": "/tmp/match-mate-test",
            "seed": 4,
            "fault_injection": { "rate": 0.3, "seed": 8 }
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.base_url, "http://localhost:8080");
    assert_eq!(resolved.feed, FeedSettings::new(20, 15, 3).unwrap());
    assert_eq!(resolved.timeout.as_secs(), 5);
    assert_eq!(resolved.data_dir.as_str(), "/tmp/match-mate-test");
    assert_eq!(resolved.seed, Some(4));
    let fault = resolved.fault_injection.unwrap();
    assert_eq!(fault.rate, 0.3);
    assert_eq!(fault.seed, Some(8));
}

#[test]
fn explicit_missing_file_is_read_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, MatchError::ConfigRead(_));
}

#[test]
fn invalid_json_is_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("broken.json");
    fs::write(&path, "{ page_size: ").unwrap();
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, MatchError::ConfigParse(_));
}

#[test]
fn zero_page_size_is_rejected() {
    let config = Config {
        page_size: Some(0),
        data_dir: Some("/tmp".to_string()),
        ..Config::default()
    };
    let err = ConfigLoader::resolve_config(config).unwrap_err();
    assert_matches!(err, MatchError::InvalidArgument(_));
}

#[test]
fn fault_rate_out_of_range_is_rejected() {
    let config: Config = serde_json::from_str(
        r#"{ "data_dir": "/tmp", "fault_injection": { "rate": 2.0 } }"#,
    )
    .unwrap();
    let err = ConfigLoader::resolve_config(config).unwrap_err();
    assert_matches!(err, MatchError::ConfigParse(_));
}
