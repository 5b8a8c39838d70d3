use std::fs;

use assert_matches::assert_matches;

use penn_canvas::config::ConfigLoader;
use penn_canvas::domain::{CanvasId, Instance};
use penn_canvas::error::CanvasError;

fn write_config(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("config.json");
    fs::write(&path, content).unwrap();
    (temp, path)
}

#[test]
fn resolve_detailed_config_from_file() {
    let (_temp, path) = write_config(
        r#"{
            "schema_version": 1,
            "data_dir": "/srv/penn-canvas",
            "instances": {
                "beta": { "url": "https://upenn.beta.instructure.com/", "token": "beta-token" },
                "test": "https://upenn.test.instructure.com"
            },
            "shopping": { "ignored_accounts": ["99243", "99237"] },
            "storage": { "increment_mb": 2000 },
            "orientation": { "course_id": 1234, "group_category": "Orientation Groups" }
        }"#,
    );

    let resolved = ConfigLoader::resolve(Some(&path), Instance::Beta).unwrap();
    assert_eq!(resolved.credentials.url, "https://upenn.beta.instructure.com");
    assert_eq!(resolved.credentials.token, "beta-token");
    assert_eq!(
        resolved.data_dir.as_ref().map(|dir| dir.as_str()),
        Some("/srv/penn-canvas")
    );
    assert_eq!(resolved.ignored_accounts, vec!["99243", "99237"]);
    assert_eq!(resolved.storage.increment_mb, 2000);
    assert_eq!(resolved.storage.threshold, 0.79);
    let orientation = resolved.orientation.unwrap();
    assert_eq!(orientation.course_id, CanvasId::new(1234));
    assert_eq!(orientation.group_category, "Orientation Groups");
}

#[test]
fn unknown_instance_has_no_credentials() {
    let (_temp, path) = write_config(r#"{ "instances": { "test": "https://upenn.test.instructure.com" } }"#);

    let err = ConfigLoader::resolve(Some(&path), Instance::Beta).unwrap_err();
    assert_matches!(err, CanvasError::MissingCredentials(ref name) if name == "beta");
}

#[test]
fn threshold_must_be_a_fraction() {
    let (_temp, path) = write_config(
        r#"{
            "instances": { "beta": { "url": "https://upenn.beta.instructure.com", "token": "t" } },
            "storage": { "threshold": 79 }
        }"#,
    );

    let err = ConfigLoader::resolve(Some(&path), Instance::Beta).unwrap_err();
    assert_matches!(err, CanvasError::InvalidConfig(_));
}

#[test]
fn malformed_json_is_a_parse_error() {
    let (_temp, path) = write_config("{ \"instances\": ");

    let err = ConfigLoader::resolve(Some(&path), Instance::Beta).unwrap_err();
    assert_matches!(err, CanvasError::ConfigParse(_));
}

#[test]
fn explicit_missing_file_is_a_read_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");

    let err = ConfigLoader::resolve(Some(&path), Instance::Beta).unwrap_err();
    assert_matches!(err, CanvasError::ConfigRead(_));
}
