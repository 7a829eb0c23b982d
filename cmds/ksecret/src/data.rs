//! Loading the secret payload from a JSON file.

use std::{
	collections::BTreeMap,
	fs,
	path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::debug;

/// Errors that can occur while loading secret data.
#[derive(Debug, Error)]
pub enum DataError {
	#[error("reading secret data from {}", path.display())]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("parsing secret data in {} (expected a JSON object of string values)", path.display())]
	Parse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},
}

/// Load the key/value payload of a secret.
///
/// With no path (or an empty one) the payload is empty and nothing is read.
pub fn load_secret_data(path: Option<&Path>) -> Result<BTreeMap<String, String>, DataError> {
	let Some(path) = path.filter(|p| !p.as_os_str().is_empty()) else {
		debug!("no data file given, secret will have no data");
		return Ok(BTreeMap::new());
	};

	let content = fs::read_to_string(path).map_err(|source| DataError::Read {
		path: path.to_path_buf(),
		source,
	})?;

	let data = parse_secret_data(&content).map_err(|source| DataError::Parse {
		path: path.to_path_buf(),
		source,
	})?;

	debug!(path = %path.display(), keys = data.len(), "loaded secret data");
	Ok(data)
}

/// Decode a JSON object whose values are all strings.
pub fn parse_secret_data(content: &str) -> Result<BTreeMap<String, String>, serde_json::Error> {
	serde_json::from_str(content)
}

#[cfg(test)]
mod tests {
	use std::fs;

	use assert_matches::assert_matches;
	use rstest::rstest;
	use tempfile::TempDir;

	use super::*;

	#[test]
	fn test_no_path_is_empty() {
		assert!(load_secret_data(None).unwrap().is_empty());
		assert!(load_secret_data(Some(Path::new(""))).unwrap().is_empty());
	}

	#[test]
	fn test_load_string_map() {
		let temp = TempDir::new().unwrap();
		let path = temp.path().join("creds.json");
		fs::write(&path, r#"{"user": "alice", "pass": "s3cr3t"}"#).unwrap();

		let data = load_secret_data(Some(&path)).unwrap();

		assert_eq!(
			data,
			BTreeMap::from([
				("user".to_string(), "alice".to_string()),
				("pass".to_string(), "s3cr3t".to_string()),
			])
		);
	}

	#[test]
	fn test_missing_file_is_read_error() {
		let temp = TempDir::new().unwrap();
		let path = temp.path().join("absent.json");

		let result = load_secret_data(Some(&path));
		assert_matches!(result, Err(DataError::Read { path: p, .. }) if p == path);
	}

	#[rstest]
	#[case::malformed(r#"{"user": "#)]
	#[case::array(r#"["user", "alice"]"#)]
	#[case::number_value(r#"{"port": 5432}"#)]
	#[case::nested(r#"{"db": {"user": "alice"}}"#)]
	#[case::null_value(r#"{"user": null}"#)]
	fn test_rejects_non_string_maps(#[case] content: &str) {
		let temp = TempDir::new().unwrap();
		let path = temp.path().join("data.json");
		fs::write(&path, content).unwrap();

		assert_matches!(load_secret_data(Some(&path)), Err(DataError::Parse { .. }));
	}

	#[test]
	fn test_empty_object() {
		assert!(parse_secret_data("{}").unwrap().is_empty());
	}

	#[test]
	fn test_values_kept_verbatim() {
		let data = parse_secret_data(r#"{"cert": "-----BEGIN-----\nabc\n", "empty": ""}"#).unwrap();
		assert_eq!(data["cert"], "-----BEGIN-----\nabc\n");
		assert_eq!(data["empty"], "");
	}
}
