//! Helper functions for mock Kubernetes testing.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Map, Value};

/// Normalize a Secret body the way the API server does before storing it.
///
/// `stringData` entries are base64-encoded into `data`, overwriting keys
/// that appear in both, and `stringData` itself is dropped. A missing `type`
/// becomes `Opaque`.
pub fn normalize_secret(mut secret: Value) -> Value {
	let Value::Object(ref mut obj) = secret else {
		return secret;
	};

	let string_data = obj.remove("stringData");
	let mut data = match obj.remove("data") {
		Some(Value::Object(map)) => map,
		_ => Map::new(),
	};

	if let Some(Value::Object(string_data)) = string_data {
		for (key, value) in string_data {
			if let Value::String(s) = value {
				data.insert(key, Value::String(STANDARD.encode(s)));
			}
		}
	}

	if !data.is_empty() {
		obj.insert("data".to_string(), Value::Object(data));
	}

	obj.entry("type")
		.or_insert_with(|| Value::String("Opaque".to_string()));
	obj.entry("apiVersion")
		.or_insert_with(|| Value::String("v1".to_string()));
	obj.entry("kind")
		.or_insert_with(|| Value::String("Secret".to_string()));

	secret
}

/// Set server-owned metadata fields on a stored object.
pub fn stamp_metadata(object: &mut Value, namespace: &str, uid: &str, resource_version: u64) {
	if let Value::Object(obj) = object {
		let metadata = obj
			.entry("metadata")
			.or_insert_with(|| Value::Object(Map::new()));
		if let Value::Object(metadata) = metadata {
			metadata.insert("namespace".to_string(), json!(namespace));
			metadata.insert("uid".to_string(), json!(uid));
			metadata.insert(
				"resourceVersion".to_string(),
				json!(resource_version.to_string()),
			);
		}
	}
}

/// Decode the base64 `data` of a stored Secret back into plain strings.
///
/// Keys whose values are not valid base64 UTF-8 are skipped.
pub fn decode_secret_data(secret: &Value) -> Map<String, Value> {
	let Some(Value::Object(data)) = secret.get("data") else {
		return Map::new();
	};

	data.iter()
		.filter_map(|(key, value)| {
			let bytes = STANDARD.decode(value.as_str()?).ok()?;
			let text = String::from_utf8(bytes).ok()?;
			Some((key.clone(), Value::String(text)))
		})
		.collect()
}

/// Build a `Status` body in the shape kube-rs deserializes as an API error.
pub fn status_body(code: u16, reason: &str, message: &str) -> Value {
	json!({
		"kind": "Status",
		"apiVersion": "v1",
		"metadata": {},
		"status": "Failure",
		"message": message,
		"reason": reason,
		"code": code
	})
}

/// Parse a Kubernetes API path into (collection path, resource name).
///
/// - `/api/v1/namespaces/default/secrets/creds` -> (`/api/v1/namespaces/default/secrets`, `creds`)
/// - `/api/v1/namespaces/default/secrets` -> (`/api/v1/namespaces/default`, `secrets`)
pub fn parse_resource_path(path: &str) -> (String, String) {
	let path = path.trim_end_matches('/');
	if let Some(last_slash) = path.rfind('/') {
		(path[..last_slash].to_string(), path[last_slash + 1..].to_string())
	} else {
		(path.to_string(), String::new())
	}
}

/// Extract the namespace from a namespaced collection path.
pub fn namespace_of(collection_path: &str) -> Option<&str> {
	let rest = collection_path.split_once("/namespaces/")?.1;
	Some(rest.split('/').next().unwrap_or(rest))
}
