//! HTTP-based mock Kubernetes server using wiremock.
//!
//! Serves the core `secrets` collection over a real HTTP listener so that
//! kubeconfig-based connections and in-process clients behave exactly as they
//! would against a cluster: `GET`, `POST` and `PUT` on
//! `/api/v1/namespaces/{ns}/secrets[/{name}]`.

use std::{
	collections::HashMap,
	io,
	path::Path,
	sync::{
		atomic::{AtomicU64, Ordering},
		Arc, RwLock,
	},
};

use bon::Builder;
use kube::config::{
	AuthInfo, Cluster, Context, Kubeconfig, NamedAuthInfo, NamedCluster, NamedContext,
};
use serde_json::Value;
use tracing::{debug, trace};
use wiremock::{
	matchers::{method, path_regex},
	Mock, MockServer, Request, ResponseTemplate,
};

use super::helpers::{
	namespace_of, normalize_secret, parse_resource_path, stamp_metadata, status_body,
};

/// Path pattern matching a single named secret.
const SECRET_PATH: &str = r"^/api/v1/namespaces/[^/]+/secrets/[^/]+$";
/// Path pattern matching a namespaced secrets collection.
const SECRETS_COLLECTION_PATH: &str = r"^/api/v1/namespaces/[^/]+/secrets/?$";

/// Stored objects keyed by (collection path, name).
type ObjectMap = HashMap<(String, String), Value>;

/// State shared between the mounted responders and the test handle.
#[derive(Default)]
struct MockState {
	objects: RwLock<ObjectMap>,
	version: AtomicU64,
}

impl MockState {
	fn next_version(&self) -> u64 {
		self.version.fetch_add(1, Ordering::SeqCst) + 1
	}
}

/// A mock Kubernetes server exposed over HTTP.
#[derive(Builder)]
pub struct HttpMockK8sServer {
	/// Secrets present in the cluster before the test starts.
	///
	/// A manifest without `metadata.namespace` lands in `default`.
	#[builder(default)]
	secrets: Vec<Value>,
	/// When set, every single-secret `GET` answers with this status code
	/// instead of consulting the store.
	lookup_failure: Option<u16>,
}

/// A request observed by the mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
	pub method: String,
	pub path: String,
	pub query: Option<String>,
}

/// A running HTTP mock server instance.
pub struct RunningHttpMockK8sServer {
	server: MockServer,
	state: Arc<MockState>,
}

impl HttpMockK8sServer {
	/// Start the mock server with all configured secrets.
	pub async fn start(self) -> RunningHttpMockK8sServer {
		let server = MockServer::start().await;
		let state = Arc::new(MockState::default());

		debug!(uri = %server.uri(), "Started mock K8s server");

		{
			let mut objects = state
				.objects
				.write()
				.expect("mock state lock should not be poisoned");
			for manifest in self.secrets {
				let Some(name) = manifest.pointer("/metadata/name").and_then(Value::as_str)
				else {
					continue;
				};
				let name = name.to_string();
				let namespace = manifest
					.pointer("/metadata/namespace")
					.and_then(Value::as_str)
					.unwrap_or("default")
					.to_string();

				let version = state.next_version();
				let mut stored = normalize_secret(manifest);
				stamp_metadata(&mut stored, &namespace, &format!("uid-{version}"), version);

				let collection = secrets_collection(&namespace);
				trace!(collection = %collection, name = %name, "Registered secret");
				objects.insert((collection, name), stored);
			}
		}

		if let Some(code) = self.lookup_failure {
			mount_lookup_failure(&server, code).await;
		}
		mount_secrets(&server, &state).await;

		RunningHttpMockK8sServer { server, state }
	}
}

impl RunningHttpMockK8sServer {
	/// Get the server's URI (e.g., "http://127.0.0.1:12345").
	pub fn uri(&self) -> String {
		self.server.uri()
	}

	/// Create a Kubeconfig pointing to this mock server.
	pub fn kubeconfig(&self) -> Kubeconfig {
		self.kubeconfig_with_context("mock-context")
	}

	/// Create a Kubeconfig pointing to this mock server with a custom context name.
	pub fn kubeconfig_with_context(&self, context_name: &str) -> Kubeconfig {
		let cluster_name = "mock-cluster";
		let user_name = "mock-user";

		Kubeconfig {
			clusters: vec![NamedCluster {
				name: cluster_name.to_string(),
				cluster: Some(Cluster {
					server: Some(self.uri()),
					insecure_skip_tls_verify: Some(true),
					..Default::default()
				}),
			}],
			contexts: vec![NamedContext {
				name: context_name.to_string(),
				context: Some(Context {
					cluster: cluster_name.to_string(),
					user: Some(user_name.to_string()),
					namespace: Some("default".to_string()),
					..Default::default()
				}),
			}],
			auth_infos: vec![NamedAuthInfo {
				name: user_name.to_string(),
				auth_info: Some(AuthInfo::default()),
			}],
			current_context: Some(context_name.to_string()),
			..Default::default()
		}
	}

	/// Serialize [`Self::kubeconfig`] as YAML into `path`.
	pub fn write_kubeconfig(&self, path: &Path) -> io::Result<()> {
		let yaml = serde_yaml::to_string(&self.kubeconfig()).map_err(io::Error::other)?;
		std::fs::write(path, yaml)
	}

	/// Current stored state of a secret, if present.
	pub fn secret(&self, namespace: &str, name: &str) -> Option<Value> {
		let objects = self
			.state
			.objects
			.read()
			.expect("mock state lock should not be poisoned");
		objects
			.get(&(secrets_collection(namespace), name.to_string()))
			.cloned()
	}

	/// Number of secrets currently stored.
	pub fn secret_count(&self) -> usize {
		self.state
			.objects
			.read()
			.expect("mock state lock should not be poisoned")
			.len()
	}

	/// All requests the server has received, in arrival order.
	pub async fn requests(&self) -> Vec<RecordedRequest> {
		self.server
			.received_requests()
			.await
			.unwrap_or_default()
			.into_iter()
			.map(|req| RecordedRequest {
				method: req.method.as_str().to_string(),
				path: req.url.path().to_string(),
				query: req.url.query().map(str::to_string),
			})
			.collect()
	}

	/// Number of received requests with the given HTTP method.
	pub async fn count_requests(&self, http_method: &str) -> usize {
		self.requests()
			.await
			.iter()
			.filter(|r| r.method.eq_ignore_ascii_case(http_method))
			.count()
	}
}

fn secrets_collection(namespace: &str) -> String {
	format!("/api/v1/namespaces/{namespace}/secrets")
}

fn is_dry_run(req: &Request) -> bool {
	req.url.query().unwrap_or("").contains("dryRun")
}

async fn mount_lookup_failure(server: &MockServer, code: u16) {
	Mock::given(method("GET"))
		.and(path_regex(SECRET_PATH))
		.respond_with({
			let reason = if code == 404 { "NotFound" } else { "InternalError" };
			ResponseTemplate::new(code).set_body_json(status_body(
				code,
				reason,
				"injected lookup failure",
			))
		})
		.with_priority(1)
		.mount(server)
		.await;
}

async fn mount_secrets(server: &MockServer, state: &Arc<MockState>) {
	let get_state = Arc::clone(state);
	let post_state = Arc::clone(state);
	let put_state = Arc::clone(state);

	Mock::given(method("GET"))
		.and(path_regex(SECRET_PATH))
		.respond_with(move |req: &Request| {
			let (collection, name) = parse_resource_path(req.url.path());
			let objects = get_state
				.objects
				.read()
				.expect("mock state lock should not be poisoned");

			match objects.get(&(collection, name.clone())) {
				Some(secret) => ResponseTemplate::new(200).set_body_json(secret.clone()),
				None => ResponseTemplate::new(404).set_body_json(status_body(
					404,
					"NotFound",
					&format!("secrets \"{name}\" not found"),
				)),
			}
		})
		.mount(server)
		.await;

	// POST creates; conflicts with an existing name like the real API server
	Mock::given(method("POST"))
		.and(path_regex(SECRETS_COLLECTION_PATH))
		.respond_with(move |req: &Request| {
			let collection = req.url.path().trim_end_matches('/').to_string();
			let namespace = namespace_of(&collection).unwrap_or("default").to_string();

			let body: Value = match serde_json::from_slice(&req.body) {
				Ok(body) => body,
				Err(e) => {
					return ResponseTemplate::new(400).set_body_json(status_body(
						400,
						"BadRequest",
						&e.to_string(),
					))
				}
			};

			let Some(name) = body
				.pointer("/metadata/name")
				.and_then(Value::as_str)
				.filter(|n| !n.is_empty())
				.map(str::to_string)
			else {
				return ResponseTemplate::new(422).set_body_json(status_body(
					422,
					"Invalid",
					"metadata.name: Required value",
				));
			};

			let mut objects = post_state
				.objects
				.write()
				.expect("mock state lock should not be poisoned");
			let key = (collection, name.clone());
			if objects.contains_key(&key) {
				return ResponseTemplate::new(409).set_body_json(status_body(
					409,
					"AlreadyExists",
					&format!("secrets \"{name}\" already exists"),
				));
			}

			let version = post_state.next_version();
			let mut stored = normalize_secret(body);
			stamp_metadata(&mut stored, &namespace, &format!("uid-{version}"), version);

			if !is_dry_run(req) {
				objects.insert(key, stored.clone());
			}

			ResponseTemplate::new(201).set_body_json(stored)
		})
		.mount(server)
		.await;

	// PUT replaces the whole object; only server-owned metadata survives
	Mock::given(method("PUT"))
		.and(path_regex(SECRET_PATH))
		.respond_with(move |req: &Request| {
			let (collection, name) = parse_resource_path(req.url.path());
			let namespace = namespace_of(&collection).unwrap_or("default").to_string();

			let body: Value = match serde_json::from_slice(&req.body) {
				Ok(body) => body,
				Err(e) => {
					return ResponseTemplate::new(400).set_body_json(status_body(
						400,
						"BadRequest",
						&e.to_string(),
					))
				}
			};

			if body.pointer("/metadata/name").and_then(Value::as_str) != Some(name.as_str()) {
				return ResponseTemplate::new(400).set_body_json(status_body(
					400,
					"BadRequest",
					"the name of the object does not match the name on the URL",
				));
			}

			let mut objects = put_state
				.objects
				.write()
				.expect("mock state lock should not be poisoned");
			let key = (collection, name.clone());
			let Some(existing) = objects.get(&key) else {
				return ResponseTemplate::new(404).set_body_json(status_body(
					404,
					"NotFound",
					&format!("secrets \"{name}\" not found"),
				));
			};

			let uid = existing
				.pointer("/metadata/uid")
				.and_then(Value::as_str)
				.unwrap_or_default()
				.to_string();
			let version = put_state.next_version();
			let mut stored = normalize_secret(body);
			stamp_metadata(&mut stored, &namespace, &uid, version);

			if !is_dry_run(req) {
				objects.insert(key, stored.clone());
			}

			ResponseTemplate::new(200).set_body_json(stored)
		})
		.mount(server)
		.await;
}
