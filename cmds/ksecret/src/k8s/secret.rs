//! Secret description built from CLI flags and the JSON payload.

use std::{collections::BTreeMap, fmt, str::FromStr};

use k8s_openapi::api::core::v1::Secret;
use kube::api::ObjectMeta;
use thiserror::Error;

/// Namespace used when none is given.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Errors from parsing a secret type string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecretTypeError {
	#[error("secret type must not be empty")]
	Empty,
}

/// Semantic category of a secret, as stored in its `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SecretType {
	/// Arbitrary user-defined data.
	#[default]
	Opaque,
	ServiceAccountToken,
	Dockercfg,
	DockerConfigJson,
	BasicAuth,
	SshAuth,
	Tls,
	BootstrapToken,
	/// Any type string Kubernetes does not define itself.
	Custom(String),
}

impl SecretType {
	/// The wire representation of this type.
	pub fn as_str(&self) -> &str {
		match self {
			SecretType::Opaque => "Opaque",
			SecretType::ServiceAccountToken => "kubernetes.io/service-account-token",
			SecretType::Dockercfg => "kubernetes.io/dockercfg",
			SecretType::DockerConfigJson => "kubernetes.io/dockerconfigjson",
			SecretType::BasicAuth => "kubernetes.io/basic-auth",
			SecretType::SshAuth => "kubernetes.io/ssh-auth",
			SecretType::Tls => "kubernetes.io/tls",
			SecretType::BootstrapToken => "bootstrap.kubernetes.io/token",
			SecretType::Custom(s) => s,
		}
	}
}

impl FromStr for SecretType {
	type Err = SecretTypeError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(match s {
			"" => return Err(SecretTypeError::Empty),
			"Opaque" => SecretType::Opaque,
			"kubernetes.io/service-account-token" => SecretType::ServiceAccountToken,
			"kubernetes.io/dockercfg" => SecretType::Dockercfg,
			"kubernetes.io/dockerconfigjson" => SecretType::DockerConfigJson,
			"kubernetes.io/basic-auth" => SecretType::BasicAuth,
			"kubernetes.io/ssh-auth" => SecretType::SshAuth,
			"kubernetes.io/tls" => SecretType::Tls,
			"bootstrap.kubernetes.io/token" => SecretType::BootstrapToken,
			other => SecretType::Custom(other.to_string()),
		})
	}
}

impl fmt::Display for SecretType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Everything needed to write one secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretSpec {
	pub name: String,
	/// May be empty; see [`SecretSpec::effective_namespace`].
	pub namespace: String,
	pub secret_type: SecretType,
	pub data: BTreeMap<String, String>,
}

impl SecretSpec {
	/// Create an opaque secret with no data in the default namespace.
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			namespace: DEFAULT_NAMESPACE.to_string(),
			secret_type: SecretType::default(),
			data: BTreeMap::new(),
		}
	}

	pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
		self.namespace = namespace.into();
		self
	}

	pub fn with_type(mut self, secret_type: SecretType) -> Self {
		self.secret_type = secret_type;
		self
	}

	pub fn with_data(mut self, data: BTreeMap<String, String>) -> Self {
		self.data = data;
		self
	}

	/// The namespace the secret is written to; never empty.
	pub fn effective_namespace(&self) -> &str {
		if self.namespace.is_empty() {
			DEFAULT_NAMESPACE
		} else {
			&self.namespace
		}
	}

	/// Render the full API object.
	///
	/// The payload goes into `stringData` so the API server does the base64
	/// encoding. `data` is left unset, which makes an update replace every
	/// previously stored key.
	pub fn to_secret(&self) -> Secret {
		Secret {
			metadata: ObjectMeta {
				name: Some(self.name.clone()),
				namespace: Some(self.effective_namespace().to_string()),
				..Default::default()
			},
			type_: Some(self.secret_type.to_string()),
			string_data: Some(self.data.clone()),
			..Default::default()
		}
	}
}
