//! Create-or-replace of a single Secret.

use std::fmt;

use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, PostParams};
use thiserror::Error;
use tracing::{debug, instrument};

use super::{client::ClusterConnection, secret::SecretSpec};

/// Errors that can occur while writing a secret.
#[derive(Debug, Error)]
pub enum UpsertError {
	#[error("secret name must not be empty")]
	MissingName,

	#[error("looking up secret {namespace}/{name}")]
	Lookup {
		namespace: String,
		name: String,
		#[source]
		source: Box<kube::Error>,
	},

	#[error("creating secret {namespace}/{name}")]
	Create {
		namespace: String,
		name: String,
		#[source]
		source: Box<kube::Error>,
	},

	#[error("updating secret {namespace}/{name}")]
	Update {
		namespace: String,
		name: String,
		#[source]
		source: Box<kube::Error>,
	},
}

/// Which write was performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
	Created,
	Updated,
}

impl fmt::Display for UpsertOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			UpsertOutcome::Created => write!(f, "created"),
			UpsertOutcome::Updated => write!(f, "updated"),
		}
	}
}

/// Options for an upsert.
#[derive(Debug, Clone, Default)]
pub struct UpsertOpts {
	/// Ask the API server to validate the write without persisting it.
	pub dry_run: bool,
}

/// Create the secret if it does not exist, otherwise replace it.
///
/// Makes exactly one read and at most one write. A replace sends the whole
/// object without a `resourceVersion`, so it overwrites `type` and every data
/// key unconditionally. A failed lookup is reported as an error and never
/// falls through to a create.
#[instrument(skip_all, fields(
	name = %spec.name,
	namespace = %spec.effective_namespace(),
	cluster = %conn.cluster_identifier(),
))]
pub async fn upsert_secret(
	conn: &ClusterConnection,
	spec: &SecretSpec,
	opts: &UpsertOpts,
) -> Result<UpsertOutcome, UpsertError> {
	if spec.name.is_empty() {
		return Err(UpsertError::MissingName);
	}

	let namespace = spec.effective_namespace();
	let api: Api<Secret> = Api::namespaced(conn.client().clone(), namespace);

	let existing = api
		.get_opt(&spec.name)
		.await
		.map_err(|e| UpsertError::Lookup {
			namespace: namespace.to_string(),
			name: spec.name.clone(),
			source: Box::new(e),
		})?;

	let secret = spec.to_secret();
	let params = PostParams {
		dry_run: opts.dry_run,
		..Default::default()
	};

	match existing {
		None => {
			debug!("secret not found, creating");
			api.create(&params, &secret)
				.await
				.map_err(|e| UpsertError::Create {
					namespace: namespace.to_string(),
					name: spec.name.clone(),
					source: Box::new(e),
				})?;
			Ok(UpsertOutcome::Created)
		}
		Some(current) => {
			debug!(
				resource_version = current.metadata.resource_version.as_deref().unwrap_or(""),
				"secret exists, replacing"
			);
			api.replace(&spec.name, &params, &secret)
				.await
				.map_err(|e| UpsertError::Update {
					namespace: namespace.to_string(),
					name: spec.name.clone(),
					source: Box::new(e),
				})?;
			Ok(UpsertOutcome::Updated)
		}
	}
}
