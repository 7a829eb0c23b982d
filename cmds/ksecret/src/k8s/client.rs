//! Kubernetes cluster connection management.

use std::{
	path::{Path, PathBuf},
	time::Duration,
};

use kube::{
	config::{InClusterError, KubeConfigOptions, Kubeconfig, KubeconfigError},
	Client, Config,
};
use thiserror::Error;
use tracing::{info, instrument};

/// Default timeout for Kubernetes API requests.
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur when connecting to a Kubernetes cluster.
#[derive(Debug, Error)]
pub enum ConnectionError {
	#[error("reading kubeconfig {}", path.display())]
	ReadKubeconfig {
		path: PathBuf,
		#[source]
		source: KubeconfigError,
	},

	#[error("no context named `{0}` was found in kubeconfig")]
	ContextNotFound(String),

	#[error("kubeconfig has no current-context and no context was given")]
	NoCurrentContext,

	#[error(transparent)]
	Kubeconfig(#[from] KubeconfigError),

	#[error("loading in-cluster configuration")]
	InCluster(#[from] InClusterError),

	#[error(transparent)]
	Kube(#[from] kube::Error),
}

/// Where the cluster credentials come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionSource {
	/// An explicit kubeconfig file, optionally with a context override.
	Kubeconfig {
		path: PathBuf,
		context: Option<String>,
	},

	/// The service account mounted into the pod.
	InCluster,
}

impl ConnectionSource {
	/// Pick the credential source.
	///
	/// A non-empty kubeconfig path always wins; otherwise in-cluster credentials are used.
	pub fn resolve(kubeconfig: Option<PathBuf>, context: Option<String>) -> Self {
		match kubeconfig.filter(|p| !p.as_os_str().is_empty()) {
			Some(path) => ConnectionSource::Kubeconfig { path, context },
			None => {
				info!("no kubeconfig given, trying in-cluster connection");
				ConnectionSource::InCluster
			}
		}
	}

	/// Load the client configuration and a human-readable cluster identifier.
	#[instrument(skip_all)]
	pub async fn load_config(&self) -> Result<(Config, String), ConnectionError> {
		match self {
			ConnectionSource::Kubeconfig { path, context } => {
				let kubeconfig = read_kubeconfig(path)?;
				kubeconfig_config(kubeconfig, context.as_deref()).await
			}
			ConnectionSource::InCluster => {
				let config = Config::incluster()?;
				let identifier = format!("in-cluster ({})", config.cluster_url);
				Ok((config, identifier))
			}
		}
	}
}

/// Represents a connection to a Kubernetes cluster.
///
/// Construction performs no network calls.
#[derive(Clone)]
pub struct ClusterConnection {
	client: Client,
	/// Human-readable identifier for the cluster (context name or API server URL).
	cluster_identifier: String,
}

impl std::fmt::Debug for ClusterConnection {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ClusterConnection")
			.field("cluster_identifier", &self.cluster_identifier)
			.finish_non_exhaustive()
	}
}

impl ClusterConnection {
	/// Build a client from the given credential source.
	#[instrument(skip_all)]
	pub async fn connect(
		source: &ConnectionSource,
		timeout: Duration,
	) -> Result<Self, ConnectionError> {
		let (config, cluster_identifier) = source.load_config().await?;
		Self::from_config(config, cluster_identifier, timeout)
	}

	/// Build a client from an already parsed kubeconfig.
	#[instrument(skip_all)]
	pub async fn from_kubeconfig(
		kubeconfig: Kubeconfig,
		context: Option<&str>,
		timeout: Duration,
	) -> Result<Self, ConnectionError> {
		let (config, cluster_identifier) = kubeconfig_config(kubeconfig, context).await?;
		Self::from_config(config, cluster_identifier, timeout)
	}

	/// Build a client from a finished configuration, bounding every request by `timeout`.
	pub fn from_config(
		mut config: Config,
		cluster_identifier: String,
		timeout: Duration,
	) -> Result<Self, ConnectionError> {
		config.connect_timeout = Some(timeout);
		config.read_timeout = Some(timeout);
		config.write_timeout = Some(timeout);

		let client = Client::try_from(config)?;
		tracing::debug!(cluster = %cluster_identifier, "created kube client");

		Ok(Self {
			client,
			cluster_identifier,
		})
	}

	/// Get a reference to the underlying kube client.
	pub fn client(&self) -> &Client {
		&self.client
	}

	/// Get the cluster identifier (context name or API server URL).
	pub fn cluster_identifier(&self) -> &str {
		&self.cluster_identifier
	}
}

fn read_kubeconfig(path: &Path) -> Result<Kubeconfig, ConnectionError> {
	Kubeconfig::read_from(path).map_err(|source| ConnectionError::ReadKubeconfig {
		path: path.to_path_buf(),
		source,
	})
}

/// Select the context (explicit, else current-context) and build its config.
async fn kubeconfig_config(
	kubeconfig: Kubeconfig,
	context: Option<&str>,
) -> Result<(Config, String), ConnectionError> {
	let context_name = match context {
		Some(name) => {
			if !kubeconfig.contexts.iter().any(|c| c.name == name) {
				return Err(ConnectionError::ContextNotFound(name.to_string()));
			}
			name.to_string()
		}
		None => kubeconfig
			.current_context
			.clone()
			.ok_or(ConnectionError::NoCurrentContext)?,
	};

	tracing::debug!(context = %context_name, "using kubeconfig context");

	let config = Config::from_custom_kubeconfig(
		kubeconfig,
		&KubeConfigOptions {
			context: Some(context_name.clone()),
			..Default::default()
		},
	)
	.await?;

	Ok((config, format!("context:{}", context_name)))
}
