//! Upsert command handler.
//!
//! Loads the payload, connects to the cluster and writes the secret, in that
//! order. The first failure aborts the run before anything is written.

use std::{io::Write, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, instrument};

use crate::{
	data::load_secret_data,
	k8s::{
		client::{ClusterConnection, ConnectionSource},
		secret::{SecretSpec, SecretType},
		upsert::{upsert_secret, UpsertOpts, UpsertOutcome},
	},
};

#[derive(Args, Debug, Clone)]
pub struct UpsertArgs {
	/// Path to the kubeconfig file. When unset, the in-cluster service account is used
	#[arg(long, env = "KUBECONFIG_PATH")]
	pub kubeconfig: Option<PathBuf>,

	/// Kubeconfig context to use instead of current-context
	#[arg(long, env = "KSECRET_CONTEXT")]
	pub context: Option<String>,

	/// Name of the secret to create or update
	#[arg(long, env = "KSECRET_NAME", default_value = "default-sec")]
	pub name: String,

	/// Namespace of the secret
	#[arg(long, env = "KSECRET_NAMESPACE", default_value = "default")]
	pub namespace: String,

	/// Type of the secret, e.g. Opaque or kubernetes.io/tls
	#[arg(long = "type", env = "KSECRET_TYPE", default_value = "Opaque")]
	pub secret_type: SecretType,

	/// Path to a JSON object of string keys and values used as the secret data
	#[arg(long, env = "KSECRET_DATA_JSON_PATH")]
	pub data_json_path: Option<PathBuf>,

	/// Timeout in seconds for each Kubernetes API request
	#[arg(
		long,
		env = "KSECRET_TIMEOUT",
		default_value = "30",
		value_parser = clap::value_parser!(u64).range(1..)
	)]
	pub timeout: u64,

	/// Validate the write on the server without persisting it
	#[arg(long, env = "KSECRET_DRY_RUN")]
	pub dry_run: bool,
}

impl UpsertArgs {
	fn secret_spec(&self, data: std::collections::BTreeMap<String, String>) -> SecretSpec {
		SecretSpec::new(&self.name)
			.with_namespace(&self.namespace)
			.with_type(self.secret_type.clone())
			.with_data(data)
	}

	fn upsert_opts(&self) -> UpsertOpts {
		UpsertOpts {
			dry_run: self.dry_run,
		}
	}
}

/// Run the upsert command.
pub fn run<W: Write>(args: UpsertArgs, writer: W) -> Result<()> {
	let runtime = tokio::runtime::Builder::new_current_thread()
		.enable_all()
		.build()
		.context("creating tokio runtime")?;

	runtime.block_on(run_async(args, writer))?;
	Ok(())
}

/// Load, connect and write, reporting the outcome to `writer`.
#[instrument(skip_all, fields(name = %args.name, namespace = %args.namespace))]
pub async fn run_async<W: Write>(args: UpsertArgs, writer: W) -> Result<UpsertOutcome> {
	let data = load_secret_data(args.data_json_path.as_deref())?;

	let source = ConnectionSource::resolve(args.kubeconfig.clone(), args.context.clone());
	let connection = ClusterConnection::connect(&source, Duration::from_secs(args.timeout))
		.await
		.context("connecting to Kubernetes")?;

	let spec = args.secret_spec(data);
	upsert_and_report(&connection, &spec, &args.upsert_opts(), writer).await
}

/// Write the secret through an existing connection and print the result line.
pub async fn upsert_and_report<W: Write>(
	connection: &ClusterConnection,
	spec: &SecretSpec,
	opts: &UpsertOpts,
	mut writer: W,
) -> Result<UpsertOutcome> {
	let outcome = upsert_secret(connection, spec, opts).await?;

	info!(
		outcome = %outcome,
		dry_run = opts.dry_run,
		keys = spec.data.len(),
		"secret written"
	);

	let suffix = if opts.dry_run { " (dry run)" } else { "" };
	writeln!(writer, "secret {} {} successfully{}", spec.name, outcome, suffix)
		.context("writing result")?;

	Ok(outcome)
}
