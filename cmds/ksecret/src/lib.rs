//! Create or update a Kubernetes Secret from a JSON file of string values.

use clap::Parser;

pub mod commands;
pub mod data;
pub mod k8s;
pub mod telemetry;

#[derive(Parser, Debug)]
#[command(name = "ksecret")]
#[command(about = "Create or update a Kubernetes secret from a JSON file", long_about = None)]
#[command(version = env!("KSECRET_VERSION"))]
pub struct Cli {
	#[command(flatten)]
	pub upsert: commands::upsert::UpsertArgs,

	/// Log level (error, warn, info, debug, trace). Falls back to RUST_LOG
	#[arg(long)]
	pub log_level: Option<tracing::Level>,
}
