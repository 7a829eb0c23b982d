use anyhow::Result;
use clap::Parser;
use ksecret::{commands, telemetry, Cli};

fn main() -> Result<()> {
	let cli = Cli::parse();

	telemetry::init(cli.log_level);

	commands::upsert::run(cli.upsert, std::io::stdout())
}
