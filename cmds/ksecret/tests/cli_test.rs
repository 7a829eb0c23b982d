//! End-to-end tests for the upsert command: flags in, printed line and cluster state out.

use std::{fs, path::Path};

use clap::Parser;
use k8s_mock::{decode_secret_data, HttpMockK8sServer, RunningHttpMockK8sServer};
use ksecret::{commands::upsert::run_async, k8s::upsert::UpsertOutcome, Cli};
use serde_json::json;
use tempfile::TempDir;

/// Parse a command line the way `main` does.
fn parse(args: &[&str]) -> Cli {
	Cli::try_parse_from(std::iter::once("ksecret").chain(args.iter().copied()))
		.expect("arguments should parse")
}

fn write_kubeconfig(server: &RunningHttpMockK8sServer, dir: &Path) -> String {
	let path = dir.join("kubeconfig");
	server
		.write_kubeconfig(&path)
		.expect("failed to write kubeconfig");
	path.to_str().unwrap().to_string()
}

#[tokio::test]
async fn test_create_then_update_app_creds() {
	let temp = TempDir::new().unwrap();
	let server = HttpMockK8sServer::builder().build().start().await;
	let kubeconfig = write_kubeconfig(&server, temp.path());

	let creds = temp.path().join("creds.json");
	fs::write(&creds, r#"{"user":"alice","pass":"s3cr3t"}"#).unwrap();

	let args = [
		format!("--kubeconfig={kubeconfig}"),
		"--name=app-creds".to_string(),
		"--namespace=prod".to_string(),
		format!("--data-json-path={}", creds.display()),
	];
	let args: Vec<&str> = args.iter().map(String::as_str).collect();

	let mut output = Vec::new();
	let outcome = run_async(parse(&args).upsert, &mut output)
		.await
		.expect("first run should succeed");

	assert_eq!(outcome, UpsertOutcome::Created);
	assert_eq!(
		String::from_utf8(output).unwrap(),
		"secret app-creds created successfully\n"
	);

	let stored = server.secret("prod", "app-creds").expect("secret stored");
	assert_eq!(stored["metadata"]["name"], "app-creds");
	assert_eq!(stored["metadata"]["namespace"], "prod");
	assert_eq!(
		serde_json::Value::Object(decode_secret_data(&stored)),
		json!({"user": "alice", "pass": "s3cr3t"})
	);

	let mut output = Vec::new();
	let outcome = run_async(parse(&args).upsert, &mut output)
		.await
		.expect("second run should succeed");

	assert_eq!(outcome, UpsertOutcome::Updated);
	assert_eq!(
		String::from_utf8(output).unwrap(),
		"secret app-creds updated successfully\n"
	);
	let stored = server.secret("prod", "app-creds").expect("secret stored");
	assert_eq!(
		serde_json::Value::Object(decode_secret_data(&stored)),
		json!({"user": "alice", "pass": "s3cr3t"})
	);
}

#[tokio::test]
async fn test_without_data_path_secret_is_empty() {
	let temp = TempDir::new().unwrap();
	let server = HttpMockK8sServer::builder().build().start().await;
	let kubeconfig = write_kubeconfig(&server, temp.path());

	let kubeconfig_arg = format!("--kubeconfig={kubeconfig}");
	let mut output = Vec::new();
	run_async(parse(&[kubeconfig_arg.as_str()]).upsert, &mut output)
		.await
		.expect("run should succeed");

	assert_eq!(
		String::from_utf8(output).unwrap(),
		"secret default-sec created successfully\n"
	);
	let stored = server
		.secret("default", "default-sec")
		.expect("secret stored");
	assert!(decode_secret_data(&stored).is_empty());
	assert_eq!(stored["type"], "Opaque");
}

#[tokio::test]
async fn test_unreadable_data_file_aborts_before_contacting_cluster() {
	let temp = TempDir::new().unwrap();
	let server = HttpMockK8sServer::builder().build().start().await;
	let kubeconfig = write_kubeconfig(&server, temp.path());

	let kubeconfig_arg = format!("--kubeconfig={kubeconfig}");
	let data_arg = format!(
		"--data-json-path={}",
		temp.path().join("missing.json").display()
	);
	let mut output = Vec::new();
	let err = run_async(
		parse(&[kubeconfig_arg.as_str(), data_arg.as_str()]).upsert,
		&mut output,
	)
	.await
	.expect_err("missing data file should fail");

	assert!(format!("{err:#}").contains("missing.json"));
	assert!(output.is_empty());
	assert!(server.requests().await.is_empty());
}

#[tokio::test]
async fn test_malformed_data_file_aborts() {
	let temp = TempDir::new().unwrap();
	let server = HttpMockK8sServer::builder().build().start().await;
	let kubeconfig = write_kubeconfig(&server, temp.path());

	let data = temp.path().join("data.json");
	fs::write(&data, r#"{"port": 5432}"#).unwrap();

	let kubeconfig_arg = format!("--kubeconfig={kubeconfig}");
	let data_arg = format!("--data-json-path={}", data.display());
	let result = run_async(
		parse(&[kubeconfig_arg.as_str(), data_arg.as_str()]).upsert,
		Vec::new(),
	)
	.await;

	assert!(result.is_err());
	assert_eq!(server.secret_count(), 0);
}

#[tokio::test]
async fn test_bad_kubeconfig_path_aborts() {
	let temp = TempDir::new().unwrap();
	let kubeconfig_arg = format!(
		"--kubeconfig={}",
		temp.path().join("no-such-kubeconfig").display()
	);

	let err = run_async(parse(&[kubeconfig_arg.as_str()]).upsert, Vec::new())
		.await
		.expect_err("missing kubeconfig should fail");

	assert!(format!("{err:#}").contains("no-such-kubeconfig"));
}

#[tokio::test]
async fn test_context_flag_selects_context() {
	let temp = TempDir::new().unwrap();
	let server = HttpMockK8sServer::builder().build().start().await;
	let kubeconfig = write_kubeconfig(&server, temp.path());

	let kubeconfig_arg = format!("--kubeconfig={kubeconfig}");
	let err = run_async(
		parse(&[kubeconfig_arg.as_str(), "--context=elsewhere"]).upsert,
		Vec::new(),
	)
	.await
	.expect_err("unknown context should fail");

	assert!(format!("{err:#}").contains("elsewhere"));
	assert!(server.requests().await.is_empty());

	let mut output = Vec::new();
	run_async(
		parse(&[kubeconfig_arg.as_str(), "--context=mock-context", "--dry-run"]).upsert,
		&mut output,
	)
	.await
	.expect("known context should work");

	assert_eq!(
		String::from_utf8(output).unwrap(),
		"secret default-sec created successfully (dry run)\n"
	);
	assert_eq!(server.secret_count(), 0);
}
