// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `bwh-secrets`: resolve and validate Benchling credentials.

use std::convert::Infallible;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use bwh_secrets::{
	CliValues, EnvSnapshot, LegacyFieldPolicy, LocalFileReader, ResolveInputs, Resolver,
	SecretLoader, SecretString, UnconfiguredSecretStore,
};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

mod logging;
mod report;

use logging::{LogFormat, LogLevel};
use report::OutputFormat;

/// Resolve, validate, and display Benchling credentials.
#[derive(Parser, Debug)]
#[command(name = "bwh-secrets", version)]
struct Args {
	/// Secrets bundle: a Secrets Manager ARN, inline JSON, or @path to a JSON file
	#[arg(long, value_parser = parse_secret)]
	secrets: Option<SecretString>,

	/// Benchling tenant (deprecated, use --secrets)
	#[arg(long, value_parser = parse_secret)]
	tenant: Option<SecretString>,

	/// OAuth client ID (deprecated, use --secrets)
	#[arg(long, value_parser = parse_secret)]
	client_id: Option<SecretString>,

	/// OAuth client secret (deprecated, use --secrets)
	#[arg(long, value_parser = parse_secret)]
	client_secret: Option<SecretString>,

	/// App definition ID (deprecated, use --secrets)
	#[arg(long = "app-id", value_parser = parse_secret)]
	app_definition_id: Option<SecretString>,

	/// Dotenv file read as the lowest-priority explicit source
	#[arg(long, default_value = ".env")]
	env_file: PathBuf,

	/// Catalog host used to infer the tenant (falls back to QUILT_CATALOG)
	#[arg(long)]
	catalog: Option<String>,

	/// Treatment of deprecated individual fields: warn or reject
	#[arg(long, env = "BWH_LEGACY_FIELDS", default_value = "warn")]
	legacy_fields: LegacyFieldPolicy,

	#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
	output: OutputFormat,

	#[arg(long, value_enum, env = "BWH_LOG_LEVEL", default_value_t = LogLevel::Error)]
	log_level: LogLevel,

	#[arg(long, value_enum, env = "BWH_LOG_FORMAT", default_value_t = LogFormat::Pretty)]
	log_format: LogFormat,
}

impl Args {
	fn resolve_inputs(&self) -> ResolveInputs {
		ResolveInputs {
			cli: CliValues {
				secrets: self.secrets.clone(),
				tenant: self.tenant.clone(),
				client_id: self.client_id.clone(),
				client_secret: self.client_secret.clone(),
				app_definition_id: self.app_definition_id.clone(),
			},
			env: EnvSnapshot::from_process(),
			dotenv_path: Some(self.env_file.clone()),
			catalog: self.catalog.clone(),
		}
	}
}

fn parse_secret(value: &str) -> Result<SecretString, Infallible> {
	Ok(SecretString::new(value.to_string()))
}

#[tokio::main]
async fn main() -> ExitCode {
	let args = Args::parse();
	logging::init_tracing(args.log_level, args.log_format);

	match run(args).await {
		Ok(code) => code,
		Err(e) => {
			eprintln!("error: {e:#}");
			ExitCode::from(2)
		}
	}
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
	let candidates = args
		.resolve_inputs()
		.read()
		.context("failed to read configuration sources")?;
	debug!(candidates = candidates.len(), "collected candidates");

	let cancel = CancellationToken::new();
	let interrupt = cancel.clone();
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			warn!("interrupt received, cancelling");
			interrupt.cancel();
		}
	});

	let resolver = Resolver::new(SecretLoader::new(
		Arc::new(UnconfiguredSecretStore),
		Arc::new(LocalFileReader),
	))
	.with_policy(args.legacy_fields);

	let stdout = io::stdout();
	let stderr = io::stderr();
	match resolver.resolve(&candidates, &cancel).await {
		Ok(config) => {
			report::success(&config, args.output, &mut stdout.lock(), &mut stderr.lock())
				.context("failed to write report")?;
			Ok(ExitCode::SUCCESS)
		}
		Err(e) => {
			report::failure(&e, &mut stderr.lock()).context("failed to write report")?;
			Ok(ExitCode::from(1))
		}
	}
}
