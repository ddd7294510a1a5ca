// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Operator-facing output. Only masked values are written here.

use std::error::Error as _;
use std::io::{self, Write};

use bwh_secrets::{EffectiveConfig, ResolveError};
use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
	#[default]
	Text,
	Json,
}

/// Masked bundle to `out`; deprecations, conflicts, and warnings to `err`.
pub fn success(
	config: &EffectiveConfig,
	format: OutputFormat,
	out: &mut impl Write,
	err: &mut impl Write,
) -> io::Result<()> {
	for deprecation in config.deprecations() {
		writeln!(err, "deprecated: {deprecation}")?;
	}
	for conflict in config.conflicts() {
		writeln!(err, "note: {conflict}")?;
	}
	for warning in config.warnings() {
		writeln!(err, "{warning}")?;
	}

	let masked = config.masked();
	match format {
		OutputFormat::Text => writeln!(out, "{masked}")?,
		OutputFormat::Json => {
			serde_json::to_writer_pretty(&mut *out, &masked)?;
			writeln!(out)?;
		}
	}
	out.flush()
}

/// Error, cause chain, full validation result, and remediation to `err`.
pub fn failure(error: &ResolveError, err: &mut impl Write) -> io::Result<()> {
	if let ResolveError::Schema(schema) = error {
		for deprecation in schema.deprecations() {
			writeln!(err, "deprecated: {deprecation}")?;
		}
		for conflict in schema.conflicts() {
			writeln!(err, "note: {conflict}")?;
		}
	}

	writeln!(err, "error: {error}")?;

	let mut source = error.source();
	while let Some(cause) = source {
		writeln!(err, "  caused by: {cause}")?;
		source = cause.source();
	}

	if let ResolveError::Schema(schema) = error {
		write!(err, "{}", schema.result())?;
	}

	writeln!(err, "hint: {}", error.remediation())?;
	err.flush()
}
