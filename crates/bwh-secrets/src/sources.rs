// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Candidate sources: CLI arguments, environment, dotenv file, inferred defaults.
//!
//! Each source reports the raw values it holds without interpreting them.
//! Precedence is applied later by the merger.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use bwh_common_secret::SecretString;
use serde::Serialize;
use tracing::{debug, trace};
use url::{Host, Url};

use crate::error::SourceError;
use crate::record::CredentialField;

/// Unified secrets bundle variable.
pub const SECRETS_ENV_VAR: &str = "BENCHLING_SECRETS";
/// Catalog host used for tenant inference.
pub const CATALOG_ENV_VAR: &str = "QUILT_CATALOG";

const FILE_SUFFIX: &str = "_FILE";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Inferred = 10,
	Dotenv = 20,
	Environment = 50,
	Cli = 60,
}

/// Where a candidate value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
	Inferred,
	Dotenv,
	Environment,
	Cli,
}

impl Source {
	pub fn precedence(self) -> Precedence {
		match self {
			Source::Inferred => Precedence::Inferred,
			Source::Dotenv => Precedence::Dotenv,
			Source::Environment => Precedence::Environment,
			Source::Cli => Precedence::Cli,
		}
	}

	pub fn label(self) -> &'static str {
		match self {
			Source::Inferred => "inferred",
			Source::Dotenv => "dotenv",
			Source::Environment => "environment",
			Source::Cli => "cli",
		}
	}
}

impl fmt::Display for Source {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.label())
	}
}

/// What a candidate value is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CandidateKey {
	/// The unified secrets bundle parameter.
	Bundle,
	/// A single credential field: a deprecated individual parameter, or an
	/// inferred default when the source is [`Source::Inferred`].
	Field(CredentialField),
}

impl CandidateKey {
	/// Parameter name as the operator would have written it for `source`.
	pub fn parameter(self, source: Source) -> &'static str {
		match (self, source) {
			(CandidateKey::Bundle, Source::Cli) => "--secrets",
			(CandidateKey::Bundle, _) => SECRETS_ENV_VAR,
			(CandidateKey::Field(field), Source::Cli) => field.legacy_cli_flag(),
			(CandidateKey::Field(field), Source::Inferred) => field.json_key(),
			(CandidateKey::Field(field), _) => field.legacy_env_var(),
		}
	}
}

/// A value as supplied by one source, before interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCandidate {
	source: Source,
	key: CandidateKey,
	value: SecretString,
}

impl RawCandidate {
	pub fn new(source: Source, key: CandidateKey, value: impl Into<String>) -> Self {
		Self::from_secret(source, key, SecretString::new(value.into()))
	}

	pub fn from_secret(source: Source, key: CandidateKey, value: SecretString) -> Self {
		Self { source, key, value }
	}

	pub fn source(&self) -> Source {
		self.source
	}

	pub fn key(&self) -> CandidateKey {
		self.key
	}

	pub fn value(&self) -> &SecretString {
		&self.value
	}

	/// Operator-facing name of the parameter this value was supplied as.
	pub fn parameter(&self) -> &'static str {
		self.key.parameter(self.source)
	}

	pub(crate) fn into_value(self) -> SecretString {
		self.value
	}
}

/// A provider of raw candidates.
pub trait CandidateSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn source(&self) -> Source;
	fn read(&self) -> Result<Vec<RawCandidate>, SourceError>;

	fn precedence(&self) -> Precedence {
		self.source().precedence()
	}
}

/// Read every source in ascending precedence order.
pub fn read_candidates(
	mut sources: Vec<Box<dyn CandidateSource>>,
) -> Result<Vec<RawCandidate>, SourceError> {
	sources.sort_by_key(|s| s.precedence());

	let mut candidates = Vec::new();
	for source in sources {
		debug!(source = source.name(), "reading candidate source");
		let read = source.read()?;
		trace!(source = source.name(), count = read.len(), "read candidates");
		candidates.extend(read);
	}
	Ok(candidates)
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliValues {
	pub secrets: Option<SecretString>,
	pub tenant: Option<SecretString>,
	pub client_id: Option<SecretString>,
	pub client_secret: Option<SecretString>,
	pub app_definition_id: Option<SecretString>,
}

impl CliValues {
	fn field(&self, field: CredentialField) -> Option<&SecretString> {
		match field {
			CredentialField::Tenant => self.tenant.as_ref(),
			CredentialField::ClientId => self.client_id.as_ref(),
			CredentialField::ClientSecret => self.client_secret.as_ref(),
			CredentialField::AppDefinitionId => self.app_definition_id.as_ref(),
		}
	}
}

pub struct CliSource {
	values: CliValues,
}

impl CliSource {
	pub fn new(values: CliValues) -> Self {
		Self { values }
	}
}

impl CandidateSource for CliSource {
	fn name(&self) -> &'static str {
		"cli"
	}

	fn source(&self) -> Source {
		Source::Cli
	}

	fn read(&self) -> Result<Vec<RawCandidate>, SourceError> {
		let mut candidates = Vec::new();
		if let Some(value) = self.values.secrets.as_ref().filter(|v| !v.is_blank()) {
			candidates.push(RawCandidate::from_secret(
				Source::Cli,
				CandidateKey::Bundle,
				value.clone(),
			));
		}
		for field in CredentialField::ALL {
			if let Some(value) = self.values.field(field).filter(|v| !v.is_blank()) {
				candidates.push(RawCandidate::from_secret(
					Source::Cli,
					CandidateKey::Field(field),
					value.clone(),
				));
			}
		}
		Ok(candidates)
	}
}

/// Point-in-time copy of environment variables.
///
/// Values are held as secrets since several of them are credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
	vars: BTreeMap<String, SecretString>,
}

impl EnvSnapshot {
	/// Capture the current process environment. Non-UTF-8 entries are skipped.
	pub fn from_process() -> Self {
		let vars = std::env::vars_os()
			.filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
			.map(|(k, v)| (k, SecretString::new(v)))
			.collect();
		Self { vars }
	}

	pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
	where
		K: Into<String>,
		V: Into<String>,
	{
		let vars = pairs
			.into_iter()
			.map(|(k, v)| (k.into(), SecretString::new(v.into())))
			.collect();
		Self { vars }
	}

	/// Value of `name`, treating empty or whitespace-only values as unset.
	pub fn get(&self, name: &str) -> Option<&SecretString> {
		self.vars.get(name).filter(|v| !v.is_blank())
	}

	fn is_set(&self, name: &str) -> bool {
		self.vars.contains_key(name)
	}
}

pub struct EnvSource {
	env: EnvSnapshot,
}

impl EnvSource {
	pub fn new(env: EnvSnapshot) -> Self {
		Self { env }
	}

	/// Load `var`, honouring `<var>_FILE` which wins when both are set.
	fn load_secret(&self, var: &str) -> Result<Option<SecretString>, SourceError> {
		let file_var = format!("{var}{FILE_SUFFIX}");
		if self.env.is_set(&file_var) {
			let Some(path) = self.env.get(&file_var) else {
				return Err(SourceError::EmptyFilePath { var: file_var });
			};
			let path = PathBuf::from(path.reveal());
			debug!(var = %file_var, path = %path.display(), "reading secret from file");
			let content = std::fs::read_to_string(&path).map_err(|source| SourceError::SecretFile {
				var: file_var.clone(),
				path: path.clone(),
				source,
			})?;
			let trimmed = content
				.strip_suffix('\n')
				.map(|s| s.strip_suffix('\r').unwrap_or(s))
				.unwrap_or(&content);
			if trimmed.trim().is_empty() {
				return Ok(None);
			}
			return Ok(Some(SecretString::new(trimmed.to_string())));
		}

		Ok(self.env.get(var).cloned())
	}
}

impl CandidateSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn source(&self) -> Source {
		Source::Environment
	}

	fn read(&self) -> Result<Vec<RawCandidate>, SourceError> {
		let mut candidates = Vec::new();
		if let Some(value) = self.env.get(SECRETS_ENV_VAR) {
			candidates.push(RawCandidate::from_secret(
				Source::Environment,
				CandidateKey::Bundle,
				value.clone(),
			));
		}
		for field in CredentialField::ALL {
			if let Some(value) = self.load_secret(field.legacy_env_var())? {
				candidates.push(RawCandidate::from_secret(
					Source::Environment,
					CandidateKey::Field(field),
					value,
				));
			}
		}
		Ok(candidates)
	}
}

/// Dotenv file source. Read with `dotenvy` without touching the process
/// environment; a missing file contributes nothing.
pub struct DotenvSource {
	path: PathBuf,
}

impl DotenvSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &std::path::Path {
		&self.path
	}

	fn parse_error(&self, source: dotenvy::Error) -> SourceError {
		SourceError::Dotenv {
			path: self.path.clone(),
			source,
		}
	}
}

impl CandidateSource for DotenvSource {
	fn name(&self) -> &'static str {
		"dotenv"
	}

	fn source(&self) -> Source {
		Source::Dotenv
	}

	fn read(&self) -> Result<Vec<RawCandidate>, SourceError> {
		let iter = match dotenvy::from_path_iter(&self.path) {
			Ok(iter) => iter,
			Err(e) if e.not_found() => {
				debug!(path = %self.path.display(), "dotenv file not found, skipping");
				return Ok(Vec::new());
			}
			Err(e) => return Err(self.parse_error(e)),
		};

		let mut vars = BTreeMap::new();
		for item in iter {
			let (key, value) = item.map_err(|e| self.parse_error(e))?;
			vars.insert(key, SecretString::new(value));
		}
		let env = EnvSnapshot { vars };

		let mut candidates = Vec::new();
		if let Some(value) = env.get(SECRETS_ENV_VAR) {
			candidates.push(RawCandidate::from_secret(
				Source::Dotenv,
				CandidateKey::Bundle,
				value.clone(),
			));
		}
		for field in CredentialField::ALL {
			if let Some(value) = env.get(field.legacy_env_var()) {
				candidates.push(RawCandidate::from_secret(
					Source::Dotenv,
					CandidateKey::Field(field),
					value.clone(),
				));
			}
		}
		debug!(path = %self.path.display(), count = candidates.len(), "loaded dotenv file");
		Ok(candidates)
	}
}

/// Defaults derived from deployment context rather than supplied directly.
pub struct InferredSource {
	catalog: Option<String>,
}

impl InferredSource {
	pub fn new(catalog: Option<String>) -> Self {
		Self { catalog }
	}
}

impl CandidateSource for InferredSource {
	fn name(&self) -> &'static str {
		"inferred"
	}

	fn source(&self) -> Source {
		Source::Inferred
	}

	fn read(&self) -> Result<Vec<RawCandidate>, SourceError> {
		let Some(catalog) = self.catalog.as_deref() else {
			return Ok(Vec::new());
		};
		match infer_tenant_from_catalog(catalog) {
			Some(tenant) => {
				debug!(catalog, tenant = %tenant, "inferred tenant from catalog host");
				Ok(vec![RawCandidate::new(
					Source::Inferred,
					CandidateKey::Field(CredentialField::Tenant),
					tenant,
				)])
			}
			None => {
				debug!(catalog, "catalog host does not yield a tenant");
				Ok(Vec::new())
			}
		}
	}
}

/// Tenant implied by a catalog host: its first DNS label, lowercased.
///
/// Accepts a bare host or a URL. IP addresses and single-label hosts yield
/// nothing.
pub fn infer_tenant_from_catalog(catalog: &str) -> Option<String> {
	let catalog = catalog.trim();
	if catalog.is_empty() {
		return None;
	}

	let url = if catalog.contains("://") {
		Url::parse(catalog).ok()?
	} else {
		Url::parse(&format!("https://{catalog}")).ok()?
	};

	let Some(Host::Domain(domain)) = url.host() else {
		return None;
	};
	let (label, rest) = domain.split_once('.')?;
	if label.is_empty() || rest.is_empty() {
		return None;
	}
	Some(label.to_ascii_lowercase())
}

/// Every explicit input the resolver reads from, gathered in one place.
#[derive(Debug, Clone, Default)]
pub struct ResolveInputs {
	pub cli: CliValues,
	pub env: EnvSnapshot,
	pub dotenv_path: Option<PathBuf>,
	/// Catalog host from the command line; falls back to `QUILT_CATALOG`.
	pub catalog: Option<String>,
}

impl ResolveInputs {
	pub fn sources(&self) -> Vec<Box<dyn CandidateSource>> {
		let catalog = self.catalog.clone().or_else(|| {
			self
				.env
				.get(CATALOG_ENV_VAR)
				.map(|v| v.reveal().to_string())
		});

		let mut sources: Vec<Box<dyn CandidateSource>> = vec![
			Box::new(InferredSource::new(catalog)),
			Box::new(EnvSource::new(self.env.clone())),
			Box::new(CliSource::new(self.cli.clone())),
		];
		if let Some(path) = &self.dotenv_path {
			sources.push(Box::new(DotenvSource::new(path.clone())));
		}
		sources
	}

	/// Read all candidates in precedence order.
	pub fn read(&self) -> Result<Vec<RawCandidate>, SourceError> {
		read_candidates(self.sources())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	fn secret(value: &str) -> Option<SecretString> {
		Some(SecretString::new(value.to_string()))
	}

	fn keys(candidates: &[RawCandidate]) -> Vec<(Source, CandidateKey)> {
		candidates.iter().map(|c| (c.source(), c.key())).collect()
	}

	#[test]
	fn precedence_ordering() {
		assert!(Precedence::Cli > Precedence::Environment);
		assert!(Precedence::Environment > Precedence::Dotenv);
		assert!(Precedence::Dotenv > Precedence::Inferred);
	}

	#[test]
	fn cli_source_skips_blank_values() {
		let source = CliSource::new(CliValues {
			secrets: secret("{\"tenant\":\"acme\"}"),
			tenant: secret("   "),
			client_id: secret("abc123"),
			..Default::default()
		});

		let candidates = source.read().unwrap();
		assert_eq!(
			keys(&candidates),
			vec![
				(Source::Cli, CandidateKey::Bundle),
				(Source::Cli, CandidateKey::Field(CredentialField::ClientId)),
			]
		);
		assert_eq!(candidates[1].parameter(), "--client-id");
	}

	#[test]
	fn env_source_reads_bundle_and_legacy_vars() {
		let env = EnvSnapshot::from_pairs([
			("BENCHLING_SECRETS", "arn:aws:secretsmanager:us-east-1:123456789012:secret:x"),
			("BENCHLING_TENANT", "acme"),
			("BENCHLING_CLIENT_ID", ""),
			("UNRELATED", "value"),
		]);

		let candidates = EnvSource::new(env).read().unwrap();
		assert_eq!(
			keys(&candidates),
			vec![
				(Source::Environment, CandidateKey::Bundle),
				(
					Source::Environment,
					CandidateKey::Field(CredentialField::Tenant)
				),
			]
		);
		assert_eq!(candidates[1].parameter(), "BENCHLING_TENANT");
	}

	#[test]
	fn env_source_skips_whitespace_values() {
		let env = EnvSnapshot::from_pairs([
			("BENCHLING_SECRETS", "   "),
			("BENCHLING_TENANT", "acme"),
			("BENCHLING_CLIENT_ID", "\t\n"),
		]);

		let candidates = EnvSource::new(env).read().unwrap();
		assert_eq!(
			keys(&candidates),
			vec![(
				Source::Environment,
				CandidateKey::Field(CredentialField::Tenant)
			)]
		);
	}

	#[test]
	fn env_source_file_variant_wins() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "from-file-secret").unwrap();

		let env = EnvSnapshot::from_pairs([
			("BENCHLING_CLIENT_SECRET", "from-env-secret".to_string()),
			(
				"BENCHLING_CLIENT_SECRET_FILE",
				file.path().display().to_string(),
			),
		]);

		let candidates = EnvSource::new(env).read().unwrap();
		assert_eq!(candidates.len(), 1);
		assert_eq!(candidates[0].value().reveal(), "from-file-secret");
	}

	#[test]
	fn env_source_empty_file_path_is_error() {
		let env = EnvSnapshot::from_pairs([("BENCHLING_CLIENT_SECRET_FILE", "")]);
		let err = EnvSource::new(env).read().unwrap_err();
		assert!(matches!(err, SourceError::EmptyFilePath { var } if var == "BENCHLING_CLIENT_SECRET_FILE"));
	}

	#[test]
	fn env_source_missing_secret_file_is_error() {
		let env = EnvSnapshot::from_pairs([(
			"BENCHLING_CLIENT_ID_FILE",
			"/nonexistent/benchling/client_id",
		)]);
		let err = EnvSource::new(env).read().unwrap_err();
		assert!(matches!(err, SourceError::SecretFile { .. }));
	}

	#[test]
	fn dotenv_source_reads_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "# deployment settings").unwrap();
		writeln!(file, "BENCHLING_TENANT=acme").unwrap();
		writeln!(file, "BENCHLING_CLIENT_SECRET=\"dotenv-secret-value\"").unwrap();
		writeln!(file, "BENCHLING_APP_DEFINITION_ID=").unwrap();

		let candidates = DotenvSource::new(file.path()).read().unwrap();
		assert_eq!(
			keys(&candidates),
			vec![
				(Source::Dotenv, CandidateKey::Field(CredentialField::Tenant)),
				(
					Source::Dotenv,
					CandidateKey::Field(CredentialField::ClientSecret)
				),
			]
		);
		assert_eq!(candidates[1].value().reveal(), "dotenv-secret-value");
	}

	#[test]
	fn dotenv_source_skips_whitespace_bundle() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "BENCHLING_SECRETS=\"  \"").unwrap();
		writeln!(file, "BENCHLING_TENANT=acme").unwrap();

		let candidates = DotenvSource::new(file.path()).read().unwrap();
		assert_eq!(
			keys(&candidates),
			vec![(Source::Dotenv, CandidateKey::Field(CredentialField::Tenant))]
		);
	}

	#[test]
	fn dotenv_source_missing_file_is_empty() {
		let dir = tempfile::tempdir().unwrap();
		let source = DotenvSource::new(dir.path().join(".env"));
		assert!(source.read().unwrap().is_empty());
	}

	#[test]
	fn dotenv_source_malformed_file_is_error() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "BENCHLING_TENANT='unterminated").unwrap();

		let err = DotenvSource::new(file.path()).read().unwrap_err();
		assert!(matches!(err, SourceError::Dotenv { .. }));
	}

	#[test]
	fn infers_tenant_from_catalog() {
		assert_eq!(
			infer_tenant_from_catalog("https://MyCompany.quiltdata.com/b/bucket"),
			Some("mycompany".to_string())
		);
		assert_eq!(
			infer_tenant_from_catalog("acme.quiltdata.com"),
			Some("acme".to_string())
		);
		assert_eq!(infer_tenant_from_catalog("localhost"), None);
		assert_eq!(infer_tenant_from_catalog("10.0.0.1"), None);
		assert_eq!(infer_tenant_from_catalog("  "), None);
	}

	#[test]
	fn inferred_source_emits_tenant_candidate() {
		let candidates = InferredSource::new(Some("acme.quiltdata.com".to_string()))
			.read()
			.unwrap();
		assert_eq!(
			keys(&candidates),
			vec![(
				Source::Inferred,
				CandidateKey::Field(CredentialField::Tenant)
			)]
		);
		assert_eq!(candidates[0].value().reveal(), "acme");
	}

	#[test]
	fn inputs_read_in_precedence_order() {
		let inputs = ResolveInputs {
			cli: CliValues {
				secrets: secret("{\"tenant\":\"cli\"}"),
				..Default::default()
			},
			env: EnvSnapshot::from_pairs([
				("BENCHLING_SECRETS", "{\"tenant\":\"env\"}"),
				("QUILT_CATALOG", "inferred.quiltdata.com"),
			]),
			dotenv_path: None,
			catalog: None,
		};

		let sources: Vec<Source> = inputs.read().unwrap().iter().map(|c| c.source()).collect();
		assert_eq!(
			sources,
			vec![Source::Inferred, Source::Environment, Source::Cli]
		);
	}

	#[test]
	fn env_snapshot_debug_is_redacted() {
		let env = EnvSnapshot::from_pairs([("BENCHLING_CLIENT_SECRET", "super-secret-value")]);
		assert!(!format!("{env:?}").contains("super-secret-value"));
	}
}
