// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for secrets resolution.
//!
//! Errors never carry credential values. Where an input has to be
//! referenced, it is masked first.

use std::path::PathBuf;

use bwh_common_secret::SecretString;
use thiserror::Error;

use crate::merge::{DeprecationWarning, PrecedenceConflictWarning};
use crate::record::CredentialField;
use crate::store::{FileReadError, StoreError};
use crate::validation::ValidationResult;

/// Hint listing the accepted secrets bundle forms.
pub const ACCEPTED_FORMS_HINT: &str = "pass --secrets (or BENCHLING_SECRETS) in one of three forms: \
	an AWS Secrets Manager ARN (arn:aws:secretsmanager:<region>:<account>:secret:<name>), \
	inline JSON ('{\"tenant\":...,\"client_id\":...,\"client_secret\":...}'), \
	or a file reference (@path/to/secrets.json)";

/// The secrets bundle matched none of the accepted forms.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized secrets bundle format (value {masked_input})")]
pub struct ClassificationError {
	masked_input: String,
}

impl ClassificationError {
	pub(crate) fn for_input(input: &SecretString) -> Self {
		Self {
			masked_input: input.masked(),
		}
	}

	pub fn remediation(&self) -> &'static str {
		ACCEPTED_FORMS_HINT
	}
}

/// Why a classified bundle could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecretLoadErrorKind {
	#[error("secret not found")]
	NotFound,

	#[error("access denied")]
	AccessDenied,

	#[error("secret store unavailable")]
	Unavailable,

	#[error("file not found")]
	FileNotFound,

	#[error("file unreadable")]
	FileUnreadable,

	#[error("malformed JSON at line {line}, column {column}")]
	MalformedJson { line: usize, column: usize },

	#[error("JSON payload is not an object")]
	NotAnObject,

	#[error("lookup cancelled")]
	Cancelled,
}

/// A classified bundle could not be turned into a record.
#[derive(Debug, Error)]
#[error("failed to load secrets bundle from {target}: {kind}")]
pub struct SecretLoadError {
	kind: SecretLoadErrorKind,
	target: String,
	#[source]
	cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SecretLoadError {
	pub(crate) fn new(kind: SecretLoadErrorKind, target: impl Into<String>) -> Self {
		Self {
			kind,
			target: target.into(),
			cause: None,
		}
	}

	pub(crate) fn with_cause(
		mut self,
		cause: impl Into<Box<dyn std::error::Error + Send + Sync>>,
	) -> Self {
		self.cause = Some(cause.into());
		self
	}

	pub(crate) fn from_store(error: StoreError, target: impl Into<String>) -> Self {
		let kind = match &error {
			StoreError::NotFound => SecretLoadErrorKind::NotFound,
			StoreError::AccessDenied(_) => SecretLoadErrorKind::AccessDenied,
			StoreError::Unavailable(_) => SecretLoadErrorKind::Unavailable,
		};
		Self::new(kind, target).with_cause(error)
	}

	pub(crate) fn from_file(error: FileReadError, path: &std::path::Path) -> Self {
		match error {
			FileReadError::NotFound => {
				Self::new(SecretLoadErrorKind::FileNotFound, path.display().to_string())
			}
			FileReadError::Unreadable(source) => {
				Self::new(SecretLoadErrorKind::FileUnreadable, path.display().to_string())
					.with_cause(source)
			}
		}
	}

	pub fn kind(&self) -> &SecretLoadErrorKind {
		&self.kind
	}

	/// Store identifier, file path, or `inline JSON`.
	pub fn target(&self) -> &str {
		&self.target
	}

	pub fn remediation(&self) -> String {
		match &self.kind {
			SecretLoadErrorKind::NotFound => format!(
				"check that the secret {} exists in the referenced account and region",
				self.target
			),
			SecretLoadErrorKind::AccessDenied => {
				"grant secretsmanager:GetSecretValue on the secret to the deploying identity".to_string()
			}
			SecretLoadErrorKind::Unavailable => {
				"the secret store could not be reached; retry, or pass the bundle inline or as @file"
					.to_string()
			}
			SecretLoadErrorKind::FileNotFound => format!(
				"no file at {}; paths after @ are relative to the working directory",
				self.target
			),
			SecretLoadErrorKind::FileUnreadable => format!(
				"make sure {} is readable and UTF-8 encoded",
				self.target
			),
			SecretLoadErrorKind::MalformedJson { .. } => {
				"the bundle must be a JSON object such as {\"tenant\":\"...\",\"client_id\":\"...\",\"client_secret\":\"...\"}"
					.to_string()
			}
			SecretLoadErrorKind::NotAnObject => {
				"the bundle must be a JSON object keyed by tenant, client_id, client_secret, app_definition_id"
					.to_string()
			}
			SecretLoadErrorKind::Cancelled => "the operation was cancelled; rerun to retry".to_string(),
		}
	}
}

/// A configuration source could not be read.
#[derive(Debug, Error)]
pub enum SourceError {
	#[error("failed to parse dotenv file {path}: {source}")]
	Dotenv {
		path: PathBuf,
		#[source]
		source: dotenvy::Error,
	},

	#[error("failed to read secret file {path} named by {var}: {source}")]
	SecretFile {
		var: String,
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("secret file path in {var} is empty")]
	EmptyFilePath { var: String },
}

/// Aggregate of every schema violation found in one pass.
///
/// Carries the merge notes of the failed attempt so a deprecated input
/// path is still reported when its values do not validate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("secrets bundle failed validation with {} error(s)", .result.errors().count())]
pub struct SchemaValidationError {
	result: ValidationResult,
	deprecations: Vec<DeprecationWarning>,
	conflicts: Vec<PrecedenceConflictWarning>,
}

impl SchemaValidationError {
	pub(crate) fn new(result: ValidationResult) -> Self {
		Self {
			result,
			deprecations: Vec::new(),
			conflicts: Vec::new(),
		}
	}

	pub(crate) fn with_merge_notes(
		mut self,
		deprecations: Vec<DeprecationWarning>,
		conflicts: Vec<PrecedenceConflictWarning>,
	) -> Self {
		self.deprecations = deprecations;
		self.conflicts = conflicts;
		self
	}

	/// The full result, warnings included.
	pub fn result(&self) -> &ValidationResult {
		&self.result
	}

	pub fn deprecations(&self) -> &[DeprecationWarning] {
		&self.deprecations
	}

	pub fn conflicts(&self) -> &[PrecedenceConflictWarning] {
		&self.conflicts
	}
}

/// The single tagged failure returned by [`crate::Resolver::resolve`].
#[derive(Debug, Error)]
pub enum ResolveError {
	#[error(transparent)]
	Classification(#[from] ClassificationError),

	#[error(transparent)]
	Load(#[from] SecretLoadError),

	#[error(transparent)]
	Schema(#[from] SchemaValidationError),

	#[error("no Benchling credentials were supplied")]
	NoCredentials,

	#[error("legacy credential fields are no longer accepted: {}", join_fields(.fields))]
	LegacyFieldsRejected { fields: Vec<CredentialField> },
}

impl ResolveError {
	/// Human-readable next step for the operator.
	pub fn remediation(&self) -> String {
		match self {
			ResolveError::Classification(e) => e.remediation().to_string(),
			ResolveError::Load(e) => e.remediation(),
			ResolveError::Schema(_) => {
				"fix every error listed above, then rerun; warnings do not block deployment".to_string()
			}
			ResolveError::NoCredentials => ACCEPTED_FORMS_HINT.to_string(),
			ResolveError::LegacyFieldsRejected { .. } => format!(
				"replace the individual fields with a single bundle; {ACCEPTED_FORMS_HINT}"
			),
		}
	}
}

fn join_fields(fields: &[CredentialField]) -> String {
	fields
		.iter()
		.map(|f| f.json_key())
		.collect::<Vec<_>>()
		.join(", ")
}
