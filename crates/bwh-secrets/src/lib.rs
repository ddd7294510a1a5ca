// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Benchling credential resolution.
//!
//! Reads candidate values from the command line, environment, dotenv file,
//! and inferred defaults; merges them by precedence; classifies and loads
//! the winning secrets bundle; validates the result against the credential
//! schema.
//!
//! # Example
//!
//! ```no_run
//! use bwh_secrets::{EnvSnapshot, ResolveInputs, Resolver};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let inputs = ResolveInputs {
//! 	env: EnvSnapshot::from_process(),
//! 	..Default::default()
//! };
//! let candidates = inputs.read()?;
//! let config = Resolver::default()
//! 	.resolve(&candidates, &CancellationToken::new())
//! 	.await?;
//! println!("{}", config.masked());
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod error;
pub mod handoff;
pub mod loader;
pub mod mask;
pub mod merge;
pub mod record;
pub mod resolve;
pub mod sources;
pub mod store;
pub mod validation;

pub use bwh_common_secret::{Secret, SecretString};
pub use classify::{classify, ClassifiedForm, SecretsBundleInput, StoreReference};
pub use error::{
	ClassificationError, ResolveError, SchemaValidationError, SecretLoadError, SecretLoadErrorKind,
	SourceError,
};
pub use handoff::ProvisioningHandoff;
pub use loader::SecretLoader;
pub use mask::{mask_record, MaskedCredentials};
pub use merge::{
	merge, DeprecationWarning, LegacyFieldPolicy, MergeOutcome, MergePlan, PrecedenceConflictWarning,
	LEGACY_FIELDS_ENV_VAR,
};
pub use record::{CredentialField, CredentialRecord, FieldNote, RecordForm};
pub use resolve::{EffectiveConfig, RecordOrigin, Resolver};
pub use sources::{
	infer_tenant_from_catalog, read_candidates, CandidateKey, CandidateSource, CliSource, CliValues,
	DotenvSource, EnvSnapshot, EnvSource, InferredSource, Precedence, RawCandidate, ResolveInputs,
	Source, CATALOG_ENV_VAR, SECRETS_ENV_VAR,
};
pub use store::{
	FileReadError, FileReader, LocalFileReader, SecretStore, StaticSecretStore, StoreError,
	UnconfiguredSecretStore,
};
pub use validation::{validate, IssueOrigin, Severity, ValidationIssue, ValidationResult};
