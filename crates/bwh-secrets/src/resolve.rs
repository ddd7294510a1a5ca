// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The resolution pipeline: merge, classify, load, validate.

use std::collections::BTreeMap;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::{ResolveError, SchemaValidationError};
use crate::handoff::ProvisioningHandoff;
use crate::loader::SecretLoader;
use crate::mask::MaskedCredentials;
use crate::merge::{merge, DeprecationWarning, LegacyFieldPolicy, MergePlan, PrecedenceConflictWarning};
use crate::record::{CredentialField, CredentialRecord, RecordForm};
use crate::sources::{RawCandidate, Source};
use crate::validation::{validate, ValidationIssue};

/// How the record was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOrigin {
	/// Loaded from the unified bundle supplied by `source`.
	Bundle { form: RecordForm, source: Source },
	/// Assembled from deprecated individual fields.
	LegacyFields,
}

/// The validated, merged configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveConfig {
	record: CredentialRecord,
	origin: RecordOrigin,
	provenance: BTreeMap<CredentialField, Source>,
	deprecations: Vec<DeprecationWarning>,
	conflicts: Vec<PrecedenceConflictWarning>,
	warnings: Vec<ValidationIssue>,
}

impl EffectiveConfig {
	pub fn record(&self) -> &CredentialRecord {
		&self.record
	}

	pub fn origin(&self) -> &RecordOrigin {
		&self.origin
	}

	/// Which source supplied each present field.
	pub fn provenance(&self) -> &BTreeMap<CredentialField, Source> {
		&self.provenance
	}

	pub fn deprecations(&self) -> &[DeprecationWarning] {
		&self.deprecations
	}

	pub fn conflicts(&self) -> &[PrecedenceConflictWarning] {
		&self.conflicts
	}

	/// Non-blocking validation issues.
	pub fn warnings(&self) -> &[ValidationIssue] {
		&self.warnings
	}

	pub fn masked(&self) -> MaskedCredentials {
		self.record.masked()
	}

	/// Hand the revealed values to the provisioning boundary.
	pub fn into_handoff(self) -> ProvisioningHandoff {
		ProvisioningHandoff::from_record(self.record)
	}
}

pub struct Resolver {
	loader: SecretLoader,
	policy: LegacyFieldPolicy,
}

impl Resolver {
	pub fn new(loader: SecretLoader) -> Self {
		Self {
			loader,
			policy: LegacyFieldPolicy::default(),
		}
	}

	pub fn with_policy(mut self, policy: LegacyFieldPolicy) -> Self {
		self.policy = policy;
		self
	}

	/// Resolve `candidates` into a validated configuration.
	///
	/// Classification and load failures abort immediately. Schema errors
	/// are reported together in one [`SchemaValidationError`], along with
	/// the deprecations and conflicts of the merge.
	#[instrument(skip_all, fields(candidates = candidates.len()))]
	pub async fn resolve(
		&self,
		candidates: &[RawCandidate],
		cancel: &CancellationToken,
	) -> Result<EffectiveConfig, ResolveError> {
		let outcome = merge(candidates.to_vec());
		let deprecations = outcome.deprecations();

		let (record, origin, mut provenance) = match outcome.plan {
			MergePlan::Empty => return Err(ResolveError::NoCredentials),
			MergePlan::Legacy { fields } => {
				if self.policy == LegacyFieldPolicy::Reject {
					return Err(ResolveError::LegacyFieldsRejected {
						fields: fields.into_keys().collect(),
					});
				}
				for deprecation in &deprecations {
					warn!(
						parameter = deprecation.parameter,
						source = %deprecation.source,
						"deprecated credential parameter in use"
					);
				}
				let provenance: BTreeMap<_, _> = fields.iter().map(|(f, c)| (*f, c.source())).collect();
				let record =
					CredentialRecord::from_fields(fields.into_iter().map(|(f, c)| (f, c.into_value())));
				(record, RecordOrigin::LegacyFields, provenance)
			}
			MergePlan::Bundle { input, source } => {
				let form = input.classify();
				debug!(form = form.label(), source = %source, "classified secrets bundle");
				let record = self.loader.load(form, cancel).await?;
				let provenance: BTreeMap<_, _> = CredentialField::ALL
					.into_iter()
					.filter(|f| record.has(*f))
					.map(|f| (f, source))
					.collect();
				let origin = RecordOrigin::Bundle {
					form: record.form().clone(),
					source,
				};
				(record, origin, provenance)
			}
		};

		let record = match outcome.inferred_tenant {
			Some(tenant) if !record.has(CredentialField::Tenant) => {
				debug!(tenant = %tenant, "filling tenant from inferred default");
				provenance.insert(CredentialField::Tenant, Source::Inferred);
				record.with_tenant_fallback(Some(&tenant))
			}
			_ => record,
		};

		let result = validate(&record);
		if !result.is_deploy_ready() {
			warn!(
				errors = result.errors().count(),
				warnings = result.warnings().count(),
				"secrets bundle failed validation"
			);
			return Err(SchemaValidationError::new(result)
				.with_merge_notes(deprecations, outcome.conflicts)
				.into());
		}

		info!(
			form = record.form().label(),
			warnings = result.warnings().count(),
			deprecations = deprecations.len(),
			"resolved Benchling credentials"
		);

		Ok(EffectiveConfig {
			record,
			origin,
			provenance,
			deprecations,
			conflicts: outcome.conflicts,
			warnings: result.into_warnings(),
		})
	}
}

impl Default for Resolver {
	fn default() -> Self {
		Self::new(SecretLoader::default())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sources::CandidateKey;

	const BUNDLE: &str = r#"{"tenant":"mycompany","client_id":"abc123","client_secret":"secret_key_12345"}"#;

	fn bundle(source: Source, value: &str) -> RawCandidate {
		RawCandidate::new(source, CandidateKey::Bundle, value)
	}

	fn field(source: Source, field: CredentialField, value: &str) -> RawCandidate {
		RawCandidate::new(source, CandidateKey::Field(field), value)
	}

	#[tokio::test]
	async fn resolves_inline_bundle() {
		let config = Resolver::default()
			.resolve(&[bundle(Source::Cli, BUNDLE)], &CancellationToken::new())
			.await
			.unwrap();

		assert_eq!(
			config.origin(),
			&RecordOrigin::Bundle {
				form: RecordForm::InlineJson,
				source: Source::Cli
			}
		);
		assert_eq!(config.provenance().len(), 3);
		assert_eq!(config.warnings().len(), 1);
		assert_eq!(config.warnings()[0].field, "app_definition_id");
		assert!(config.deprecations().is_empty());
	}

	#[tokio::test]
	async fn legacy_fields_attach_deprecations() {
		let config = Resolver::default()
			.resolve(
				&[
					field(Source::Environment, CredentialField::Tenant, "mycompany"),
					field(Source::Environment, CredentialField::ClientId, "abc123"),
					field(Source::Cli, CredentialField::ClientSecret, "secret_key_12345"),
				],
				&CancellationToken::new(),
			)
			.await
			.unwrap();

		assert_eq!(config.origin(), &RecordOrigin::LegacyFields);
		assert_eq!(config.deprecations().len(), 3);
		assert_eq!(
			config.provenance()[&CredentialField::ClientSecret],
			Source::Cli
		);
	}

	#[tokio::test]
	async fn reject_policy_refuses_legacy_fields() {
		let err = Resolver::default()
			.with_policy(LegacyFieldPolicy::Reject)
			.resolve(
				&[field(Source::Environment, CredentialField::Tenant, "mycompany")],
				&CancellationToken::new(),
			)
			.await
			.unwrap_err();

		assert!(matches!(
			err,
			ResolveError::LegacyFieldsRejected { fields } if fields == vec![CredentialField::Tenant]
		));
	}

	#[tokio::test]
	async fn reject_policy_allows_bundle() {
		let config = Resolver::default()
			.with_policy(LegacyFieldPolicy::Reject)
			.resolve(
				&[
					bundle(Source::Environment, BUNDLE),
					field(Source::Environment, CredentialField::Tenant, "ignored"),
				],
				&CancellationToken::new(),
			)
			.await
			.unwrap();
		assert_eq!(config.record().tenant(), Some("mycompany"));
		assert!(config.conflicts().is_empty());
	}

	#[tokio::test]
	async fn inferred_tenant_fills_gap() {
		let config = Resolver::default()
			.resolve(
				&[
					field(Source::Inferred, CredentialField::Tenant, "acme"),
					bundle(
						Source::Environment,
						r#"{"client_id":"abc123","client_secret":"secret_key_12345"}"#,
					),
				],
				&CancellationToken::new(),
			)
			.await
			.unwrap();

		assert_eq!(config.record().tenant(), Some("acme"));
		assert_eq!(
			config.provenance()[&CredentialField::Tenant],
			Source::Inferred
		);
	}

	#[tokio::test]
	async fn no_candidates_is_no_credentials() {
		let err = Resolver::default()
			.resolve(&[], &CancellationToken::new())
			.await
			.unwrap_err();
		assert!(matches!(err, ResolveError::NoCredentials));
	}

	#[tokio::test]
	async fn schema_errors_are_aggregated() {
		let err = Resolver::default()
			.resolve(
				&[bundle(Source::Cli, r#"{"tenant":"My Company","client_secret":"short"}"#)],
				&CancellationToken::new(),
			)
			.await
			.unwrap_err();

		let ResolveError::Schema(schema) = err else {
			panic!("expected schema error");
		};
		assert_eq!(schema.result().errors().count(), 3);
		assert!(schema.deprecations().is_empty());
	}

	#[tokio::test]
	async fn failed_legacy_fields_keep_deprecations() {
		let err = Resolver::default()
			.resolve(
				&[
					field(Source::Environment, CredentialField::Tenant, "mycompany"),
					field(Source::Dotenv, CredentialField::Tenant, "other"),
				],
				&CancellationToken::new(),
			)
			.await
			.unwrap_err();

		let ResolveError::Schema(schema) = err else {
			panic!("expected schema error");
		};
		assert_eq!(schema.result().errors().count(), 2);
		assert_eq!(schema.deprecations().len(), 1);
		assert_eq!(schema.deprecations()[0].parameter, "BENCHLING_TENANT");
		assert_eq!(schema.conflicts().len(), 1);
		assert_eq!(schema.conflicts()[0].shadowed, Source::Dotenv);
	}

	#[tokio::test]
	async fn handoff_consumes_config() {
		let config = Resolver::default()
			.resolve(&[bundle(Source::Cli, BUNDLE)], &CancellationToken::new())
			.await
			.unwrap();
		let handoff = config.into_handoff();
		assert_eq!(handoff.get(CredentialField::ClientId), Some("abc123"));
	}
}
