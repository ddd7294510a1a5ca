// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Priority merge of raw candidates.
//!
//! Precedence, highest first:
//!
//! 1. `--secrets`
//! 2. `BENCHLING_SECRETS`
//! 3. deprecated individual fields from the CLI or environment
//! 4. dotenv file values
//! 5. inferred defaults (tenant only)
//!
//! A unified bundle at level 1 or 2 shadows every individual field. The
//! shadowed fields raise neither a deprecation nor a conflict warning.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::classify::SecretsBundleInput;
use crate::record::CredentialField;
use crate::sources::{CandidateKey, Precedence, RawCandidate, Source, SECRETS_ENV_VAR};

/// Environment variable selecting the [`LegacyFieldPolicy`].
pub const LEGACY_FIELDS_ENV_VAR: &str = "BWH_LEGACY_FIELDS";

/// How deprecated individual fields are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LegacyFieldPolicy {
	/// Accept them and attach a deprecation warning per field.
	#[default]
	Warn,
	/// Refuse them outright.
	Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid legacy field policy '{0}', expected 'warn' or 'reject'")]
pub struct ParsePolicyError(String);

impl FromStr for LegacyFieldPolicy {
	type Err = ParsePolicyError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"warn" => Ok(LegacyFieldPolicy::Warn),
			"reject" => Ok(LegacyFieldPolicy::Reject),
			_ => Err(ParsePolicyError(s.to_string())),
		}
	}
}

/// A deprecated individual field was used to build the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeprecationWarning {
	pub field: CredentialField,
	pub source: Source,
	pub parameter: &'static str,
}

impl fmt::Display for DeprecationWarning {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{} ({}) is deprecated; put \"{}\" in the --secrets / {SECRETS_ENV_VAR} bundle instead",
			self.parameter, self.source, self.field
		)
	}
}

/// A lower-priority value was shadowed by a higher-priority one.
///
/// Informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrecedenceConflictWarning {
	pub shadowed: Source,
	pub shadowed_parameter: &'static str,
	pub winner: Source,
	pub winner_parameter: &'static str,
}

impl PrecedenceConflictWarning {
	fn new(shadowed: &RawCandidate, winner: &RawCandidate) -> Self {
		Self {
			shadowed: shadowed.source(),
			shadowed_parameter: shadowed.parameter(),
			winner: winner.source(),
			winner_parameter: winner.parameter(),
		}
	}
}

impl fmt::Display for PrecedenceConflictWarning {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{} from {} ignored; {} from {} takes precedence",
			self.shadowed_parameter, self.shadowed, self.winner_parameter, self.winner
		)
	}
}

/// What the pipeline should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergePlan {
	/// Classify and load the winning bundle.
	Bundle {
		input: SecretsBundleInput,
		source: Source,
	},
	/// Build the record directly from individual fields.
	Legacy {
		fields: BTreeMap<CredentialField, RawCandidate>,
	},
	/// Nothing usable was supplied.
	Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
	pub plan: MergePlan,
	pub inferred_tenant: Option<String>,
	pub conflicts: Vec<PrecedenceConflictWarning>,
}

impl MergeOutcome {
	/// One deprecation per individual field the plan uses.
	pub fn deprecations(&self) -> Vec<DeprecationWarning> {
		let MergePlan::Legacy { fields } = &self.plan else {
			return Vec::new();
		};
		fields
			.iter()
			.map(|(field, candidate)| DeprecationWarning {
				field: *field,
				source: candidate.source(),
				parameter: candidate.parameter(),
			})
			.collect()
	}
}

/// Pick the effective bundle or field set from `candidates`.
pub fn merge(candidates: Vec<RawCandidate>) -> MergeOutcome {
	let mut bundles = Vec::new();
	let mut legacy = Vec::new();
	let mut inferred_tenant = None;

	for candidate in candidates {
		match (candidate.key(), candidate.source()) {
			(CandidateKey::Bundle, Source::Inferred) => {}
			(CandidateKey::Bundle, _) => bundles.push(candidate),
			(CandidateKey::Field(CredentialField::Tenant), Source::Inferred) => {
				if inferred_tenant.is_none() {
					inferred_tenant = Some(candidate.value().reveal().clone());
				}
			}
			(CandidateKey::Field(_), Source::Inferred) => {}
			(CandidateKey::Field(_), _) => legacy.push(candidate),
		}
	}

	bundles.sort_by_key(|c| std::cmp::Reverse(c.source().precedence()));
	legacy.sort_by_key(|c| std::cmp::Reverse(c.source().precedence()));

	let top_legacy_is_direct = legacy
		.first()
		.is_some_and(|c| c.source().precedence() > Precedence::Dotenv);
	let bundle_wins = bundles.first().is_some_and(|b| {
		b.source().precedence() >= Precedence::Environment || !top_legacy_is_direct
	});

	let mut conflicts = Vec::new();
	let plan = if bundle_wins {
		let winner = bundles.remove(0);
		for shadowed in &bundles {
			conflicts.push(PrecedenceConflictWarning::new(shadowed, &winner));
		}
		for shadowed in &legacy {
			debug!(
				source = %shadowed.source(),
				parameter = shadowed.parameter(),
				"individual field shadowed by unified bundle"
			);
		}
		debug!(source = %winner.source(), "unified bundle selected");
		MergePlan::Bundle {
			source: winner.source(),
			input: SecretsBundleInput::from_secret(winner.into_value()),
		}
	} else if let Some(first) = legacy.first().cloned() {
		for shadowed in &bundles {
			conflicts.push(PrecedenceConflictWarning::new(shadowed, &first));
		}

		let mut fields: BTreeMap<CredentialField, RawCandidate> = BTreeMap::new();
		for candidate in legacy {
			let CandidateKey::Field(field) = candidate.key() else {
				continue;
			};
			match fields.get(&field) {
				Some(winner) => conflicts.push(PrecedenceConflictWarning::new(&candidate, winner)),
				None => {
					fields.insert(field, candidate);
				}
			}
		}
		info!(fields = fields.len(), "building record from individual fields");
		MergePlan::Legacy { fields }
	} else {
		MergePlan::Empty
	};

	for conflict in &conflicts {
		debug!(
			shadowed = %conflict.shadowed,
			parameter = conflict.shadowed_parameter,
			winner = %conflict.winner,
			"shadowed lower-priority value"
		);
	}

	MergeOutcome {
		plan,
		inferred_tenant,
		conflicts,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn bundle(source: Source, value: &str) -> RawCandidate {
		RawCandidate::new(source, CandidateKey::Bundle, value)
	}

	fn field(source: Source, field: CredentialField, value: &str) -> RawCandidate {
		RawCandidate::new(source, CandidateKey::Field(field), value)
	}

	fn bundle_source(outcome: &MergeOutcome) -> Option<Source> {
		match &outcome.plan {
			MergePlan::Bundle { source, .. } => Some(*source),
			_ => None,
		}
	}

	#[test]
	fn cli_bundle_beats_env_bundle() {
		let outcome = merge(vec![
			bundle(Source::Environment, "{\"tenant\":\"env\"}"),
			bundle(Source::Cli, "{\"tenant\":\"cli\"}"),
		]);

		assert_eq!(bundle_source(&outcome), Some(Source::Cli));
		assert_eq!(outcome.conflicts.len(), 1);
		assert_eq!(outcome.conflicts[0].shadowed, Source::Environment);
		assert_eq!(outcome.conflicts[0].winner_parameter, "--secrets");
	}

	#[test]
	fn bundle_shadows_legacy_without_deprecations() {
		let outcome = merge(vec![
			bundle(Source::Environment, "{\"tenant\":\"acme\"}"),
			field(Source::Cli, CredentialField::ClientSecret, "legacy-secret"),
			field(Source::Environment, CredentialField::Tenant, "legacy"),
		]);

		assert_eq!(bundle_source(&outcome), Some(Source::Environment));
		assert!(outcome.deprecations().is_empty());
		assert!(outcome.conflicts.is_empty());
	}

	#[test]
	fn shadowed_bundle_is_still_a_conflict_next_to_legacy_fields() {
		let outcome = merge(vec![
			bundle(Source::Cli, "{\"tenant\":\"acme\"}"),
			bundle(Source::Environment, "{\"tenant\":\"other\"}"),
			field(Source::Environment, CredentialField::Tenant, "legacy"),
		]);

		assert_eq!(bundle_source(&outcome), Some(Source::Cli));
		assert_eq!(outcome.conflicts.len(), 1);
		assert_eq!(outcome.conflicts[0].shadowed_parameter, SECRETS_ENV_VAR);
	}

	#[test]
	fn legacy_fields_pick_highest_source_per_field() {
		let outcome = merge(vec![
			field(Source::Dotenv, CredentialField::Tenant, "from-dotenv"),
			field(Source::Environment, CredentialField::Tenant, "from-env"),
			field(Source::Cli, CredentialField::ClientId, "abc123"),
			field(Source::Dotenv, CredentialField::ClientSecret, "dotenv-secret"),
		]);

		let MergePlan::Legacy { fields } = &outcome.plan else {
			panic!("expected legacy plan");
		};
		assert_eq!(fields[&CredentialField::Tenant].value().reveal(), "from-env");
		assert_eq!(fields[&CredentialField::ClientId].source(), Source::Cli);
		assert_eq!(fields[&CredentialField::ClientSecret].source(), Source::Dotenv);
		assert_eq!(outcome.conflicts.len(), 1);

		let deprecations = outcome.deprecations();
		assert_eq!(deprecations.len(), 3);
		assert_eq!(deprecations[0].parameter, "BENCHLING_TENANT");
		assert_eq!(deprecations[1].parameter, "--client-id");
	}

	#[test]
	fn direct_legacy_beats_dotenv_bundle() {
		let outcome = merge(vec![
			bundle(Source::Dotenv, "{\"tenant\":\"dotenv\"}"),
			field(Source::Environment, CredentialField::Tenant, "acme"),
		]);

		assert!(matches!(outcome.plan, MergePlan::Legacy { .. }));
		assert_eq!(outcome.conflicts[0].shadowed, Source::Dotenv);
		assert_eq!(outcome.conflicts[0].winner_parameter, "BENCHLING_TENANT");
	}

	#[test]
	fn dotenv_bundle_beats_dotenv_fields() {
		let outcome = merge(vec![
			bundle(Source::Dotenv, "{\"tenant\":\"dotenv\"}"),
			field(Source::Dotenv, CredentialField::Tenant, "acme"),
		]);

		assert_eq!(bundle_source(&outcome), Some(Source::Dotenv));
		assert!(outcome.deprecations().is_empty());
	}

	#[test]
	fn inferred_tenant_is_carried_separately() {
		let outcome = merge(vec![field(Source::Inferred, CredentialField::Tenant, "acme")]);
		assert_eq!(outcome.plan, MergePlan::Empty);
		assert_eq!(outcome.inferred_tenant.as_deref(), Some("acme"));
	}

	#[test]
	fn nothing_supplied_is_empty() {
		assert_eq!(merge(Vec::new()).plan, MergePlan::Empty);
	}

	#[test]
	fn parses_policy() {
		assert_eq!("warn".parse(), Ok(LegacyFieldPolicy::Warn));
		assert_eq!(" Reject ".parse(), Ok(LegacyFieldPolicy::Reject));
		assert!("block".parse::<LegacyFieldPolicy>().is_err());
	}

	#[test]
	fn conflict_display_names_parameters() {
		let outcome = merge(vec![
			bundle(Source::Environment, "{}"),
			bundle(Source::Cli, "{}"),
		]);
		assert_eq!(
			outcome.conflicts[0].to_string(),
			"BENCHLING_SECRETS from environment ignored; --secrets from cli takes precedence"
		);
	}
}
