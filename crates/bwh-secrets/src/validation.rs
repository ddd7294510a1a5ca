// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Schema validation for credential records.
//!
//! Every field is checked on every pass; all violations are returned
//! together. Errors block deployment, warnings do not.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::record::{CredentialField, CredentialRecord, FieldNote};

/// Client secrets shorter than this are treated as truncated.
pub const MIN_CLIENT_SECRET_LEN: usize = 8;

static TENANT_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z0-9-]+$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
	Error,
	Warning,
}

/// Whether an issue stems from a supplied value or from a gap no
/// source or default filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueOrigin {
	Supplied,
	Gap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
	pub field: String,
	pub severity: Severity,
	pub origin: IssueOrigin,
	pub message: String,
	pub hint: String,
}

impl ValidationIssue {
	fn error(field: impl Into<String>, origin: IssueOrigin, message: String, hint: &str) -> Self {
		Self {
			field: field.into(),
			severity: Severity::Error,
			origin,
			message,
			hint: hint.to_string(),
		}
	}

	fn warning(field: impl Into<String>, origin: IssueOrigin, message: String, hint: &str) -> Self {
		Self {
			field: field.into(),
			severity: Severity::Warning,
			origin,
			message,
			hint: hint.to_string(),
		}
	}
}

impl fmt::Display for ValidationIssue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let label = match self.severity {
			Severity::Error => "error",
			Severity::Warning => "warning",
		};
		write!(f, "{label}: {}: {} (hint: {})", self.field, self.message, self.hint)
	}
}

/// Ordered sequence of validation issues.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
	issues: Vec<ValidationIssue>,
}

impl ValidationResult {
	pub fn issues(&self) -> &[ValidationIssue] {
		&self.issues
	}

	pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
		self.issues.iter().filter(|i| i.severity == Severity::Error)
	}

	pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
		self.issues.iter().filter(|i| i.severity == Severity::Warning)
	}

	/// True when no error-severity issue is present.
	pub fn is_deploy_ready(&self) -> bool {
		self.errors().next().is_none()
	}

	pub(crate) fn into_warnings(self) -> Vec<ValidationIssue> {
		self.issues
			.into_iter()
			.filter(|i| i.severity == Severity::Warning)
			.collect()
	}
}

impl fmt::Display for ValidationResult {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for issue in &self.issues {
			writeln!(f, "{issue}")?;
		}
		Ok(())
	}
}

/// Validate a record against the fixed schema.
pub fn validate(record: &CredentialRecord) -> ValidationResult {
	let mut issues = Vec::new();

	for field in CredentialField::ALL {
		if let Some(found) = wrong_type(record, field) {
			issues.push(ValidationIssue::error(
				field.json_key(),
				IssueOrigin::Supplied,
				format!("{field} must be a string, found {found}"),
				"quote the value in the bundle JSON",
			));
			continue;
		}
		match field {
			CredentialField::Tenant => check_tenant(record, &mut issues),
			CredentialField::ClientId => check_client_id(record, &mut issues),
			CredentialField::ClientSecret => check_client_secret(record, &mut issues),
			CredentialField::AppDefinitionId => check_app_definition_id(record, &mut issues),
		}
	}

	for note in record.notes() {
		if let FieldNote::UnknownKey(key) = note {
			issues.push(ValidationIssue::warning(
				key.as_str(),
				IssueOrigin::Supplied,
				format!("unknown key {key:?} is ignored and will not be provisioned"),
				"remove the key, or check it for a typo of tenant, client_id, client_secret, app_definition_id",
			));
		}
	}

	ValidationResult { issues }
}

fn wrong_type(record: &CredentialRecord, field: CredentialField) -> Option<&'static str> {
	record.notes().iter().find_map(|note| match note {
		FieldNote::WrongType { field: f, found } if *f == field => Some(*found),
		_ => None,
	})
}

fn check_tenant(record: &CredentialRecord, issues: &mut Vec<ValidationIssue>) {
	let field = CredentialField::Tenant.json_key();
	match record.tenant() {
		None => issues.push(ValidationIssue::error(
			field,
			IssueOrigin::Gap,
			"tenant is required".to_string(),
			"add \"tenant\" to the bundle, or pass --catalog so it can be inferred",
		)),
		Some(tenant) if tenant.trim().is_empty() => issues.push(ValidationIssue::error(
			field,
			IssueOrigin::Supplied,
			"tenant must not be empty".to_string(),
			"use the subdomain of your Benchling URL, e.g. mycompany for mycompany.benchling.com",
		)),
		Some(tenant) if !TENANT_PATTERN.is_match(tenant) => {
			issues.push(ValidationIssue::error(
				field,
				IssueOrigin::Supplied,
				format!("tenant {tenant:?} may only contain lowercase letters, digits, and hyphens"),
				"use the subdomain of your Benchling URL, e.g. mycompany for mycompany.benchling.com",
			))
		}
		Some(_) => {}
	}
}

fn check_client_id(record: &CredentialRecord, issues: &mut Vec<ValidationIssue>) {
	let field = CredentialField::ClientId.json_key();
	match record.client_id() {
		None => issues.push(ValidationIssue::error(
			field,
			IssueOrigin::Gap,
			"client_id is required".to_string(),
			"copy the client ID from the Benchling app's settings page",
		)),
		Some(id) if id.is_blank() => issues.push(ValidationIssue::error(
			field,
			IssueOrigin::Supplied,
			"client_id must not be empty".to_string(),
			"copy the client ID from the Benchling app's settings page",
		)),
		Some(_) => {}
	}
}

fn check_client_secret(record: &CredentialRecord, issues: &mut Vec<ValidationIssue>) {
	let field = CredentialField::ClientSecret.json_key();
	match record.client_secret() {
		None => issues.push(ValidationIssue::error(
			field,
			IssueOrigin::Gap,
			"client_secret is required".to_string(),
			"generate a client secret in the Benchling app's settings page",
		)),
		Some(secret) if secret.is_blank() => issues.push(ValidationIssue::error(
			field,
			IssueOrigin::Supplied,
			"client_secret must not be empty".to_string(),
			"generate a client secret in the Benchling app's settings page",
		)),
		Some(secret) if secret.char_len() < MIN_CLIENT_SECRET_LEN => {
			issues.push(ValidationIssue::error(
				field,
				IssueOrigin::Supplied,
				format!(
					"client_secret is {} characters, expected at least {MIN_CLIENT_SECRET_LEN}; it looks truncated",
					secret.char_len()
				),
				"copy the full secret; it is shown only once when generated",
			))
		}
		Some(_) => {}
	}
}

fn check_app_definition_id(record: &CredentialRecord, issues: &mut Vec<ValidationIssue>) {
	let field = CredentialField::AppDefinitionId.json_key();
	match record.app_definition_id() {
		None => issues.push(ValidationIssue::warning(
			field,
			IssueOrigin::Gap,
			"app_definition_id is not set; a default will be synthesized downstream".to_string(),
			"add \"app_definition_id\" from the Benchling app manifest to pin it explicitly",
		)),
		Some(id) if id.trim().is_empty() => issues.push(ValidationIssue::error(
			field,
			IssueOrigin::Supplied,
			"app_definition_id must not be empty when provided".to_string(),
			"remove the key or set it to the app definition ID from the Benchling app manifest",
		)),
		Some(_) => {}
	}
}
