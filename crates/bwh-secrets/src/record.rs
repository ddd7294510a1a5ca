// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Normalized credential record.

use std::fmt;
use std::path::PathBuf;

use bwh_common_secret::SecretString;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::classify::StoreReference;

/// The fixed set of semantic credential fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialField {
	Tenant,
	ClientId,
	ClientSecret,
	AppDefinitionId,
}

impl CredentialField {
	/// All fields in validation/display order.
	pub const ALL: [CredentialField; 4] = [
		CredentialField::Tenant,
		CredentialField::ClientId,
		CredentialField::ClientSecret,
		CredentialField::AppDefinitionId,
	];

	/// Key used inside a secrets bundle JSON object.
	pub fn json_key(self) -> &'static str {
		match self {
			CredentialField::Tenant => "tenant",
			CredentialField::ClientId => "client_id",
			CredentialField::ClientSecret => "client_secret",
			CredentialField::AppDefinitionId => "app_definition_id",
		}
	}

	pub fn from_json_key(key: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|f| f.json_key() == key)
	}

	/// Deprecated individual environment variable for this field.
	pub fn legacy_env_var(self) -> &'static str {
		match self {
			CredentialField::Tenant => "BENCHLING_TENANT",
			CredentialField::ClientId => "BENCHLING_CLIENT_ID",
			CredentialField::ClientSecret => "BENCHLING_CLIENT_SECRET",
			CredentialField::AppDefinitionId => "BENCHLING_APP_DEFINITION_ID",
		}
	}

	/// Deprecated individual CLI flag for this field.
	pub fn legacy_cli_flag(self) -> &'static str {
		match self {
			CredentialField::Tenant => "--tenant",
			CredentialField::ClientId => "--client-id",
			CredentialField::ClientSecret => "--client-secret",
			CredentialField::AppDefinitionId => "--app-id",
		}
	}

	/// Whether display must go through suffix masking.
	pub fn is_sensitive(self) -> bool {
		matches!(self, CredentialField::ClientId | CredentialField::ClientSecret)
	}
}

impl fmt::Display for CredentialField {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.json_key())
	}
}

/// Which input form produced a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordForm {
	StoreReference(StoreReference),
	InlineJson,
	FileReference(PathBuf),
	/// Built directly from deprecated individual fields.
	LegacyFields,
}

impl RecordForm {
	pub fn label(&self) -> &'static str {
		match self {
			RecordForm::StoreReference(_) => "store-reference",
			RecordForm::InlineJson => "inline-json",
			RecordForm::FileReference(_) => "file-reference",
			RecordForm::LegacyFields => "legacy-fields",
		}
	}
}

/// Something normalization noticed but did not reject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldNote {
	/// Key outside the schema; its value is dropped.
	UnknownKey(String),
	/// Known key whose JSON value is not a string.
	WrongType {
		field: CredentialField,
		found: &'static str,
	},
}

/// The normalized credential record.
///
/// Immutable once built. `client_id` and `client_secret` are held as
/// [`SecretString`] and only leave through masking or the provisioning
/// handoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
	tenant: Option<String>,
	client_id: Option<SecretString>,
	client_secret: Option<SecretString>,
	app_definition_id: Option<String>,
	form: RecordForm,
	notes: Vec<FieldNote>,
}

impl CredentialRecord {
	/// Normalize a JSON object into a record.
	///
	/// Unknown keys become [`FieldNote::UnknownKey`]; non-string values for
	/// known keys become [`FieldNote::WrongType`]. `null` counts as absent.
	pub(crate) fn from_json_object(object: Map<String, Value>, form: RecordForm) -> Self {
		let mut record = Self::empty(form);

		for (key, value) in object {
			let Some(field) = CredentialField::from_json_key(&key) else {
				record.notes.push(FieldNote::UnknownKey(key));
				continue;
			};
			match value {
				Value::String(s) => record.set(field, s),
				Value::Null => {}
				other => record.notes.push(FieldNote::WrongType {
					field,
					found: json_kind(&other),
				}),
			}
		}

		record
	}

	/// Build a record from individually supplied legacy values.
	pub(crate) fn from_fields(fields: impl IntoIterator<Item = (CredentialField, SecretString)>) -> Self {
		let mut record = Self::empty(RecordForm::LegacyFields);
		for (field, value) in fields {
			record.set(field, value.into_inner());
		}
		record
	}

	/// Fill the tenant from a lower-priority default when the record has none.
	///
	/// Consumes the record so the result is a new immutable value.
	pub(crate) fn with_tenant_fallback(mut self, tenant: Option<&str>) -> Self {
		if self.tenant.is_none() {
			self.tenant = tenant.map(str::to_string);
		}
		self
	}

	fn empty(form: RecordForm) -> Self {
		Self {
			tenant: None,
			client_id: None,
			client_secret: None,
			app_definition_id: None,
			form,
			notes: Vec::new(),
		}
	}

	fn set(&mut self, field: CredentialField, value: String) {
		match field {
			CredentialField::Tenant => self.tenant = Some(value),
			CredentialField::ClientId => self.client_id = Some(SecretString::new(value)),
			CredentialField::ClientSecret => self.client_secret = Some(SecretString::new(value)),
			CredentialField::AppDefinitionId => self.app_definition_id = Some(value),
		}
	}

	pub fn tenant(&self) -> Option<&str> {
		self.tenant.as_deref()
	}

	pub fn client_id(&self) -> Option<&SecretString> {
		self.client_id.as_ref()
	}

	pub fn client_secret(&self) -> Option<&SecretString> {
		self.client_secret.as_ref()
	}

	pub fn app_definition_id(&self) -> Option<&str> {
		self.app_definition_id.as_deref()
	}

	pub fn form(&self) -> &RecordForm {
		&self.form
	}

	pub fn notes(&self) -> &[FieldNote] {
		&self.notes
	}

	/// Whether a value (of any content) is present for the field.
	pub fn has(&self, field: CredentialField) -> bool {
		match field {
			CredentialField::Tenant => self.tenant.is_some(),
			CredentialField::ClientId => self.client_id.is_some(),
			CredentialField::ClientSecret => self.client_secret.is_some(),
			CredentialField::AppDefinitionId => self.app_definition_id.is_some(),
		}
	}

	/// Consume the record, yielding each present value wrapped as a secret.
	pub(crate) fn into_values(self) -> Vec<(CredentialField, SecretString)> {
		let mut values = Vec::with_capacity(4);
		if let Some(tenant) = &self.tenant {
			values.push((CredentialField::Tenant, SecretString::new(tenant.clone())));
		}
		if let Some(id) = &self.client_id {
			values.push((CredentialField::ClientId, id.clone()));
		}
		if let Some(secret) = &self.client_secret {
			values.push((CredentialField::ClientSecret, secret.clone()));
		}
		if let Some(app) = &self.app_definition_id {
			values.push((CredentialField::AppDefinitionId, SecretString::new(app.clone())));
		}
		values
	}
}

fn json_kind(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "boolean",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) => "array",
		Value::Object(_) => "object",
	}
}
