// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Clear-text handoff to the provisioning boundary.
//!
//! This is the one place revealed credential values leave the engine.
//! Obtaining a [`ProvisioningHandoff`] consumes the resolved configuration.

use std::collections::BTreeMap;
use std::fmt;

use bwh_common_secret::{SecretString, REDACTED};
use serde_json::{Map, Value};

use crate::record::{CredentialField, CredentialRecord};

/// Revealed credential values keyed by semantic field name.
#[derive(Clone, PartialEq, Eq)]
pub struct ProvisioningHandoff {
	values: BTreeMap<CredentialField, SecretString>,
}

impl ProvisioningHandoff {
	pub(crate) fn from_record(record: CredentialRecord) -> Self {
		Self {
			values: record.into_values().into_iter().collect(),
		}
	}

	/// Clear-text value for `field`.
	pub fn get(&self, field: CredentialField) -> Option<&str> {
		self.values.get(&field).map(|v| v.reveal().as_str())
	}

	/// Present fields in schema order, clear text.
	pub fn iter(&self) -> impl Iterator<Item = (CredentialField, &str)> + '_ {
		self.values.iter().map(|(k, v)| (*k, v.reveal().as_str()))
	}

	/// Environment variable pairs for container injection.
	pub fn to_env(&self) -> Vec<(&'static str, String)> {
		self
			.iter()
			.map(|(field, value)| (field.legacy_env_var(), value.to_string()))
			.collect()
	}

	/// Bundle JSON suitable for storing back into a secret store.
	pub fn to_bundle_json(&self) -> SecretString {
		let object: Map<String, Value> = self
			.iter()
			.map(|(field, value)| (field.json_key().to_string(), Value::String(value.to_string())))
			.collect();
		SecretString::new(Value::Object(object).to_string())
	}
}

impl fmt::Debug for ProvisioningHandoff {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut map = f.debug_map();
		for field in self.values.keys() {
			map.entry(&field.json_key(), &REDACTED);
		}
		map.finish()
	}
}
