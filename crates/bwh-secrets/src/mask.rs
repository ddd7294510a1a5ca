// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Safe-for-display rendering of credential records.
//!
//! `client_id` and `client_secret` show at most their last four
//! characters; `tenant` and `app_definition_id` are not sensitive and are
//! shown as-is. This is the only path by which a record reaches a log,
//! console, or error message.

use std::fmt;

use serde::Serialize;

use crate::record::{CredentialField, CredentialRecord};

const NOT_SET: &str = "<not set>";

/// Display form of a [`CredentialRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaskedCredentials {
	pub tenant: Option<String>,
	pub client_id: Option<String>,
	pub client_secret: Option<String>,
	pub app_definition_id: Option<String>,
}

impl MaskedCredentials {
	pub fn get(&self, field: CredentialField) -> Option<&str> {
		match field {
			CredentialField::Tenant => self.tenant.as_deref(),
			CredentialField::ClientId => self.client_id.as_deref(),
			CredentialField::ClientSecret => self.client_secret.as_deref(),
			CredentialField::AppDefinitionId => self.app_definition_id.as_deref(),
		}
	}
}

impl fmt::Display for MaskedCredentials {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, field) in CredentialField::ALL.into_iter().enumerate() {
			if i > 0 {
				writeln!(f)?;
			}
			write!(f, "{field}: {}", self.get(field).unwrap_or(NOT_SET))?;
		}
		Ok(())
	}
}

/// Render a record for display.
pub fn mask_record(record: &CredentialRecord) -> MaskedCredentials {
	MaskedCredentials {
		tenant: record.tenant().map(str::to_string),
		client_id: record.client_id().map(|v| v.masked()),
		client_secret: record.client_secret().map(|v| v.masked()),
		app_definition_id: record.app_definition_id().map(str::to_string),
	}
}

impl CredentialRecord {
	/// Shorthand for [`mask_record`].
	pub fn masked(&self) -> MaskedCredentials {
		mask_record(self)
	}
}
