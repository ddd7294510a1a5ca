// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secrets bundle format classification.
//!
//! Pure string inspection: no filesystem or network access. Rules are
//! checked in order and the first match wins:
//!
//! 1. Secrets Manager ARN → [`ClassifiedForm::StoreReference`]
//! 2. Leading `@` → [`ClassifiedForm::FileReference`]
//! 3. Leading `{` → [`ClassifiedForm::InlineJson`]
//! 4. Anything else → [`ClassifiedForm::Unrecognized`]

use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use bwh_common_secret::SecretString;
use regex::Regex;

static STORE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r"^arn:(aws|aws-cn|aws-us-gov):secretsmanager:([a-z]{2}(?:-[a-z]+)+-\d+):(\d{12}):secret:([A-Za-z0-9/_+=.@-]+)$",
	)
	.unwrap()
});

/// A parsed reference to a secret held in AWS Secrets Manager.
///
/// Identifiers are not secret material and display verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreReference {
	partition: String,
	region: String,
	account: String,
	name: String,
}

impl StoreReference {
	/// Parse an ARN, returning `None` if it does not match the accepted pattern.
	pub fn parse(value: &str) -> Option<Self> {
		let caps = STORE_REFERENCE.captures(value)?;
		Some(Self {
			partition: caps[1].to_string(),
			region: caps[2].to_string(),
			account: caps[3].to_string(),
			name: caps[4].to_string(),
		})
	}

	pub fn partition(&self) -> &str {
		&self.partition
	}

	pub fn region(&self) -> &str {
		&self.region
	}

	pub fn account(&self) -> &str {
		&self.account
	}

	pub fn name(&self) -> &str {
		&self.name
	}
}

impl fmt::Display for StoreReference {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"arn:{}:secretsmanager:{}:{}:secret:{}",
			self.partition, self.region, self.account, self.name
		)
	}
}

/// The classified form of a secrets bundle input. Exactly one is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedForm {
	StoreReference(StoreReference),
	InlineJson(SecretString),
	FileReference(PathBuf),
	Unrecognized(SecretString),
}

impl ClassifiedForm {
	pub fn label(&self) -> &'static str {
		match self {
			ClassifiedForm::StoreReference(_) => "store-reference",
			ClassifiedForm::InlineJson(_) => "inline-json",
			ClassifiedForm::FileReference(_) => "file-reference",
			ClassifiedForm::Unrecognized(_) => "unrecognized",
		}
	}
}

/// The raw value supplied for the unified secrets parameter.
///
/// May itself be inline JSON carrying the client secret, so it stays
/// wrapped until classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretsBundleInput(SecretString);

impl SecretsBundleInput {
	pub fn new(value: impl Into<String>) -> Self {
		Self(SecretString::new(value.into()))
	}

	pub(crate) fn from_secret(value: SecretString) -> Self {
		Self(value)
	}

	/// Classify this input.
	pub fn classify(&self) -> ClassifiedForm {
		classify(self.0.reveal())
	}
}

/// Classify one raw secrets bundle value.
pub fn classify(input: &str) -> ClassifiedForm {
	let trimmed = input.trim();

	if let Some(reference) = StoreReference::parse(trimmed) {
		return ClassifiedForm::StoreReference(reference);
	}
	if let Some(path) = trimmed.strip_prefix('@') {
		return ClassifiedForm::FileReference(PathBuf::from(path));
	}
	if trimmed.starts_with('{') {
		return ClassifiedForm::InlineJson(SecretString::new(trimmed.to_string()));
	}
	ClassifiedForm::Unrecognized(SecretString::new(trimmed.to_string()))
}
