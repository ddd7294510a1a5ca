// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Capabilities the loader consumes: secret store lookup and file reads.
//!
//! Concrete backends live outside this crate. Retry and timeout policy
//! belong to the [`SecretStore`] implementation, not the engine.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use async_trait::async_trait;
use bwh_common_secret::SecretString;
use thiserror::Error;
use tracing::debug;

use crate::classify::StoreReference;

/// Errors a secret store lookup can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
	#[error("secret not found")]
	NotFound,

	#[error("access denied: {0}")]
	AccessDenied(String),

	#[error("secret store unavailable: {0}")]
	Unavailable(String),
}

/// Lookup capability for secrets held in an external store.
#[async_trait]
pub trait SecretStore: Send + Sync {
	/// Fetch the raw payload (JSON text) stored under `reference`.
	async fn fetch(&self, reference: &StoreReference) -> Result<SecretString, StoreError>;
}

/// Store used when no backend is wired in. Every lookup is `Unavailable`.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredSecretStore;

#[async_trait]
impl SecretStore for UnconfiguredSecretStore {
	async fn fetch(&self, reference: &StoreReference) -> Result<SecretString, StoreError> {
		debug!(reference = %reference, "no secret store backend configured");
		Err(StoreError::Unavailable(
			"no secret store backend is configured for this invocation".to_string(),
		))
	}
}

#[derive(Debug, Clone)]
enum StaticEntry {
	Payload(SecretString),
	Failure(StoreError),
	Pending,
}

/// In-memory store keyed by the full reference string.
///
/// Unknown references report [`StoreError::NotFound`]. Entries can also be
/// set to fail or to never complete, for exercising error and
/// cancellation paths.
#[derive(Debug, Default, Clone)]
pub struct StaticSecretStore {
	entries: HashMap<String, StaticEntry>,
}

impl StaticSecretStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_secret(mut self, reference: impl Into<String>, payload: impl Into<String>) -> Self {
		self.entries.insert(
			reference.into(),
			StaticEntry::Payload(SecretString::new(payload.into())),
		);
		self
	}

	pub fn with_failure(mut self, reference: impl Into<String>, error: StoreError) -> Self {
		self.entries.insert(reference.into(), StaticEntry::Failure(error));
		self
	}

	/// Lookups for this reference never complete.
	pub fn with_pending(mut self, reference: impl Into<String>) -> Self {
		self.entries.insert(reference.into(), StaticEntry::Pending);
		self
	}
}

#[async_trait]
impl SecretStore for StaticSecretStore {
	async fn fetch(&self, reference: &StoreReference) -> Result<SecretString, StoreError> {
		match self.entries.get(&reference.to_string()) {
			Some(StaticEntry::Payload(payload)) => Ok(payload.clone()),
			Some(StaticEntry::Failure(error)) => Err(error.clone()),
			Some(StaticEntry::Pending) => std::future::pending().await,
			None => Err(StoreError::NotFound),
		}
	}
}

/// Errors from the filesystem capability.
#[derive(Debug, Error)]
pub enum FileReadError {
	#[error("file not found")]
	NotFound,

	#[error("file could not be read: {0}")]
	Unreadable(#[source] io::Error),
}

/// Read-only filesystem capability.
pub trait FileReader: Send + Sync {
	/// Read the file at `path` as UTF-8 text.
	fn read_utf8(&self, path: &Path) -> Result<String, FileReadError>;
}

/// [`FileReader`] backed by the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileReader;

impl FileReader for LocalFileReader {
	fn read_utf8(&self, path: &Path) -> Result<String, FileReadError> {
		std::fs::read_to_string(path).map_err(|e| match e.kind() {
			io::ErrorKind::NotFound => FileReadError::NotFound,
			_ => FileReadError::Unreadable(e),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	fn reference() -> StoreReference {
		StoreReference::parse("arn:aws:secretsmanager:us-east-1:123456789012:secret:benchling-creds")
			.unwrap()
	}

	#[tokio::test]
	async fn static_store_returns_payload() {
		let store = StaticSecretStore::new().with_secret(reference().to_string(), r#"{"tenant":"acme"}"#);
		let payload = store.fetch(&reference()).await.unwrap();
		assert_eq!(payload.reveal(), r#"{"tenant":"acme"}"#);
	}

	#[tokio::test]
	async fn static_store_unknown_reference_is_not_found() {
		let store = StaticSecretStore::new();
		assert_eq!(store.fetch(&reference()).await.unwrap_err(), StoreError::NotFound);
	}

	#[tokio::test]
	async fn static_store_reports_configured_failure() {
		let store = StaticSecretStore::new().with_failure(
			reference().to_string(),
			StoreError::AccessDenied("missing secretsmanager:GetSecretValue".to_string()),
		);
		assert!(matches!(
			store.fetch(&reference()).await,
			Err(StoreError::AccessDenied(_))
		));
	}

	#[tokio::test]
	async fn unconfigured_store_is_unavailable() {
		let result = UnconfiguredSecretStore.fetch(&reference()).await;
		assert!(matches!(result, Err(StoreError::Unavailable(_))));
	}

	#[test]
	fn local_reader_reads_utf8() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(file, "{{\"tenant\":\"acme\"}}").unwrap();

		let text = LocalFileReader.read_utf8(file.path()).unwrap();
		assert_eq!(text, "{\"tenant\":\"acme\"}");
	}

	#[test]
	fn local_reader_maps_missing_file() {
		let result = LocalFileReader.read_utf8(Path::new("/nonexistent/benchling/secrets.json"));
		assert!(matches!(result, Err(FileReadError::NotFound)));
	}

	#[test]
	fn local_reader_rejects_invalid_utf8() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(&[0xff, 0xfe, 0x00, 0x80]).unwrap();

		let result = LocalFileReader.read_utf8(file.path());
		assert!(matches!(result, Err(FileReadError::Unreadable(_))));
	}
}
