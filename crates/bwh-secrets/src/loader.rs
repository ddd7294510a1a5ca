// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Loads a classified secrets bundle into a [`CredentialRecord`].
//!
//! Store references go through the injected [`SecretStore`], file
//! references through the injected [`FileReader`], inline JSON is parsed
//! directly. All three converge on the same JSON-object normalization.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::classify::{ClassifiedForm, StoreReference};
use crate::error::{ClassificationError, ResolveError, SecretLoadError, SecretLoadErrorKind};
use crate::record::{CredentialRecord, RecordForm};
use crate::store::{FileReader, LocalFileReader, SecretStore, UnconfiguredSecretStore};

const INLINE_TARGET: &str = "inline JSON";

pub struct SecretLoader {
	store: Arc<dyn SecretStore>,
	files: Arc<dyn FileReader>,
}

impl SecretLoader {
	pub fn new(store: Arc<dyn SecretStore>, files: Arc<dyn FileReader>) -> Self {
		Self { store, files }
	}

	/// Load a classified form.
	///
	/// [`ClassifiedForm::Unrecognized`] yields a classification error; the
	/// other forms yield a record or a [`SecretLoadError`]. Nothing is
	/// retried here.
	pub async fn load(
		&self,
		form: ClassifiedForm,
		cancel: &CancellationToken,
	) -> Result<CredentialRecord, ResolveError> {
		let record = match form {
			ClassifiedForm::StoreReference(reference) => self.load_store(reference, cancel).await?,
			ClassifiedForm::FileReference(path) => {
				ensure_not_cancelled(cancel, &path.display().to_string())?;
				self.load_file(&path)?
			}
			ClassifiedForm::InlineJson(text) => {
				ensure_not_cancelled(cancel, INLINE_TARGET)?;
				parse_bundle(text.reveal(), RecordForm::InlineJson, INLINE_TARGET)?
			}
			ClassifiedForm::Unrecognized(text) => {
				return Err(ClassificationError::for_input(&text).into());
			}
		};
		Ok(record)
	}

	#[instrument(skip_all, fields(reference = %reference))]
	async fn load_store(
		&self,
		reference: StoreReference,
		cancel: &CancellationToken,
	) -> Result<CredentialRecord, SecretLoadError> {
		let target = reference.to_string();
		debug!("fetching secrets bundle from store");

		let payload = tokio::select! {
			biased;
			_ = cancel.cancelled() => {
				debug!("store lookup cancelled");
				return Err(SecretLoadError::new(SecretLoadErrorKind::Cancelled, target));
			}
			result = self.store.fetch(&reference) => {
				result.map_err(|e| SecretLoadError::from_store(e, target.clone()))?
			}
		};

		parse_bundle(payload.reveal(), RecordForm::StoreReference(reference), &target)
	}

	fn load_file(&self, path: &Path) -> Result<CredentialRecord, SecretLoadError> {
		debug!(path = %path.display(), "reading secrets bundle file");
		let text = self
			.files
			.read_utf8(path)
			.map_err(|e| SecretLoadError::from_file(e, path))?;
		parse_bundle(
			&text,
			RecordForm::FileReference(path.to_path_buf()),
			&path.display().to_string(),
		)
	}
}

impl Default for SecretLoader {
	/// Local filesystem and no store backend.
	fn default() -> Self {
		Self::new(Arc::new(UnconfiguredSecretStore), Arc::new(LocalFileReader))
	}
}

fn ensure_not_cancelled(cancel: &CancellationToken, target: &str) -> Result<(), SecretLoadError> {
	if cancel.is_cancelled() {
		return Err(SecretLoadError::new(SecretLoadErrorKind::Cancelled, target));
	}
	Ok(())
}

/// Parse bundle JSON text and normalize it.
///
/// The parser's own message is not kept as a cause since it can quote
/// fragments of the input; only the position is reported.
pub(crate) fn parse_bundle(
	text: &str,
	form: RecordForm,
	target: &str,
) -> Result<CredentialRecord, SecretLoadError> {
	let value: Value = serde_json::from_str(text).map_err(|e| {
		SecretLoadError::new(
			SecretLoadErrorKind::MalformedJson {
				line: e.line(),
				column: e.column(),
			},
			target,
		)
	})?;

	let Value::Object(object) = value else {
		return Err(SecretLoadError::new(SecretLoadErrorKind::NotAnObject, target));
	};

	let record = CredentialRecord::from_json_object(object, form);
	debug!(
		bundle = target,
		form = record.form().label(),
		notes = record.notes().len(),
		"normalized secrets bundle"
	);
	Ok(record)
}
