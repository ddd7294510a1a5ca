// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret wrapper type for credential material.
//!
//! [`Secret<T>`] wraps client secrets and client identifiers so they:
//!
//! - Never appear in logs (redacted Debug/Display)
//! - Never serialize to plain text (redacted Serialize)
//! - Are zeroized from memory on drop
//! - Can only leave the wrapper through [`Secret::masked`] (display) or
//!   [`Secret::reveal`] (provisioning handoff)
//!
//! # Example
//!
//! ```
//! use bwh_common_secret::Secret;
//!
//! let client_secret = Secret::new("secret_key_12345".to_string());
//!
//! assert_eq!(format!("{:?}", client_secret), "Secret(\"[REDACTED]\")");
//! assert_eq!(format!("{}", client_secret), "[REDACTED]");
//! assert_eq!(client_secret.masked(), "...2345");
//!
//! // Handoff only
//! assert_eq!(client_secret.reveal(), "secret_key_12345");
//! ```

use std::fmt;
use zeroize::Zeroize;

/// The redaction placeholder used in Debug/Display/Serialize output.
pub const REDACTED: &str = "[REDACTED]";

/// Number of trailing characters a masked value may show.
pub const VISIBLE_SUFFIX: usize = 4;

/// Rendering used when a value is too short to show any suffix.
pub const FULLY_MASKED: &str = "****";

/// A wrapper for sensitive values that prevents accidental exposure.
///
/// There is no `Deref` impl. Display code calls [`Secret::masked`];
/// the provisioning boundary calls [`Secret::reveal`].
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct Secret<T>
where
	T: Zeroize,
{
	inner: T,
}

/// Convenience alias for the common case of secret strings.
pub type SecretString = Secret<String>;

impl<T> Secret<T>
where
	T: Zeroize,
{
	/// Create a new secret wrapper around the given value.
	pub fn new(inner: T) -> Self {
		Self { inner }
	}

	/// Access the clear value.
	///
	/// Reserved for the provisioning handoff and for parsing a freshly
	/// fetched payload. Never route the result to a log or console.
	pub fn reveal(&self) -> &T {
		&self.inner
	}

	/// Consume the wrapper and return the inner value.
	///
	/// This clones rather than moves so the wrapper's memory is still
	/// zeroized on drop.
	pub fn into_inner(self) -> T
	where
		T: Clone,
	{
		self.inner.clone()
	}
}

impl Secret<String> {
	/// Render the value for display: at most the last [`VISIBLE_SUFFIX`]
	/// characters, prefixed with `...`. Values shorter than that are
	/// rendered as [`FULLY_MASKED`].
	pub fn masked(&self) -> String {
		mask_suffix(&self.inner)
	}

	/// Length in characters. Validation needs it without revealing.
	pub fn char_len(&self) -> usize {
		self.inner.chars().count()
	}

	/// True when the value is empty or whitespace only.
	pub fn is_blank(&self) -> bool {
		self.inner.trim().is_empty()
	}
}

fn mask_suffix(value: &str) -> String {
	let len = value.chars().count();
	if len < VISIBLE_SUFFIX {
		return FULLY_MASKED.to_string();
	}
	let suffix: String = value.chars().skip(len - VISIBLE_SUFFIX).collect();
	format!("...{suffix}")
}

impl<T> Clone for Secret<T>
where
	T: Zeroize + Clone,
{
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T> fmt::Debug for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Secret").field(&REDACTED).finish()
	}
}

impl<T> fmt::Display for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl<T> PartialEq for Secret<T>
where
	T: Zeroize + PartialEq,
{
	fn eq(&self, other: &Self) -> bool {
		self.inner == other.inner
	}
}

impl<T> Eq for Secret<T> where T: Zeroize + Eq {}

#[cfg(feature = "serde")]
mod serde_impl {
	use super::{Secret, REDACTED};
	use serde::{Deserialize, Deserializer, Serialize, Serializer};
	use zeroize::Zeroize;

	impl<T> Serialize for Secret<T>
	where
		T: Serialize + Zeroize,
	{
		fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
		where
			S: Serializer,
		{
			serializer.serialize_str(REDACTED)
		}
	}

	impl<'de, T> Deserialize<'de> for Secret<T>
	where
		T: Deserialize<'de> + Zeroize,
	{
		fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
		where
			D: Deserializer<'de>,
		{
			let inner = T::deserialize(deserializer)?;
			Ok(Secret::new(inner))
		}
	}
}
