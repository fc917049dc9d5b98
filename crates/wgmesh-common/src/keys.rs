// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeyError {
	#[error("public key is not valid UTF-8: {0}")]
	InvalidUtf8(#[from] std::string::FromUtf8Error),
}

pub type Result<T> = std::result::Result<T, KeyError>;

/// A peer's public key as an opaque byte string.
///
/// The coordination service never interprets the key, it only relays it to
/// the other peers of the tenant. On the wire it is a JSON string whose UTF-8
/// bytes are the key, and it is sent back out exactly as received.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey {
	text: String,
}

impl PublicKey {
	pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
		let text = String::from_utf8(bytes.into())?;
		Ok(Self { text })
	}

	pub fn as_bytes(&self) -> &[u8] {
		self.text.as_bytes()
	}

	pub fn as_str(&self) -> &str {
		&self.text
	}
}

impl From<String> for PublicKey {
	fn from(text: String) -> Self {
		Self { text }
	}
}

impl From<&str> for PublicKey {
	fn from(text: &str) -> Self {
		Self {
			text: text.to_string(),
		}
	}
}

impl fmt::Debug for PublicKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let prefix: String = self.text.chars().take(8).collect();
		f.debug_struct("PublicKey")
			.field("prefix", &format!("{prefix}..."))
			.finish()
	}
}

impl fmt::Display for PublicKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.text)
	}
}

impl Serialize for PublicKey {
	fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.text)
	}
}

impl<'de> Deserialize<'de> for PublicKey {
	fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		String::deserialize(deserializer).map(Self::from)
	}
}
