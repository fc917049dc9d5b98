// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-connection session settings.

use serde::Deserialize;
use std::time::Duration;

use crate::error::ConfigError;

const DEFAULT_JOIN_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SEND_QUEUE_SIZE: usize = 64;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SessionConfigLayer {
	#[serde(default)]
	pub join_timeout_secs: Option<u64>,
	#[serde(default)]
	pub send_queue_size: Option<usize>,
}

impl SessionConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.join_timeout_secs.is_some() {
			self.join_timeout_secs = other.join_timeout_secs;
		}
		if other.send_queue_size.is_some() {
			self.send_queue_size = other.send_queue_size;
		}
	}

	pub fn finalize(self) -> Result<SessionConfig, ConfigError> {
		let join_timeout_secs = self.join_timeout_secs.unwrap_or(DEFAULT_JOIN_TIMEOUT_SECS);
		let send_queue_size = self.send_queue_size.unwrap_or(DEFAULT_SEND_QUEUE_SIZE);

		if send_queue_size == 0 {
			return Err(ConfigError::Validation(
				"session.send_queue_size must be greater than zero".to_string(),
			));
		}

		Ok(SessionConfig {
			join_timeout: (join_timeout_secs > 0).then(|| Duration::from_secs(join_timeout_secs)),
			send_queue_size,
		})
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
	/// How long a new connection may take to send its join request.
	/// `None` waits forever.
	pub join_timeout: Option<Duration>,
	/// Outbound messages buffered per connection before sends fail.
	pub send_queue_size: usize,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			join_timeout: Some(Duration::from_secs(DEFAULT_JOIN_TIMEOUT_SECS)),
			send_queue_size: DEFAULT_SEND_QUEUE_SIZE,
		}
	}
}
