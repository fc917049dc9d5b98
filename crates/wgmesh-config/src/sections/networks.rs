// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Network blocks available to tenant overlay networks.

use ipnet::Ipv4Net;
use serde::Deserialize;

use crate::error::ConfigError;

/// Shortest prefix accepted for a block. Every tenant keeps a table of its
/// block's host addresses, so blocks larger than a /16 are refused.
pub const MIN_PREFIX_LEN: u8 = 16;

/// Longest prefix accepted for a block; a /30 still has two host addresses.
pub const MAX_PREFIX_LEN: u8 = 30;

fn default_blocks() -> Vec<Ipv4Net> {
	vec![
		Ipv4Net::new(std::net::Ipv4Addr::new(192, 168, 1, 0), 24).expect("valid prefix length"),
		Ipv4Net::new(std::net::Ipv4Addr::new(172, 16, 0, 0), 16).expect("valid prefix length"),
	]
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct NetworksConfigLayer {
	#[serde(default)]
	pub blocks: Option<Vec<Ipv4Net>>,
}

impl NetworksConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.blocks.is_some() {
			self.blocks = other.blocks;
		}
	}

	pub fn finalize(self) -> Result<NetworksConfig, ConfigError> {
		let config = NetworksConfig {
			blocks: self.blocks.unwrap_or_else(default_blocks),
		};
		config.validate()?;
		Ok(config)
	}
}

/// Fixed list of blocks; each live tenant owns exactly one of them.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworksConfig {
	pub blocks: Vec<Ipv4Net>,
}

impl Default for NetworksConfig {
	fn default() -> Self {
		Self {
			blocks: default_blocks(),
		}
	}
}

impl NetworksConfig {
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.blocks.is_empty() {
			return Err(ConfigError::Validation(
				"at least one network block must be configured".to_string(),
			));
		}

		for block in &self.blocks {
			if !(MIN_PREFIX_LEN..=MAX_PREFIX_LEN).contains(&block.prefix_len()) {
				return Err(ConfigError::Validation(format!(
					"network block {block} must have a prefix length between /{MIN_PREFIX_LEN} and /{MAX_PREFIX_LEN}"
				)));
			}
			if block.trunc() != *block {
				return Err(ConfigError::Validation(format!(
					"network block {block} has host bits set (did you mean {}?)",
					block.trunc()
				)));
			}
		}

		for (i, a) in self.blocks.iter().enumerate() {
			for b in &self.blocks[i + 1..] {
				if a.contains(b) || b.contains(a) {
					return Err(ConfigError::Validation(format!(
						"network blocks {a} and {b} overlap"
					)));
				}
			}
		}

		Ok(())
	}
}
