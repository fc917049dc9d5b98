// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! JSON messages exchanged between the coordination server and mesh clients.

use crate::keys::PublicKey;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MessageError {
	#[error("invalid JSON: {0}")]
	Json(#[from] serde_json::Error),
}

/// First message a client sends after connecting.
///
/// Fields the server does not know about are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
	pub display_name: String,
	pub public_key: PublicKey,
}

impl JoinRequest {
	pub fn parse(text: &str) -> Result<Self, MessageError> {
		Ok(serde_json::from_str(text)?)
	}
}

/// A tenant member as seen by the other members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
	pub display_name: String,
	pub public_key: PublicKey,
	pub virtual_ip: Ipv4Addr,
}

/// Reply to a [`JoinRequest`]: the assigned address and the members that were
/// already in the tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinResponse {
	pub virtual_ip: Ipv4Addr,
	pub peers: Vec<PeerInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRemoval {
	pub removed_peer: Ipv4Addr,
}

/// Push notifications sent to active members.
///
/// Variants are distinguished by their fields, so each one serializes exactly
/// like the wrapped message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Notification {
	PeerJoined(PeerInfo),
	PeerRemoved(PeerRemoval),
}

impl From<PeerInfo> for Notification {
	fn from(info: PeerInfo) -> Self {
		Notification::PeerJoined(info)
	}
}

impl From<PeerRemoval> for Notification {
	fn from(removal: PeerRemoval) -> Self {
		Notification::PeerRemoved(removal)
	}
}
