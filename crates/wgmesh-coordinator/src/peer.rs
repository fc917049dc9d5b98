// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::broadcast::Recipient;
use crate::error::Result;
use crate::transport::{Connection, ConnectionId};
use serde::Serialize;
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;
use wgmesh_common::{JoinRequest, PeerInfo, PublicKey};

/// What a client claims to be, taken from its join request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
	pub display_name: String,
	pub public_key: PublicKey,
}

impl From<JoinRequest> for Identity {
	fn from(request: JoinRequest) -> Self {
		Self {
			display_name: request.display_name,
			public_key: request.public_key,
		}
	}
}

/// A connection is anonymous until its join request has been accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PeerIdentity {
	#[default]
	Anonymous,
	Identified(Identity),
}

impl PeerIdentity {
	pub fn identity(&self) -> Option<&Identity> {
		match self {
			PeerIdentity::Anonymous => None,
			PeerIdentity::Identified(identity) => Some(identity),
		}
	}

	pub fn is_identified(&self) -> bool {
		matches!(self, PeerIdentity::Identified(_))
	}
}

/// A roster member. The connection handle is shared with the session that
/// owns it; the peer only uses it to push messages.
pub struct Peer {
	connection: Arc<dyn Connection>,
	identity: Identity,
	virtual_ip: Ipv4Addr,
}

impl Peer {
	pub fn new(connection: Arc<dyn Connection>, identity: Identity, virtual_ip: Ipv4Addr) -> Self {
		Self {
			connection,
			identity,
			virtual_ip,
		}
	}

	pub fn connection_id(&self) -> ConnectionId {
		self.connection.id()
	}

	pub fn identity(&self) -> &Identity {
		&self.identity
	}

	pub fn virtual_ip(&self) -> Ipv4Addr {
		self.virtual_ip
	}

	pub fn info(&self) -> PeerInfo {
		PeerInfo {
			display_name: self.identity.display_name.clone(),
			public_key: self.identity.public_key.clone(),
			virtual_ip: self.virtual_ip,
		}
	}

	pub fn recipient(&self) -> Recipient {
		Recipient::new(Arc::clone(&self.connection), self.virtual_ip)
	}

	pub async fn send<T: Serialize + Sync>(&self, message: &T) -> Result<()> {
		let text = serde_json::to_string(message)?;
		self.connection.send_text(text).await?;
		Ok(())
	}
}

impl fmt::Debug for Peer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Peer")
			.field("connection_id", &self.connection_id())
			.field("display_name", &self.identity.display_name)
			.field("virtual_ip", &self.virtual_ip)
			.finish()
	}
}
