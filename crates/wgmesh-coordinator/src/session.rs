// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-connection session driver.
//!
//! A session waits for the client's join request, attaches the client to its
//! tenant and then holds the membership until the connection goes away. The
//! client only listens once it has joined; any further message it sends ends
//! the session.

use crate::directory::TenantDirectory;
use crate::error::{MeshError, Result};
use crate::peer::{Identity, PeerIdentity};
use crate::transport::Connection;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use wgmesh_common::JoinRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
	Connected,
	AwaitingJoinRequest,
	Handshaking,
	Active,
	Leaving,
	Removed,
}

#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
	/// How long a fresh connection may stay silent before it is dropped.
	pub join_timeout: Option<Duration>,
}

pub struct PeerSession {
	directory: Arc<TenantDirectory>,
	tenant_id: String,
	connection: Arc<dyn Connection>,
	options: SessionOptions,
	state: PeerState,
	identity: PeerIdentity,
}

impl PeerSession {
	pub fn new(
		directory: Arc<TenantDirectory>,
		tenant_id: impl Into<String>,
		connection: Arc<dyn Connection>,
		options: SessionOptions,
	) -> Self {
		Self {
			directory,
			tenant_id: tenant_id.into(),
			connection,
			options,
			state: PeerState::Connected,
			identity: PeerIdentity::Anonymous,
		}
	}

	pub fn state(&self) -> PeerState {
		self.state
	}

	pub fn identity(&self) -> &PeerIdentity {
		&self.identity
	}

	/// Drives the connection to completion.
	///
	/// Returns `Ok(())` when the client simply hung up. Any other ending is
	/// reported to the client with a close frame and returned. Once the join
	/// has succeeded, leaving the tenant happens exactly once whatever the
	/// reason the session ends.
	#[instrument(
		skip(self),
		fields(tenant_id = %self.tenant_id, connection_id = %self.connection.id())
	)]
	pub async fn run(mut self) -> Result<()> {
		self.transition(PeerState::AwaitingJoinRequest);

		let request = match self.await_join_request().await {
			Ok(request) => request,
			Err(err) => return self.abort(err).await,
		};

		let identity = Identity::from(request);
		self.identity = PeerIdentity::Identified(identity.clone());
		self.transition(PeerState::Handshaking);

		let info = match self
			.directory
			.resolve_and_attach(&self.tenant_id, Arc::clone(&self.connection), identity)
			.await
		{
			Ok(info) => info,
			Err(err) => return self.abort(err).await,
		};

		self.transition(PeerState::Active);
		info!(virtual_ip = %info.virtual_ip, "session active");

		let ended = self.await_disconnect().await;

		self.transition(PeerState::Leaving);
		if let Err(err) = &ended {
			self.connection.close(err.close_code(), &err.to_string()).await;
		}
		let detached = self
			.directory
			.detach_and_maybe_reclaim(&self.tenant_id, self.connection.id())
			.await;
		self.transition(PeerState::Removed);

		match ended {
			Err(MeshError::Disconnected) | Ok(()) => detached,
			Err(err) => {
				warn!(error = %err, "session ended");
				Err(err)
			}
		}
	}

	async fn await_join_request(&self) -> Result<JoinRequest> {
		let received = match self.options.join_timeout {
			Some(limit) => tokio::time::timeout(limit, self.connection.receive_text())
				.await
				.map_err(|_| MeshError::HandshakeTimeout(limit))?,
			None => self.connection.receive_text().await,
		};
		let text = received?;
		debug!(bytes = text.len(), "join request received");

		Ok(JoinRequest::parse(&text)?)
	}

	async fn await_disconnect(&self) -> Result<()> {
		match self.connection.receive_text().await {
			Ok(_) => Err(MeshError::UnexpectedMessage),
			Err(err) => Err(err.into()),
		}
	}

	/// Ends a session that never became a member.
	async fn abort(&mut self, err: MeshError) -> Result<()> {
		self.transition(PeerState::Leaving);
		self.transition(PeerState::Removed);

		if matches!(err, MeshError::Disconnected) {
			info!("connection closed before joining");
			return Ok(());
		}

		warn!(error = %err, "join rejected");
		self.connection.close(err.close_code(), &err.to_string()).await;
		Err(err)
	}

	fn transition(&mut self, next: PeerState) {
		debug!(from = ?self.state, to = ?next, "session state");
		self.state = next;
	}
}

/// Runs a session for `connection` on `tenant_id`.
pub async fn serve_connection(
	directory: Arc<TenantDirectory>,
	tenant_id: impl Into<String>,
	connection: Arc<dyn Connection>,
	options: SessionOptions,
) -> Result<()> {
	PeerSession::new(directory, tenant_id, connection, options)
		.run()
		.await
}
