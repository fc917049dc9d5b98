// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-connection transport contract.
//!
//! The coordinator never touches sockets. Whatever terminates client
//! connections (the WebSocket adapter in the server, or
//! [`MemoryConnection`](crate::testing::MemoryConnection) in tests) implements
//! [`Connection`].

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Stable identity of one client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}

	pub fn as_uuid(&self) -> Uuid {
		self.0
	}
}

impl Default for ConnectionId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for ConnectionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCode {
	Normal,
	InvalidPayload,
	PolicyViolation,
	InternalError,
	TryAgainLater,
}

impl CloseCode {
	/// Numeric value as defined for WebSocket close frames (RFC 6455).
	pub fn as_u16(self) -> u16 {
		match self {
			CloseCode::Normal => 1000,
			CloseCode::InvalidPayload => 1007,
			CloseCode::PolicyViolation => 1008,
			CloseCode::InternalError => 1011,
			CloseCode::TryAgainLater => 1013,
		}
	}
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
	#[error("connection closed")]
	Disconnected,

	#[error("send failed: {0}")]
	Send(String),

	#[error("receive failed: {0}")]
	Receive(String),
}

#[async_trait]
pub trait Connection: Send + Sync {
	fn id(&self) -> ConnectionId;

	/// Waits for the next text message. Returns [`TransportError::Disconnected`]
	/// once the peer has gone away.
	async fn receive_text(&self) -> Result<String, TransportError>;

	async fn send_text(&self, text: String) -> Result<(), TransportError>;

	async fn close(&self, code: CloseCode, reason: &str);
}
