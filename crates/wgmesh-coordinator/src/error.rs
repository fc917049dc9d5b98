// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::transport::{CloseCode, TransportError};
use std::time::Duration;
use thiserror::Error;
use wgmesh_common::{MessageError, PoolError};

#[derive(Error, Debug)]
pub enum MeshError {
	#[error("no virtual address left in the tenant network")]
	Exhausted,

	#[error("unknown resource: {0}")]
	UnknownResource(String),

	#[error("no network block left for a new tenant")]
	NoCapacity,

	#[error("malformed message: {0}")]
	MalformedMessage(String),

	#[error("connection closed")]
	Disconnected,

	#[error("transport error: {0}")]
	Transport(String),

	#[error("no join request received within {0:?}")]
	HandshakeTimeout(Duration),

	#[error("unexpected message after join")]
	UnexpectedMessage,

	#[error("connection already joined this tenant")]
	AlreadyJoined,

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

impl MeshError {
	/// WebSocket close code sent to a client whose session ends with this error.
	pub fn close_code(&self) -> CloseCode {
		match self {
			MeshError::Exhausted | MeshError::NoCapacity => CloseCode::TryAgainLater,
			MeshError::MalformedMessage(_) => CloseCode::InvalidPayload,
			MeshError::HandshakeTimeout(_)
			| MeshError::UnexpectedMessage
			| MeshError::AlreadyJoined => CloseCode::PolicyViolation,
			MeshError::Disconnected => CloseCode::Normal,
			MeshError::UnknownResource(_)
			| MeshError::Transport(_)
			| MeshError::Serialization(_) => CloseCode::InternalError,
		}
	}
}

impl From<PoolError> for MeshError {
	fn from(err: PoolError) -> Self {
		match err {
			PoolError::Exhausted => MeshError::Exhausted,
			PoolError::UnknownResource(resource) => MeshError::UnknownResource(resource),
		}
	}
}

impl From<TransportError> for MeshError {
	fn from(err: TransportError) -> Self {
		match err {
			TransportError::Disconnected => MeshError::Disconnected,
			other => MeshError::Transport(other.to_string()),
		}
	}
}

impl From<MessageError> for MeshError {
	fn from(err: MessageError) -> Self {
		MeshError::MalformedMessage(err.to_string())
	}
}

pub type Result<T> = std::result::Result<T, MeshError>;
