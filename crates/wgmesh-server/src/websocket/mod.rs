// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! WebSocket transport for coordinator sessions.

mod connection;
mod handler;

pub use connection::WsConnection;
pub use handler::ws_upgrade_handler;

pub mod config {
	use std::time::Duration;

	/// How long a close frame may wait behind queued messages.
	pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

	/// Close frame reasons must fit a control frame payload.
	pub const MAX_CLOSE_REASON_BYTES: usize = 123;
}
