// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use super::config;
use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Mutex};
use tracing::debug;
use wgmesh_coordinator::{CloseCode, Connection, ConnectionId, TransportError};

/// [`Connection`] over an upgraded axum WebSocket.
///
/// Outbound messages go through a bounded queue drained by a writer task, so
/// a slow client never stalls the sender. A full queue counts as a failed
/// delivery.
pub struct WsConnection {
	id: ConnectionId,
	outbound: mpsc::Sender<Message>,
	inbound: Mutex<SplitStream<WebSocket>>,
}

impl WsConnection {
	/// Splits `socket` and spawns its writer task.
	pub fn spawn(socket: WebSocket, queue_size: usize) -> Self {
		let id = ConnectionId::new();
		let (mut sender, receiver) = socket.split();
		let (tx, mut rx) = mpsc::channel::<Message>(queue_size.max(1));

		tokio::spawn(async move {
			while let Some(msg) = rx.recv().await {
				let closing = matches!(msg, Message::Close(_));
				if let Err(e) = sender.send(msg).await {
					debug!(connection_id = %id, error = %e, "failed to send WebSocket message");
					break;
				}
				if closing {
					break;
				}
			}
			let _ = sender.close().await;
		});

		Self {
			id,
			outbound: tx,
			inbound: Mutex::new(receiver),
		}
	}
}

fn close_reason(reason: &str) -> String {
	if reason.len() <= config::MAX_CLOSE_REASON_BYTES {
		return reason.to_string();
	}
	let mut end = config::MAX_CLOSE_REASON_BYTES;
	while !reason.is_char_boundary(end) {
		end -= 1;
	}
	reason[..end].to_string()
}

/// Binary frames are handed on as text. Invalid UTF-8 is replaced rather than
/// failing the receive, so the session decides what the message means.
fn binary_text(data: &[u8]) -> String {
	String::from_utf8_lossy(data).into_owned()
}

#[async_trait]
impl Connection for WsConnection {
	fn id(&self) -> ConnectionId {
		self.id
	}

	async fn receive_text(&self) -> Result<String, TransportError> {
		let mut inbound = self.inbound.lock().await;
		loop {
			match inbound.next().await {
				Some(Ok(Message::Text(text))) => return Ok(text.as_str().to_owned()),
				Some(Ok(Message::Binary(data))) => return Ok(binary_text(&data)),
				Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
					debug!(connection_id = %self.id, "control frame");
				}
				Some(Ok(Message::Close(_))) | None => return Err(TransportError::Disconnected),
				Some(Err(e)) => return Err(TransportError::Receive(e.to_string())),
			}
		}
	}

	async fn send_text(&self, text: String) -> Result<(), TransportError> {
		self.outbound
			.try_send(Message::Text(text.into()))
			.map_err(|e| match e {
				mpsc::error::TrySendError::Full(_) => {
					TransportError::Send("send queue full".to_string())
				}
				mpsc::error::TrySendError::Closed(_) => TransportError::Disconnected,
			})
	}

	async fn close(&self, code: CloseCode, reason: &str) {
		let frame = CloseFrame {
			code: code.as_u16(),
			reason: close_reason(reason).into(),
		};
		let queued =
			tokio::time::timeout(config::CLOSE_TIMEOUT, self.outbound.send(Message::Close(Some(frame))))
				.await;
		if !matches!(queued, Ok(Ok(()))) {
			debug!(connection_id = %self.id, "close frame not queued");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn binary_frames_become_text() {
		assert_eq!(binary_text(b"{\"a\":1}"), "{\"a\":1}");
		assert_eq!(binary_text(&[0xff, 0xfe]), "\u{fffd}\u{fffd}");
	}

	#[test]
	fn short_reason_is_kept() {
		assert_eq!(close_reason("no join request"), "no join request");
	}

	#[test]
	fn long_reason_is_truncated_on_char_boundary() {
		let reason = "é".repeat(100);

		let truncated = close_reason(&reason);

		assert!(truncated.len() <= config::MAX_CLOSE_REASON_BYTES);
		assert!(reason.starts_with(&truncated));
	}
}
