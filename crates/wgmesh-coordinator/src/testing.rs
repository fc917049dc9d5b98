// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory [`Connection`] for driving the coordinator without a network.
//!
//! [`MemoryConnection::pair`] returns the server half, which is handed to the
//! coordinator, and a [`MemoryClient`] that plays the remote end.
//!
//! Only built for unit tests or with the `testing` feature.

use crate::transport::{CloseCode, Connection, ConnectionId, TransportError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex};
use wgmesh_common::{JoinRequest, PublicKey};

pub struct MemoryConnection {
	id: ConnectionId,
	inbound: Mutex<mpsc::UnboundedReceiver<String>>,
	outbound: mpsc::UnboundedSender<String>,
	fail_sends: AtomicBool,
	close_frame: StdMutex<Option<(CloseCode, String)>>,
}

impl MemoryConnection {
	pub fn pair() -> (Arc<MemoryConnection>, MemoryClient) {
		let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
		let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

		let connection = Arc::new(MemoryConnection {
			id: ConnectionId::new(),
			inbound: Mutex::new(inbound_rx),
			outbound: outbound_tx,
			fail_sends: AtomicBool::new(false),
			close_frame: StdMutex::new(None),
		});

		let client = MemoryClient {
			inbound: Some(inbound_tx),
			outbound: outbound_rx,
			connection: Arc::clone(&connection),
		};

		(connection, client)
	}

	/// Makes every following `send_text` fail until reset.
	pub fn set_fail_sends(&self, fail: bool) {
		self.fail_sends.store(fail, Ordering::SeqCst);
	}

	pub fn close_frame(&self) -> Option<(CloseCode, String)> {
		self.close_frame.lock().ok().and_then(|frame| (*frame).clone())
	}

	pub fn is_closed(&self) -> bool {
		self.close_frame().is_some()
	}
}

#[async_trait]
impl Connection for MemoryConnection {
	fn id(&self) -> ConnectionId {
		self.id
	}

	async fn receive_text(&self) -> Result<String, TransportError> {
		if self.is_closed() {
			return Err(TransportError::Disconnected);
		}
		let mut inbound = self.inbound.lock().await;
		inbound.recv().await.ok_or(TransportError::Disconnected)
	}

	async fn send_text(&self, text: String) -> Result<(), TransportError> {
		if self.fail_sends.load(Ordering::SeqCst) {
			return Err(TransportError::Send("injected send failure".to_string()));
		}
		if self.is_closed() {
			return Err(TransportError::Disconnected);
		}
		self.outbound
			.send(text)
			.map_err(|_| TransportError::Disconnected)
	}

	async fn close(&self, code: CloseCode, reason: &str) {
		if let Ok(mut frame) = self.close_frame.lock() {
			frame.get_or_insert_with(|| (code, reason.to_string()));
		}
	}
}

/// Remote end of a [`MemoryConnection`].
pub struct MemoryClient {
	inbound: Option<mpsc::UnboundedSender<String>>,
	outbound: mpsc::UnboundedReceiver<String>,
	connection: Arc<MemoryConnection>,
}

impl MemoryClient {
	/// Sends raw text to the server half. Returns false once disconnected.
	pub fn send(&self, text: impl Into<String>) -> bool {
		match &self.inbound {
			Some(tx) => tx.send(text.into()).is_ok(),
			None => false,
		}
	}

	pub fn send_join(&self, display_name: &str, public_key: &PublicKey) -> bool {
		let request = JoinRequest {
			display_name: display_name.to_string(),
			public_key: public_key.clone(),
		};
		match serde_json::to_string(&request) {
			Ok(text) => self.send(text),
			Err(_) => false,
		}
	}

	/// Hangs up. The server half observes [`TransportError::Disconnected`].
	pub fn disconnect(&mut self) {
		self.inbound = None;
	}

	pub async fn recv(&mut self) -> Option<String> {
		self.outbound.recv().await
	}

	/// Next message decoded as `T`. `None` if the channel is closed or the
	/// message does not decode.
	pub async fn recv_json<T: DeserializeOwned>(&mut self) -> Option<T> {
		let text = self.recv().await?;
		serde_json::from_str(&text).ok()
	}

	/// Next already delivered message, without waiting.
	pub fn try_recv(&mut self) -> Option<String> {
		self.outbound.try_recv().ok()
	}

	pub fn try_recv_json<T: DeserializeOwned>(&mut self) -> Option<T> {
		let text = self.try_recv()?;
		serde_json::from_str(&text).ok()
	}

	/// Every message delivered so far.
	pub fn drain(&mut self) -> Vec<String> {
		let mut messages = Vec::new();
		while let Ok(text) = self.outbound.try_recv() {
			messages.push(text);
		}
		messages
	}

	pub fn connection(&self) -> &Arc<MemoryConnection> {
		&self.connection
	}

	pub fn id(&self) -> ConnectionId {
		self.connection.id
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn relays_both_directions() {
		let (connection, mut client) = MemoryConnection::pair();

		assert!(client.send("hello"));
		assert_eq!(connection.receive_text().await.unwrap(), "hello");

		connection.send_text("world".to_string()).await.unwrap();
		assert_eq!(client.recv().await.as_deref(), Some("world"));
	}

	#[tokio::test]
	async fn disconnect_surfaces_as_disconnected() {
		let (connection, mut client) = MemoryConnection::pair();

		client.disconnect();

		assert_eq!(
			connection.receive_text().await,
			Err(TransportError::Disconnected)
		);
		assert!(!client.send("late"));
	}

	#[tokio::test]
	async fn injected_send_failure() {
		let (connection, mut client) = MemoryConnection::pair();

		connection.set_fail_sends(true);
		assert!(matches!(
			connection.send_text("lost".to_string()).await,
			Err(TransportError::Send(_))
		));
		assert!(client.try_recv().is_none());

		connection.set_fail_sends(false);
		connection.send_text("kept".to_string()).await.unwrap();
		assert_eq!(client.try_recv().as_deref(), Some("kept"));
	}

	#[tokio::test]
	async fn close_records_first_frame_only() {
		let (connection, _client) = MemoryConnection::pair();

		connection.close(CloseCode::PolicyViolation, "first").await;
		connection.close(CloseCode::Normal, "second").await;

		assert_eq!(
			connection.close_frame(),
			Some((CloseCode::PolicyViolation, "first".to_string()))
		);
		assert_eq!(
			connection.receive_text().await,
			Err(TransportError::Disconnected)
		);
	}
}
