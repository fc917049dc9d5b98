// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Best-effort fan-out of notifications to a fixed set of recipients.

use crate::error::Result;
use crate::transport::{Connection, ConnectionId, TransportError};
use futures::future::join_all;
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use wgmesh_common::Notification;

/// A roster member captured at the moment a broadcast starts.
#[derive(Clone)]
pub struct Recipient {
	connection: Arc<dyn Connection>,
	virtual_ip: Ipv4Addr,
}

impl Recipient {
	pub fn new(connection: Arc<dyn Connection>, virtual_ip: Ipv4Addr) -> Self {
		Self {
			connection,
			virtual_ip,
		}
	}

	pub fn connection_id(&self) -> ConnectionId {
		self.connection.id()
	}

	pub fn virtual_ip(&self) -> Ipv4Addr {
		self.virtual_ip
	}
}

impl fmt::Debug for Recipient {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Recipient")
			.field("connection_id", &self.connection_id())
			.field("virtual_ip", &self.virtual_ip)
			.finish()
	}
}

#[derive(Debug, Clone)]
pub struct DeliveryFailure {
	pub connection_id: ConnectionId,
	pub virtual_ip: Ipv4Addr,
	pub error: TransportError,
}

/// Per-recipient outcome of one broadcast.
#[derive(Debug, Default)]
pub struct BroadcastReport {
	pub delivered: Vec<ConnectionId>,
	pub failures: Vec<DeliveryFailure>,
}

impl BroadcastReport {
	pub fn recipients(&self) -> usize {
		self.delivered.len() + self.failures.len()
	}

	pub fn is_complete(&self) -> bool {
		self.failures.is_empty()
	}
}

/// Sends `notification` to every recipient concurrently.
///
/// A failed delivery is logged and recorded in the report; it never stops
/// delivery to the others. Only encoding the notification can fail the call.
#[instrument(skip_all, fields(recipients = recipients.len()))]
pub async fn broadcast(
	recipients: &[Recipient],
	notification: &Notification,
) -> Result<BroadcastReport> {
	let text = serde_json::to_string(notification)?;

	let sends = recipients.iter().map(|recipient| {
		let text = text.clone();
		async move { (recipient, recipient.connection.send_text(text).await) }
	});

	let mut report = BroadcastReport::default();
	for (recipient, outcome) in join_all(sends).await {
		match outcome {
			Ok(()) => report.delivered.push(recipient.connection_id()),
			Err(error) => {
				warn!(
					connection_id = %recipient.connection_id(),
					virtual_ip = %recipient.virtual_ip,
					%error,
					"notification delivery failed"
				);
				report.failures.push(DeliveryFailure {
					connection_id: recipient.connection_id(),
					virtual_ip: recipient.virtual_ip,
					error,
				});
			}
		}
	}

	debug!(
		delivered = report.delivered.len(),
		failed = report.failures.len(),
		"broadcast finished"
	);
	Ok(report)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{MemoryClient, MemoryConnection};
	use wgmesh_common::PeerRemoval;

	fn recipient(last_octet: u8) -> (Recipient, Arc<MemoryConnection>, MemoryClient) {
		let (connection, client) = MemoryConnection::pair();
		let recipient = Recipient::new(
			connection.clone(),
			Ipv4Addr::new(10, 0, 0, last_octet),
		);
		(recipient, connection, client)
	}

	fn removal() -> Notification {
		PeerRemoval {
			removed_peer: Ipv4Addr::new(10, 0, 0, 99),
		}
		.into()
	}

	#[tokio::test]
	async fn delivers_to_every_recipient() {
		let (a, _, mut client_a) = recipient(1);
		let (b, _, mut client_b) = recipient(2);

		let report = broadcast(&[a, b], &removal()).await.unwrap();

		assert!(report.is_complete());
		assert_eq!(report.delivered.len(), 2);
		assert_eq!(client_a.try_recv_json::<Notification>(), Some(removal()));
		assert_eq!(client_b.try_recv_json::<Notification>(), Some(removal()));
	}

	#[tokio::test]
	async fn failed_recipient_does_not_block_others() {
		let (a, _, mut client_a) = recipient(1);
		let (b, broken, _client_b) = recipient(2);
		let (c, _, mut client_c) = recipient(3);
		broken.set_fail_sends(true);

		let report = broadcast(&[a, b, c], &removal()).await.unwrap();

		assert_eq!(report.recipients(), 3);
		assert_eq!(report.delivered.len(), 2);
		assert_eq!(report.failures.len(), 1);
		assert_eq!(report.failures[0].connection_id, broken.id());
		assert_eq!(report.failures[0].virtual_ip, Ipv4Addr::new(10, 0, 0, 2));
		assert!(client_a.try_recv().is_some());
		assert!(client_c.try_recv().is_some());
	}

	#[tokio::test]
	async fn empty_recipient_set() {
		let report = broadcast(&[], &removal()).await.unwrap();
		assert_eq!(report.recipients(), 0);
		assert!(report.is_complete());
	}
}
