// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! One tenant's overlay network and live roster.
//!
//! All roster and address changes for a tenant happen under its own lock, so
//! joins to the same tenant are serialized. Notifications to the other
//! members are sent after the lock is released.

use crate::broadcast::{broadcast, Recipient};
use crate::error::{MeshError, Result};
use crate::peer::{Identity, Peer};
use crate::transport::{Connection, ConnectionId};
use ipnet::Ipv4Net;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use wgmesh_common::{JoinResponse, Notification, OverlayNetwork, PeerInfo, PeerRemoval};

struct TenantState {
	overlay: OverlayNetwork,
	/// Join order.
	peers: Vec<Peer>,
}

impl TenantState {
	fn recipients(&self) -> Vec<Recipient> {
		self.peers.iter().map(Peer::recipient).collect()
	}
}

pub struct Tenant {
	id: String,
	virtual_network: Ipv4Net,
	state: Mutex<TenantState>,
}

impl Tenant {
	pub fn new(id: impl Into<String>, overlay: OverlayNetwork) -> Self {
		Self {
			id: id.into(),
			virtual_network: overlay.virtual_network(),
			state: Mutex::new(TenantState {
				overlay,
				peers: Vec::new(),
			}),
		}
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	pub fn virtual_network(&self) -> Ipv4Net {
		self.virtual_network
	}

	/// Runs the join handshake for `connection`.
	///
	/// The joining peer gets a [`JoinResponse`] listing the members that were
	/// present before it, then every one of those members is told about the
	/// newcomer. If the response cannot be delivered the address is returned
	/// to the pool and the roster is left untouched.
	#[instrument(
		skip(self, connection, identity),
		fields(tenant_id = %self.id, connection_id = %connection.id(), display_name = %identity.display_name)
	)]
	pub async fn add_peer(
		&self,
		connection: Arc<dyn Connection>,
		identity: Identity,
	) -> Result<PeerInfo> {
		let (info, recipients) = {
			let mut state = self.state.lock().await;

			if state
				.peers
				.iter()
				.any(|peer| peer.connection_id() == connection.id())
			{
				return Err(MeshError::AlreadyJoined);
			}

			let snapshot: Vec<PeerInfo> = state.peers.iter().map(Peer::info).collect();
			let virtual_ip = state.overlay.allocate_ip()?;
			let peer = Peer::new(connection, identity, virtual_ip);

			let response = JoinResponse {
				virtual_ip,
				peers: snapshot,
			};
			if let Err(err) = peer.send(&response).await {
				if let Err(free_err) = state.overlay.free_ip(virtual_ip) {
					error!(%virtual_ip, error = %free_err, "failed to release address after aborted join");
				}
				warn!(%virtual_ip, error = %err, "join response not delivered, join rolled back");
				return Err(err);
			}

			let info = peer.info();
			let recipients = state.recipients();
			state.peers.push(peer);
			info!(%virtual_ip, members = state.peers.len(), "peer joined");
			(info, recipients)
		};

		match broadcast(&recipients, &Notification::from(info.clone())).await {
			Ok(report) if !report.is_complete() => {
				warn!(failed = report.failures.len(), "join notification partially delivered")
			}
			Ok(_) => {}
			Err(err) => error!(error = %err, "failed to encode join notification"),
		}

		Ok(info)
	}

	/// Removes the peer for `connection_id`, tells the remaining members and
	/// frees its address.
	///
	/// Returns `Ok(None)` when the connection is not a member. An error can
	/// only come from freeing the address; the peer has already left the
	/// roster by then.
	#[instrument(skip(self), fields(tenant_id = %self.id, %connection_id))]
	pub async fn remove_peer(&self, connection_id: ConnectionId) -> Result<Option<PeerInfo>> {
		let (removed, recipients) = {
			let mut state = self.state.lock().await;
			let Some(position) = state
				.peers
				.iter()
				.position(|peer| peer.connection_id() == connection_id)
			else {
				debug!("connection is not a member");
				return Ok(None);
			};
			let removed = state.peers.remove(position);
			(removed, state.recipients())
		};

		let virtual_ip = removed.virtual_ip();
		let removal = PeerRemoval {
			removed_peer: virtual_ip,
		};
		match broadcast(&recipients, &Notification::from(removal)).await {
			Ok(report) if !report.is_complete() => {
				warn!(failed = report.failures.len(), "removal notification partially delivered")
			}
			Ok(_) => {}
			Err(err) => error!(error = %err, "failed to encode removal notification"),
		}

		let mut state = self.state.lock().await;
		if let Err(err) = state.overlay.free_ip(virtual_ip) {
			error!(%virtual_ip, error = %err, "failed to release address of departed peer");
			return Err(err.into());
		}
		info!(%virtual_ip, members = state.peers.len(), "peer left");

		Ok(Some(removed.info()))
	}

	pub async fn peer_count(&self) -> usize {
		self.state.lock().await.peers.len()
	}

	/// Current roster in join order.
	pub async fn peers(&self) -> Vec<PeerInfo> {
		self.state.lock().await.peers.iter().map(Peer::info).collect()
	}

	pub async fn available_addresses(&self) -> usize {
		self.state.lock().await.overlay.available()
	}
}

impl std::fmt::Debug for Tenant {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Tenant")
			.field("id", &self.id)
			.field("virtual_network", &self.virtual_network)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{MemoryClient, MemoryConnection};
	use wgmesh_common::PublicKey;

	fn tenant(cidr: &str) -> Tenant {
		Tenant::new("tenant-a", OverlayNetwork::new(cidr.parse().unwrap()))
	}

	fn identity(name: &str) -> Identity {
		Identity {
			display_name: name.to_string(),
			public_key: PublicKey::from_bytes(format!("{name}-key").into_bytes()).unwrap(),
		}
	}

	async fn join(tenant: &Tenant, name: &str) -> (Arc<MemoryConnection>, MemoryClient, PeerInfo) {
		let (connection, client) = MemoryConnection::pair();
		let info = tenant
			.add_peer(connection.clone(), identity(name))
			.await
			.unwrap();
		(connection, client, info)
	}

	#[tokio::test]
	async fn first_peer_sees_empty_roster() {
		let tenant = tenant("10.0.0.0/30");

		let (_, mut client, info) = join(&tenant, "alice").await;

		let response: JoinResponse = client.try_recv_json().unwrap();
		assert_eq!(response.virtual_ip, info.virtual_ip);
		assert!(response.peers.is_empty());
		assert!(client.try_recv().is_none());
	}

	#[tokio::test]
	async fn snapshot_lists_earlier_members_in_join_order() {
		let tenant = tenant("10.0.0.0/24");
		let (_, _, alice) = join(&tenant, "alice").await;
		let (_, _, bob) = join(&tenant, "bob").await;

		let (_, mut client, carol) = join(&tenant, "carol").await;

		let response: JoinResponse = client.try_recv_json().unwrap();
		assert_eq!(response.peers, vec![alice, bob]);
		assert_eq!(response.virtual_ip, carol.virtual_ip);
		assert!(client.try_recv().is_none(), "no self notification");
	}

	#[tokio::test]
	async fn existing_members_are_notified_of_join() {
		let tenant = tenant("10.0.0.0/30");
		let (_, mut alice_client, _) = join(&tenant, "alice").await;
		alice_client.drain();

		let (_, _, bob) = join(&tenant, "bob").await;

		let notification: Notification = alice_client.try_recv_json().unwrap();
		assert_eq!(notification, Notification::PeerJoined(bob));
	}

	#[tokio::test]
	async fn distinct_addresses_inside_block() {
		let tenant = tenant("10.0.0.0/24");
		let (_, _, a) = join(&tenant, "a").await;
		let (_, _, b) = join(&tenant, "b").await;

		assert_ne!(a.virtual_ip, b.virtual_ip);
		assert!(tenant.virtual_network().contains(&a.virtual_ip));
		assert!(tenant.virtual_network().contains(&b.virtual_ip));
	}

	#[tokio::test]
	async fn exhausted_block_rejects_join_without_side_effects() {
		let tenant = tenant("10.0.0.0/30");
		join(&tenant, "a").await;
		join(&tenant, "b").await;

		let (connection, mut client) = MemoryConnection::pair();
		let err = tenant
			.add_peer(connection, identity("c"))
			.await
			.unwrap_err();

		assert!(matches!(err, MeshError::Exhausted));
		assert_eq!(tenant.peer_count().await, 2);
		assert!(client.try_recv().is_none());
	}

	#[tokio::test]
	async fn failed_response_rolls_back_address() {
		let tenant = tenant("10.0.0.0/30");
		let (_, mut alice_client, _) = join(&tenant, "alice").await;
		alice_client.drain();

		let (connection, _client) = MemoryConnection::pair();
		connection.set_fail_sends(true);
		let err = tenant
			.add_peer(connection, identity("bob"))
			.await
			.unwrap_err();

		assert!(matches!(err, MeshError::Transport(_)));
		assert_eq!(tenant.peer_count().await, 1);
		assert_eq!(tenant.available_addresses().await, 1);
		assert!(alice_client.try_recv().is_none(), "no join was announced");
	}

	#[tokio::test]
	async fn broken_member_does_not_fail_join() {
		let tenant = tenant("10.0.0.0/29");
		let (alice, _, _) = join(&tenant, "alice").await;
		let (_, mut bob_client, _) = join(&tenant, "bob").await;
		bob_client.drain();
		alice.set_fail_sends(true);

		let (_, _, carol) = join(&tenant, "carol").await;

		assert_eq!(tenant.peer_count().await, 3);
		let notification: Notification = bob_client.try_recv_json().unwrap();
		assert_eq!(notification, Notification::PeerJoined(carol));
	}

	#[tokio::test]
	async fn duplicate_join_is_rejected() {
		let tenant = tenant("10.0.0.0/29");
		let (connection, _client, _) = join(&tenant, "alice").await;

		let err = tenant
			.add_peer(connection, identity("alice"))
			.await
			.unwrap_err();

		assert!(matches!(err, MeshError::AlreadyJoined));
		assert_eq!(tenant.available_addresses().await, 5);
	}

	#[tokio::test]
	async fn leave_notifies_remaining_members_and_frees_address() {
		let tenant = tenant("10.0.0.0/30");
		let (alice, mut alice_client, alice_info) = join(&tenant, "alice").await;
		let (_, mut bob_client, _) = join(&tenant, "bob").await;
		alice_client.drain();
		bob_client.drain();

		let removed = tenant.remove_peer(alice.id()).await.unwrap();

		assert_eq!(removed, Some(alice_info.clone()));
		let notification: Notification = bob_client.try_recv_json().unwrap();
		assert_eq!(
			notification,
			Notification::PeerRemoved(PeerRemoval {
				removed_peer: alice_info.virtual_ip
			})
		);
		assert!(alice_client.try_recv().is_none(), "no self notification");
		assert_eq!(tenant.peer_count().await, 1);
		assert_eq!(tenant.available_addresses().await, 1);
	}

	#[tokio::test]
	async fn leave_frees_address_even_if_broadcast_fails() {
		let tenant = tenant("10.0.0.0/30");
		let (alice, _, _) = join(&tenant, "alice").await;
		let (bob, _, _) = join(&tenant, "bob").await;
		bob.set_fail_sends(true);

		tenant.remove_peer(alice.id()).await.unwrap();

		assert_eq!(tenant.available_addresses().await, 1);
	}

	#[tokio::test]
	async fn removing_unknown_connection_is_noop() {
		let tenant = tenant("10.0.0.0/30");
		join(&tenant, "alice").await;

		let removed = tenant.remove_peer(ConnectionId::new()).await.unwrap();

		assert!(removed.is_none());
		assert_eq!(tenant.peer_count().await, 1);
	}

	#[tokio::test]
	async fn freed_address_is_reused() {
		let tenant = tenant("10.0.0.0/30");
		let (alice, _, alice_info) = join(&tenant, "alice").await;
		join(&tenant, "bob").await;

		tenant.remove_peer(alice.id()).await.unwrap();
		let (_, _, carol) = join(&tenant, "carol").await;

		assert_eq!(carol.virtual_ip, alice_info.virtual_ip);
	}
}
