// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Process-wide registry of live tenants.
//!
//! Tenants are created on the first attach for their identifier and evicted
//! once their last member has left. Every tenant holds one network block from
//! a fixed pool for as long as it lives.
//!
//! Each cache entry carries an attachment count: members plus attaches still
//! in their handshake. The count only changes under the directory lock, and a
//! tenant is evicted when it drops to zero. The directory lock is never held
//! while talking to a connection.

use crate::error::{MeshError, Result};
use crate::peer::Identity;
use crate::tenant::Tenant;
use crate::transport::{Connection, ConnectionId};
use ipnet::Ipv4Net;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};
use wgmesh_common::{KeyedCache, OverlayNetwork, PeerInfo, PoolError, ResourceFactory, ResourcePool};

pub struct TenantEntry {
	tenant: Arc<Tenant>,
	attachments: usize,
}

impl TenantEntry {
	pub fn tenant(&self) -> &Arc<Tenant> {
		&self.tenant
	}

	pub fn attachments(&self) -> usize {
		self.attachments
	}
}

/// Creates tenants, each backed by a block taken from the network pool.
pub struct TenantFactory {
	blocks: ResourcePool<Ipv4Net>,
}

impl TenantFactory {
	pub fn new(blocks: impl IntoIterator<Item = Ipv4Net>) -> Self {
		Self {
			blocks: ResourcePool::new(blocks),
		}
	}

	fn reclaim(&mut self, block: Ipv4Net) -> Result<()> {
		self.blocks.free(&block).map_err(MeshError::from)
	}
}

impl ResourceFactory for TenantFactory {
	type Resource = TenantEntry;
	type Error = MeshError;

	fn create(&mut self, key: &str) -> Result<TenantEntry> {
		let block = self.blocks.allocate().map_err(|err| match err {
			PoolError::Exhausted => MeshError::NoCapacity,
			other => other.into(),
		})?;
		info!(tenant_id = key, network = %block, "tenant created");

		Ok(TenantEntry {
			tenant: Arc::new(Tenant::new(key, OverlayNetwork::new(block))),
			attachments: 0,
		})
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NetworkStats {
	pub total: usize,
	pub available: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DirectoryStats {
	pub tenants: usize,
	/// Members plus connections still in their join handshake.
	pub peers: usize,
	pub networks: NetworkStats,
}

pub struct TenantDirectory {
	tenants: Mutex<KeyedCache<TenantFactory>>,
}

impl TenantDirectory {
	pub fn new(blocks: impl IntoIterator<Item = Ipv4Net>) -> Self {
		Self {
			tenants: Mutex::new(KeyedCache::new(TenantFactory::new(blocks))),
		}
	}

	/// Joins `connection` to the tenant, creating the tenant if needed.
	///
	/// On failure every partial effect is undone: the address goes back to the
	/// tenant and a tenant created for this attach alone is evicted again.
	#[instrument(skip(self, connection, identity), fields(%tenant_id, connection_id = %connection.id()))]
	pub async fn resolve_and_attach(
		&self,
		tenant_id: &str,
		connection: Arc<dyn Connection>,
		identity: Identity,
	) -> Result<PeerInfo> {
		let tenant = {
			let mut tenants = self.tenants.lock().await;
			let entry = tenants.get(tenant_id)?;
			entry.attachments += 1;
			Arc::clone(&entry.tenant)
		};

		match tenant.add_peer(connection, identity).await {
			Ok(info) => Ok(info),
			Err(err) => {
				if let Err(release_err) = self.release(tenant_id, &tenant).await {
					error!(error = %release_err, "failed to release tenant after aborted join");
				}
				Err(err)
			}
		}
	}

	/// Removes the connection from its tenant and evicts the tenant if it is
	/// left without members.
	///
	/// Detaching a connection that is not a member changes nothing.
	#[instrument(skip(self), fields(%tenant_id, %connection_id))]
	pub async fn detach_and_maybe_reclaim(
		&self,
		tenant_id: &str,
		connection_id: ConnectionId,
	) -> Result<()> {
		let tenant = {
			let tenants = self.tenants.lock().await;
			tenants.peek(tenant_id).map(|entry| Arc::clone(&entry.tenant))
		};
		let Some(tenant) = tenant else {
			warn!("detach from unknown tenant");
			return Ok(());
		};

		let removal = tenant.remove_peer(connection_id).await;
		if matches!(removal, Ok(None)) {
			return Ok(());
		}

		// The peer has left the roster even if freeing its address failed.
		let released = self.release(tenant_id, &tenant).await;
		removal?;
		released
	}

	/// Drops one attachment and evicts the tenant when none are left.
	async fn release(&self, tenant_id: &str, tenant: &Arc<Tenant>) -> Result<()> {
		let mut tenants = self.tenants.lock().await;

		let Some(entry) = tenants.peek_mut(tenant_id) else {
			return Ok(());
		};
		if !Arc::ptr_eq(&entry.tenant, tenant) {
			warn!(%tenant_id, "attachment belongs to an evicted tenant");
			return Ok(());
		}

		entry.attachments = entry.attachments.saturating_sub(1);
		if entry.attachments > 0 {
			return Ok(());
		}

		if let Some(entry) = tenants.remove(tenant_id) {
			let block = entry.tenant.virtual_network();
			tenants.factory_mut().reclaim(block)?;
			info!(%tenant_id, network = %block, "tenant evicted");
		}
		Ok(())
	}

	/// Live tenant for `tenant_id`, without creating one.
	pub async fn tenant(&self, tenant_id: &str) -> Option<Arc<Tenant>> {
		let tenants = self.tenants.lock().await;
		tenants.peek(tenant_id).map(|entry| Arc::clone(&entry.tenant))
	}

	pub async fn stats(&self) -> DirectoryStats {
		let tenants = self.tenants.lock().await;
		let blocks = &tenants.factory().blocks;

		DirectoryStats {
			tenants: tenants.len(),
			peers: tenants.values().map(TenantEntry::attachments).sum(),
			networks: NetworkStats {
				total: blocks.capacity(),
				available: blocks.available(),
			},
		}
	}
}
