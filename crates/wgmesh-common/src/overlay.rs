// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::pool::{ResourcePool, Result};
use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

/// The virtual address space of one tenant.
///
/// Peers are handed host addresses out of the network block. The network and
/// broadcast addresses are never assigned.
#[derive(Debug, Clone)]
pub struct OverlayNetwork {
	virtual_network: Ipv4Net,
	address_pool: ResourcePool<Ipv4Addr>,
}

impl OverlayNetwork {
	pub fn new(virtual_network: Ipv4Net) -> Self {
		Self {
			virtual_network,
			address_pool: ResourcePool::new(virtual_network.hosts()),
		}
	}

	/// Allocates an address that stays reserved until [`free_ip`](Self::free_ip).
	pub fn allocate_ip(&mut self) -> Result<Ipv4Addr> {
		self.address_pool.allocate()
	}

	/// Frees a previously allocated address. Freeing twice is harmless.
	pub fn free_ip(&mut self, ip: Ipv4Addr) -> Result<()> {
		self.address_pool.free(&ip)
	}

	pub fn virtual_network(&self) -> Ipv4Net {
		self.virtual_network
	}

	pub fn is_allocated(&self, ip: Ipv4Addr) -> bool {
		self.address_pool.is_allocated(&ip)
	}

	pub fn capacity(&self) -> usize {
		self.address_pool.capacity()
	}

	pub fn available(&self) -> usize {
		self.address_pool.available()
	}
}
