// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Exclusive allocation over a fixed set of resources.
//!
//! A [`ResourcePool`] is built from a fixed resource set. Each resource can be
//! handed out once and stays blocked until it is freed again. Virtual IP
//! addresses and tenant network blocks are both managed this way.

use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
	#[error("resource pool exhausted")]
	Exhausted,

	#[error("resource was never part of this pool: {0}")]
	UnknownResource(String),
}

pub type Result<T> = std::result::Result<T, PoolError>;

#[derive(Debug, Clone)]
pub struct ResourcePool<R> {
	resources: BTreeSet<R>,
	available: BTreeSet<R>,
}

impl<R> ResourcePool<R>
where
	R: Ord + Clone + fmt::Debug,
{
	pub fn new(resources: impl IntoIterator<Item = R>) -> Self {
		let resources: BTreeSet<R> = resources.into_iter().collect();
		Self {
			available: resources.clone(),
			resources,
		}
	}

	/// Takes any free resource out of the pool.
	///
	/// Callers must not rely on which free resource is returned.
	pub fn allocate(&mut self) -> Result<R> {
		self.available.pop_first().ok_or(PoolError::Exhausted)
	}

	/// Returns a resource to the pool.
	///
	/// Freeing a resource that is already free is a no-op. Freeing a resource
	/// the pool never owned fails with [`PoolError::UnknownResource`].
	pub fn free(&mut self, resource: &R) -> Result<()> {
		if !self.resources.contains(resource) {
			return Err(PoolError::UnknownResource(format!("{resource:?}")));
		}

		self.available.insert(resource.clone());
		Ok(())
	}

	pub fn contains(&self, resource: &R) -> bool {
		self.resources.contains(resource)
	}

	pub fn is_allocated(&self, resource: &R) -> bool {
		self.resources.contains(resource) && !self.available.contains(resource)
	}

	pub fn capacity(&self) -> usize {
		self.resources.len()
	}

	pub fn available(&self) -> usize {
		self.available.len()
	}

	pub fn allocated(&self) -> usize {
		self.resources.len() - self.available.len()
	}
}
