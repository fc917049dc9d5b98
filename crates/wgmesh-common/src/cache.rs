// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Get-or-create cache keyed by string identifiers.
//!
//! Some resources are expensive to create or are meant to be shared by every
//! user asking for the same key. [`KeyedCache::get`] creates the resource on
//! the first request for a key and hands back the stored instance afterwards.
//! [`KeyedCache::remove`] drops the entry so the next `get` creates a fresh one.
//!
//! What gets created is decided by the [`ResourceFactory`] injected at
//! construction.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Creation strategy for a [`KeyedCache`].
pub trait ResourceFactory {
	type Resource;
	type Error;

	/// Builds the resource for `key`. Only called on a cache miss.
	fn create(&mut self, key: &str) -> Result<Self::Resource, Self::Error>;
}

pub struct KeyedCache<F: ResourceFactory> {
	factory: F,
	entries: HashMap<String, F::Resource>,
}

impl<F: ResourceFactory> KeyedCache<F> {
	pub fn new(factory: F) -> Self {
		Self {
			factory,
			entries: HashMap::new(),
		}
	}

	/// Returns the resource stored under `key`, creating it on a miss.
	///
	/// A failed creation stores nothing, so the next call retries.
	pub fn get(&mut self, key: &str) -> Result<&mut F::Resource, F::Error> {
		match self.entries.entry(key.to_string()) {
			Entry::Occupied(entry) => Ok(entry.into_mut()),
			Entry::Vacant(entry) => {
				let resource = self.factory.create(key)?;
				Ok(entry.insert(resource))
			}
		}
	}

	/// Looks up `key` without creating anything.
	pub fn peek(&self, key: &str) -> Option<&F::Resource> {
		self.entries.get(key)
	}

	pub fn peek_mut(&mut self, key: &str) -> Option<&mut F::Resource> {
		self.entries.get_mut(key)
	}

	/// Drops the entry for `key`, returning it. Removing an absent key is a no-op.
	pub fn remove(&mut self, key: &str) -> Option<F::Resource> {
		self.entries.remove(key)
	}

	pub fn contains(&self, key: &str) -> bool {
		self.entries.contains_key(key)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn values(&self) -> impl Iterator<Item = &F::Resource> {
		self.entries.values()
	}

	pub fn factory(&self) -> &F {
		&self.factory
	}

	pub fn factory_mut(&mut self) -> &mut F {
		&mut self.factory
	}
}
