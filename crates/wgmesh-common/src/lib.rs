// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

pub mod cache;
pub mod keys;
pub mod messages;
pub mod overlay;
pub mod pool;

pub use cache::{KeyedCache, ResourceFactory};
pub use keys::{KeyError, PublicKey};
pub use messages::{
	JoinRequest, JoinResponse, MessageError, Notification, PeerInfo, PeerRemoval,
};
pub use overlay::OverlayNetwork;
pub use pool::{PoolError, ResourcePool};
