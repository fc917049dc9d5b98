// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Membership coordination for wgmesh tenants.
//!
//! Clients join a named tenant, receive a virtual address plus the current
//! roster, and are told whenever another member joins or leaves. Connections
//! reach the coordinator through the [`Connection`] trait; [`serve_connection`]
//! runs one client from its join request until it goes away.

pub mod broadcast;
pub mod directory;
pub mod error;
pub mod peer;
pub mod session;
pub mod tenant;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;

pub use broadcast::{broadcast, BroadcastReport, DeliveryFailure, Recipient};
pub use directory::{DirectoryStats, NetworkStats, TenantDirectory, TenantFactory};
pub use error::{MeshError, Result};
pub use peer::{Identity, Peer, PeerIdentity};
pub use session::{serve_connection, PeerSession, PeerState, SessionOptions};
pub use tenant::Tenant;
pub use transport::{CloseCode, Connection, ConnectionId, TransportError};
