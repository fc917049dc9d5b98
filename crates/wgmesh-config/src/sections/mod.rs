// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections for wgmesh-server.

pub mod http;
pub mod logging;
pub mod networks;
pub mod session;

pub use http::{HttpConfig, HttpConfigLayer};
pub use logging::{LoggingConfig, LoggingConfigLayer};
pub use networks::{NetworksConfig, NetworksConfigLayer};
pub use session::{SessionConfig, SessionConfigLayer};
