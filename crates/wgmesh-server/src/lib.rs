// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP surface of the wgmesh coordination service.

pub mod routes;
pub mod websocket;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use wgmesh_config::ServerConfig;
use wgmesh_coordinator::{SessionOptions, TenantDirectory};

#[derive(Clone)]
pub struct AppState {
	pub directory: Arc<TenantDirectory>,
	pub session_options: SessionOptions,
	pub send_queue_size: usize,
}

impl AppState {
	pub fn new(config: &ServerConfig) -> Self {
		Self {
			directory: Arc::new(TenantDirectory::new(config.networks.blocks.iter().copied())),
			session_options: SessionOptions {
				join_timeout: config.session.join_timeout,
			},
			send_queue_size: config.session.send_queue_size,
		}
	}
}

pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(routes::health::health_check))
		.route("/tenants/{tenant_id}", get(websocket::ws_upgrade_handler))
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}
