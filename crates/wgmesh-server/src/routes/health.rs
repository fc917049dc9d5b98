// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Health HTTP handler.

use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use wgmesh_coordinator::NetworkStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
	Healthy,
	Degraded,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
	pub status: HealthStatus,
	pub tenants: usize,
	pub peers: usize,
	pub networks: NetworkStats,
}

/// GET /health - directory occupancy.
///
/// Reports `degraded` once no network block is left for a new tenant.
/// Existing tenants keep working, so the status code stays 200.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
	let stats = state.directory.stats().await;

	let status = if stats.networks.available == 0 {
		HealthStatus::Degraded
	} else {
		HealthStatus::Healthy
	};

	let response = HealthResponse {
		status,
		tenants: stats.tenants,
		peers: stats.peers,
		networks: stats.networks,
	};

	(StatusCode::OK, Json(response))
}
