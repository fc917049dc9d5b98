// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use super::WsConnection;
use crate::AppState;
use axum::{
	extract::{ws::WebSocket, Path, State, WebSocketUpgrade},
	response::IntoResponse,
};
use std::sync::Arc;
use tracing::{debug, error, info};
use wgmesh_coordinator::{serve_connection, Connection, MeshError};

/// GET /tenants/{tenant_id} - join the tenant over a WebSocket.
pub async fn ws_upgrade_handler(
	ws: WebSocketUpgrade,
	Path(tenant_id): Path<String>,
	State(state): State<AppState>,
) -> impl IntoResponse {
	info!(%tenant_id, "WebSocket upgrade request received");

	ws.on_upgrade(move |socket| handle_ws_connection(socket, tenant_id, state))
}

async fn handle_ws_connection(socket: WebSocket, tenant_id: String, state: AppState) {
	let connection = Arc::new(WsConnection::spawn(socket, state.send_queue_size));
	let connection_id = connection.id();
	info!(%tenant_id, %connection_id, "connection accepted");

	match serve_connection(
		Arc::clone(&state.directory),
		tenant_id.clone(),
		connection,
		state.session_options.clone(),
	)
	.await
	{
		Ok(()) => info!(%tenant_id, %connection_id, "connection closed"),
		Err(MeshError::UnknownResource(resource)) => {
			error!(%tenant_id, %connection_id, %resource, "session ended with pool inconsistency")
		}
		Err(err) => debug!(%tenant_id, %connection_id, error = %err, "session ended with error"),
	}
}
