// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::{SinkExt, StreamExt};
use http_body_util::BodyExt;
use ipnet::Ipv4Net;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;
use wgmesh_common::{JoinRequest, JoinResponse, Notification, PeerRemoval, PublicKey};
use wgmesh_config::ServerConfig;
use wgmesh_server::{create_router, AppState};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

fn config(blocks: &[&str]) -> ServerConfig {
	let mut config = ServerConfig::default();
	config.networks.blocks = blocks
		.iter()
		.map(|block| block.parse::<Ipv4Net>().unwrap())
		.collect();
	config
}

async fn spawn_server(config: &ServerConfig) -> SocketAddr {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	let app = create_router(AppState::new(config));
	tokio::spawn(async move {
		axum::serve(listener, app).await.unwrap();
	});
	addr
}

async fn connect(addr: SocketAddr, tenant: &str) -> Client {
	let (ws, _) = connect_async(format!("ws://{addr}/tenants/{tenant}"))
		.await
		.unwrap();
	ws
}

async fn send_join(ws: &mut Client, name: &str) {
	let request = JoinRequest {
		display_name: name.to_string(),
		public_key: PublicKey::from_bytes(format!("{name}-key").into_bytes()).unwrap(),
	};
	ws.send(Message::Text(serde_json::to_string(&request).unwrap()))
		.await
		.unwrap();
}

async fn next_message(ws: &mut Client) -> Message {
	tokio::time::timeout(RECV_TIMEOUT, ws.next())
		.await
		.expect("timed out waiting for a message")
		.expect("stream ended")
		.unwrap()
}

async fn next_json<T: serde::de::DeserializeOwned>(ws: &mut Client) -> T {
	match next_message(ws).await {
		Message::Text(text) => serde_json::from_str(&text).unwrap(),
		other => panic!("expected text message, got {other:?}"),
	}
}

async fn health(config: &ServerConfig) -> serde_json::Value {
	let app = create_router(AppState::new(config));
	let response = app
		.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);
	let body = response.into_body().collect().await.unwrap().to_bytes();
	serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_reports_idle_directory() {
	let body = health(&config(&["10.0.0.0/24", "10.0.1.0/24"])).await;

	assert_eq!(body["status"], "healthy");
	assert_eq!(body["tenants"], 0);
	assert_eq!(body["peers"], 0);
	assert_eq!(body["networks"]["total"], 2);
	assert_eq!(body["networks"]["available"], 2);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
	let app = create_router(AppState::new(&config(&["10.0.0.0/24"])));

	let response = app
		.oneshot(Request::builder().uri("/tenants").body(Body::empty()).unwrap())
		.await
		.unwrap();

	assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn peers_join_and_leave_over_websocket() {
	let blocks = config(&["10.0.0.0/30"]);
	let block = blocks.networks.blocks[0];
	let addr = spawn_server(&blocks).await;

	let mut alice = connect(addr, "acme").await;
	send_join(&mut alice, "alice").await;
	let alice_joined: JoinResponse = next_json(&mut alice).await;
	assert!(block.contains(&alice_joined.virtual_ip));
	assert!(alice_joined.peers.is_empty());

	let mut bob = connect(addr, "acme").await;
	send_join(&mut bob, "bob").await;
	let bob_joined: JoinResponse = next_json(&mut bob).await;
	assert!(block.contains(&bob_joined.virtual_ip));
	assert_ne!(bob_joined.virtual_ip, alice_joined.virtual_ip);
	assert_eq!(bob_joined.peers.len(), 1);
	assert_eq!(bob_joined.peers[0].display_name, "alice");

	let heard: Notification = next_json(&mut alice).await;
	match heard {
		Notification::PeerJoined(info) => assert_eq!(info.display_name, "bob"),
		other => panic!("unexpected notification {other:?}"),
	}

	alice.close(None).await.unwrap();
	let removed: Notification = next_json(&mut bob).await;
	assert_eq!(
		removed,
		Notification::PeerRemoved(PeerRemoval {
			removed_peer: alice_joined.virtual_ip
		})
	);
}

#[tokio::test]
async fn binary_frame_after_join_is_a_policy_violation() {
	let addr = spawn_server(&config(&["10.0.0.0/30"])).await;
	let mut ws = connect(addr, "acme").await;
	send_join(&mut ws, "alice").await;
	let _: JoinResponse = next_json(&mut ws).await;

	ws.send(Message::Binary(vec![0xff, 0xfe, 0xfd])).await.unwrap();

	match next_message(&mut ws).await {
		Message::Close(Some(frame)) => assert_eq!(u16::from(frame.code), 1008),
		other => panic!("expected close frame, got {other:?}"),
	}
}

#[tokio::test]
async fn malformed_join_gets_invalid_payload_close() {
	let addr = spawn_server(&config(&["10.0.0.0/30"])).await;
	let mut ws = connect(addr, "acme").await;

	ws.send(Message::Text(r#"{"display_name":"x"}"#.to_string()))
		.await
		.unwrap();

	match next_message(&mut ws).await {
		Message::Close(Some(frame)) => assert_eq!(u16::from(frame.code), 1007),
		other => panic!("expected close frame, got {other:?}"),
	}
}

#[tokio::test]
async fn second_tenant_without_block_is_told_to_retry() {
	let addr = spawn_server(&config(&["10.0.0.0/30"])).await;

	let mut first = connect(addr, "acme").await;
	send_join(&mut first, "alice").await;
	let _: JoinResponse = next_json(&mut first).await;

	let mut second = connect(addr, "globex").await;
	send_join(&mut second, "bob").await;

	match next_message(&mut second).await {
		Message::Close(Some(frame)) => assert_eq!(u16::from(frame.code), 1013),
		other => panic!("expected close frame, got {other:?}"),
	}
}
