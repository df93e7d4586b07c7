//! Shared fixtures: an in-memory gateway wired to a fake remote drive.

// Each test binary uses its own subset of these helpers.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response, header};
use bytes::Bytes;
use futures::stream;
use reqwest::Client;
use serde_json::Value;
use tower::ServiceExt;

use feeder_gateway::auth::{IdentityReconciler, OAuthExchanger, TokenCodec};
use feeder_gateway::config::OAuthConfig;
use feeder_gateway::gateway::{AppState, create_router};
use feeder_gateway::relay::{ByteStream, ObjectMetadata, RemoteDrive};
use feeder_gateway::store::MemoryStore;
use feeder_gateway::{Error, Result};

pub const TEST_SECRET: &str = "integration-test-secret";
pub const CHUNK_SIZE: u64 = 512 * 1024;

/// In-memory stand-in for the remote drive API.
#[derive(Default)]
pub struct FakeDrive {
    objects: HashMap<String, (Vec<u8>, String)>,
    folders: HashMap<String, String>,
}

impl FakeDrive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, id: &str, bytes: Vec<u8>, mime_type: &str) -> Self {
        self.objects.insert(id.to_string(), (bytes, mime_type.to_string()));
        self
    }

    pub fn with_folder(mut self, name: &str, id: &str) -> Self {
        self.folders.insert(name.to_string(), id.to_string());
        self
    }
}

#[async_trait]
impl RemoteDrive for FakeDrive {
    async fn object_metadata(&self, id: &str, _access_token: &str) -> Result<ObjectMetadata> {
        let (bytes, mime_type) = self
            .objects
            .get(id)
            .ok_or_else(|| Error::Upstream(format!("no such object {id}")))?;
        Ok(ObjectMetadata {
            size: bytes.len() as u64,
            mime_type: mime_type.clone(),
        })
    }

    async fn object_range(
        &self,
        id: &str,
        _access_token: &str,
        start: u64,
        end: u64,
    ) -> Result<ByteStream> {
        let (bytes, _) = self
            .objects
            .get(id)
            .ok_or_else(|| Error::Upstream(format!("no such object {id}")))?;
        let slice = bytes[start as usize..=end as usize].to_vec();
        Ok(Box::pin(stream::once(async move {
            Ok::<Bytes, std::io::Error>(Bytes::from(slice))
        })))
    }

    async fn find_folder(&self, name: &str, _access_token: &str) -> Result<Option<String>> {
        Ok(self.folders.get(name).cloned())
    }
}

/// A router over fresh in-memory state and the given fake drive.
pub fn test_app(drive: FakeDrive) -> Router {
    let store = Arc::new(MemoryStore::new());
    let state = Arc::new(AppState {
        store: store.clone(),
        reconciler: IdentityReconciler::new(store),
        oauth: OAuthExchanger::new(Client::new(), OAuthConfig::default()),
        tokens: Arc::new(TokenCodec::new(TEST_SECRET, 36000)),
        drive: Arc::new(drive),
        chunk_size: CHUNK_SIZE,
        client_url: "http://localhost:3000".to_string(),
    });
    create_router(state)
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get_authed(app: &Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: &Value,
) -> Response<Body> {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = request.body(Body::from(body.to_string())).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    to_bytes(response.into_body(), usize::MAX).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await.to_vec()).unwrap()
}

/// Register a direct account and log in, returning (user, session token).
pub async fn register_and_login(app: &Router, username: &str, password: &str) -> (Value, String) {
    let response = send_json(
        app,
        "POST",
        "/api/customUsers",
        None,
        &serde_json::json!({ "username": username, "password": password }),
    )
    .await;
    assert!(response.status().is_success(), "registration failed");

    let response = send_json(
        app,
        "POST",
        "/api/login",
        None,
        &serde_json::json!({ "username": username, "password": password }),
    )
    .await;
    assert!(response.status().is_success(), "login failed");

    let body = body_json(response).await;
    let token = body["sessionToken"].as_str().unwrap().to_string();
    (body["user"].clone(), token)
}
