//! HTTP router and handlers

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::auth::{
    IdentityReconciler, OAuthExchanger, TokenCodec, bearer_token, session_middleware,
};
use crate::relay::{RangeError, RangeWindow, RemoteDrive};
use crate::store::{IdentityStore, NewAccount};
use crate::{Error, Result};

/// Shared application state
pub struct AppState {
    /// Identity store collaborator
    pub store: Arc<dyn IdentityStore>,
    /// Identity reconciliation over the store
    pub reconciler: IdentityReconciler,
    /// Authorization-code exchanger
    pub oauth: OAuthExchanger,
    /// Session token codec
    pub tokens: Arc<TokenCodec>,
    /// Remote object API
    pub drive: Arc<dyn RemoteDrive>,
    /// Maximum byte span for open-ended range requests
    pub chunk_size: u64,
    /// Front-end origin allowed by CORS
    pub client_url: String,
}

/// Create the router
pub fn create_router(state: Arc<AppState>) -> Router {
    let tokens = Arc::clone(&state.tokens);

    // Account and preference routes sit behind the session gate; the login
    // surface and the relay (which authorizes with the provider access token)
    // stay open.
    let protected = Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/{user_id}", get(find_user))
        .route("/api/getAllUsernames", get(list_usernames))
        .route("/api/schedule/{user_id}", get(find_preferences).put(update_schedule))
        .route("/api/portion/{user_id}", put(update_portion))
        .route("/api/PortionSchedule/{user_id}", put(update_preferences))
        .route_layer(middleware::from_fn_with_state(tokens, session_middleware));

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/auth/url", get(auth_url_handler))
        .route("/auth/token", get(auth_token_handler))
        .route("/auth/logged_in", get(logged_in_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/api/customUsers", post(register_handler))
        .route("/api/login", post(login_handler))
        .route("/api/getFolderID", post(folder_id_handler))
        .route("/api/video/{id}", get(video_handler))
        .merge(protected)
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http());

    match state.client_url.parse::<HeaderValue>() {
        Ok(origin) => {
            let cors = CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::GET, Method::POST, Method::PUT])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::RANGE])
                .allow_credentials(true);
            router = router.layer(cors);
        }
        Err(e) => {
            warn!(client_url = %state.client_url, error = %e, "Invalid client URL, CORS layer disabled");
        }
    }

    router.with_state(state)
}

/// Health check handler
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ============================================================================
// Login surface
// ============================================================================

/// GET /auth/url — the deterministic provider authorization URL
async fn auth_url_handler(State(state): State<Arc<AppState>>) -> Result<Json<Value>> {
    let url = state.oauth.authorization_url()?;
    Ok(Json(json!({ "url": url })))
}

#[derive(Debug, Deserialize)]
struct AuthCodeQuery {
    #[serde(default)]
    code: Option<String>,
}

/// GET /auth/token — exchange the authorization code, reconcile the identity,
/// and issue a session token
async fn auth_token_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuthCodeQuery>,
) -> Result<Json<Value>> {
    let code = query.code.unwrap_or_default();
    let (access_token, claims) = state.oauth.exchange_code(&code).await?;
    let user = state.reconciler.resolve_or_create(&claims).await?;
    let session_token = state
        .tokens
        .issue(&user)
        .map_err(|e| Error::Internal(format!("Failed to issue session token: {e}")))?;

    info!(account_id = %user.id, "Provider login completed");
    Ok(Json(json!({
        "user": user,
        "sessionToken": session_token,
        "accessToken": access_token,
    })))
}

/// GET /auth/logged_in — tolerant session probe.
/// Never rejects; a missing or bad token just reads as logged out.
async fn logged_in_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<Value> {
    let user = bearer_token(&headers).and_then(|token| state.tokens.verify(token).ok());
    match user {
        Some(user) => Json(json!({ "loggedIn": true, "user": user })),
        None => Json(json!({ "loggedIn": false })),
    }
}

/// POST /auth/logout — acknowledgement only; session tokens are stateless so
/// there is no server-side state to clear
async fn logout_handler() -> Json<Value> {
    Json(json!({ "message": "Logged out" }))
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    username: String,
    password: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

/// POST /api/customUsers — direct registration.
/// A username conflict keeps the historical contract: 400 with a plain
/// "Unable to create user" body.
async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Response> {
    match state
        .reconciler
        .register_direct(
            &request.username,
            &request.password,
            request.email,
            request.name,
        )
        .await
    {
        Ok(user) => Ok(Json(user).into_response()),
        Err(Error::Conflict(_)) => {
            Ok((StatusCode::BAD_REQUEST, "Unable to create user").into_response())
        }
        Err(e) => Err(e),
    }
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

/// POST /api/login — direct login; 400 for an unknown user, 401 for a
/// credential mismatch (historical contract)
async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Response> {
    match state
        .reconciler
        .authenticate_direct(&request.username, &request.password)
        .await
    {
        Ok(user) => {
            let session_token = state
                .tokens
                .issue(&user)
                .map_err(|e| Error::Internal(format!("Failed to issue session token: {e}")))?;
            Ok(Json(json!({ "user": user, "sessionToken": session_token })).into_response())
        }
        Err(Error::NotFound(_)) => {
            Ok((StatusCode::BAD_REQUEST, "User Doesn't Exist").into_response())
        }
        Err(Error::Unauthenticated) => {
            Ok((StatusCode::UNAUTHORIZED, "Invalid password").into_response())
        }
        Err(e) => Err(e),
    }
}

// ============================================================================
// Media relay
// ============================================================================

#[derive(Debug, Deserialize)]
struct FolderRequest {
    #[serde(rename = "folderName")]
    folder_name: String,
    #[serde(rename = "accessToken")]
    access_token: String,
}

/// POST /api/getFolderID — first folder matching a name in the caller's drive
async fn folder_id_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FolderRequest>,
) -> Result<Json<Value>> {
    let folder_id = state
        .drive
        .find_folder(&request.folder_name, &request.access_token)
        .await?
        .ok_or_else(|| {
            Error::NotFound(format!(
                "Folder with name {} not found",
                request.folder_name
            ))
        })?;

    Ok(Json(json!({ "folderId": folder_id })))
}

#[derive(Debug, Deserialize)]
struct VideoQuery {
    #[serde(rename = "accessToken", default)]
    access_token: Option<String>,
}

/// GET /api/video/{id} — byte-range relay of a remote object.
///
/// Requires the provider access token and a `Range` header; the absence of a
/// Range header is a range-not-satisfiable condition, never a full-object
/// response. The upstream byte stream is piped through as it arrives.
async fn video_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<VideoQuery>,
    headers: HeaderMap,
) -> Result<Response> {
    let access_token = match query.access_token.as_deref() {
        Some(token) if !token.is_empty() => token,
        _ => return Ok((StatusCode::BAD_REQUEST, "Missing access token").into_response()),
    };

    let Some(range_header) = headers.get(header::RANGE).and_then(|v| v.to_str().ok()) else {
        return Ok((StatusCode::RANGE_NOT_SATISFIABLE, "Requires Range header").into_response());
    };

    let metadata = state.drive.object_metadata(&id, access_token).await?;

    let window = match RangeWindow::parse(range_header, metadata.size, state.chunk_size) {
        Ok(window) => window,
        Err(RangeError::Malformed(detail)) => {
            return Err(Error::BadRequest(format!("Malformed Range header: {detail}")));
        }
        Err(RangeError::Unsatisfiable { size }) => {
            return Err(Error::RangeNotSatisfiable { size });
        }
    };

    let stream = state
        .drive
        .object_range(&id, access_token, window.start, window.end)
        .await?;

    // Headers are committed here; an upstream failure mid-stream terminates
    // the connection without further body framing.
    Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header(header::CONTENT_RANGE, window.content_range())
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_LENGTH, window.content_length())
        .header(header::CONTENT_TYPE, metadata.mime_type)
        .body(Body::from_stream(stream))
        .map_err(|e| Error::Internal(format!("Failed to build relay response: {e}")))
}

// ============================================================================
// Account and preference glue (session-gated)
// ============================================================================

async fn list_users(State(state): State<Arc<AppState>>) -> Result<Json<Value>> {
    let users = state.store.list_accounts().await?;
    Ok(Json(serde_json::to_value(users)?))
}

async fn find_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>> {
    let user = state
        .store
        .find_account(&user_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("No user {user_id}")))?;
    Ok(Json(serde_json::to_value(user)?))
}

#[derive(Debug, Deserialize)]
struct ProviderUserRequest {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

/// POST /api/users — provider-shaped account creation, mapped field by field
async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ProviderUserRequest>,
) -> Result<Json<Value>> {
    let account = state
        .store
        .create_account(NewAccount::provider(
            request.sub,
            request.email,
            request.name,
            request.picture,
        ))
        .await?;
    Ok(Json(serde_json::to_value(account)?))
}

async fn list_usernames(State(state): State<Arc<AppState>>) -> Result<Json<Value>> {
    let usernames = state.store.list_usernames().await?;
    Ok(Json(serde_json::to_value(usernames)?))
}

async fn find_preferences(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>> {
    let record = state
        .store
        .find_schedule(&user_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("No schedule for user {user_id}")))?;
    Ok(Json(serde_json::to_value(record)?))
}

async fn update_schedule(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(schedule): Json<Value>,
) -> Result<Json<Value>> {
    let matched = state.store.set_schedule(&user_id, schedule).await?;
    Ok(Json(json!({ "acknowledged": matched })))
}

async fn update_portion(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(portion): Json<u32>,
) -> Result<Json<Value>> {
    let matched = state.store.set_portion(&user_id, portion).await?;
    Ok(Json(json!({ "acknowledged": matched })))
}

#[derive(Debug, Deserialize)]
struct PreferencesRequest {
    schedule: Value,
    portion: u32,
}

async fn update_preferences(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(request): Json<PreferencesRequest>,
) -> Result<Json<Value>> {
    let matched = state
        .store
        .set_preferences(&user_id, request.schedule, request.portion)
        .await?;
    Ok(Json(json!({ "acknowledged": matched })))
}
