//! Shared demo server and helpers for the fexios example binaries.
//!
//! Each binary starts [`spawn_server`] on an ephemeral port and talks to it
//! with a [`fexios::Client`].

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::RwLock;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct NewUser {
    pub name: String,
}

pub type Db = Arc<RwLock<HashMap<u64, User>>>;

/// Demo API: a small user store plus a couple of diagnostic routes.
pub fn app() -> Router {
    let mut users = HashMap::new();
    users.insert(1, User { id: 1, name: "ada".to_string() });
    let db: Db = Arc::new(RwLock::new(users));

    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(get_user).delete(delete_user))
        .route("/whoami", get(whoami))
        .route("/health", get(|| async { "ok" }))
        .with_state(db)
}

/// Serve [`app`] on an ephemeral local port and return its base URL.
pub async fn spawn_server() -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr: SocketAddr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app()).await {
            tracing::error!(error = %err, "demo server stopped");
        }
    });
    tracing::info!(%addr, "demo server listening");
    Ok(format!("http://{addr}"))
}

/// Install a `fmt` subscriber filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fexios=debug".into()),
        )
        .init();
}

async fn list_users(State(db): State<Db>) -> Json<Vec<User>> {
    let users = db.read().await;
    let mut users: Vec<User> = users.values().cloned().collect();
    users.sort_by_key(|user| user.id);
    Json(users)
}

async fn create_user(State(db): State<Db>, Json(input): Json<NewUser>) -> (StatusCode, Json<User>) {
    let mut users = db.write().await;
    let id = users.keys().max().copied().unwrap_or(0) + 1;
    let user = User { id, name: input.name };
    users.insert(id, user.clone());
    (StatusCode::CREATED, Json(user))
}

async fn get_user(State(db): State<Db>, Path(id): Path<u64>) -> Result<Json<User>, StatusCode> {
    let users = db.read().await;
    users.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn delete_user(State(db): State<Db>, Path(id): Path<u64>) -> StatusCode {
    match db.write().await.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

/// Echo back the identifying headers the client sent.
async fn whoami(headers: HeaderMap) -> Result<Json<serde_json::Value>, StatusCode> {
    let token = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;
    let trace = headers.get("x-trace").and_then(|value| value.to_str().ok());
    Ok(Json(serde_json::json!({ "token": token, "trace": trace })))
}
