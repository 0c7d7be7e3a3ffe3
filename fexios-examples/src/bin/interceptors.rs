//! Request and response interceptors against the local demo server.
//!
//! Run with: cargo run --bin interceptors

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use fexios::{Client, Handler, HeaderInterceptor, RequestConfig, ResponseEnvelope};
use fexios_examples::{User, init_tracing, spawn_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let base_url = spawn_server().await?;

    let client = Client::builder()
        .base_url(&base_url)
        .header("content-type", "application/json")
        .build()?;

    // ========================================================================
    // Request side: static header plus a computed one
    // ========================================================================
    client
        .interceptors()
        .request
        .use_handler(HeaderInterceptor::new("x-trace", "demo-trace-1"));

    client.interceptors().request.use_handler(
        Handler::new().on_fulfilled(|config: RequestConfig| async move {
            // Stand-in for an async token lookup.
            tokio::task::yield_now().await;
            config.try_header("authorization", "Bearer demo-token")
        }),
    );

    // ========================================================================
    // Response side: count responses by status class
    // ========================================================================
    let responses = Arc::new(AtomicUsize::new(0));
    let counter = responses.clone();
    let counting = client.interceptors().response.use_handler(
        Handler::new().on_fulfilled_sync(move |res: ResponseEnvelope| {
            counter.fetch_add(1, Ordering::SeqCst);
            println!("  <- {} {} ({})", res.status, res.config.url, res.kind().as_str());
            Ok(res)
        }),
    );

    println!("Test 1: headers added by request interceptors reach the server...");
    let res = client.get("/whoami").await?;
    println!("  whoami: {}", res.data.as_json().cloned().unwrap_or_default());

    println!("Test 2: typed payloads in and out...");
    let created = client
        .post("/users", &serde_json::json!({ "name": "grace" }))
        .await?
        .json::<User>()
        .await?;
    println!("  created user #{} ({})", created.data.id, created.data.name);

    let users = client.get("/users").await?.json::<Vec<User>>().await?;
    println!("  {} users on the server", users.data.len());

    println!("Test 3: ejected interceptors stop applying to new requests...");
    client.interceptors().response.eject(counting);
    client.get("/health").await?;

    println!();
    println!("Counted {} responses", responses.load(Ordering::SeqCst));
    Ok(())
}
