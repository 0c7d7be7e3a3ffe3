//! Recovering failures inside the interceptor chain.
//!
//! Run with: cargo run --bin error-recovery

use std::time::Duration;

use fexios::{Body, Client, Error, Handler, RequestConfig, RequestOptions, StatusCode};
use fexios_examples::{init_tracing, spawn_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let base_url = spawn_server().await?;
    let client = Client::builder().base_url(&base_url).build()?;

    let mut passed = 0;
    let mut failed = 0;

    // ========================================================================
    // Test 1: without handlers a 404 rejects with the full envelope
    // ========================================================================
    println!("Test 1: 404 without recovery...");
    match client.get("/users/404").await {
        Err(err) if err.status() == Some(StatusCode::NOT_FOUND) => {
            println!("  PASS: rejected with {}", err);
            passed += 1;
        }
        other => {
            println!("  FAIL: unexpected outcome {:?}", other.map(|res| res.status));
            failed += 1;
        }
    }

    // ========================================================================
    // Test 2: a response interceptor turns 404 into an empty result
    // ========================================================================
    println!("Test 2: 404 recovered by a response interceptor...");
    let recovery = client.interceptors().response.use_handler(Handler::new().on_rejected_sync(
        |err: Error| match err.into_response() {
            Ok(res) if res.status == StatusCode::NOT_FOUND => Ok(res.map(|_| Body::Json(serde_json::Value::Null))),
            Ok(res) => Err(Error::Status(Box::new(res))),
            Err(err) => Err(err),
        },
    ));
    match client.get("/users/404").await {
        Ok(res) if res.data.as_json() == Some(&serde_json::Value::Null) => {
            println!("  PASS: recovered with status {}", res.status);
            passed += 1;
        }
        other => {
            println!("  FAIL: unexpected outcome {:?}", other.map(|res| res.status));
            failed += 1;
        }
    }
    client.interceptors().response.eject(recovery);

    // ========================================================================
    // Test 3: a failing request interceptor skips dispatch entirely
    // ========================================================================
    println!("Test 3: request interceptor rejection skips dispatch...");
    let guard = client.interceptors().request.use_handler(
        Handler::new().on_fulfilled_sync(|config: RequestConfig| {
            if config.url.starts_with("/admin") {
                Err(Error::interceptor("admin routes are blocked"))
            } else {
                Ok(config)
            }
        }),
    );
    match client.get("/admin/users").await {
        Err(Error::Interceptor(reason)) => {
            println!("  PASS: blocked before dispatch ({})", reason);
            passed += 1;
        }
        other => {
            println!("  FAIL: unexpected outcome {:?}", other.map(|res| res.status));
            failed += 1;
        }
    }
    client.interceptors().request.eject(guard);

    // ========================================================================
    // Test 4: transport failures carry no status
    // ========================================================================
    println!("Test 4: timeout surfaces as a transport error...");
    let options = RequestOptions::new().timeout(Duration::from_nanos(1));
    match client.get_with_options("/users", options).await {
        Err(err) if err.is_transport() && err.status().is_none() => {
            println!("  PASS: {}", err);
            passed += 1;
        }
        Ok(res) => {
            // A loopback answer can occasionally beat a 1ns deadline.
            println!("  SKIP: request completed with {}", res.status);
        }
        Err(err) => {
            println!("  FAIL: unexpected error {}", err);
            failed += 1;
        }
    }

    println!();
    println!("Results: {} passed, {} failed", passed, failed);
    if failed > 0 {
        anyhow::bail!("{} checks failed", failed);
    }
    Ok(())
}
