//! Deriving clients that share a connection pool but not interceptors.
//!
//! Run with: cargo run --bin derived-clients

use fexios::{Client, ClientDefaults, HeaderInterceptor};
use fexios_examples::{User, init_tracing, spawn_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let base_url = spawn_server().await?;

    let public = Client::new(ClientDefaults::with_base_url(&base_url))?;
    public
        .interceptors()
        .request
        .use_handler(HeaderInterceptor::new("x-trace", "public"));

    let mut overrides = ClientDefaults::default();
    overrides
        .headers
        .insert("authorization", "Bearer admin-token".parse()?);
    let admin = public.create(overrides);

    println!("public interceptors: {}", public.interceptors().request.len());
    println!("admin interceptors:  {}", admin.interceptors().request.len());

    match public.get("/whoami").await {
        Ok(res) => println!("public whoami: {:?}", res.data.as_json()),
        Err(err) => println!("public whoami rejected: {}", err),
    }

    let res = admin.get("/whoami").await?;
    println!("admin whoami:  {:?}", res.data.as_json());

    let users = admin.get("/users").await?.json::<Vec<User>>().await?.data;
    for user in users {
        println!("  user #{}: {}", user.id, user.name);
    }
    Ok(())
}
