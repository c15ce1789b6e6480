//! Upload demo
//!
//! Posts a multipart form with values, a cookie and two files, without
//! following redirects, then prints the response.
//!
//! ```sh
//! RUST_LOG=courier=debug cargo run -p upload-demo -- https://httpbin.org/post
//! ```

#![allow(clippy::print_stdout)]

use std::fs::File;

use courier::prelude::*;
use tracing_subscriber::EnvFilter;

const BOT: &str = "Googlebot/2.1 (+http://www.google.com/bot.html)";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://example.com".to_owned());
    let manifest_dir = env!("CARGO_MANIFEST_DIR");

    let mut manifest = File::open(format!("{manifest_dir}/Cargo.toml"))?;

    let request = post(url)
        .disable_redirect()
        .force_multipart()
        .header("Accept-Language", "en")
        .user_agent(BOT)
        .cookie(Cookie::new("session", "123"))
        .value("id", "123")
        .value("name", "Doe")
        .file("file", "Cargo.toml", &mut manifest)
        .open_file("source", format!("{manifest_dir}/src/main.rs"));

    println!("{request}");

    let response = request.send().await?;
    println!("{response}");
    response.close();

    Ok(())
}
