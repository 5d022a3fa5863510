//! Thin entrypoint delegating to [`dexter_cli::run`].

use std::process;

#[tokio::main]
async fn main() {
    process::exit(dexter_cli::run().await);
}
