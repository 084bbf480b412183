use std::error::Error;
use std::sync::Arc;

use ik_server::{server, Planner};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    // stdout carries only the JSON reply
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let planner = Planner::default();

    if args.first().map(String::as_str) == Some("serve") {
        let addr = server::resolve_addr(args.get(1).cloned());
        let listener = TcpListener::bind(&addr).await?;
        server::serve(listener, Arc::new(planner)).await?;
        return Ok(());
    }

    let mut input = String::new();
    tokio::io::stdin().read_to_string(&mut input).await?;

    let (line, code) = tokio::task::spawn_blocking(move || planner.respond(&input)).await?;
    println!("{}", line);
    info!("exit status {}", code);
    std::process::exit(code);
}
