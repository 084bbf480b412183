use std::sync::Arc;

use ik_server::{server, Planner};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

#[tokio::test]
async fn test_one_reply_per_line() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve(listener, Arc::new(Planner::default())));

    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    write_half
        .write_all(b"{\"target\": [5, 8, 0]}\n{\"target\": \"bad\"}\n")
        .await
        .unwrap();

    let mut lines = BufReader::new(read_half).lines();

    let first: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert_eq!(first["intermediates"], serde_json::json!([]));
    assert_eq!(first["final"]["bones"].as_array().unwrap().len(), 5);

    let second: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert_eq!(second["error"], "Invalid target");
}
