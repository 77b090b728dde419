use bolt_connection::Connection;
use bolt_core::config::{DriverConfig, ProtocolVersion};

use crate::server::MockServer;

#[tokio::test]
async fn negotiates_to_5_4_against_a_server_offering_it() {
    let server = MockServer::bind().await;
    let port = server.port;

    let server_task = tokio::spawn(async move {
        let mut conn = server.accept().await;
        conn.handshake(5, 4).await;
    });

    let config = DriverConfig::new("127.0.0.1", port);
    let connection = Connection::connect(&config).await.unwrap();
    assert_eq!(connection.version, ProtocolVersion::new(5, 4));

    server_task.await.unwrap();
}

#[tokio::test]
async fn negotiates_to_the_older_version_a_server_chooses() {
    let server = MockServer::bind().await;
    let port = server.port;

    let server_task = tokio::spawn(async move {
        let mut conn = server.accept().await;
        conn.handshake(4, 3).await;
    });

    let config = DriverConfig::new("127.0.0.1", port);
    let connection = Connection::connect(&config).await.unwrap();
    assert_eq!(connection.version, ProtocolVersion::new(4, 3));

    server_task.await.unwrap();
}
