use std::collections::HashMap;

use bolt_connection::{Connection, ConnectionState};
use bolt_core::config::{AuthToken, DriverConfig};
use bolt_core::error::BoltError;
use bolt_core::message::RunExtra;

use crate::server::MockServer;

#[tokio::test]
async fn failure_then_ignored_then_reset_recovers_the_connection() {
    let server = MockServer::bind().await;
    let port = server.port;

    let server_task = tokio::spawn(async move {
        let mut conn = server.accept().await;
        conn.handshake(4, 4).await;

        let _hello = conn.recv().await;
        conn.send_success(HashMap::new()).await;

        // First RUN: syntactically invalid query.
        let _bad_run = conn.recv().await;
        conn.send_failure("Neo.ClientError.Statement.SyntaxError", "bad query")
            .await;

        // Second RUN without RESET: server ignores it.
        let _ignored_run = conn.recv().await;
        conn.send_ignored().await;

        // RESET clears the failure.
        let _reset = conn.recv().await;
        conn.send_success(HashMap::new()).await;

        // RUN succeeds again.
        let _good_run = conn.recv().await;
        let mut run_meta = HashMap::new();
        run_meta.insert(
            "fields".to_string(),
            bolt_core::packstream::Value::List(vec![]),
        );
        run_meta.insert("qid".to_string(), bolt_core::packstream::Value::Integer(1));
        conn.send_success(run_meta).await;
    });

    let config = DriverConfig::new("127.0.0.1", port);
    let mut connection = Connection::connect(&config).await.unwrap();
    connection
        .hello("bolt-client/test".into(), &AuthToken::none())
        .await
        .unwrap();

    let err = connection
        .run("not cypher".into(), HashMap::new(), RunExtra::default())
        .await
        .unwrap_err();
    assert!(matches!(err, BoltError::ServerFailure { .. }));
    assert_eq!(connection.state(), ConnectionState::Failed);

    let err = connection
        .run("RETURN 1".into(), HashMap::new(), RunExtra::default())
        .await
        .unwrap_err();
    assert!(matches!(err, BoltError::Protocol(_)));
    assert_eq!(connection.state(), ConnectionState::Interrupted);

    connection.reset().await.unwrap();
    assert_eq!(connection.state(), ConnectionState::Ready);

    let run_summary = connection
        .run("RETURN 1".into(), HashMap::new(), RunExtra::default())
        .await
        .unwrap();
    assert_eq!(run_summary.qid, 1);
    assert_eq!(connection.state(), ConnectionState::Streaming);

    server_task.await.unwrap();
}
