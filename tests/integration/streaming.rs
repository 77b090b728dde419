use std::collections::HashMap;

use bolt_connection::Connection;
use bolt_core::config::{AuthToken, DriverConfig};
use bolt_core::message::RunExtra;
use bolt_core::packstream::Value;
use bolt_stream::RecordStream;

use crate::server::MockServer;

async fn connected(port: u16) -> Connection {
    let config = DriverConfig::new("127.0.0.1", port);
    let mut connection = Connection::connect(&config).await.unwrap();
    connection
        .hello("bolt-client/test".into(), &AuthToken::none())
        .await
        .unwrap();
    connection
}

#[tokio::test]
async fn run_then_pull_yields_the_declared_record() {
    let server = MockServer::bind().await;
    let port = server.port;

    let server_task = tokio::spawn(async move {
        let mut conn = server.accept().await;
        conn.handshake(4, 4).await;

        let _hello = conn.recv().await;
        conn.send_success(HashMap::new()).await;

        let _run = conn.recv().await;
        let mut run_meta = HashMap::new();
        run_meta.insert(
            "fields".to_string(),
            Value::List(vec![Value::String("n".into())]),
        );
        run_meta.insert("qid".to_string(), Value::Integer(0));
        conn.send_success(run_meta).await;

        let _pull = conn.recv().await;
        conn.send_record(vec![Value::Integer(1)]).await;
        let mut pull_meta = HashMap::new();
        pull_meta.insert("has_more".to_string(), Value::Boolean(false));
        pull_meta.insert("type".to_string(), Value::String("r".into()));
        conn.send_success(pull_meta).await;
    });

    let mut connection = connected(port).await;
    let run_summary = connection
        .run("RETURN 1 AS n".into(), HashMap::new(), RunExtra::default())
        .await
        .unwrap();
    assert_eq!(run_summary.fields, vec!["n".to_string()]);

    let mut stream = RecordStream::new(&mut connection, run_summary, 1000);
    let record = stream.next().await.unwrap();
    assert_eq!(record, Some(vec![Value::Integer(1)]));
    assert_eq!(stream.next().await.unwrap(), None);
    assert_eq!(stream.summary().unwrap().result_type.as_deref(), Some("r"));

    server_task.await.unwrap();
}

#[tokio::test]
async fn early_termination_issues_discard_and_returns_connection_to_ready() {
    let server = MockServer::bind().await;
    let port = server.port;

    let server_task = tokio::spawn(async move {
        let mut conn = server.accept().await;
        conn.handshake(4, 4).await;

        let _hello = conn.recv().await;
        conn.send_success(HashMap::new()).await;

        let _run = conn.recv().await;
        let mut run_meta = HashMap::new();
        run_meta.insert(
            "fields".to_string(),
            Value::List(vec![Value::String("n".into())]),
        );
        run_meta.insert("qid".to_string(), Value::Integer(0));
        conn.send_success(run_meta).await;

        // First PULL: server has far more to give, reports has_more.
        let _pull = conn.recv().await;
        for i in 0..5 {
            conn.send_record(vec![Value::Integer(i)]).await;
        }
        let mut pull_meta = HashMap::new();
        pull_meta.insert("has_more".to_string(), Value::Boolean(true));
        conn.send_success(pull_meta).await;

        // Consumer bails; client issues DISCARD.
        let _discard = conn.recv().await;
        conn.send_success(HashMap::new()).await;
    });

    let mut connection = connected(port).await;
    let run_summary = connection
        .run("UNWIND range(1, 10000) AS n RETURN n".into(), HashMap::new(), RunExtra::default())
        .await
        .unwrap();

    let mut stream = RecordStream::new(&mut connection, run_summary, 5);
    let first = stream.next().await.unwrap();
    assert_eq!(first, Some(vec![Value::Integer(0)]));
    let second = stream.next().await.unwrap();
    assert_eq!(second, Some(vec![Value::Integer(1)]));

    // Consumer stops after two records; close() drains via DISCARD.
    let summary = stream.close().await.unwrap();
    assert!(!summary.has_more);
    assert_eq!(connection.state(), bolt_connection::ConnectionState::Ready);

    server_task.await.unwrap();
}
