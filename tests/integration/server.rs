//! A scripted, in-process Bolt server: accepts one TCP connection,
//! performs the handshake, then replies to whatever the test script
//! tells it to. No real Neo4j is available in this environment, so this
//! stands in for one.

use bolt_core::handshake::MAGIC_PREAMBLE;
use bolt_core::message::server_signature;
use bolt_core::packstream::{decode_value, encode_value, Reader, Value};
use bolt_core::framing::{write_chunked, Dechunker};
use bytes::BytesMut;
use std::collections::HashMap;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub struct MockServer {
    pub port: u16,
    listener: TcpListener,
}

impl MockServer {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        MockServer { port, listener }
    }

    pub async fn accept(self) -> ServerConn {
        let (stream, _) = self.listener.accept().await.unwrap();
        ServerConn {
            stream,
            dechunker: Dechunker::new(),
        }
    }
}

pub struct ServerConn {
    stream: TcpStream,
    dechunker: Dechunker,
}

impl ServerConn {
    /// Reads the 20-byte handshake request and replies with `version`
    /// (major, minor).
    pub async fn handshake(&mut self, major: u8, minor: u8) {
        let mut request = [0u8; 20];
        self.stream.read_exact(&mut request).await.unwrap();
        assert_eq!(&request[0..4], &MAGIC_PREAMBLE);
        self.stream.write_all(&[0, 0, major, minor]).await.unwrap();
    }

    /// Reads one full client message and returns its decoded `Value`
    /// (always a `Structure`).
    pub async fn recv(&mut self) -> Value {
        loop {
            let mut buf = [0u8; 4096];
            let n = self.stream.read(&mut buf).await.unwrap();
            assert!(n > 0, "peer closed before sending a complete message");
            let messages = self.dechunker.feed(&buf[..n]).unwrap();
            if let Some(bytes) = messages.into_iter().next() {
                let mut reader = Reader::new(&bytes);
                return decode_value(&mut reader).unwrap();
            }
        }
    }

    async fn send_value(&mut self, value: &Value) {
        let mut payload = BytesMut::new();
        encode_value(value, &mut payload);
        let mut framed = BytesMut::new();
        write_chunked(&payload, &mut framed);
        self.stream.write_all(&framed).await.unwrap();
    }

    pub async fn send_success(&mut self, metadata: HashMap<String, Value>) {
        self.send_value(&Value::Structure {
            signature: server_signature::SUCCESS,
            fields: vec![Value::Map(metadata)],
        })
        .await;
    }

    pub async fn send_record(&mut self, values: Vec<Value>) {
        self.send_value(&Value::Structure {
            signature: server_signature::RECORD,
            fields: vec![Value::List(values)],
        })
        .await;
    }

    pub async fn send_ignored(&mut self) {
        self.send_value(&Value::Structure {
            signature: server_signature::IGNORED,
            fields: vec![],
        })
        .await;
    }

    pub async fn send_failure(&mut self, code: &str, message: &str) {
        let mut metadata = HashMap::new();
        metadata.insert("code".to_string(), Value::String(code.to_string()));
        metadata.insert("message".to_string(), Value::String(message.to_string()));
        self.send_value(&Value::Structure {
            signature: server_signature::FAILURE,
            fields: vec![Value::Map(metadata)],
        })
        .await;
    }
}
