//! Drives the pure handshake functions in `bolt_core::handshake` against
//! an actual socket.

use bolt_core::config::ProtocolVersion;
use bolt_core::error::HandshakeError;
use bolt_core::handshake::{build_request, parse_response, MAGIC_PREAMBLE};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::transport::BoxedStream;

/// Performs the magic-preamble + version-negotiation exchange and
/// returns the version the server agreed to speak.
pub async fn negotiate(
    stream: &mut BoxedStream,
    candidate_versions: &[ProtocolVersion],
) -> Result<ProtocolVersion, HandshakeError> {
    tracing::debug!(?candidate_versions, "sending handshake request");
    let request = build_request(candidate_versions);
    stream
        .write_all(&request.to_bytes())
        .await
        .map_err(|e| HandshakeError::Io(e.to_string()))?;
    stream
        .flush()
        .await
        .map_err(|e| HandshakeError::Io(e.to_string()))?;

    let mut response = [0u8; 4];
    stream
        .read_exact(&mut response)
        .await
        .map_err(|e| HandshakeError::Io(e.to_string()))?;

    let version = parse_response(response);
    match &version {
        Ok(v) => tracing::debug!(negotiated = %v, "server accepted a version"),
        Err(e) => tracing::warn!(error = %e, "handshake negotiation failed"),
    }
    version
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn negotiate_reads_chosen_version_off_a_duplex_stream() {
        let (client_side, mut server_side) = duplex(64);
        let candidates = vec![ProtocolVersion::new(5, 4)];

        let client_task = tokio::spawn(async move {
            let mut stream: BoxedStream = Box::pin(client_side);
            negotiate(&mut stream, &candidates).await
        });

        // drain the client's request off the wire, then reply with a
        // chosen version.
        let mut buf = [0u8; 20];
        server_side.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf[0..4], &MAGIC_PREAMBLE);
        server_side.write_all(&[0, 0, 5, 4]).await.unwrap();

        let version = client_task.await.unwrap().unwrap();
        assert_eq!(version, ProtocolVersion::new(5, 4));
    }
}
