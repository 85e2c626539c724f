//! WebSocket client for Kismet's meta-GPS update endpoint.
//!
//! Kismet accepts one JSON location object per text frame on
//! `/gps/meta/{name}/update.ws` and answers every update with a reply frame.
//! Configuration mistakes surface as handshake status codes, mapped onto
//! distinct error variants.

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

use crate::message::LocationUpdate;

/// Errors from the Kismet websocket connection.
#[derive(Debug, Error)]
pub enum KismetError {
    /// Nothing answered the TCP dial.
    #[error("Connection refused: {0}")]
    Refused(std::io::Error),

    /// Handshake rejected with HTTP 404; the meta GPS name is unknown.
    #[error("Kismet does not know this meta GPS name (HTTP 404)")]
    NotFound,

    /// Handshake rejected with HTTP 401; the API key is invalid or lacks
    /// the required role.
    #[error("Kismet rejected the API key (HTTP 401)")]
    Unauthorized,

    /// Handshake rejected with any other HTTP status.
    #[error("Kismet rejected the websocket handshake (HTTP {status})")]
    Rejected { status: u16 },

    /// The connection dropped during a send or receive.
    #[error("Connection to Kismet closed")]
    Closed,

    #[error("Failed to encode location update: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("WebSocket error: {0}")]
    Transport(tungstenite::Error),
}

/// A connected meta-GPS websocket session.
pub struct KismetClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl KismetClient {
    /// Perform the websocket handshake against a meta-GPS endpoint URL.
    pub async fn connect(url: &str) -> Result<Self, KismetError> {
        let (ws, response) = connect_async(url).await.map_err(classify_handshake)?;
        debug!(status = %response.status(), "WebSocket handshake complete");

        Ok(Self { ws })
    }

    /// Serialize one location update and transmit it as a text frame.
    pub async fn send(&mut self, update: &LocationUpdate) -> Result<(), KismetError> {
        let payload = serde_json::to_string(update)?;

        self.ws
            .send(Message::Text(payload))
            .await
            .map_err(classify_stream)
    }

    /// Wait for the reply frame Kismet sends for each update.
    ///
    /// The content is not inspected; only its arrival matters.
    pub async fn await_ack(&mut self) -> Result<(), KismetError> {
        match self.ws.next().await {
            Some(Ok(Message::Close(_))) | None => Err(KismetError::Closed),
            Some(Ok(_)) => Ok(()),
            Some(Err(e)) => Err(classify_stream(e)),
        }
    }

    /// Close the websocket, ignoring errors on the way out.
    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}

/// Map a handshake failure onto the configuration mistake it points at.
fn classify_handshake(err: tungstenite::Error) -> KismetError {
    match err {
        tungstenite::Error::Http(response) => match response.status().as_u16() {
            404 => KismetError::NotFound,
            401 => KismetError::Unauthorized,
            status => KismetError::Rejected { status },
        },
        tungstenite::Error::Io(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
            KismetError::Refused(e)
        }
        other => KismetError::Transport(other),
    }
}

/// Map a mid-session failure; every way the peer can vanish collapses into
/// the same retryable "connection closed" condition.
fn classify_stream(err: tungstenite::Error) -> KismetError {
    match err {
        tungstenite::Error::ConnectionClosed
        | tungstenite::Error::AlreadyClosed
        | tungstenite::Error::Io(_)
        | tungstenite::Error::Protocol(ProtocolError::ResetWithoutClosingHandshake) => {
            KismetError::Closed
        }
        other => KismetError::Transport(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_tungstenite::tungstenite::http::Response;

    fn http_error(status: u16) -> tungstenite::Error {
        tungstenite::Error::Http(Response::builder().status(status).body(None).unwrap())
    }

    #[test]
    fn test_classify_handshake_not_found() {
        assert!(matches!(
            classify_handshake(http_error(404)),
            KismetError::NotFound
        ));
    }

    #[test]
    fn test_classify_handshake_unauthorized() {
        assert!(matches!(
            classify_handshake(http_error(401)),
            KismetError::Unauthorized
        ));
    }

    #[test]
    fn test_classify_handshake_other_status() {
        assert!(matches!(
            classify_handshake(http_error(503)),
            KismetError::Rejected { status: 503 }
        ));
    }

    #[test]
    fn test_classify_handshake_refused() {
        let err =
            tungstenite::Error::Io(std::io::Error::from(std::io::ErrorKind::ConnectionRefused));
        assert!(matches!(classify_handshake(err), KismetError::Refused(_)));
    }

    #[test]
    fn test_classify_handshake_passthrough() {
        assert!(matches!(
            classify_handshake(tungstenite::Error::ConnectionClosed),
            KismetError::Transport(_)
        ));
    }

    #[test]
    fn test_classify_stream_closed_conditions() {
        assert!(matches!(
            classify_stream(tungstenite::Error::ConnectionClosed),
            KismetError::Closed
        ));
        assert!(matches!(
            classify_stream(tungstenite::Error::AlreadyClosed),
            KismetError::Closed
        ));
        assert!(matches!(
            classify_stream(tungstenite::Error::Io(std::io::Error::from(
                std::io::ErrorKind::BrokenPipe
            ))),
            KismetError::Closed
        ));
    }
}
