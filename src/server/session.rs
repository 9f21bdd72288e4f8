//! Progress Channel: one WebSocket connection drives one pipeline run.
//!
//! The client sends a single JSON [`GenerateRequest`]; the server streams
//! [`ProgressEvent`]s back until the terminal event, then closes.

use crate::pipeline::{ChannelSink, Pipeline};
use crate::server::protocol::{GenerateRequest, ProgressEvent};
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;

/// Parse the initiating message. The error is the text of the `error` event
/// sent back to the client.
pub fn parse_request(payload: &[u8]) -> std::result::Result<GenerateRequest, String> {
    serde_json::from_slice(payload).map_err(|e| format!("Invalid request: {e}"))
}

/// Drive one connection from the initiating message to the terminal event.
pub async fn handle_socket(socket: WebSocket, pipeline: Arc<Pipeline>) {
    let (mut sender, mut receiver) = socket.split();

    let request = match read_request(&mut receiver).await {
        Some(Ok(request)) => request,
        Some(Err(message)) => {
            tracing::debug!(%message, "rejecting initiating message");
            if send_event(&mut sender, &ProgressEvent::error(message)).await {
                close(&mut sender).await;
            }
            return;
        }
        None => {
            tracing::debug!("connection closed before a request arrived");
            return;
        }
    };

    let (sink, mut events) = ChannelSink::new();
    tokio::spawn(async move {
        // The outcome has already been reported through the sink.
        if let Err(e) = pipeline.run(request, &sink).await {
            tracing::debug!(error = %e, "run ended with error");
        }
    });

    while let Some(event) = events.recv().await {
        let terminal = event.is_terminal();
        if !send_event(&mut sender, &event).await {
            // Client gone: the run keeps going and its events become no-ops
            // once `events` is dropped.
            return;
        }
        if terminal {
            break;
        }
    }
    close(&mut sender).await;
}

/// Wait for the first data frame. `None` means the peer left first.
async fn read_request(
    receiver: &mut SplitStream<WebSocket>,
) -> Option<std::result::Result<GenerateRequest, String>> {
    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => return Some(parse_request(text.as_str().as_bytes())),
            Ok(Message::Binary(data)) => return Some(parse_request(&data)),
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => return None,
            Err(e) => {
                tracing::debug!(error = %e, "websocket receive failed");
                return None;
            }
        }
    }
    None
}

/// Send one event as a text frame. Returns false once the client is gone.
async fn send_event(sender: &mut SplitSink<WebSocket, Message>, event: &ProgressEvent) -> bool {
    let json = match event.to_json() {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(error = %e, "failed to serialize progress event");
            return true;
        }
    };
    match sender.send(Message::Text(json.into())).await {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(error = %e, "client disconnected");
            false
        }
    }
}

async fn close(sender: &mut SplitSink<WebSocket, Message>) {
    if let Err(e) = sender.close().await {
        tracing::trace!(error = %e, "websocket close failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_valid() {
        let request = parse_request(br#"{"userId":"42","audioSample":"aGk="}"#).unwrap();
        assert_eq!(request, GenerateRequest::new("42", "aGk="));
    }

    #[test]
    fn test_parse_request_missing_fields_is_not_a_parse_error() {
        let request = parse_request(br#"{"userId":"42"}"#).unwrap();
        assert!(request.audio_sample.is_none());
    }

    #[test]
    fn test_parse_request_invalid_json() {
        let message = parse_request(b"hello").unwrap_err();
        assert!(message.starts_with("Invalid request: "), "{message}");
    }
}
