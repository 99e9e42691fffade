//! Persistent push-channel connection with reconnect-on-close.
//!
//! Inbound text frames are parsed and handed to `on_message`; every state
//! transition goes to `on_status`. Transport errors only report `Error`; the
//! close that follows is what schedules the next attempt.

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::backoff::{Backoff, ConnectionState, ReconnectPolicy};
use super::message::{LiveMessage, parse_frame};

type LiveStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Handle to the background connection task. Dropping it has the same effect
/// as [`LiveSyncClient::close`].
pub struct LiveSyncClient {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl LiveSyncClient {
    pub fn spawn<M, S>(
        runtime: &Handle,
        url: String,
        policy: ReconnectPolicy,
        on_message: M,
        on_status: S,
    ) -> Self
    where
        M: FnMut(LiveMessage) + Send + 'static,
        S: FnMut(ConnectionState) + Send + 'static,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = runtime.spawn(run_connection(url, policy, stop_rx, on_message, on_status));
        Self { stop_tx, task }
    }

    /// Permanently stop: closes the active connection and cancels any pending
    /// reconnect.
    pub fn close(&self) {
        self.stop_tx.send_replace(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for LiveSyncClient {
    fn drop(&mut self) {
        self.close();
    }
}

#[derive(PartialEq, Eq)]
enum SessionEnd {
    Closed,
    Stopped,
}

async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    // A dropped sender also counts as a stop.
    let _ = stop.wait_for(|stopped| *stopped).await;
}

async fn run_connection<M, S>(
    url: String,
    policy: ReconnectPolicy,
    mut stop: watch::Receiver<bool>,
    mut on_message: M,
    mut on_status: S,
) where
    M: FnMut(LiveMessage) + Send + 'static,
    S: FnMut(ConnectionState) + Send + 'static,
{
    let mut backoff = Backoff::new(policy);
    let mut attempt = 0u64;

    loop {
        if *stop.borrow() {
            backoff.stop();
        }
        if backoff.is_stopped() {
            break;
        }

        attempt += 1;
        tracing::info!(url = %url, attempt, "connecting to live channel");
        on_status(ConnectionState::Connecting);

        let stream = tokio::select! {
            _ = stop_requested(&mut stop) => {
                backoff.stop();
                None
            }
            result = connect_async(url.as_str()) => match result {
                Ok((stream, _response)) => Some(stream),
                Err(error) => {
                    tracing::warn!(url = %url, attempt, %error, "live channel connect failed");
                    on_status(ConnectionState::Error);
                    None
                }
            }
        };

        if let Some(stream) = stream {
            backoff.on_open();
            tracing::info!(url = %url, "live channel connected");
            on_status(ConnectionState::Connected);

            if run_session(stream, &mut stop, &mut on_message, &mut on_status).await
                == SessionEnd::Stopped
            {
                backoff.stop();
            }
        }

        let retry_in = backoff.on_close();
        on_status(ConnectionState::Disconnected { retry_in });
        let Some(delay) = retry_in else {
            break;
        };

        tracing::info!(delay_ms = delay.as_millis() as u64, "live channel reconnect scheduled");
        tokio::select! {
            _ = stop_requested(&mut stop) => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    tracing::info!(url = %url, "live channel stopped");
}

async fn run_session<M, S>(
    mut stream: LiveStream,
    stop: &mut watch::Receiver<bool>,
    on_message: &mut M,
    on_status: &mut S,
) -> SessionEnd
where
    M: FnMut(LiveMessage),
    S: FnMut(ConnectionState),
{
    loop {
        tokio::select! {
            _ = stop_requested(stop) => {
                if let Err(error) = stream.close(None).await {
                    tracing::debug!(%error, "live channel close handshake failed");
                }
                return SessionEnd::Stopped;
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if let Some(message) = parse_frame(&text) {
                        on_message(message);
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(?frame, "live channel closed by server");
                    return SessionEnd::Closed;
                }
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    tracing::warn!(%error, "live channel transport error");
                    on_status(ConnectionState::Error);
                    return SessionEnd::Closed;
                }
                None => return SessionEnd::Closed,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::SinkExt;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use super::*;

    fn channels() -> (
        mpsc::UnboundedSender<LiveMessage>,
        mpsc::UnboundedReceiver<LiveMessage>,
        mpsc::UnboundedSender<ConnectionState>,
        mpsc::UnboundedReceiver<ConnectionState>,
    ) {
        let (message_tx, message_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        (message_tx, message_rx, status_tx, status_rx)
    }

    #[tokio::test]
    async fn delivers_parsed_frames_and_drops_malformed_ones() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            ws.send(Message::Text("{not json".into())).await.unwrap();
            ws.send(Message::Text(
                r#"{"type":"log_line","job_id":"Refine3D/job010","line":"Iteration 7"}"#.into(),
            ))
            .await
            .unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        });

        let (message_tx, mut message_rx, status_tx, mut status_rx) = channels();
        let client = LiveSyncClient::spawn(
            &Handle::current(),
            format!("ws://{addr}/ws"),
            ReconnectPolicy::default(),
            move |message| {
                let _ = message_tx.send(message);
            },
            move |state| {
                let _ = status_tx.send(state);
            },
        );

        let first = timeout(Duration::from_secs(5), message_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            first,
            LiveMessage::LogLine {
                job_id: "Refine3D/job010".to_owned(),
                line: "Iteration 7".to_owned(),
            }
        );

        client.close();

        let mut states = Vec::new();
        while let Ok(Some(state)) = timeout(Duration::from_secs(5), status_rx.recv()).await {
            states.push(state);
            if matches!(state, ConnectionState::Disconnected { .. }) {
                break;
            }
        }

        assert_eq!(
            states,
            vec![
                ConnectionState::Connecting,
                ConnectionState::Connected,
                ConnectionState::Disconnected { retry_in: None },
            ]
        );
        assert!(message_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn close_during_backoff_stops_reconnecting() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };

        let policy = ReconnectPolicy {
            initial_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(200),
            multiplier: 2,
        };

        let (message_tx, _message_rx, status_tx, mut status_rx) = channels();
        let client = LiveSyncClient::spawn(
            &Handle::current(),
            format!("ws://{addr}/ws"),
            policy,
            move |message| {
                let _ = message_tx.send(message);
            },
            move |state| {
                let _ = status_tx.send(state);
            },
        );

        let mut retries = Vec::new();
        while retries.len() < 2 {
            let state = timeout(Duration::from_secs(5), status_rx.recv())
                .await
                .unwrap()
                .unwrap();
            if let ConnectionState::Disconnected { retry_in } = state {
                retries.push(retry_in);
            }
        }
        assert_eq!(
            retries,
            vec![Some(Duration::from_millis(20)), Some(Duration::from_millis(40))]
        );

        client.close();

        let finished = timeout(Duration::from_secs(2), async {
            while !client.is_finished() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(finished.is_ok(), "live task kept running after close()");

        let mut trailing = Vec::new();
        while let Ok(state) = status_rx.try_recv() {
            trailing.push(state);
        }
        assert!(
            trailing
                .last()
                .is_none_or(|state| matches!(state, ConnectionState::Disconnected { .. })),
            "unexpected trailing states {trailing:?}"
        );
    }
}
