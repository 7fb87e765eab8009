//! Native client for the periodicity service socket
//!
//! Uses tokio-tungstenite in a background thread. Outgoing frames are queued on
//! an unbounded channel, so a session can send `ready` before the handshake has
//! finished; incoming frames come back over a std channel and are drained by
//! the caller.

use crate::core::session::{Frame, SessionError, Transport};
use crate::ws_state::ConnectionState;
use parking_lot::Mutex;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

/// Socket client that runs in a background thread
pub struct ServiceClient {
    url: String,
    rx: Receiver<Frame>,
    outgoing: UnboundedSender<Frame>,
    state: Arc<Mutex<ConnectionState>>,
}

impl ServiceClient {
    /// Connect to a socket endpoint
    ///
    /// Spawns a background thread with a tokio runtime to handle the connection.
    pub fn connect(url: &str) -> Self {
        let (tx, rx): (Sender<Frame>, Receiver<Frame>) = mpsc::channel();
        let (outgoing, outgoing_rx) = unbounded_channel();
        let state = Arc::new(Mutex::new(ConnectionState::Connecting));

        let thread_url = url.to_string();
        let state_clone = state.clone();

        std::thread::spawn(move || {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    error!(error = %e, "Failed to create tokio runtime");
                    *state_clone.lock() = ConnectionState::Error(e.to_string());
                    return;
                }
            };
            rt.block_on(async move {
                Self::run_socket(&thread_url, tx, outgoing_rx, state_clone).await;
            });
        });

        Self { url: url.to_string(), rx, outgoing, state }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> ConnectionState {
        self.state.lock().clone()
    }

    /// Next received frame, if one is waiting
    pub fn try_recv(&self) -> Result<Option<Frame>, SessionError> {
        match self.rx.try_recv() {
            Ok(frame) => Ok(Some(frame)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(self.closed()),
        }
    }

    /// Wait up to `timeout` for the next frame
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<Frame>, SessionError> {
        match self.rx.recv_timeout(timeout) {
            Ok(frame) => Ok(Some(frame)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(self.closed()),
        }
    }

    fn closed(&self) -> SessionError {
        match self.state() {
            ConnectionState::Error(e) => SessionError::Transport(e),
            _ => SessionError::Transport("socket closed".into()),
        }
    }

    async fn run_socket(
        url: &str,
        tx: Sender<Frame>,
        mut outgoing: UnboundedReceiver<Frame>,
        state: Arc<Mutex<ConnectionState>>,
    ) {
        use futures_util::{SinkExt, StreamExt};
        use tokio_tungstenite::{connect_async, tungstenite::Message};

        info!(url, "Connecting to dataset socket");

        let ws_stream = match connect_async(url).await {
            Ok((stream, _)) => {
                info!(url, "Dataset socket connected");
                *state.lock() = ConnectionState::Connected;
                stream
            }
            Err(e) => {
                error!(url, error = %e, "Failed to connect");
                *state.lock() = ConnectionState::Error(e.to_string());
                return;
            }
        };

        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                frame = outgoing.recv() => {
                    // Client dropped: close politely and stop
                    let Some(frame) = frame else {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    };
                    let message = match frame {
                        Frame::Text(text) => Message::Text(text.into()),
                        Frame::Binary(bytes) => Message::Binary(bytes.into()),
                    };
                    if let Err(e) = write.send(message).await {
                        error!(error = %e, "Failed to send frame");
                        *state.lock() = ConnectionState::Error(e.to_string());
                        return;
                    }
                }
                msg = read.next() => {
                    let frame = match msg {
                        Some(Ok(Message::Binary(bytes))) => Frame::Binary(bytes.to_vec()),
                        Some(Ok(Message::Text(text))) => Frame::Text(text.to_string()),
                        Some(Ok(Message::Close(_))) => {
                            warn!("Dataset socket closed by server");
                            break;
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            error!(error = %e, "Dataset socket error");
                            *state.lock() = ConnectionState::Error(e.to_string());
                            return;
                        }
                        None => break,
                    };
                    if let Frame::Binary(bytes) = &frame {
                        debug!(len = bytes.len(), "Received binary frame");
                    }
                    if tx.send(frame).is_err() {
                        // Receiver dropped, exit
                        break;
                    }
                }
            }
        }

        warn!("Dataset socket stream ended");
        *state.lock() = ConnectionState::Disconnected;
    }
}

impl Transport for ServiceClient {
    fn send(&mut self, frame: Frame) -> Result<(), SessionError> {
        self.outgoing.send(frame).map_err(|_| self.closed())
    }
}
