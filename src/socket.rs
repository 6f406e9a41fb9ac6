use crate::error::{PlayerError, Result};
use crate::framer::ChunkFramer;
use crate::pcm::encode_frame;
use crate::player::PcmStreamPlayer;
use futures_util::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tokio_util::sync::CancellationToken;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Closing,
}

/// Push transport: PCM frames arrive as binary WebSocket messages and are fed
/// straight into the playback pipeline. The connection is re-established
/// after a fixed delay whenever it drops, indefinitely, until
/// [`close`](SocketPlayer::close).
///
/// Unlike the pull transport there is no way to pause a remote sender, so the
/// playback queue is capped by dropping its oldest buffers when the sender
/// outruns playback.
pub struct SocketPlayer {
    player: Arc<PcmStreamPlayer>,
    url: Url,
    state: Arc<Mutex<ConnectionState>>,
    outbound: Arc<Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>>,
    task: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl SocketPlayer {
    pub fn new(player: Arc<PcmStreamPlayer>, url: &str) -> Result<Self> {
        let mut url = Url::parse(url)?;
        url.query_pairs_mut()
            .append_pair("buffer-ms", &player.config().buffer_ms().to_string());

        Ok(Self {
            player,
            url,
            state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
            outbound: Arc::new(Mutex::new(None)),
            task: Mutex::new(None),
            cancel: CancellationToken::new(),
        })
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap()
    }

    /// Start the connection task. A no-op returning `false` when a task is
    /// already running (guards against concurrent duplicate connections) or
    /// the player has been closed.
    pub fn connect(&self) -> bool {
        let mut task = self.task.lock().unwrap();
        if let Some(handle) = task.as_ref() {
            if !handle.is_finished() {
                log::debug!("connect() ignored: connection task already running");
                return false;
            }
        }
        if self.cancel.is_cancelled() {
            return false;
        }

        *self.state.lock().unwrap() = ConnectionState::Connecting;
        *task = Some(tokio::spawn(Self::run(
            Arc::clone(&self.player),
            self.url.clone(),
            Arc::clone(&self.state),
            Arc::clone(&self.outbound),
            self.cancel.clone(),
        )));

        true
    }

    /// Send one raw PCM frame upstream as a single binary message. Rejected
    /// before any I/O unless the connection is open.
    pub fn send_frame(&self, samples: &[f32]) -> Result<()> {
        if self.state() != ConnectionState::Open {
            return Err(PlayerError::NotConnected);
        }

        let outbound = self.outbound.lock().unwrap();
        let sender = outbound.as_ref().ok_or(PlayerError::NotConnected)?;
        sender
            .send(encode_frame(samples))
            .map_err(|_| PlayerError::NotConnected)
    }

    /// Stop reconnecting and tear the connection down.
    pub fn close(&self) {
        *self.state.lock().unwrap() = ConnectionState::Closing;
        self.cancel.cancel();
    }

    async fn run(
        player: Arc<PcmStreamPlayer>,
        url: Url,
        state: Arc<Mutex<ConnectionState>>,
        outbound: Arc<Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>>,
        cancel: CancellationToken,
    ) {
        let reconnect_delay = player.config().reconnect_delay;
        let max_buffered_sec = player.config().max_buffered_sec;

        'outer: loop {
            *state.lock().unwrap() = ConnectionState::Connecting;
            log::info!("Connecting to {}", url);

            let connected = tokio::select! {
                _ = cancel.cancelled() => break 'outer,
                result = connect_async(url.as_str()) => result,
            };

            match connected {
                Ok((socket, _)) => {
                    *state.lock().unwrap() = ConnectionState::Open;
                    player.ensure_scheduler();
                    log::info!("Connected to {}", url);

                    let (mut write, mut read) = socket.split();
                    let (sender, mut receiver) = mpsc::unbounded_channel::<Vec<u8>>();
                    *outbound.lock().unwrap() = Some(sender);

                    // Chunk alignment is per-session; a new connection starts
                    // with a fresh remainder.
                    let mut framer = ChunkFramer::new(player.config().chunk_bytes());

                    let mut closing = false;
                    loop {
                        tokio::select! {
                            _ = cancel.cancelled() => {
                                let _ = write.close().await;
                                closing = true;
                                break;
                            }
                            message = read.next() => match message {
                                Some(Ok(Message::Binary(data))) => {
                                    player.ingest(&mut framer, data.as_slice());
                                    let dropped = player.queue().evict_over(max_buffered_sec);
                                    if dropped > 0.0 {
                                        log::warn!(
                                            "Playback queue overran {:.1}s cap, dropped {:.2}s of oldest audio",
                                            max_buffered_sec,
                                            dropped
                                        );
                                    }
                                }
                                Some(Ok(Message::Close(frame))) => {
                                    log::info!("Server closed connection: {:?}", frame);
                                    break;
                                }
                                Some(Ok(_)) => {}
                                Some(Err(e)) => {
                                    log::error!("WebSocket error: {}", e);
                                    break;
                                }
                                None => {
                                    log::info!("Connection to {} dropped", url);
                                    break;
                                }
                            },
                            frame = receiver.recv() => {
                                if let Some(bytes) = frame {
                                    if let Err(e) = write.send(Message::Binary(bytes.into())).await {
                                        log::error!("Failed to send PCM frame: {}", e);
                                        break;
                                    }
                                }
                            }
                        }
                    }

                    *outbound.lock().unwrap() = None;
                    if closing {
                        break 'outer;
                    }
                }
                Err(e) => {
                    log::warn!("Connection to {} failed: {}", url, e);
                }
            }

            *state.lock().unwrap() = ConnectionState::Disconnected;
            log::info!("Reconnecting to {} in {:?}", url, reconnect_delay);

            tokio::select! {
                _ = cancel.cancelled() => break 'outer,
                _ = tokio::time::sleep(reconnect_delay) => {}
            }
        }

        *state.lock().unwrap() = ConnectionState::Disconnected;
        log::debug!("Connection task for {} exited", url);
    }
}

impl Drop for SocketPlayer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
