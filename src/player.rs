use crate::config::PlayerConfig;
use crate::error::{PlayerError, Result};
use crate::framer::ChunkFramer;
use crate::pcm::decode_chunk;
use crate::queue::PlaybackQueue;
use crate::scheduler;
use crate::sink::{AudioSink, CpalSink};
use futures_util::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Streaming PCM playback with a jitter buffer.
///
/// Raw bytes from a transport are framed into fixed-duration chunks, decoded
/// and queued; a periodic scheduler times chunk playback against the device
/// clock, bridging underruns with silence so the stream starts quickly and
/// plays without gaps despite irregular arrival timing.
pub struct PcmStreamPlayer {
    config: PlayerConfig,
    queue: Arc<PlaybackQueue>,
    sink: Arc<dyn AudioSink>,
    scheduler_running: AtomicBool,
    cancel: CancellationToken,
}

impl PcmStreamPlayer {
    /// Create a player on top of an explicit sink (used by tests and custom
    /// outputs).
    pub fn new(config: PlayerConfig, sink: Arc<dyn AudioSink>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            queue: Arc::new(PlaybackQueue::new()),
            sink,
            scheduler_running: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        })
    }

    /// Create a player on the default audio output device. Fails up front
    /// when no device is available; playback is never started in that case.
    pub fn with_default_output(config: PlayerConfig) -> Result<Self> {
        let sink = Arc::new(CpalSink::new(config.sample_rate)?);
        Self::new(config, sink)
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Seconds of decoded audio currently awaiting playback
    pub fn queued_secs(&self) -> f64 {
        self.queue.buffered_secs()
    }

    pub(crate) fn queue(&self) -> &Arc<PlaybackQueue> {
        &self.queue
    }

    /// Start the periodic scheduler if it is not already running. It keeps
    /// running until [`stop`](Self::stop).
    pub fn ensure_scheduler(&self) {
        if self
            .scheduler_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let _ = scheduler::spawn(
                self.config.clone(),
                Arc::clone(&self.queue),
                Arc::clone(&self.sink),
                self.cancel.clone(),
            );
        }
    }

    /// Frame, decode and enqueue one transport fragment.
    pub(crate) fn ingest(&self, framer: &mut ChunkFramer, fragment: &[u8]) {
        for chunk in framer.push(fragment) {
            self.queue
                .push(decode_chunk(&chunk, self.config.sample_rate));
        }
    }

    /// Pull transport: stream raw PCM from an HTTP endpoint until the server
    /// ends the stream. A single logical session; no retry.
    ///
    /// Reading pauses whenever more than `max_buffered_sec` of audio is
    /// queued and resumes once the queue drains below 80% of that.
    pub async fn play_stream(&self, url: &str) -> Result<()> {
        self.ensure_scheduler();

        let response = reqwest::Client::new()
            .get(url)
            .header("Accept", "audio/x-raw")
            .header("X-Buffer-Duration-Ms", self.config.buffer_ms().to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlayerError::BadStatus(status.as_u16()));
        }

        log::info!("Streaming PCM from {}", url);

        let mut stream = response.bytes_stream();
        let mut framer = ChunkFramer::new(self.config.chunk_bytes());

        loop {
            if self.queued_secs() > self.config.max_buffered_sec {
                log::debug!(
                    "Pausing stream read: {:.2}s buffered",
                    self.queued_secs()
                );
                self.queue
                    .wait_for_capacity(self.config.max_buffered_sec)
                    .await;
            }

            let Some(fragment) = stream.next().await else {
                break;
            };
            self.ingest(&mut framer, &fragment?);
        }

        log::info!(
            "Stream from {} ended ({} bytes of trailing remainder discarded)",
            url,
            framer.leftover_len()
        );

        Ok(())
    }

    /// Tear the player down: stops the scheduler task. In-flight decode work
    /// is synchronous and completes on its own.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for PcmStreamPlayer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
