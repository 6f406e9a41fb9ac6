use crate::pcm::DecodedBuffer;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// FIFO of decoded buffers awaiting playback. The transport side pushes at
/// the tail, the scheduler pops at the head; all operations are atomic with
/// respect to each other.
///
/// This is the jitter buffer: it absorbs arrival-timing variance between the
/// network and the audio clock.
pub struct PlaybackQueue {
    buffers: Mutex<VecDeque<DecodedBuffer>>,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self {
            buffers: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push(&self, buffer: DecodedBuffer) {
        self.buffers.lock().unwrap().push_back(buffer);
    }

    pub fn pop(&self) -> Option<DecodedBuffer> {
        self.buffers.lock().unwrap().pop_front()
    }

    /// Total buffered playback time in seconds
    pub fn buffered_secs(&self) -> f64 {
        self.buffers.lock().unwrap().iter().map(|b| b.duration).sum()
    }

    pub fn len(&self) -> usize {
        self.buffers.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.lock().unwrap().is_empty()
    }

    pub fn clear(&self) {
        self.buffers.lock().unwrap().clear();
    }

    /// Drop buffers from the head until the buffered duration is within
    /// `max_secs`. Returns the seconds dropped.
    ///
    /// Used by the push transport, which cannot pause a remote sender and
    /// instead sheds the oldest audio to bound latency.
    pub fn evict_over(&self, max_secs: f64) -> f64 {
        let mut buffers = self.buffers.lock().unwrap();
        let mut total: f64 = buffers.iter().map(|b| b.duration).sum();
        let mut dropped = 0.0;

        while total > max_secs {
            match buffers.pop_front() {
                Some(buffer) => {
                    total -= buffer.duration;
                    dropped += buffer.duration;
                }
                None => break,
            }
        }

        dropped
    }

    /// Suspend until the buffered duration falls below 80% of `max_secs`.
    ///
    /// The hysteresis band keeps the pull reader from oscillating between
    /// paused and resumed around the threshold.
    pub async fn wait_for_capacity(&self, max_secs: f64) {
        let resume_below = max_secs * 0.8;
        while self.buffered_secs() >= resume_below {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

impl Default for PlaybackQueue {
    fn default() -> Self {
        Self::new()
    }
}
