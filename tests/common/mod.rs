#![allow(dead_code)] // not every test binary uses every helper

use pcm_stream_player::sink::AudioSink;
use pcm_stream_player::DecodedBuffer;
use std::sync::Mutex;
use std::time::Instant;

/// Sink that records every scheduled buffer and runs its device clock off
/// wall time, so the scheduler behaves as it would against real hardware.
pub struct RecordingSink {
    start: Instant,
    events: Mutex<Vec<(f64, DecodedBuffer)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<(f64, DecodedBuffer)> {
        self.events.lock().unwrap().clone()
    }

    /// Scheduled buffers that carry actual signal, in order. Silence injected
    /// by the scheduler is filtered out.
    pub fn non_silence(&self) -> Vec<DecodedBuffer> {
        self.events()
            .into_iter()
            .map(|(_, buffer)| buffer)
            .filter(|buffer| buffer.samples.iter().any(|&s| s != 0.0))
            .collect()
    }
}

impl AudioSink for RecordingSink {
    fn clock(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn play_at(&self, buffer: DecodedBuffer, at: f64) {
        self.events.lock().unwrap().push((at, buffer));
    }
}

/// i16 ramp as little-endian PCM bytes, guaranteed non-zero everywhere
pub fn ramp_pcm_bytes(samples: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples * 2);
    for i in 0..samples {
        let value = (i as i16).wrapping_mul(7).max(1);
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}
