//! End-to-end properties of the framing → decode → queue → scheduler
//! pipeline, driven tick by tick against a hand-advanced device clock.

use pcm_stream_player::framer::ChunkFramer;
use pcm_stream_player::pcm::{decode_chunk, DecodedBuffer};
use pcm_stream_player::queue::PlaybackQueue;
use pcm_stream_player::scheduler::SchedulerState;
use pcm_stream_player::sink::AudioSink;
use pcm_stream_player::PlayerConfig;
use std::sync::Mutex;

mod common;

struct ManualSink {
    clock: Mutex<f64>,
    events: Mutex<Vec<(f64, DecodedBuffer)>>,
}

impl ManualSink {
    fn new() -> Self {
        Self {
            clock: Mutex::new(0.0),
            events: Mutex::new(Vec::new()),
        }
    }

    fn advance(&self, secs: f64) {
        *self.clock.lock().unwrap() += secs;
    }

    fn events(&self) -> Vec<(f64, DecodedBuffer)> {
        self.events.lock().unwrap().clone()
    }
}

impl AudioSink for ManualSink {
    fn clock(&self) -> f64 {
        *self.clock.lock().unwrap()
    }

    fn play_at(&self, buffer: DecodedBuffer, at: f64) {
        self.events.lock().unwrap().push((at, buffer));
    }
}

#[test]
fn test_fragmented_stream_is_replayed_exactly_in_order() {
    let config = PlayerConfig::default();
    let queue = PlaybackQueue::new();
    let sink = ManualSink::new();
    let mut framer = ChunkFramer::new(config.chunk_bytes());

    // 4000 samples = 5 exact chunks, delivered in deliberately awkward
    // fragment sizes.
    let bytes = common::ramp_pcm_bytes(4000);
    let expected = decode_chunk(&bytes, config.sample_rate).samples;

    let mut offset = 0;
    for size in [1, 3, 1599, 1601, 795, 2000, 8000] {
        let end = (offset + size).min(bytes.len());
        for chunk in framer.push(&bytes[offset..end]) {
            queue.push(decode_chunk(&chunk, config.sample_rate));
        }
        offset = end;
    }
    assert_eq!(framer.leftover_len(), 0);
    assert_eq!(queue.len(), 5);

    // Drain through the scheduler; all five fit inside the schedule-ahead
    // window so no silence is injected.
    let mut state = SchedulerState::new(&config, 0.0);
    for _ in 0..5 {
        state.tick(&queue, &sink);
    }

    let events = sink.events();
    assert_eq!(events.len(), 5);

    // Back-to-back scheduling, in order, with no duplication: the emitted
    // buffers concatenate to exactly the input sample sequence.
    let mut replayed = Vec::new();
    for (i, (at, buffer)) in events.iter().enumerate() {
        assert!((at - i as f64 * 0.05).abs() < 1e-12);
        replayed.extend_from_slice(&buffer.samples);
    }
    assert_eq!(replayed, expected);
}

#[test]
fn test_silence_bridges_underrun_and_playback_resumes_in_order() {
    let config = PlayerConfig::default();
    let queue = PlaybackQueue::new();
    let sink = ManualSink::new();
    let mut state = SchedulerState::new(&config, 0.0);

    let burst = |tag: f32| DecodedBuffer {
        samples: vec![tag; config.samples_per_chunk()],
        duration: config.buffer_duration,
    };

    // First burst plays immediately.
    queue.push(burst(0.25));
    state.tick(&queue, &sink);

    // Playback overtakes the schedule: the next tick has nothing queued and
    // less than MIN_BUFFER_SEC of margin, so silence bridges the gap.
    sink.advance(0.5);
    state.tick(&queue, &sink);

    // Second burst arrives and resumes after the silence.
    queue.push(burst(0.75));
    state.tick(&queue, &sink);

    let events = sink.events();
    assert_eq!(events.len(), 3);

    let (_, first) = &events[0];
    let (_, bridge) = &events[1];
    let (_, second) = &events[2];
    assert!(first.samples.iter().all(|&s| s == 0.25));
    assert!(bridge.samples.iter().all(|&s| s == 0.0));
    assert!(second.samples.iter().all(|&s| s == 0.75));

    // Starts never decrease, and nothing was scheduled before the clock at
    // its emission time.
    let starts: Vec<f64> = events.iter().map(|(at, _)| *at).collect();
    assert!(starts.windows(2).all(|w| w[0] <= w[1]));
    assert!(starts[1] >= 0.5);

    assert!(state.next_start() >= sink.clock());
}

#[test]
fn test_sparse_arrivals_inside_grace_window_play_without_silence() {
    let config = PlayerConfig::default();
    let queue = PlaybackQueue::new();
    let sink = ManualSink::new();
    let mut state = SchedulerState::new(&config, 0.0);

    let burst = |tag: f32| DecodedBuffer {
        samples: vec![tag; config.samples_per_chunk()],
        duration: config.buffer_duration,
    };

    // Prime 0.3s of schedule so late arrivals land inside the grace window.
    for tag in 1..=6 {
        queue.push(burst(tag as f32));
        state.tick(&queue, &sink);
    }

    // Each arrival is 40ms late; margin stays between MIN_BUFFER_SEC and
    // SCHEDULE_AHEAD_SEC throughout, so no silence is ever injected.
    for tag in 7..=12 {
        sink.advance(0.04);
        state.tick(&queue, &sink); // empty queue, grace window: no-op
        queue.push(burst(tag as f32));
        state.tick(&queue, &sink);
    }

    let events = sink.events();
    assert_eq!(events.len(), 12);
    for (i, (_, buffer)) in events.iter().enumerate() {
        assert_eq!(buffer.samples[0], (i + 1) as f32);
    }
}
