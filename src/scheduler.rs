use crate::config::PlayerConfig;
use crate::pcm::DecodedBuffer;
use crate::queue::PlaybackQueue;
use crate::sink::AudioSink;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const TICK_INTERVAL: Duration = Duration::from_millis(10);

/// Stop scheduling once this much audio is queued on the device.
pub const SCHEDULE_AHEAD_SEC: f64 = 0.5;

/// Below this much scheduled audio, starvation is imminent and silence is
/// injected to keep the output clock from stalling.
pub const MIN_BUFFER_SEC: f64 = 0.2;

/// Per-tick scheduling state: where the next buffer must start on the device
/// clock. `next_start` never decreases and never falls behind the clock at an
/// update.
pub struct SchedulerState {
    next_start: f64,
    samples_per_chunk: usize,
    sample_rate: u32,
}

impl SchedulerState {
    pub fn new(config: &PlayerConfig, now: f64) -> Self {
        Self {
            next_start: now,
            samples_per_chunk: config.samples_per_chunk(),
            sample_rate: config.sample_rate,
        }
    }

    /// One scheduler tick.
    ///
    /// Emits the head buffer when less than [`SCHEDULE_AHEAD_SEC`] of audio is
    /// scheduled; on an empty queue, injects one chunk of silence only once
    /// less than [`MIN_BUFFER_SEC`] remains. The band in between is a grace
    /// window that tolerates small arrival jitter without audible gaps.
    pub fn tick(&mut self, queue: &PlaybackQueue, sink: &dyn AudioSink) {
        let now = sink.clock();
        let time_ahead = self.next_start - now;

        if time_ahead >= SCHEDULE_AHEAD_SEC {
            return;
        }

        if let Some(buffer) = queue.pop() {
            self.emit(buffer, now, sink);
        } else if time_ahead < MIN_BUFFER_SEC {
            log::debug!(
                "Scheduler: queue underrun at {:.3}s, injecting {}ms of silence",
                now,
                self.samples_per_chunk * 1000 / self.sample_rate as usize
            );
            let silence = DecodedBuffer::silence(self.samples_per_chunk, self.sample_rate);
            self.emit(silence, now, sink);
        }
    }

    fn emit(&mut self, buffer: DecodedBuffer, now: f64, sink: &dyn AudioSink) {
        let play_at = now.max(self.next_start);
        let duration = buffer.duration;
        sink.play_at(buffer, play_at);
        self.next_start = play_at + duration;
    }

    pub fn next_start(&self) -> f64 {
        self.next_start
    }
}

/// Run the periodic scheduler until `cancel` fires. Started once per player;
/// it never returns to idle while the player lives.
pub fn spawn(
    config: PlayerConfig,
    queue: Arc<PlaybackQueue>,
    sink: Arc<dyn AudioSink>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut state = SchedulerState::new(&config, sink.clock());
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        log::debug!("Scheduler: started at clock {:.3}s", state.next_start);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    log::debug!("Scheduler: stopping");
                    break;
                }
                _ = interval.tick() => {
                    state.tick(&queue, sink.as_ref());
                }
            }
        }
    })
}
