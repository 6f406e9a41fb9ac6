use crate::error::{PlayerError, Result};
use crate::pcm::DecodedBuffer;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc::{channel, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

/// Playback device seam between the scheduler and the audio hardware.
///
/// The clock is the monotonically increasing time reference of the output
/// device, in seconds of source-rate audio played since the sink started.
pub trait AudioSink: Send + Sync {
    /// Current device clock in seconds
    fn clock(&self) -> f64;

    /// Schedule `buffer` to start playing at `at` seconds on the device
    /// clock. The scheduler only ever schedules at or after the end of
    /// previously scheduled audio.
    fn play_at(&self, buffer: DecodedBuffer, at: f64);
}

struct SinkState {
    /// Scheduled samples not yet consumed by the device callback
    samples: Vec<f32>,
    /// Source-rate samples already consumed by the device callback
    consumed: u64,
}

enum SinkCommand {
    Stop,
}

/// Audio output via the default cpal device.
///
/// The cpal stream lives on a dedicated thread; the output callback pulls
/// from a shared sample queue, linearly interpolating to the hardware sample
/// rate and duplicating the mono signal across hardware channels. When the
/// queue runs dry the callback emits zeros without advancing the clock.
pub struct CpalSink {
    state: Arc<Mutex<SinkState>>,
    sample_rate: u32,
    command_sender: Sender<SinkCommand>,
    audio_thread: Option<thread::JoinHandle<()>>,
}

impl CpalSink {
    pub fn new(sample_rate: u32) -> Result<Self> {
        let host = cpal::default_host();
        log::debug!("CpalSink: using audio host {:?}", host.id());

        let device = host
            .default_output_device()
            .ok_or_else(|| PlayerError::Device("no output device found".to_string()))?;
        log::debug!("CpalSink: using output device {:?}", device.name());

        let supported_config = device
            .default_output_config()
            .map_err(|e| PlayerError::Device(e.to_string()))?;
        log::debug!("CpalSink: output config {:?}", supported_config);

        let output_sample_rate = supported_config.sample_rate().0;
        let output_channels = supported_config.channels() as usize;

        let state = Arc::new(Mutex::new(SinkState {
            samples: Vec::new(),
            consumed: 0,
        }));
        let callback_state = Arc::clone(&state);
        let (command_sender, command_receiver) = channel();

        let audio_thread = thread::spawn(move || {
            let stream = match device.build_output_stream(
                &supported_config.config(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut state = callback_state.lock().unwrap();

                    let step = sample_rate as f32 / output_sample_rate as f32;
                    let output_frames = data.len() / output_channels;
                    let needed = (output_frames as f32 * step).ceil() as usize;

                    let mut position: f32 = 0.0;
                    for frame in data.chunks_mut(output_channels) {
                        let sample = if state.samples.is_empty() {
                            0.0
                        } else {
                            // Linear interpolation between adjacent source samples
                            let lo = position.floor() as usize;
                            let hi = lo + 1;
                            let fract = position.fract();
                            let a = state.samples.get(lo).copied().unwrap_or(0.0);
                            let b = state.samples.get(hi).copied().unwrap_or(0.0);
                            a * (1.0 - fract) + b * fract
                        };

                        for channel in frame.iter_mut() {
                            *channel = sample;
                        }

                        position += step;
                    }

                    let drained = needed.min(state.samples.len());
                    state.samples.drain(0..drained);
                    state.consumed += drained as u64;
                },
                |err| {
                    log::error!("CpalSink: stream error: {}", err);
                },
                None,
            ) {
                Ok(stream) => stream,
                Err(e) => {
                    log::error!("CpalSink: failed to create output stream: {}", e);
                    return;
                }
            };

            if let Err(e) = stream.play() {
                log::error!("CpalSink: failed to start output stream: {}", e);
                return;
            }

            log::debug!("CpalSink: output stream started");

            // Park until told to stop; the stream is dropped on exit
            while let Ok(command) = command_receiver.recv() {
                match command {
                    SinkCommand::Stop => break,
                }
            }

            log::debug!("CpalSink: audio thread exiting");
        });

        Ok(Self {
            state,
            sample_rate,
            command_sender,
            audio_thread: Some(audio_thread),
        })
    }
}

impl AudioSink for CpalSink {
    fn clock(&self) -> f64 {
        let state = self.state.lock().unwrap();
        state.consumed as f64 / self.sample_rate as f64
    }

    fn play_at(&self, buffer: DecodedBuffer, at: f64) {
        let mut state = self.state.lock().unwrap();

        // End of already-scheduled audio on the device clock
        let scheduled_end =
            (state.consumed as f64 + state.samples.len() as f64) / self.sample_rate as f64;

        if at > scheduled_end {
            let gap_samples = ((at - scheduled_end) * self.sample_rate as f64).round() as usize;
            state.samples.extend(std::iter::repeat(0.0).take(gap_samples));
        }

        state.samples.extend_from_slice(&buffer.samples);
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        let _ = self.command_sender.send(SinkCommand::Stop);
        if let Some(thread) = self.audio_thread.take() {
            if let Err(e) = thread.join() {
                log::error!("CpalSink: failed to join audio thread: {:?}", e);
            }
        }
    }
}
