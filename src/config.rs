use crate::error::{PlayerError, Result};
use crate::pcm::BYTES_PER_SAMPLE;
use std::time::Duration;

/// Construction-time options for a player instance.
///
/// The input stream is headerless signed 16-bit little-endian PCM, so the
/// sample rate has to be agreed out-of-band with the server.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Sample rate of the incoming stream in Hz
    pub sample_rate: u32,
    /// Channel count; only mono is supported
    pub channels: u16,
    /// Duration of one playback chunk in seconds
    pub buffer_duration: f64,
    /// Buffered-audio ceiling before backpressure kicks in, in seconds
    pub max_buffered_sec: f64,
    /// Delay between reconnect attempts for the push transport
    pub reconnect_delay: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            buffer_duration: 0.05,
            max_buffered_sec: 2.0,
            reconnect_delay: Duration::from_millis(1000),
        }
    }
}

impl PlayerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(PlayerError::Config("sample rate must be non-zero".into()));
        }
        if self.channels != 1 {
            return Err(PlayerError::Config(format!(
                "only mono playback is supported, got {} channels",
                self.channels
            )));
        }
        if self.buffer_duration <= 0.0 {
            return Err(PlayerError::Config(
                "buffer duration must be positive".into(),
            ));
        }
        if self.samples_per_chunk() == 0 {
            return Err(PlayerError::Config(format!(
                "buffer duration {}s is shorter than one sample at {}Hz",
                self.buffer_duration, self.sample_rate
            )));
        }
        if self.max_buffered_sec <= 0.0 {
            return Err(PlayerError::Config(
                "max buffered seconds must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Number of samples in one playback chunk (default 800)
    pub fn samples_per_chunk(&self) -> usize {
        (self.sample_rate as f64 * self.buffer_duration) as usize
    }

    /// Byte size of one playback chunk (default 1600)
    pub fn chunk_bytes(&self) -> usize {
        self.samples_per_chunk() * BYTES_PER_SAMPLE
    }

    /// Buffer duration rounded to whole milliseconds, for transport hints
    pub fn buffer_ms(&self) -> u64 {
        (self.buffer_duration * 1000.0).round() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chunk_geometry() {
        let config = PlayerConfig::default();
        assert_eq!(config.samples_per_chunk(), 800);
        assert_eq!(config.chunk_bytes(), 1600);
        assert_eq!(config.buffer_ms(), 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_stereo() {
        let config = PlayerConfig {
            channels: 2,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PlayerError::Config(_))));
    }

    #[test]
    fn test_rejects_degenerate_durations() {
        let config = PlayerConfig {
            buffer_duration: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = PlayerConfig {
            max_buffered_sec: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = PlayerConfig {
            sample_rate: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
