pub const BYTES_PER_SAMPLE: usize = 2;

/// One chunk of decoded audio, immutable once produced. Owned by the playback
/// queue until the scheduler dequeues it for playback.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBuffer {
    /// Normalized samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Playback duration in seconds
    pub duration: f64,
}

impl DecodedBuffer {
    pub fn silence(num_samples: usize, sample_rate: u32) -> Self {
        Self {
            samples: vec![0.0; num_samples],
            duration: num_samples as f64 / sample_rate as f64,
        }
    }
}

/// Decode a chunk of signed 16-bit little-endian samples into a normalized
/// float buffer.
///
/// The framer only ever produces whole-chunk byte slices, so an odd length
/// here is an internal contract violation and fails loudly rather than
/// risking sample misalignment.
pub fn decode_chunk(chunk: &[u8], sample_rate: u32) -> DecodedBuffer {
    assert!(
        chunk.len() % BYTES_PER_SAMPLE == 0,
        "PCM chunk of {} bytes is not sample-aligned",
        chunk.len()
    );

    let samples: Vec<f32> = chunk
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
        .collect();

    let duration = samples.len() as f64 / sample_rate as f64;

    DecodedBuffer { samples, duration }
}

/// Inverse of [`decode_chunk`]: encode normalized floats as signed 16-bit
/// little-endian bytes, for sending raw PCM frames upstream.
pub fn encode_frame(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * BYTES_PER_SAMPLE);

    for &sample in samples {
        let value = (sample * 32768.0).round().clamp(-32768.0, 32767.0) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    bytes
}
