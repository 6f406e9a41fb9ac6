use crate::error::{PlayerError, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;

/// Encode normalized float samples as a mono 16-bit PCM WAV blob
/// (44-byte RIFF/WAVE header followed by little-endian sample data).
///
/// This is the alternate upload path: a full utterance captured elsewhere is
/// encoded in memory and posted in one request, independent of the streaming
/// pipeline.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer =
        WavWriter::new(&mut cursor, spec).map_err(|e| PlayerError::Wav(e.to_string()))?;

    for &sample in samples {
        let value = (sample * 32768.0).round().clamp(-32768.0, 32767.0) as i16;
        writer
            .write_sample(value)
            .map_err(|e| PlayerError::Wav(e.to_string()))?;
    }

    writer
        .finalize()
        .map_err(|e| PlayerError::Wav(e.to_string()))?;

    Ok(cursor.into_inner())
}

/// POST a WAV-encoded utterance to an upload endpoint.
pub async fn upload_wav(
    client: &reqwest::Client,
    url: &str,
    samples: &[f32],
    sample_rate: u32,
) -> Result<()> {
    let body = encode_wav(samples, sample_rate)?;

    log::debug!("Uploading {} byte WAV to {}", body.len(), url);

    let response = client
        .post(url)
        .header("Content-Type", "application/octet-stream")
        .body(body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(PlayerError::BadStatus(status.as_u16()));
    }

    Ok(())
}
