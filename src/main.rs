use anyhow::Context;
use clap::{Parser, Subcommand};
use pcm_stream_player::{PcmStreamPlayer, PlayerConfig, SocketPlayer};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "pcm-stream-player",
    about = "Play a raw 16-bit PCM audio stream with low latency"
)]
struct Cli {
    /// Sample rate of the incoming stream in Hz
    #[arg(long, default_value_t = 16000)]
    sample_rate: u32,

    /// Playback chunk duration in milliseconds
    #[arg(long, default_value_t = 50)]
    buffer_ms: u64,

    /// Buffered-audio ceiling in seconds before input is throttled
    #[arg(long, default_value_t = 2.0)]
    max_buffered_sec: f64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stream PCM from an HTTP endpoint until the server ends the stream
    Pull { url: String },
    /// Receive PCM pushed over a WebSocket, reconnecting whenever it drops
    Push { url: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let config = PlayerConfig {
        sample_rate: cli.sample_rate,
        buffer_duration: cli.buffer_ms as f64 / 1000.0,
        max_buffered_sec: cli.max_buffered_sec,
        ..Default::default()
    };

    let player = Arc::new(
        PcmStreamPlayer::with_default_output(config).context("failed to open audio output")?,
    );

    match cli.command {
        Command::Pull { url } => {
            tokio::select! {
                result = player.play_stream(&url) => result?,
                _ = tokio::signal::ctrl_c() => {
                    log::info!("Received Ctrl+C, shutting down");
                }
            }
            // Let whatever is already scheduled drain before tearing down
            tokio::time::sleep(Duration::from_millis(500)).await;
            player.stop();
        }
        Command::Push { url } => {
            let socket = SocketPlayer::new(Arc::clone(&player), &url)?;
            socket.connect();

            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for Ctrl+C")?;
            log::info!("Received Ctrl+C, shutting down");

            socket.close();
            player.stop();
        }
    }

    Ok(())
}
