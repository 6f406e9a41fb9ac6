use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlayerError>;

#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Stream endpoint returned status {0}")]
    BadStatus(u16),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Audio device error: {0}")]
    Device(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not connected")]
    NotConnected,

    #[error("WAV encoding error: {0}")]
    Wav(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
