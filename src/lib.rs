pub mod config;
pub mod error;
pub mod framer;
pub mod pcm;
pub mod player;
pub mod queue;
pub mod scheduler;
pub mod sink;
pub mod socket;
pub mod wav;

pub use config::PlayerConfig;
pub use error::{PlayerError, Result};
pub use pcm::DecodedBuffer;
pub use player::PcmStreamPlayer;
pub use socket::{ConnectionState, SocketPlayer};
