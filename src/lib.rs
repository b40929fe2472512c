//! Playback core for a jukebox front-end: decodes MP3/WAV/OGG/FLAC to
//! fixed-rate stereo chunks and keeps visualization levels alongside.

pub mod audio;
pub mod config;
pub mod error;
pub mod player;
pub mod viz;

pub use audio::backend::{Backend, ChannelOrder, Codec, StreamInfo};
pub use audio::{OUT_RATE, SAMPLES_PER_FRAME};
pub use config::{load_config, Config, VizConfig, VizMode};
pub use error::OpenError;
pub use player::Player;
pub use viz::MAX_VIZ_BANDS;
