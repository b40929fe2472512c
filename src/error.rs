use std::path::PathBuf;
use thiserror::Error;

use crate::audio::backend::Codec;

/// Why a track could not be opened. Mid-stream decode trouble never surfaces
/// here; backends degrade to short reads instead.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("failed to open {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported or corrupt {codec} stream in {}: {detail}", .path.display())]
    Unsupported {
        codec: Codec,
        path: PathBuf,
        detail: String,
    },

    #[error("{} has {channels} channels, more than the supported 8", .path.display())]
    TooManyChannels { path: PathBuf, channels: usize },
}
