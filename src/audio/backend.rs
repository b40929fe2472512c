use std::fmt;
use std::path::Path;

use crate::audio::flac::FlacBackend;
use crate::audio::mp3::Mp3Backend;
use crate::audio::ogg::OggBackend;
use crate::audio::wav::WavBackend;
use crate::audio::MAX_CHANNELS;
use crate::error::OpenError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Mp3,
    Wav,
    Ogg,
    Flac,
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Codec::Mp3 => "mp3",
            Codec::Wav => "wav",
            Codec::Ogg => "ogg",
            Codec::Flac => "flac",
        };
        f.write_str(name)
    }
}

/// Multichannel layout convention. Vorbis streams put the center channel
/// before front-right; everything else here is SMPTE order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    Smpte,
    Vorbis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    pub codec: Codec,
    pub sample_rate: u32,
    pub channels: usize,
    /// Total source frames, 0 when the container does not say.
    pub total_frames: u64,
}

/// A decoder for one open track. Reads deliver interleaved i16 PCM at the
/// source rate; `out` must hold a whole number of frames. Dropping the
/// backend releases the underlying file.
pub trait Backend {
    fn info(&self) -> StreamInfo;

    /// Fills `out` with whole frames and returns how many. A short count
    /// means the decoder could not deliver more right now; 0 past the end.
    fn read(&mut self, out: &mut [i16]) -> usize;

    /// Best-effort reposition to an absolute source frame.
    fn seek(&mut self, frame: u64);

    fn channel_order(&self) -> ChannelOrder {
        ChannelOrder::Smpte
    }
}

/// Picks a backend by file extension and opens it. Anything unrecognized is
/// tried as WAV, which yields a clear error if the content is something else.
pub fn open(path: &Path) -> Result<Box<dyn Backend>, OpenError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let backend: Box<dyn Backend> = match ext.as_deref() {
        Some("mp3") => Box::new(Mp3Backend::open(path)?),
        Some("ogg") => Box::new(OggBackend::open(path)?),
        Some("flac") => Box::new(FlacBackend::open(path)?),
        _ => Box::new(WavBackend::open(path)?),
    };

    let info = backend.info();
    if info.channels > MAX_CHANNELS {
        return Err(OpenError::TooManyChannels {
            path: path.to_path_buf(),
            channels: info.channels,
        });
    }

    Ok(backend)
}

/// Containers occasionally omit the channel count; fall back to stereo so
/// the rest of the pipeline keeps a sane frame stride.
pub(crate) fn normalize_channels(channels: usize, path: &Path) -> usize {
    if channels == 0 {
        log::warn!("{}: no channel count in header, assuming stereo", path.display());
        2
    } else {
        channels
    }
}

/// Decoded but undelivered interleaved samples. Block and packet based
/// backends refill this between reads.
pub(crate) struct PendingPcm {
    buf: Vec<i16>,
    pos: usize,
}

impl PendingPcm {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            pos: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.pos = 0;
    }

    pub fn refill(&mut self, samples: Vec<i16>) {
        debug_assert!(self.is_empty());
        self.buf = samples;
        self.pos = 0;
    }

    /// Like `refill` but starts draining from an interior sample offset.
    pub fn refill_at(&mut self, samples: Vec<i16>, offset: usize) {
        self.buf = samples;
        self.pos = offset.min(self.buf.len());
    }

    /// Copies out as much as fits; returns samples copied.
    pub fn drain_into(&mut self, out: &mut [i16]) -> usize {
        let avail = &self.buf[self.pos..];
        let n = out.len().min(avail.len());
        out[..n].copy_from_slice(&avail[..n]);
        self.pos += n;
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_names_are_lowercase() {
        assert_eq!(Codec::Mp3.to_string(), "mp3");
        assert_eq!(Codec::Flac.to_string(), "flac");
    }

    #[test]
    fn pending_drains_across_reads() {
        let mut pending = PendingPcm::new();
        pending.refill(vec![1, 2, 3, 4, 5]);

        let mut out = [0i16; 2];
        assert_eq!(pending.drain_into(&mut out), 2);
        assert_eq!(out, [1, 2]);
        assert!(!pending.is_empty());

        let mut rest = [0i16; 8];
        assert_eq!(pending.drain_into(&mut rest), 3);
        assert_eq!(&rest[..3], &[3, 4, 5]);
        assert!(pending.is_empty());
    }

    #[test]
    fn pending_refill_at_skips_leading_samples() {
        let mut pending = PendingPcm::new();
        pending.refill_at(vec![9, 9, 7, 8], 2);

        let mut out = [0i16; 4];
        assert_eq!(pending.drain_into(&mut out), 2);
        assert_eq!(&out[..2], &[7, 8]);
    }

    #[test]
    fn normalize_channels_defaults_zero_to_stereo() {
        let path = Path::new("x.wav");
        assert_eq!(normalize_channels(0, path), 2);
        assert_eq!(normalize_channels(6, path), 6);
    }
}
