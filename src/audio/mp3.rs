use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::audio::backend::{
    normalize_channels, Backend, ChannelOrder, Codec, PendingPcm, StreamInfo,
};
use crate::error::OpenError;

const MAX_DECODE_RETRIES: usize = 3;

/// MP3 decoder on the symphonia packet loop. Bad packets are retried a few
/// times before the stream is declared over.
pub struct Mp3Backend {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    info: StreamInfo,
    pending: PendingPcm,
    /// Frames still to drop after a coarse container seek.
    skip_frames: u64,
}

impl Mp3Backend {
    pub fn open(path: &Path) -> Result<Self, OpenError> {
        let unsupported = |detail: String| OpenError::Unsupported {
            codec: Codec::Mp3,
            path: path.to_path_buf(),
            detail,
        };

        let file = File::open(path).map_err(|source| OpenError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        hint.with_extension("mp3");

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| unsupported(format!("probe failed: {e}")))?;

        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| unsupported("no audio track".into()))?;

        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| unsupported("missing sample rate".into()))?;
        let channels =
            normalize_channels(track.codec_params.channels.map_or(0, |c| c.count()), path);
        let total_frames = track.codec_params.n_frames.unwrap_or(0);

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| unsupported(format!("decoder init failed: {e}")))?;

        Ok(Self {
            format,
            decoder,
            track_id,
            info: StreamInfo {
                codec: Codec::Mp3,
                sample_rate,
                channels,
                total_frames,
            },
            pending: PendingPcm::new(),
            skip_frames: 0,
        })
    }

    /// Pulls packets until one decodes into samples, staging them in the
    /// pending buffer. Returns false at the end of the stream.
    fn decode_more(&mut self) -> bool {
        let mut retries = 0;
        loop {
            let packet = match self.format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return false;
                }
                Err(e) => {
                    log::warn!("MP3 packet read failed: {}", e);
                    return false;
                }
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            // Whole packets inside the post-seek gap are dropped undecoded.
            if self.skip_frames >= packet.dur() {
                self.skip_frames -= packet.dur();
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    if decoded.frames() == 0 {
                        continue;
                    }
                    let spec = *decoded.spec();
                    let mut buf = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
                    buf.copy_interleaved_ref(decoded);

                    let offset = (self.skip_frames as usize * self.info.channels)
                        .min(buf.samples().len());
                    self.skip_frames = 0;
                    self.pending.refill_at(buf.samples().to_vec(), offset);
                    return true;
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    retries += 1;
                    log::warn!("MP3 decode error ({} of {}): {}", retries, MAX_DECODE_RETRIES, e);
                    if retries > MAX_DECODE_RETRIES {
                        return false;
                    }
                    continue;
                }
                Err(e) => {
                    log::warn!("MP3 decode failed: {}", e);
                    return false;
                }
            }
        }
    }
}

impl Backend for Mp3Backend {
    fn info(&self) -> StreamInfo {
        self.info
    }

    fn read(&mut self, out: &mut [i16]) -> usize {
        let mut filled = 0;
        while filled < out.len() {
            if self.pending.is_empty() && !self.decode_more() {
                break;
            }
            filled += self.pending.drain_into(&mut out[filled..]);
        }
        filled / self.info.channels
    }

    /// Container seeks land on a packet boundary at or before the request;
    /// the remaining gap is skipped sample-accurately during decode.
    fn seek(&mut self, frame: u64) {
        self.pending.clear();
        self.skip_frames = 0;

        let seconds = frame as f64 / self.info.sample_rate as f64;
        let result = self.format.seek(
            SeekMode::Accurate,
            SeekTo::Time {
                time: seconds.into(),
                track_id: None,
            },
        );
        match result {
            Ok(seeked) => {
                self.decoder.reset();
                self.skip_frames = seeked.required_ts.saturating_sub(seeked.actual_ts);
            }
            Err(e) => log::warn!("MP3 seek failed: {}", e),
        }
    }

    fn channel_order(&self) -> ChannelOrder {
        ChannelOrder::Smpte
    }
}
