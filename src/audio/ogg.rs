use std::fs::File;
use std::path::Path;

use lewton::inside_ogg::OggStreamReader;

use crate::audio::backend::{
    normalize_channels, Backend, ChannelOrder, Codec, PendingPcm, StreamInfo,
};
use crate::error::OpenError;

/// Ogg Vorbis decoder. The container exposes no total length up front, so
/// `total_frames` stays 0 and callers treat the duration as unknown.
pub struct OggBackend {
    reader: OggStreamReader<File>,
    info: StreamInfo,
    pending: PendingPcm,
}

impl OggBackend {
    pub fn open(path: &Path) -> Result<Self, OpenError> {
        let file = File::open(path).map_err(|source| OpenError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = OggStreamReader::new(file).map_err(|e| OpenError::Unsupported {
            codec: Codec::Ogg,
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

        Ok(Self {
            info: StreamInfo {
                codec: Codec::Ogg,
                sample_rate: reader.ident_hdr.audio_sample_rate,
                channels: normalize_channels(reader.ident_hdr.audio_channels as usize, path),
                total_frames: 0,
            },
            pending: PendingPcm::new(),
            reader,
        })
    }
}

impl Backend for OggBackend {
    fn info(&self) -> StreamInfo {
        self.info
    }

    fn read(&mut self, out: &mut [i16]) -> usize {
        let mut filled = 0;
        while filled < out.len() {
            if self.pending.is_empty() {
                match self.reader.read_dec_packet_itl() {
                    // Packets may be empty, notably the first one; the next
                    // loop turn just pulls again.
                    Ok(Some(packet)) => self.pending.refill(packet),
                    Ok(None) => break,
                    Err(e) => {
                        log::warn!("OGG decode error: {}", e);
                        break;
                    }
                }
            }
            filled += self.pending.drain_into(&mut out[filled..]);
        }
        filled / self.info.channels
    }

    /// Granule position seek, accurate to the containing page.
    fn seek(&mut self, frame: u64) {
        self.pending.clear();
        if let Err(e) = self.reader.seek_absgp_pg(frame) {
            log::warn!("OGG seek failed: {}", e);
        }
    }

    fn channel_order(&self) -> ChannelOrder {
        ChannelOrder::Vorbis
    }
}
