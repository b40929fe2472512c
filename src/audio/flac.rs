use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use claxon::frame::Block;
use claxon::FlacReader;

use crate::audio::backend::{
    normalize_channels, Backend, ChannelOrder, Codec, PendingPcm, StreamInfo,
};
use crate::error::OpenError;

/// FLAC decoder. Blocks are pulled one at a time and interleaved into a
/// pending buffer; the planar block memory is recycled between pulls.
pub struct FlacBackend {
    reader: FlacReader<BufReader<File>>,
    path: PathBuf,
    info: StreamInfo,
    bits: i32,
    pending: PendingPcm,
    block_buf: Vec<i32>,
}

impl FlacBackend {
    pub fn open(path: &Path) -> Result<Self, OpenError> {
        let reader = Self::open_reader(path)?;
        let streaminfo = reader.streaminfo();

        Ok(Self {
            info: StreamInfo {
                codec: Codec::Flac,
                sample_rate: streaminfo.sample_rate,
                channels: normalize_channels(streaminfo.channels as usize, path),
                total_frames: streaminfo.samples.unwrap_or(0),
            },
            bits: streaminfo.bits_per_sample as i32,
            path: path.to_path_buf(),
            pending: PendingPcm::new(),
            block_buf: Vec::new(),
            reader,
        })
    }

    fn open_reader(path: &Path) -> Result<FlacReader<BufReader<File>>, OpenError> {
        let file = File::open(path).map_err(|source| OpenError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        FlacReader::new(BufReader::new(file)).map_err(|e| OpenError::Unsupported {
            codec: Codec::Flac,
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    fn next_block(&mut self) -> Option<Block> {
        let recycle = std::mem::take(&mut self.block_buf);
        let mut blocks = self.reader.blocks();
        match blocks.read_next_or_eof(recycle) {
            Ok(Some(block)) => Some(block),
            Ok(None) => None,
            Err(e) => {
                // A broken frame leaves the stream unsynchronized; stop here
                // and let the caller treat it as the end.
                log::warn!("FLAC decode error: {}", e);
                None
            }
        }
    }

    /// Interleaves `block` into the pending buffer, skipping its first
    /// `skip` frames, and reclaims the block memory.
    fn stage_block(&mut self, block: Block, skip: usize) {
        let channels = block.channels() as usize;
        let duration = block.duration() as usize;
        let start = skip.min(duration);

        let mut samples = Vec::with_capacity((duration - start) * channels);
        for frame in start..duration {
            for ch in 0..channels {
                samples.push(self.scale(block.sample(ch as u32, frame as u32)));
            }
        }
        self.pending.refill(samples);
        self.block_buf = block.into_buffer();
    }

    fn scale(&self, s: i32) -> i16 {
        if self.bits >= 16 {
            (s >> (self.bits - 16)) as i16
        } else {
            (s << (16 - self.bits)) as i16
        }
    }
}

impl Backend for FlacBackend {
    fn info(&self) -> StreamInfo {
        self.info
    }

    fn read(&mut self, out: &mut [i16]) -> usize {
        let mut filled = 0;
        while filled < out.len() {
            if self.pending.is_empty() {
                match self.next_block() {
                    Some(block) => self.stage_block(block, 0),
                    None => break,
                }
                if self.pending.is_empty() {
                    break;
                }
            }
            filled += self.pending.drain_into(&mut out[filled..]);
        }
        filled / self.info.channels
    }

    /// Exact but linear: the format has no seek table support here, so the
    /// stream is reopened and decoded up to the target block.
    fn seek(&mut self, frame: u64) {
        self.pending.clear();
        match Self::open_reader(&self.path) {
            Ok(reader) => self.reader = reader,
            Err(e) => {
                log::warn!("FLAC reopen for seek failed: {}", e);
                return;
            }
        }

        let mut block_start: u64 = 0;
        while let Some(block) = self.next_block() {
            let duration = block.duration() as u64;
            if block_start + duration > frame {
                self.stage_block(block, (frame - block_start) as usize);
                return;
            }
            block_start += duration;
            self.block_buf = block.into_buffer();
        }
        // Target past the end; reads will now return 0.
    }

    fn channel_order(&self) -> ChannelOrder {
        ChannelOrder::Smpte
    }
}
