use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use hound::{SampleFormat, WavReader};

use crate::audio::backend::{normalize_channels, Backend, ChannelOrder, Codec, StreamInfo};
use crate::audio::clamp_i16;
use crate::error::OpenError;

/// WAV decoder, also the fallback for files with unrecognized extensions.
pub struct WavBackend {
    reader: WavReader<BufReader<File>>,
    info: StreamInfo,
    bits: u16,
    format: SampleFormat,
}

impl WavBackend {
    pub fn open(path: &Path) -> Result<Self, OpenError> {
        let file = File::open(path).map_err(|source| OpenError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = WavReader::new(BufReader::new(file)).map_err(|e| OpenError::Unsupported {
            codec: Codec::Wav,
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

        let spec = reader.spec();
        let total_frames = reader.duration() as u64;

        Ok(Self {
            info: StreamInfo {
                codec: Codec::Wav,
                sample_rate: spec.sample_rate,
                channels: normalize_channels(spec.channels as usize, path),
                total_frames,
            },
            bits: spec.bits_per_sample,
            format: spec.sample_format,
            reader,
        })
    }
}

impl Backend for WavBackend {
    fn info(&self) -> StreamInfo {
        self.info
    }

    fn read(&mut self, out: &mut [i16]) -> usize {
        let mut filled = 0;

        match self.format {
            SampleFormat::Int => {
                // Other integer widths are shifted into the 16-bit range.
                let bits = self.bits as i32;
                for (slot, sample) in out.iter_mut().zip(self.reader.samples::<i32>()) {
                    let s = match sample {
                        Ok(s) => s,
                        Err(_) => break,
                    };
                    *slot = if bits >= 16 {
                        (s >> (bits - 16)) as i16
                    } else {
                        (s << (16 - bits)) as i16
                    };
                    filled += 1;
                }
            }
            SampleFormat::Float => {
                for (slot, sample) in out.iter_mut().zip(self.reader.samples::<f32>()) {
                    let s = match sample {
                        Ok(s) => s,
                        Err(_) => break,
                    };
                    *slot = clamp_i16(s * 32767.0);
                    filled += 1;
                }
            }
        }

        filled / self.info.channels
    }

    fn seek(&mut self, frame: u64) {
        let frame = frame.min(u32::MAX as u64) as u32;
        if let Err(e) = self.reader.seek(frame) {
            log::warn!("WAV seek failed: {}", e);
        }
    }

    fn channel_order(&self) -> ChannelOrder {
        ChannelOrder::Smpte
    }
}
