pub mod backend;
pub mod flac;
pub mod mp3;
pub mod ogg;
pub mod resample;
pub mod wav;

/// Fixed output rate the host consumes.
pub const OUT_RATE: u32 = 48_000;
/// Stereo frames delivered per pull.
pub const SAMPLES_PER_FRAME: usize = 800;
/// Hard cap on source channel count.
pub const MAX_CHANNELS: usize = 8;

pub fn clamp_i16(v: f32) -> i16 {
    if v > 32767.0 {
        return 32767;
    }
    if v < -32768.0 {
        return -32768;
    }
    v as i16
}

#[cfg(test)]
pub mod testutil {
    use super::backend::{Backend, ChannelOrder, Codec, StreamInfo};

    /// In-memory PCM source for pipeline tests.
    pub struct MemoryBackend {
        samples: Vec<i16>,
        sample_rate: u32,
        channels: usize,
        cursor: u64,
        order: ChannelOrder,
        reported_total: Option<u64>,
    }

    impl MemoryBackend {
        pub fn new(sample_rate: u32, channels: usize, samples: Vec<i16>) -> Self {
            assert!(channels >= 1);
            assert_eq!(samples.len() % channels, 0);
            Self {
                samples,
                sample_rate,
                channels,
                cursor: 0,
                order: ChannelOrder::Smpte,
                reported_total: None,
            }
        }

        pub fn with_order(mut self, order: ChannelOrder) -> Self {
            self.order = order;
            self
        }

        /// Overrides the advertised length, e.g. 0 for an unknown total.
        pub fn reporting_total(mut self, total: u64) -> Self {
            self.reported_total = Some(total);
            self
        }

        fn total(&self) -> u64 {
            (self.samples.len() / self.channels) as u64
        }
    }

    impl Backend for MemoryBackend {
        fn info(&self) -> StreamInfo {
            StreamInfo {
                codec: Codec::Wav,
                sample_rate: self.sample_rate,
                channels: self.channels,
                total_frames: self.reported_total.unwrap_or_else(|| self.total()),
            }
        }

        fn read(&mut self, out: &mut [i16]) -> usize {
            let start = self.cursor as usize * self.channels;
            if start >= self.samples.len() {
                return 0;
            }
            let want = out.len() / self.channels;
            let have = (self.samples.len() - start) / self.channels;
            let frames = want.min(have);
            let n = frames * self.channels;
            out[..n].copy_from_slice(&self.samples[start..start + n]);
            self.cursor += frames as u64;
            frames
        }

        fn seek(&mut self, frame: u64) {
            self.cursor = frame.min(self.total());
        }

        fn channel_order(&self) -> ChannelOrder {
            self.order
        }
    }

    /// Refuses to deliver more than `cap` frames per read, exercising the
    /// short-read handling above the pipeline.
    pub struct CappedBackend {
        pub inner: MemoryBackend,
        pub cap: usize,
    }

    impl Backend for CappedBackend {
        fn info(&self) -> StreamInfo {
            self.inner.info()
        }

        fn read(&mut self, out: &mut [i16]) -> usize {
            let limit = (self.cap * self.inner.channels).min(out.len());
            self.inner.read(&mut out[..limit])
        }

        fn seek(&mut self, frame: u64) {
            self.inner.seek(frame);
        }

        fn channel_order(&self) -> ChannelOrder {
            self.inner.channel_order()
        }
    }
}
