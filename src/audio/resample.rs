use crate::audio::backend::{Backend, ChannelOrder};
use crate::audio::{clamp_i16, MAX_CHANNELS, OUT_RATE, SAMPLES_PER_FRAME};

/// Frames carried between pulls so interpolation can straddle the boundary
/// without re-reading the decoder.
pub const CACHE_FRAMES: usize = 8;
/// Staging capacity in source frames; bounds the usable rate ratio at 8x.
const MAX_INPUT_FRAMES: usize = SAMPLES_PER_FRAME * 8;
/// Source cursor below which short decoder reads are forgiven, so codecs
/// that warm up slowly are not cut off on the first pulls.
const STARTUP_GRACE_FRAMES: u64 = 1000;

/// Linear interpolating rate converter. Pulls source frames from a backend,
/// downmixes each to stereo and renders exactly [`SAMPLES_PER_FRAME`] output
/// frames per call at [`OUT_RATE`].
pub struct Resampler {
    /// Fractional position into the current source frame, in [0, 1).
    phase: f64,
    input: Vec<i16>,
    cache: [i16; CACHE_FRAMES * MAX_CHANNELS],
    cache_frames: usize,
}

impl Resampler {
    pub fn new() -> Self {
        Self {
            phase: 0.0,
            input: vec![0; MAX_INPUT_FRAMES * MAX_CHANNELS],
            cache: [0; CACHE_FRAMES * MAX_CHANNELS],
            cache_frames: 0,
        }
    }

    /// Drops the fractional phase and any carried frames. Call on track
    /// changes and seeks; stale neighbors would smear across the jump.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.cache_frames = 0;
    }

    /// Renders one output frame's worth of stereo samples into `out`
    /// (length `SAMPLES_PER_FRAME * 2`). Returns the number of source
    /// frames consumed, or `None` once the track is over: fewer than two
    /// source frames left, or a short decoder read past the startup grace
    /// window (`position` is the caller's source cursor).
    pub fn produce(
        &mut self,
        backend: &mut dyn Backend,
        position: u64,
        out: &mut [i16],
    ) -> Option<u64> {
        debug_assert_eq!(out.len(), SAMPLES_PER_FRAME * 2);

        let info = backend.info();
        let channels = info.channels.clamp(1, MAX_CHANNELS);
        let order = backend.channel_order();
        let ratio = info.sample_rate as f64 / OUT_RATE as f64;

        let advance = self.phase + SAMPLES_PER_FRAME as f64 * ratio;
        let advance_frames = advance as u64;
        let new_phase = advance - advance_frames as f64;

        // The last output sample interpolates between floor(max_pos) and the
        // frame after it, so that neighbor must be present as well.
        let max_src_pos = self.phase + (SAMPLES_PER_FRAME - 1) as f64 * ratio;
        let required = max_src_pos as usize + 2;

        let frames_to_read = required
            .max(advance_frames as usize)
            .min(MAX_INPUT_FRAMES);

        let cached = self.cache_frames.min(frames_to_read);
        self.input[..cached * channels].copy_from_slice(&self.cache[..cached * channels]);

        let need = frames_to_read - cached;
        let read = if need > 0 {
            backend.read(&mut self.input[cached * channels..frames_to_read * channels])
        } else {
            0
        };

        let available = cached + read;
        if available < 2 {
            log::debug!("end of track, {} source frames left", available);
            return None;
        }
        if read < need && position > STARTUP_GRACE_FRAMES {
            log::debug!("end of track, decoder gave {} of {} frames", read, need);
            return None;
        }

        for i in 0..SAMPLES_PER_FRAME {
            let src_pos = self.phase + i as f64 * ratio;
            let mut i1 = src_pos as usize;
            if i1 >= available {
                i1 = available - 1;
            }
            let i2 = (i1 + 1).min(available - 1);
            let frac = (src_pos - i1 as f64) as f32;

            let (l1, r1) = downmix_frame(&self.input[i1 * channels..i1 * channels + channels], order);
            let (l2, r2) = downmix_frame(&self.input[i2 * channels..i2 * channels + channels], order);

            out[i * 2] = clamp_i16((1.0 - frac) * l1 + frac * l2);
            out[i * 2 + 1] = clamp_i16((1.0 - frac) * r1 + frac * r2);
        }

        self.phase = new_phase;

        // The unconsumed tail seeds the next pull.
        let overshoot = available
            .saturating_sub(advance_frames as usize)
            .min(CACHE_FRAMES);
        let tail = (available - overshoot) * channels;
        self.cache[..overshoot * channels]
            .copy_from_slice(&self.input[tail..tail + overshoot * channels]);
        self.cache_frames = overshoot;

        Some(advance_frames)
    }
}

impl Default for Resampler {
    fn default() -> Self {
        Self::new()
    }
}

/// Folds one interleaved source frame down to a stereo pair. Center and
/// surround channels mix in at 0.707, LFE at 0.5; layouts above six
/// channels fall back to an equal-weight average.
pub fn downmix_frame(frame: &[i16], order: ChannelOrder) -> (f32, f32) {
    let vorbis = order == ChannelOrder::Vorbis;
    match frame.len() {
        0 => (0.0, 0.0),
        1 => {
            let s = frame[0] as f32;
            (s, s)
        }
        2 => (frame[0] as f32, frame[1] as f32),
        3 => {
            let (fl, fr, fc) = if vorbis {
                (frame[0] as f32, frame[2] as f32, frame[1] as f32)
            } else {
                (frame[0] as f32, frame[1] as f32, frame[2] as f32)
            };
            (fl + 0.707 * fc, fr + 0.707 * fc)
        }
        4 => {
            let fl = frame[0] as f32;
            let fr = frame[1] as f32;
            let sl = frame[2] as f32;
            let sr = frame[3] as f32;
            (fl + 0.707 * sl, fr + 0.707 * sr)
        }
        5 => {
            let (fl, fr, fc, sl, sr) = if vorbis {
                (
                    frame[0] as f32,
                    frame[2] as f32,
                    frame[1] as f32,
                    frame[3] as f32,
                    frame[4] as f32,
                )
            } else {
                (
                    frame[0] as f32,
                    frame[1] as f32,
                    frame[2] as f32,
                    frame[3] as f32,
                    frame[4] as f32,
                )
            };
            (fl + 0.707 * fc + 0.707 * sl, fr + 0.707 * fc + 0.707 * sr)
        }
        6 => {
            let (fl, fr, fc, lfe, sl, sr) = if vorbis {
                (
                    frame[0] as f32,
                    frame[2] as f32,
                    frame[1] as f32,
                    frame[5] as f32,
                    frame[3] as f32,
                    frame[4] as f32,
                )
            } else {
                (
                    frame[0] as f32,
                    frame[1] as f32,
                    frame[2] as f32,
                    frame[3] as f32,
                    frame[4] as f32,
                    frame[5] as f32,
                )
            };
            (
                fl + 0.707 * fc + 0.707 * sl + 0.5 * lfe,
                fr + 0.707 * fc + 0.707 * sr + 0.5 * lfe,
            )
        }
        _ => {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            let mono = sum as f32 / frame.len() as f32;
            (mono, mono)
        }
    }
}
