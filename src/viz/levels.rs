use crate::viz::MAX_VIZ_BANDS;

/// Per-band display state shared by every visualization mode: smoothed
/// levels in [0, 1], held peak markers and their countdown timers.
pub struct VizBands {
    pub levels: [f32; MAX_VIZ_BANDS],
    pub peaks: [f32; MAX_VIZ_BANDS],
    pub peak_timers: [u32; MAX_VIZ_BANDS],
}

impl VizBands {
    pub fn new() -> Self {
        Self {
            levels: [0.0; MAX_VIZ_BANDS],
            peaks: [0.0; MAX_VIZ_BANDS],
            peak_timers: [0; MAX_VIZ_BANDS],
        }
    }

    /// Lets the first `count` bands fall with no audio driving them.
    pub fn decay(&mut self, count: usize) {
        self.decay_range(0, count.min(MAX_VIZ_BANDS));
    }

    pub(crate) fn decay_range(&mut self, from: usize, to: usize) {
        for i in from..to {
            self.levels[i] *= 0.85;
            if self.peak_timers[i] > 0 {
                self.peak_timers[i] -= 1;
            } else {
                self.peaks[i] *= 0.95;
            }
        }
    }

    /// Raises the peak marker when `candidate` beats it, holding it there
    /// for `peak_hold` updates before it starts to slide.
    pub(crate) fn hold_peak(&mut self, i: usize, candidate: f32, peak_hold: u32) {
        if candidate > self.peaks[i] {
            self.peaks[i] = candidate;
            self.peak_timers[i] = peak_hold;
        } else if self.peak_timers[i] > 0 {
            self.peak_timers[i] -= 1;
        } else {
            self.peaks[i] *= 0.95;
        }
    }

    /// Amplitude mode: each band samples one left-channel point from the
    /// interleaved buffer at a fixed stride. Attack is instant, release
    /// exponential.
    pub fn sample_levels(&mut self, audio: &[i16], frames: usize, band_count: usize, peak_hold: u32) {
        let band_count = band_count.min(MAX_VIZ_BANDS);
        let total = (frames * 2).min(audio.len());
        if total == 0 {
            self.decay(band_count);
            return;
        }

        let stride = if band_count == MAX_VIZ_BANDS { 20 } else { 40 };
        for i in 0..band_count {
            let idx = (i * stride).min(total - 1);
            // Widen before negating; |i16::MIN| does not fit in i16.
            let s = (audio[idx] as i32).abs();
            let p = s as f32 / 32768.0;

            if p > self.levels[i] {
                self.levels[i] = p;
            } else {
                self.levels[i] *= 0.85;
            }
            self.hold_peak(i, p, peak_hold);
        }
    }

    /// VU mode: bands 0 and 1 track the left and right channel as a blend
    /// of average and peak amplitude over every fourth frame.
    pub fn vu_levels(&mut self, audio: &[i16], frames: usize, peak_hold: u32) {
        let frames = frames.min(audio.len() / 2);

        let mut sum = [0.0f32; 2];
        let mut peak = [0.0f32; 2];
        let mut count = 0u32;
        let mut i = 0;
        while i < frames {
            for ch in 0..2 {
                let a = (audio[i * 2 + ch] as i32).abs() as f32 / 32768.0;
                sum[ch] += a;
                if a > peak[ch] {
                    peak[ch] = a;
                }
            }
            count += 1;
            i += 4;
        }

        for ch in 0..2 {
            let target = if count > 0 {
                let avg = sum[ch] / count as f32;
                (avg * 0.75 + peak[ch] * 0.25).min(1.0)
            } else {
                0.0
            };

            if target > self.levels[ch] {
                self.levels[ch] = target;
            } else {
                self.levels[ch] *= 0.85;
            }
            let level = self.levels[ch];
            self.hold_peak(ch, level, peak_hold);
        }
    }
}

impl Default for VizBands {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loud_buffer(frames: usize, value: i16) -> Vec<i16> {
        vec![value; frames * 2]
    }

    #[test]
    fn sampled_attack_is_instant() {
        let mut bands = VizBands::new();
        let audio = loud_buffer(800, 16384);
        bands.sample_levels(&audio, 800, 40, 30);
        for i in 0..40 {
            assert!((bands.levels[i] - 0.5).abs() < 1e-4, "band {}", i);
        }
    }

    #[test]
    fn sampled_release_decays() {
        let mut bands = VizBands::new();
        bands.sample_levels(&loud_buffer(800, 16384), 800, 40, 30);
        bands.sample_levels(&loud_buffer(800, 0), 800, 40, 30);
        for i in 0..40 {
            assert!((bands.levels[i] - 0.5 * 0.85).abs() < 1e-4, "band {}", i);
        }
    }

    #[test]
    fn sampled_bands_read_strided_left_samples() {
        // Band 3 at 40 bands reads interleaved index 60, a left sample.
        let mut audio = vec![0i16; 1600];
        audio[60] = -8192;
        let mut bands = VizBands::new();
        bands.sample_levels(&audio, 800, 40, 30);
        assert!((bands.levels[3] - 0.25).abs() < 1e-4);
        assert_eq!(bands.levels[4], 0.0);
    }

    #[test]
    fn sampled_index_clamps_on_short_buffers() {
        let audio = vec![1000i16; 20];
        let mut bands = VizBands::new();
        // 10 frames on offer; high bands all clamp to the final sample.
        bands.sample_levels(&audio, 10, 40, 30);
        for i in 0..40 {
            assert!(bands.levels[i] > 0.0, "band {}", i);
        }
    }

    #[test]
    fn sampled_empty_input_decays() {
        let mut bands = VizBands::new();
        bands.levels[7] = 0.8;
        bands.sample_levels(&[], 0, 40, 30);
        assert!((bands.levels[7] - 0.8 * 0.85).abs() < 1e-6);
    }

    #[test]
    fn vu_blends_average_and_peak_per_channel() {
        // Constant left at half scale, silent right.
        let mut audio = Vec::with_capacity(1600);
        for _ in 0..800 {
            audio.push(16384i16);
            audio.push(0i16);
        }
        let mut bands = VizBands::new();
        bands.vu_levels(&audio, 800, 30);
        assert!((bands.levels[0] - 0.5).abs() < 1e-4);
        assert_eq!(bands.levels[1], 0.0);
    }

    #[test]
    fn vu_peaks_hold_then_slide() {
        let loud: Vec<i16> = vec![16384; 1600];
        let silent = vec![0i16; 1600];
        let mut bands = VizBands::new();

        bands.vu_levels(&loud, 800, 2);
        let held = bands.peaks[0];
        assert!((held - 0.5).abs() < 1e-4);

        // Two silent updates burn the hold timer, the third starts decay.
        bands.vu_levels(&silent, 800, 2);
        bands.vu_levels(&silent, 800, 2);
        assert!((bands.peaks[0] - held).abs() < 1e-6);
        bands.vu_levels(&silent, 800, 2);
        assert!((bands.peaks[0] - held * 0.95).abs() < 1e-6);
    }

    #[test]
    fn decay_lowers_levels_and_eventually_peaks() {
        let mut bands = VizBands::new();
        bands.levels[0] = 1.0;
        bands.peaks[0] = 1.0;
        bands.peak_timers[0] = 1;

        bands.decay(40);
        assert!((bands.levels[0] - 0.85).abs() < 1e-6);
        assert_eq!(bands.peaks[0], 1.0);
        assert_eq!(bands.peak_timers[0], 0);

        bands.decay(40);
        assert!((bands.peaks[0] - 0.95).abs() < 1e-6);
    }
}
