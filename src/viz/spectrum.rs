use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::audio::OUT_RATE;
use crate::viz::levels::VizBands;
use crate::viz::MAX_VIZ_BANDS;

const FFT_SIZE: usize = 512;
/// Lowest band edge in Hz.
const MIN_FREQ: f32 = 35.0;
/// Top band edge as a fraction of Nyquist, keeping the roll-off region out.
const MAX_FREQ_RATIO: f32 = 0.92;

/// Windowed FFT front-end for the bar modes. Holds the plan, the Hann
/// window and an automatic gain that rides the recent frame maxima, so
/// quiet passages still fill the display.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window: [f32; FFT_SIZE],
    input: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    band_energy: [f32; MAX_VIZ_BANDS],
    auto_gain: f32,
}

impl SpectrumAnalyzer {
    pub fn new() -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        let mut window = [0.0f32; FFT_SIZE];
        for (i, w) in window.iter_mut().enumerate() {
            *w = 0.5 - 0.5 * (2.0 * PI * i as f32 / (FFT_SIZE - 1) as f32).cos();
        }

        Self {
            fft,
            window,
            input: vec![Complex::new(0.0, 0.0); FFT_SIZE],
            scratch,
            band_energy: [0.0; MAX_VIZ_BANDS],
            auto_gain: 24.0,
        }
    }

    /// Folds one interleaved stereo buffer into `band_count` log-spaced
    /// bands and advances the smoothed levels in `bands`. Buffers shorter
    /// than the window repeat their last frame; an empty buffer only decays.
    pub fn update(
        &mut self,
        bands: &mut VizBands,
        audio: &[i16],
        frames: usize,
        band_count: usize,
        peak_hold: u32,
    ) {
        let band_count = band_count.min(MAX_VIZ_BANDS);
        let frames = frames.min(audio.len() / 2);
        if frames == 0 {
            bands.decay(band_count);
            return;
        }

        for i in 0..FFT_SIZE {
            let f = i.min(frames - 1);
            let mono = (audio[f * 2] as f32 + audio[f * 2 + 1] as f32) * (0.5 / 32768.0);
            self.input[i] = Complex::new(mono * self.window[i], 0.0);
        }
        self.fft.process_with_scratch(&mut self.input, &mut self.scratch);

        let max_bin = FFT_SIZE / 2 - 1;
        let max_freq = (OUT_RATE / 2) as f32 * MAX_FREQ_RATIO;
        let span = max_freq / MIN_FREQ;
        let bin_of =
            |freq: f32| ((freq * FFT_SIZE as f32 / OUT_RATE as f32) as usize).clamp(1, max_bin);

        let mut frame_max = 0.0f32;
        for i in 0..band_count {
            let b0 = bin_of(MIN_FREQ * span.powf(i as f32 / band_count as f32));
            let b1 = bin_of(MIN_FREQ * span.powf((i + 1) as f32 / band_count as f32)).max(b0);

            let mut energy = 0.0;
            for k in b0..=b1 {
                energy += self.input[k].norm() * (2.0 / FFT_SIZE as f32);
            }
            energy /= (b1 - b0 + 1) as f32;

            // Nudge the low end up; it reads weak on log-spaced bands.
            let t = i as f32 / band_count as f32;
            energy *= (1.15 - 0.35 * t).max(0.75);

            self.band_energy[i] = energy;
            if energy > frame_max {
                frame_max = energy;
            }
        }

        let target = (0.90 / frame_max.max(1e-6)).clamp(1.0, 140.0);
        self.auto_gain = 0.95 * self.auto_gain + 0.05 * target;

        for i in 0..band_count {
            let p = (self.band_energy[i] * self.auto_gain).clamp(0.0, 1.0).powf(0.62);
            if p > bands.levels[i] {
                bands.levels[i] = 0.40 * bands.levels[i] + 0.60 * p;
            } else {
                bands.levels[i] = 0.88 * bands.levels[i] + 0.12 * p;
            }
            bands.hold_peak(i, p, peak_hold);
        }

        bands.decay_range(band_count, MAX_VIZ_BANDS);
    }
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_stereo(freq: f32, frames: usize) -> Vec<i16> {
        let mut out = Vec::with_capacity(frames * 2);
        for i in 0..frames {
            let s = (2.0 * PI * freq * i as f32 / OUT_RATE as f32).sin();
            let v = (s * 16000.0) as i16;
            out.push(v);
            out.push(v);
        }
        out
    }

    #[test]
    fn sine_peaks_in_the_matching_band() {
        let mut analyzer = SpectrumAnalyzer::new();
        let mut bands = VizBands::new();
        let audio = sine_stereo(4800.0, 800);

        for _ in 0..8 {
            analyzer.update(&mut bands, &audio, 800, 40, 30);
        }

        let loudest = bands
            .levels
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        // 4800 Hz lands in band 30 of 40 on the 35..22080 Hz log scale.
        assert_eq!(loudest, 30);
        assert!(bands.levels[30] > 0.1);
    }

    #[test]
    fn silence_decays_levels_and_opens_the_gain() {
        let mut analyzer = SpectrumAnalyzer::new();
        let mut bands = VizBands::new();
        bands.levels[0] = 1.0;
        let silent = vec![0i16; 1600];

        for _ in 0..150 {
            analyzer.update(&mut bands, &silent, 800, 40, 30);
        }

        assert!(bands.levels[0] < 0.01);
        assert!(analyzer.auto_gain > 100.0);
    }

    #[test]
    fn bands_above_the_active_count_still_fall() {
        let mut analyzer = SpectrumAnalyzer::new();
        let mut bands = VizBands::new();
        bands.levels[39] = 0.8;
        let silent = vec![0i16; 1600];

        analyzer.update(&mut bands, &silent, 800, 10, 30);
        assert!((bands.levels[39] - 0.8 * 0.85).abs() < 1e-6);
    }

    #[test]
    fn low_band_boost_follows_the_band_fraction() {
        // An impulse at the window centre has a flat spectrum, so with two
        // bands the level ratio after one update is exactly the boost ratio
        // through the display curve: (0.975 / 1.15)^0.62.
        let mut analyzer = SpectrumAnalyzer::new();
        let mut bands = VizBands::new();
        let mut audio = vec![0i16; 1600];
        audio[FFT_SIZE] = 3276;
        audio[FFT_SIZE + 1] = 3276;

        analyzer.update(&mut bands, &audio, 800, 2, 30);

        let ratio = bands.levels[1] / bands.levels[0];
        assert!(
            (ratio - (0.975f32 / 1.15).powf(0.62)).abs() < 1e-3,
            "ratio {}",
            ratio
        );
    }

    #[test]
    fn empty_input_takes_the_decay_path() {
        let mut analyzer = SpectrumAnalyzer::new();
        let mut bands = VizBands::new();
        bands.levels[3] = 0.8;

        analyzer.update(&mut bands, &[], 0, 40, 30);
        assert!((bands.levels[3] - 0.8 * 0.85).abs() < 1e-6);
    }
}
