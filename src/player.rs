use std::path::Path;

use crate::audio::backend::{self, Backend, StreamInfo};
use crate::audio::resample::Resampler;
use crate::audio::SAMPLES_PER_FRAME;
use crate::config::{VizConfig, VizMode};
use crate::error::OpenError;
use crate::viz::levels::VizBands;
use crate::viz::spectrum::SpectrumAnalyzer;
use crate::viz::MAX_VIZ_BANDS;

/// One loaded track plus the state that outlives it: the resampler, the
/// visualization bands and the spectrum analyzer's auto-gain. Opening a
/// new track replaces the decoder but leaves the display state running,
/// so the bars fall smoothly across track changes instead of snapping.
pub struct Player {
    backend: Option<Box<dyn Backend>>,
    position: u64,
    resampler: Resampler,
    bands: VizBands,
    spectrum: SpectrumAnalyzer,
    viz: VizConfig,
}

impl Player {
    pub fn new(viz: VizConfig) -> Self {
        Self {
            backend: None,
            position: 0,
            resampler: Resampler::new(),
            bands: VizBands::new(),
            spectrum: SpectrumAnalyzer::new(),
            viz,
        }
    }

    /// Closes the current track, then opens `path`, picking the decoder
    /// from the file extension. On failure the player is left closed.
    pub fn open_track(&mut self, path: &Path) -> Result<StreamInfo, OpenError> {
        self.close();

        let backend = backend::open(path)?;
        let info = backend.info();
        if info.total_frames > 0 {
            log::info!(
                "Opened {} ({}): {} Hz, {} ch, {} frames",
                path.display(),
                info.codec,
                info.sample_rate,
                info.channels,
                info.total_frames
            );
        } else {
            log::info!(
                "Opened {} ({}): {} Hz, {} ch, length unknown",
                path.display(),
                info.codec,
                info.sample_rate,
                info.channels
            );
        }

        self.backend = Some(backend);
        Ok(info)
    }

    pub fn close(&mut self) {
        self.backend = None;
        self.position = 0;
        self.resampler.reset();
    }

    /// Renders the next 800 stereo frames into `out` (1600 samples).
    /// Returns the number of frames rendered: the full chunk, or 0 at the
    /// end of the track or with no track open, with `out` left silent.
    pub fn read_frame(&mut self, out: &mut [i16]) -> usize {
        out.fill(0);
        let backend = match self.backend.as_mut() {
            Some(b) => b,
            None => return 0,
        };
        match self.resampler.produce(backend.as_mut(), self.position, out) {
            Some(consumed) => {
                self.position += consumed;
                SAMPLES_PER_FRAME
            }
            None => 0,
        }
    }

    /// Jumps to an absolute source frame, clamped into the track when its
    /// length is known. Interpolation state is dropped so the first chunk
    /// after the jump does not blend across it.
    pub fn seek(&mut self, frame: u64) {
        let backend = match self.backend.as_mut() {
            Some(b) => b,
            None => return,
        };
        let info = backend.info();
        let target = if info.total_frames > 0 {
            frame.min(info.total_frames - 1)
        } else {
            frame
        };
        backend.seek(target);
        self.position = target;
        self.resampler.reset();
        log::debug!("seek to source frame {}", target);
    }

    /// Relative seek in seconds of source time; negative rewinds.
    /// Saturates at the start of the track.
    pub fn seek_by_seconds(&mut self, delta: f64) {
        let info = match self.info() {
            Some(info) => info,
            None => return,
        };
        let step = (delta.abs() * info.sample_rate as f64) as u64;
        let target = if delta < 0.0 {
            self.position.saturating_sub(step)
        } else {
            self.position.saturating_add(step)
        };
        self.seek(target);
    }

    /// Feeds one rendered chunk to whichever visualization is active.
    pub fn update_levels(&mut self, audio: &[i16], frames: usize) {
        let band_count = self.viz.clamped_bands();
        let peak_hold = self.viz.clamped_peak_hold();
        match self.viz.mode {
            VizMode::FftBars => {
                self.spectrum
                    .update(&mut self.bands, audio, frames, band_count, peak_hold)
            }
            VizMode::VuMeter => self.bands.vu_levels(audio, frames, peak_hold),
            VizMode::Bars | VizMode::Dots | VizMode::Line => {
                self.bands.sample_levels(audio, frames, band_count, peak_hold)
            }
        }
    }

    pub fn cycle_viz_mode(&mut self) -> VizMode {
        self.viz.mode = match self.viz.mode {
            VizMode::Bars => VizMode::VuMeter,
            VizMode::VuMeter => VizMode::Dots,
            VizMode::Dots => VizMode::Line,
            VizMode::Line => VizMode::FftBars,
            VizMode::FftBars => VizMode::Bars,
        };
        self.viz.mode
    }

    pub fn is_open(&self) -> bool {
        self.backend.is_some()
    }

    pub fn info(&self) -> Option<StreamInfo> {
        self.backend.as_ref().map(|b| b.info())
    }

    pub fn position_frames(&self) -> u64 {
        self.position
    }

    pub fn position_seconds(&self) -> f64 {
        match self.info() {
            Some(info) if info.sample_rate > 0 => self.position as f64 / info.sample_rate as f64,
            _ => 0.0,
        }
    }

    /// Track length in source frames, 0 when the container does not say.
    pub fn duration_frames(&self) -> u64 {
        self.info().map_or(0, |info| info.total_frames)
    }

    pub fn duration_seconds(&self) -> f64 {
        match self.info() {
            Some(info) if info.sample_rate > 0 => {
                info.total_frames as f64 / info.sample_rate as f64
            }
            _ => 0.0,
        }
    }

    /// Playback progress in [0, 1]; 0 while the length is unknown.
    pub fn progress(&self) -> f32 {
        let total = self.duration_frames();
        if total == 0 {
            return 0.0;
        }
        (self.position as f64 / total as f64).min(1.0) as f32
    }

    pub fn levels(&self) -> &[f32; MAX_VIZ_BANDS] {
        &self.bands.levels
    }

    pub fn peaks(&self) -> &[f32; MAX_VIZ_BANDS] {
        &self.bands.peaks
    }

    pub fn peak_timers(&self) -> &[u32; MAX_VIZ_BANDS] {
        &self.bands.peak_timers
    }

    pub fn band_count(&self) -> usize {
        self.viz.clamped_bands()
    }

    pub fn viz_mode(&self) -> VizMode {
        self.viz.mode
    }

    pub fn config(&self) -> &VizConfig {
        &self.viz
    }

    pub fn set_config(&mut self, viz: VizConfig) {
        self.viz = viz;
    }

    #[cfg(test)]
    fn attach_backend(&mut self, backend: Box<dyn Backend>) {
        self.close();
        self.backend = Some(backend);
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new(VizConfig::default())
    }
}
