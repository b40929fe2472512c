mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use cli::Cli;
use minijuke::config::{self, VizMode};
use minijuke::player::Player;
use minijuke::{OUT_RATE, SAMPLES_PER_FRAME};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    // Load config: explicit --config path, or auto-detect minijuke.toml / global config
    let config_path = cli.config.clone().or_else(|| {
        let local = std::path::PathBuf::from("minijuke.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("minijuke").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("minijuke").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    });

    let mut viz = config::VizConfig::default();
    if let Some(ref path) = config_path {
        if let Some(cfg) = config::load_config(path) {
            log::info!("Loaded config from {}", path.display());
            viz = cfg.viz;
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    // Merge: CLI flags override whatever the config chose
    if let Some(ref mode) = cli.viz_mode {
        viz.mode = parse_viz_mode(mode)?;
    }
    if let Some(bands) = cli.bands {
        viz.bands = bands;
    }
    if let Some(peak_hold) = cli.peak_hold {
        viz.peak_hold = peak_hold;
    }

    let input = cli.input.as_ref().context("Input audio file is required")?;
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    log::info!("minijuke - audio playback core");
    log::info!("Input: {}", input.display());
    log::info!("Output: {}", cli.output.display());
    log::info!("Viz mode: {:?}, {} bands", viz.mode, viz.clamped_bands());

    // 1. Open the track
    let mut player = Player::new(viz);
    player.open_track(input)?;
    if cli.start > 0.0 {
        player.seek_by_seconds(cli.start);
    }

    // 2. Open the output WAV at the fixed render format
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: OUT_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&cli.output, spec)
        .with_context(|| format!("Failed to create {}", cli.output.display()))?;

    // Each chunk is 800 frames, 1/60 s of output
    let max_ticks = if cli.duration > 0.0 {
        (cli.duration * (OUT_RATE as f64 / SAMPLES_PER_FRAME as f64)).round() as u64
    } else {
        0
    };

    let remaining = player.duration_seconds() - player.position_seconds();
    let pb = if remaining > 0.0 {
        let mut est = (remaining * (OUT_RATE as f64 / SAMPLES_PER_FRAME as f64)).ceil() as u64;
        if max_ticks > 0 {
            est = est.min(max_ticks);
        }
        let pb = ProgressBar::new(est);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} chunks ({eta} remaining)")
                .unwrap()
                .progress_chars("=>-"),
        );
        pb
    } else {
        ProgressBar::new_spinner()
    };

    // 3. Pull chunks until the track ends, metering as we go
    let mut buf = vec![0i16; SAMPLES_PER_FRAME * 2];
    let mut ticks = 0u64;
    let mut peak_level = 0.0f32;

    loop {
        if player.read_frame(&mut buf) == 0 {
            break;
        }
        player.update_levels(&buf, SAMPLES_PER_FRAME);
        for &level in &player.levels()[..player.band_count()] {
            if level > peak_level {
                peak_level = level;
            }
        }

        for &s in &buf {
            writer.write_sample(s)?;
        }

        ticks += 1;
        pb.set_position(ticks);
        if max_ticks > 0 && ticks >= max_ticks {
            break;
        }
    }

    pb.finish_and_clear();
    writer.finalize().context("Failed to finalize output WAV")?;

    let seconds = ticks as f64 * SAMPLES_PER_FRAME as f64 / OUT_RATE as f64;
    log::info!(
        "Done! Wrote {:.1}s to {} (peak band level {:.2})",
        seconds,
        cli.output.display(),
        peak_level
    );
    Ok(())
}

fn parse_viz_mode(name: &str) -> Result<VizMode> {
    match name {
        "bars" => Ok(VizMode::Bars),
        "dots" => Ok(VizMode::Dots),
        "line" => Ok(VizMode::Line),
        "vu_meter" | "vu" => Ok(VizMode::VuMeter),
        "fft_bars" | "fft" => Ok(VizMode::FftBars),
        other => anyhow::bail!("Unknown viz mode: {}", other),
    }
}
