use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "minijuke", about = "Decode audio to 48 kHz stereo WAV with live level metering")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG)
    pub input: Option<PathBuf>,

    /// Output WAV file
    #[arg(short, long, default_value = "out.wav")]
    pub output: PathBuf,

    /// Config file path (default: minijuke.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Visualization mode: bars, dots, line, vu_meter, fft_bars
    #[arg(short = 'm', long)]
    pub viz_mode: Option<String>,

    /// Number of visualization bands (1-40)
    #[arg(long)]
    pub bands: Option<usize>,

    /// Peak marker hold time in chunks (0-300)
    #[arg(long)]
    pub peak_hold: Option<u32>,

    /// Start position in seconds
    #[arg(long, default_value_t = 0.0)]
    pub start: f64,

    /// Stop after this many seconds of output (0 = play to the end)
    #[arg(short, long, default_value_t = 0.0)]
    pub duration: f64,
}
