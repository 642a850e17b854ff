use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use sonolabel::export::ExportFormat;
use sonolabel::render::{ColorPreset, FrequencyScale};

#[derive(Parser, Debug)]
#[command(name = "sonolabel", version, about = "Spectrogram renderer and audio label toolkit")]
pub struct Cli {
    /// Config file (defaults to ./sonolabel.toml, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render one spectrogram frame with axes and labels to an image
    Render(RenderArgs),
    /// Render a playback video that follows the playhead, muxed with the audio
    Video(VideoArgs),
    /// Print spectrogram dimensions and intensity statistics
    Analyze(AnalyzeArgs),
    /// Convert a label file between formats
    Export(ExportArgs),
}

/// Analysis parameters shared by every command that runs the STFT.
#[derive(Args, Debug, Clone)]
pub struct AnalysisArgs {
    /// FFT size (power of two)
    #[arg(long, default_value_t = 1024)]
    pub fft_size: usize,

    /// Hop size in samples
    #[arg(long, default_value_t = 512)]
    pub hop_size: usize,
}

/// View and styling flags shared by `render` and `video`.
#[derive(Args, Debug, Clone)]
pub struct ViewArgs {
    /// Output width in pixels
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Output height in pixels
    #[arg(long, default_value_t = 480)]
    pub height: u32,

    /// Visible window length in seconds (1-60)
    #[arg(long)]
    pub window: Option<f64>,

    /// Frequency scale: linear, log or mel
    #[arg(long)]
    pub scale: Option<FrequencyScale>,

    /// Lowest displayed frequency in Hz
    #[arg(long)]
    pub min_freq: Option<f64>,

    /// Highest displayed frequency in Hz (defaults to nyquist)
    #[arg(long)]
    pub max_freq: Option<f64>,

    /// Brightness multiplier
    #[arg(long)]
    pub intensity: Option<f64>,

    /// Contrast stretch around mid-grey
    #[arg(long)]
    pub contrast: Option<f64>,

    /// Color map: classic, magma or greyscale
    #[arg(long)]
    pub colormap: Option<ColorPreset>,

    /// TTF/OTF font for axis and label text
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Labels to draw (JSON or Audacity .txt)
    #[arg(short, long)]
    pub labels: Option<PathBuf>,

    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Input audio file (WAV, MP3, FLAC, OGG)
    pub input: PathBuf,

    /// Output image file
    #[arg(short, long, default_value = "spectrogram.png")]
    pub output: PathBuf,

    /// Time in seconds at the left edge of the view
    #[arg(long, default_value_t = 0.0)]
    pub start: f64,

    /// Draw the playhead at this time in seconds
    #[arg(long)]
    pub playhead: Option<f64>,

    #[command(flatten)]
    pub view: ViewArgs,
}

#[derive(Args, Debug)]
pub struct VideoArgs {
    /// Input audio file (WAV, MP3, FLAC, OGG)
    pub input: PathBuf,

    /// Output video file
    #[arg(short, long, default_value = "spectrogram.mp4")]
    pub output: PathBuf,

    /// Frames per second
    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    /// H.264 CRF quality (0-51, lower = better). Ignored when --bitrate is set.
    #[arg(long, default_value_t = 18)]
    pub crf: u32,

    /// Video bitrate (e.g. 2400k, 5M). When set, uses -b:v instead of -crf.
    #[arg(short, long)]
    pub bitrate: Option<String>,

    /// FFmpeg video codec
    #[arg(long, default_value = "libx264")]
    pub codec: String,

    /// FFmpeg pixel format
    #[arg(long, default_value = "yuv420p")]
    pub pix_fmt: String,

    #[command(flatten)]
    pub view: ViewArgs,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Input audio file (WAV, MP3, FLAC, OGG)
    pub input: PathBuf,

    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Label file to convert (JSON or Audacity .txt)
    pub input: PathBuf,

    /// Output format
    #[arg(short, long, value_enum)]
    pub format: ExportFormat,

    /// Input format, when the extension does not tell
    #[arg(long, value_enum)]
    pub from: Option<ExportFormat>,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Clamp labels to this audio duration in seconds
    #[arg(long)]
    pub duration: Option<f64>,
}
