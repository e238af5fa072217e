use std::path::PathBuf;

use clap::{Parser as ClapParser, Subcommand};
use clap_complete::Shell;

use framekit_core::WavEncoding;

use crate::{commands::config::ConfigSubcommand, frame_io::ImageFormat};

pub mod audio;
pub mod config;
pub mod crop;
pub mod detect_scenes;
pub mod resolution;
pub mod sharpness;
pub mod text;

#[derive(ClapParser)]
#[command(
    name = "framekit",
    about = "Frame batch tools: scene segmentation, crop and stitch, sharpest frame selection, WAV \
             export.",
    version
)]
pub struct FramekitCli {
    #[command(subcommand)]
    pub command:      Commands,
    /// Specify the location of the config file. Defaults to `./framekit.json`.
    #[arg(long)]
    pub config_file:  Option<PathBuf>,
    /// Log file location. Defaults to `./logs/framekit.log`.
    #[arg(long)]
    pub logs:         Option<PathBuf>,
    /// Format of written frames. Overrides the config file.
    #[arg(long)]
    pub image_format: Option<ImageFormat>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Split a directory of frames into scenes
    DetectScenes {
        /// Directory of input frames
        input:         PathBuf,
        /// Directory receiving `scene_NN/`, `remaining/` and `preview/`
        #[arg(long, short('o'), default_value = "scenes")]
        output:        PathBuf,
        #[arg(long, short('t'))]
        threshold:     Option<f64>,
        /// Number of scenes written individually (1-50)
        #[arg(long)]
        max_scenes:    Option<usize>,
        #[arg(long)]
        fps:           Option<f64>,
        /// Minimum scene length in frames
        #[arg(long)]
        min_scene_len: Option<usize>,
        /// Directory for the temporary container
        #[arg(long)]
        temp_dir:      Option<PathBuf>,
        /// Print the scene ranges as JSON instead of the summary
        #[arg(long)]
        json:          bool,
    },
    /// Crop every frame to a region
    Crop {
        input:             PathBuf,
        #[arg(long, short('o'))]
        output:            PathBuf,
        #[arg(long, default_value_t = 0)]
        x:                 usize,
        #[arg(long, default_value_t = 0)]
        y:                 usize,
        #[arg(long, default_value_t = 512)]
        width:             usize,
        #[arg(long, default_value_t = 512)]
        height:            usize,
        /// Round width and height up to a multiple of this value
        #[arg(long, default_value_t = 1)]
        round_to_multiple: usize,
    },
    /// Paste cropped frames back onto the originals
    Stitch {
        original:  PathBuf,
        cropped:   PathBuf,
        #[arg(long, short('o'))]
        output:    PathBuf,
        /// Defaults to `crop_info.json` inside the cropped directory
        #[arg(long)]
        crop_info: Option<PathBuf>,
    },
    /// Keep only the sharpest frame
    Sharpest {
        input:  PathBuf,
        #[arg(long, short('o'))]
        output: PathBuf,
    },
    /// Sample frames at an interval, taking the sharpest around each sample
    SelectSharpest {
        input:    PathBuf,
        #[arg(long, short('o'))]
        output:   PathBuf,
        #[arg(long, short('i'), default_value_t = 5)]
        interval: usize,
        #[arg(long, short('w'), default_value_t = 3)]
        window:   usize,
    },
    /// Largest 16-aligned resolution for a VRAM budget
    Resolution {
        #[arg(long, default_value_t = framekit_core::resolution::DEFAULT_VRAM_GB)]
        vram_gb:           f64,
        #[arg(long, default_value_t = framekit_core::resolution::DEFAULT_FRAME_COUNT)]
        frame_count:       usize,
        /// 0 uses the largest size that fits
        #[arg(long, default_value_t = 0.0)]
        target_megapixels: f64,
        #[arg(long, default_value_t = framekit_core::resolution::DEFAULT_ASPECT_RATIO)]
        aspect_ratio:      f64,
        /// Take frame count and aspect ratio from a directory of frames
        #[arg(long)]
        source:            Option<PathBuf>,
        #[arg(long)]
        json:              bool,
    },
    /// Print a `.txt` file from a directory, chosen by index
    LoadText {
        directory: PathBuf,
        #[arg(long, conflicts_with = "cursor")]
        index:     Option<usize>,
        /// Only consider files whose name contains this text
        #[arg(long, default_value = "")]
        filter:    String,
        /// File remembering the next index; advanced after every load
        #[arg(long)]
        cursor:    Option<PathBuf>,
    },
    /// Count the lines of a text file
    LineCount { file: PathBuf },
    /// Print the trigger word of an adapter file name
    TriggerWord { filename: String },
    /// Write audio as WAV
    SaveAudio {
        /// A `.wav` file, or JSON audio (`[waveform, rate]`, `{"waveform", "sample_rate"}` or
        /// `{"audio": {...}}`)
        input:    PathBuf,
        #[arg(long, short('o'), default_value = "audio")]
        output:   PathBuf,
        #[arg(long, default_value = framekit_core::audio::DEFAULT_PREFIX)]
        prefix:   String,
        /// PCM_16, PCM_24, PCM_32 or FLOAT_32. Overrides the config file.
        #[arg(long, short('e'))]
        encoding: Option<WavEncoding>,
    },
    /// List the available operations
    Nodes {
        #[arg(long)]
        json: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
    /// Generate shell completions
    Completions { shell: Shell },
}
