use std::{
    io,
    panic,
    path::{Path, PathBuf},
    process,
};

use anyhow::Result;
use clap::{CommandFactory, Parser};
use framekit_core::{
    nodes::all_nodes,
    resolution::ResolutionRequest,
    CropRequest,
};
use thiserror::Error;
use tracing::{debug, level_filters::LevelFilter};

use crate::{
    commands::{
        audio::save_audio_handler,
        config::config_sub_handler,
        crop::{crop_handler, stitch_handler},
        detect_scenes::{detect_scenes_handler, SceneDetectionOverrides},
        resolution::resolution_handler,
        sharpness::{select_sharpest_handler, sharpest_handler},
        text::{line_count_handler, load_text_handler, trigger_word_handler},
        Commands,
        FramekitCli,
    },
    configuration::{ConfigError, Configuration},
    logging::init_logging,
};

mod commands;
mod configuration;
mod frame_io;
mod logging;

pub const DEFAULT_CONFIG_PATH: &str = "./framekit.json";
pub const DEFAULT_LOG_PATH: &str = "./logs/framekit.log";

fn main() -> anyhow::Result<()> {
    let orig_hook = panic::take_hook();
    // Catch panics in child threads
    panic::set_hook(Box::new(move |panic_info| {
        orig_hook(panic_info);
        process::exit(1);
    }));
    run()
}

fn run() -> anyhow::Result<()> {
    let cli = FramekitCli::parse();
    let cwd = std::env::current_dir()?;
    let config_path = path_abs::PathAbs::new(
        cli.config_file.as_deref().unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH)),
    )?
    .as_path()
    .to_path_buf();

    let logs = cli.logs.unwrap_or_else(|| cwd.join(DEFAULT_LOG_PATH));
    init_logging(LevelFilter::INFO, &logs, LevelFilter::DEBUG)?;
    debug!("Using configuration path {}", config_path.display());

    match cli.command {
        Commands::Config {
            subcommand,
        } => {
            config_sub_handler(&config_path, &subcommand)?;
        },
        Commands::DetectScenes {
            input,
            output,
            threshold,
            max_scenes,
            fps,
            min_scene_len,
            temp_dir,
            json,
        } => {
            let configuration = load_configuration(&config_path)?;
            let mut scene_config = configuration.scene_detection;
            SceneDetectionOverrides {
                threshold,
                max_scenes,
                fps,
                min_scene_len,
                temp_dir,
            }
            .apply(&mut scene_config);
            let image_format = cli.image_format.unwrap_or(configuration.output.image_format);
            detect_scenes_handler(&input, &output, &scene_config, image_format, json)?;
        },
        Commands::Crop {
            input,
            output,
            x,
            y,
            width,
            height,
            round_to_multiple,
        } => {
            let image_format = resolve_image_format(&config_path, cli.image_format)?;
            let request = CropRequest {
                x,
                y,
                width,
                height,
                round_to_multiple,
            };
            crop_handler(&input, &output, &request, image_format)?;
        },
        Commands::Stitch {
            original,
            cropped,
            output,
            crop_info,
        } => {
            let image_format = resolve_image_format(&config_path, cli.image_format)?;
            stitch_handler(&original, &cropped, &output, crop_info.as_deref(), image_format)?;
        },
        Commands::Sharpest {
            input,
            output,
        } => {
            let image_format = resolve_image_format(&config_path, cli.image_format)?;
            sharpest_handler(&input, &output, image_format)?;
        },
        Commands::SelectSharpest {
            input,
            output,
            interval,
            window,
        } => {
            let image_format = resolve_image_format(&config_path, cli.image_format)?;
            select_sharpest_handler(&input, &output, interval, window, image_format)?;
        },
        Commands::Resolution {
            vram_gb,
            frame_count,
            target_megapixels,
            aspect_ratio,
            source,
            json,
        } => {
            let request = ResolutionRequest {
                vram_gb,
                frame_count,
                target_megapixels,
                aspect_ratio,
            };
            resolution_handler(request, source.as_deref(), json)?;
        },
        Commands::LoadText {
            directory,
            index,
            filter,
            cursor,
        } => {
            load_text_handler(&directory, index, &filter, cursor.as_deref())?;
        },
        Commands::LineCount {
            file,
        } => {
            line_count_handler(&file)?;
        },
        Commands::TriggerWord {
            filename,
        } => {
            trigger_word_handler(&filename);
        },
        Commands::SaveAudio {
            input,
            output,
            prefix,
            encoding,
        } => {
            let encoding = match encoding {
                Some(encoding) => encoding,
                None => load_configuration(&config_path)?.output.wav_encoding,
            };
            save_audio_handler(&input, &output, &prefix, encoding)?;
        },
        Commands::Nodes {
            json,
        } => {
            let nodes = all_nodes();
            if json {
                println!("{}", serde_json::to_string_pretty(&nodes)?);
            } else {
                for node in &nodes {
                    println!(
                        "{:<16} {:<24} [{}] {}",
                        node.name, node.display_name, node.category, node.description
                    );
                }
            }
        },
        Commands::Completions {
            shell,
        } => {
            clap_complete::generate(
                shell,
                &mut FramekitCli::command(),
                "framekit",
                &mut io::stdout(),
            );
        },
    }

    Ok(())
}

fn load_configuration(config_path: &Path) -> Result<Configuration> {
    match Configuration::load_or_default(config_path) {
        Ok(configuration) => Ok(configuration),
        Err(ConfigError::Load(path)) => Err(FramekitCliError::ConfigLoadError(path).into()),
        Err(err) => Err(err.into()),
    }
}

fn resolve_image_format(
    config_path: &Path,
    flag: Option<frame_io::ImageFormat>,
) -> Result<frame_io::ImageFormat> {
    match flag {
        Some(format) => Ok(format),
        None => Ok(load_configuration(config_path)?.output.image_format),
    }
}

#[derive(Debug, Error)]
pub enum FramekitCliError {
    #[error("Cannot initialize over an existing config file: {0}")]
    ConfigFileAlreadyExists(PathBuf),
    #[error("Failed to load config file: {0}")]
    ConfigLoadError(PathBuf),
    #[error("max_scenes must be between 1 and 50, got {0}")]
    InvalidMaxScenes(usize),
    #[error("Threshold must be a non-negative number, got {0}")]
    InvalidThreshold(f64),
    #[error("fps must be a positive number, got {0}")]
    InvalidFps(f64),
    #[error("No frames found in {0}")]
    NoFrames(PathBuf),
}
