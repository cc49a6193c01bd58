use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use eframe::{egui, NativeOptions};

#[cfg_attr(feature = "code_editor", allow(dead_code))]
mod glsl_highlight;
mod screens;
mod ui_components;
mod utils;

use screens::editor::{Launch, PlaygroundApp};
use utils::config::AppConfig;
use utils::image_loader::ImageSource;
use utils::url_state::{resolve_start_location, LocationStore};

// Window sizing constants
const DEFAULT_W: f32 = 1600.0;
const DEFAULT_H: f32 = 900.0;

/// Side-by-side GLSL palette playground for multi-channel images.
#[derive(Parser, Debug)]
#[command(name = "glsl-palette-playground", version)]
#[command(about = "Edit palette shaders and compare them with the built-in baseline")]
struct Args {
    /// Config file (default: <config_dir>/glsl-palette-playground/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Open a shared link instead of the stored session
    #[arg(long)]
    url: Option<String>,

    /// Composite image, path or http(s) URL; each colour component is a channel
    #[arg(long, conflicts_with = "channel")]
    image: Option<String>,

    /// Grayscale image for the next channel (repeatable, at most 6)
    #[arg(long = "channel")]
    channel: Vec<String>,

    /// Forget the stored shader and start from the default
    #[arg(long)]
    reset: bool,
}

impl Args {
    /// CLI image wins over the configured one.
    fn image_source(&self, config: &AppConfig) -> ImageSource {
        if let Some(location) = &self.image {
            ImageSource::Composite { location: location.clone() }
        } else if !self.channel.is_empty() {
            ImageSource::Channels { locations: self.channel.clone() }
        } else {
            config.image.clone()
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = match AppConfig::load_or_default(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let store = LocationStore::default_path().map(LocationStore::new);
    if store.is_none() {
        log::warn!("No data directory; the applied shader will not survive a restart");
    }

    let location = match resolve_start_location(
        args.url.as_deref(),
        store.as_ref(),
        &config.base_url,
        args.reset,
    ) {
        Ok(location) => location,
        Err(e) => {
            log::error!("Invalid start location: {}", e);
            eprintln!("Invalid location: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let launch = Launch {
        location,
        store,
        image: args.image_source(&config),
        palette: config.palette.clone(),
        editor_font_size: config.editor_font_size,
    };

    let native_options = NativeOptions {
        renderer: eframe::Renderer::Wgpu,
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([DEFAULT_W, DEFAULT_H])
            .with_title("GLSL Palette Playground"),
        ..Default::default()
    };

    let result = eframe::run_native(
        "GLSL Palette Playground",
        native_options,
        Box::new(|cc| Ok(Box::new(PlaygroundApp::new(cc, launch)))),
    );

    if let Err(e) = result {
        log::error!("Application error: {}", e);
        eprintln!("Application error: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_image_overrides_config() {
        let config = AppConfig::default();
        let args = Args::parse_from(["glsl-palette-playground", "--image", "cells.png"]);
        assert_eq!(
            args.image_source(&config),
            ImageSource::Composite { location: "cells.png".to_string() }
        );

        let args = Args::parse_from([
            "glsl-palette-playground",
            "--channel",
            "dapi.png",
            "--channel",
            "gfp.png",
        ]);
        assert_eq!(
            args.image_source(&config),
            ImageSource::Channels { locations: vec!["dapi.png".to_string(), "gfp.png".to_string()] }
        );

        let args = Args::parse_from(["glsl-palette-playground"]);
        assert_eq!(args.image_source(&config), ImageSource::Demo);
    }

    #[test]
    fn test_image_and_channels_conflict() {
        let parsed = Args::try_parse_from([
            "glsl-palette-playground",
            "--image",
            "a.png",
            "--channel",
            "b.png",
        ]);
        assert!(parsed.is_err());
    }
}
