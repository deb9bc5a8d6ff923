// src/main.rs
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{error, info};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use crate::ai::connector::ImageClassifier;
use crate::capture::frame::Rotation;
use crate::config::Config;

mod ai;
mod capture;
mod config;
mod display;
mod scanner;

#[derive(Parser)]
#[command(name = "aicamera")]
#[command(about = "Scan a frame and classify it with a remote model", long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a single image file
    Classify {
        /// Image to send
        image: PathBuf,

        /// Rotation reported for the frame, in degrees
        #[arg(long, default_value_t = 0)]
        rotation: u32,

        /// Classification endpoint URL
        #[arg(long)]
        endpoint: Option<String>,

        /// Rotate the frame upright before sending
        #[arg(long)]
        upright: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run a live feed from image files; press Enter to scan, q to quit
    Run {
        /// Image files or directories to cycle through as the feed
        #[arg(required = true)]
        frames: Vec<PathBuf>,

        /// Feed rate
        #[arg(long)]
        fps: Option<u32>,

        /// Rotation reported for every frame, in degrees
        #[arg(long, default_value_t = 0)]
        rotation: u32,

        /// Classification endpoint URL
        #[arg(long)]
        endpoint: Option<String>,

        /// Rotate frames upright before sending
        #[arg(long)]
        upright: bool,
    },
    /// Send a free-text prompt to the prediction endpoint
    Prompt {
        /// Prompt text
        text: String,

        /// Prediction endpoint URL
        #[arg(long)]
        endpoint: Option<String>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init_from_env(
        env_logger::Env::default().filter_or("RUST_LOG", "info")
    );

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Classify { image, rotation, endpoint, upright, json } => {
            apply_overrides(&mut config, endpoint, upright, None);
            config.validate_for_scan()?;
            classify_file(&config, image, Rotation::try_from(rotation)?, json)
        }
        Commands::Run { frames, fps, rotation, endpoint, upright } => {
            apply_overrides(&mut config, endpoint, upright, fps);
            config.validate_for_scan()?;
            run_live(&config, frames, Rotation::try_from(rotation)?)
        }
        Commands::Prompt { text, endpoint } => {
            if let Some(endpoint) = endpoint {
                config.prompt_endpoint = endpoint;
            }
            config.validate_for_prompt()?;
            send_prompt(&config, &text)
        }
    }
}

fn apply_overrides(config: &mut Config, endpoint: Option<String>, upright: bool, fps: Option<u32>) {
    if let Some(endpoint) = endpoint {
        config.endpoint = endpoint;
    }
    if let Some(fps) = fps {
        config.frames_per_second = fps;
    }
    config.upright_frames |= upright;
}

fn classify_file(config: &Config, image: PathBuf, rotation: Rotation, json: bool) -> Result<()> {
    info!("Classifying {}", image.display());

    let frame = capture::feed::load_frame(&image, config.target_resolution(), rotation)?;
    let classifier = ai::remote_classifier::RemoteClassifier::new(config)?;
    let result = classifier.classify(frame);

    if json {
        println!("{}", serde_json::to_string(&result)?);
    } else {
        println!("\n{}\n", result);
    }
    if result.is_error() {
        error!("Classification did not succeed: {}", result.label);
    }
    Ok(())
}

fn run_live(config: &Config, frames: Vec<PathBuf>, rotation: Rotation) -> Result<()> {
    let feed = capture::feed::ImageFeed::open(&frames, config.target_resolution(), rotation)?;
    info!("Feeding {} image(s) at {} fps", feed.len(), config.frames_per_second);

    let classifier: Arc<dyn ImageClassifier> =
        Arc::new(ai::remote_classifier::RemoteClassifier::new(config)?);
    let scanner = scanner::runner::Scanner::start(classifier, display::print_snapshot)?;
    let pipeline = capture::pipeline::CameraPipeline::start(
        Box::new(feed),
        config.frame_interval(),
        scanner.handle(),
    )?;

    println!("Press Enter to scan, q then Enter to quit.");
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        match line.trim() {
            "q" | "quit" | "exit" => break,
            _ => scanner.arm()?,
        }
    }

    pipeline.stop();
    scanner.shutdown();
    Ok(())
}

fn send_prompt(config: &Config, text: &str) -> Result<()> {
    let client = ai::prompt::PromptClient::new(config)?;
    match client.send(text) {
        Ok(reply) => {
            println!("\n{}\n", reply);
        }
        Err(e) => {
            error!("Prompt failed: {:#}", e);
            println!("Error: {}", e);
        }
    }
    Ok(())
}
