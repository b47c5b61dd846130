use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use client_core::{config::load_settings, HttpBlendClient};
use crossbeam_channel::bounded;
use eframe::egui;
use tracing_subscriber::EnvFilter;

mod backend_bridge;
mod controller;
mod ui;

use backend_bridge::commands::BackendCommand;
use controller::{events::UiEvent, orchestration::ChannelCommandSink};
use ui::{BlendStudioApp, StartupConfig};

#[derive(Parser, Debug)]
#[command(about = "Desktop client for the image blending service")]
struct Args {
    /// Base URL of the blending service; overrides config and environment.
    #[arg(long)]
    server_url: Option<String>,
    /// Path to a toml config file (defaults to ./blend_studio.toml).
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut settings = load_settings(args.config.as_deref());
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }

    let client = HttpBlendClient::with_timeout(&settings.server_url, settings.request_timeout())
        .with_context(|| format!("failed to create client for {}", settings.server_url))?;
    tracing::info!(server_url = client.server_url(), "starting blend studio");

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(64);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(256);
    backend_bridge::runtime::launch(Arc::new(client), cmd_rx, ui_tx);

    let startup = StartupConfig {
        server_url: settings.server_url.clone(),
        extra_fields: settings.extra_fields(),
    };
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Image Blending Studio")
            .with_inner_size([1100.0, 860.0])
            .with_min_inner_size([720.0, 560.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Image Blending Studio",
        options,
        Box::new(move |_cc| {
            Ok(Box::new(BlendStudioApp::new(
                ChannelCommandSink::new(cmd_tx),
                ui_rx,
                startup,
            )))
        }),
    )
    .map_err(|err| anyhow!("desktop ui exited with error: {err}"))
}
