use std::{
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Parser, Subcommand};
use client_core::{
    config::load_settings, BlendBackend, HttpBlendClient, ImageUpload, ProcessForm,
    SimpleBlendForm,
};
use shared::protocol::{BlendResponse, ProcessResponse};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Headless client for the image blending service")]
struct Args {
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a CAPTCHA challenge and save it as a PNG.
    Captcha {
        #[arg(long, default_value = "captcha.png")]
        out: PathBuf,
    },
    /// Blend with CAPTCHA verification and histograms.
    Process {
        #[arg(long)]
        image1: PathBuf,
        #[arg(long)]
        image2: PathBuf,
        #[arg(long, default_value = "0.5")]
        blend_level: String,
        /// Where the challenge image is written before prompting for the answer.
        #[arg(long, default_value = "captcha.png")]
        captcha_out: PathBuf,
        #[arg(long, default_value = "blend_output")]
        out_dir: PathBuf,
    },
    /// Blend through the endpoint that needs no CAPTCHA.
    Blend {
        #[arg(long)]
        image1: PathBuf,
        #[arg(long)]
        image2: PathBuf,
        #[arg(long, default_value = "0.5")]
        blend_level: String,
        #[arg(long, default_value = "blended.png")]
        out: PathBuf,
    },
}

async fn write_base64_png(path: &Path, base64_png: &str) -> Result<()> {
    let bytes = STANDARD
        .decode(base64_png.trim())
        .with_context(|| format!("server sent invalid base64 for {}", path.display()))?;
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}

fn prompt_captcha_answer(captcha_path: &Path) -> Result<String> {
    print!("Enter the CAPTCHA shown in {}: ", captcha_path.display());
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().to_string())
}

async fn run_process(
    client: &HttpBlendClient,
    form: ProcessForm,
    captcha_out: &Path,
    out_dir: &Path,
) -> Result<()> {
    let captcha = client.new_captcha().await?;
    write_base64_png(captcha_out, &captcha.captcha_image).await?;
    let form = ProcessForm {
        captcha: prompt_captcha_answer(captcha_out)?,
        ..form
    };

    match client.process(form).await? {
        ProcessResponse::Success(success) => {
            tokio::fs::create_dir_all(out_dir)
                .await
                .with_context(|| format!("failed to create {}", out_dir.display()))?;
            for (name, payload) in [
                ("blended.png", &success.blended_image),
                ("histogram1.png", &success.histogram1),
                ("histogram2.png", &success.histogram2),
                ("histogram_blended.png", &success.histogram_blended),
            ] {
                write_base64_png(&out_dir.join(name), payload).await?;
            }
            println!("Results written to {}", out_dir.display());
            Ok(())
        }
        ProcessResponse::Failure { error } => bail!("server rejected blend: {error}"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref());
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    let client = HttpBlendClient::with_timeout(&settings.server_url, settings.request_timeout())?;

    match args.command {
        Command::Captcha { out } => {
            let captcha = client.new_captcha().await?;
            write_base64_png(&out, &captcha.captcha_image).await?;
            println!("CAPTCHA saved to {}", out.display());
        }
        Command::Process {
            image1,
            image2,
            blend_level,
            captcha_out,
            out_dir,
        } => {
            let form = ProcessForm {
                image1: Some(ImageUpload::from_path(&image1).await?),
                image2: Some(ImageUpload::from_path(&image2).await?),
                blend_level,
                captcha: String::new(),
                extra_fields: settings.extra_fields(),
            };
            run_process(&client, form, &captcha_out, &out_dir).await?;
        }
        Command::Blend {
            image1,
            image2,
            blend_level,
            out,
        } => {
            let form = SimpleBlendForm {
                image1: ImageUpload::from_path(&image1).await?,
                image2: ImageUpload::from_path(&image2).await?,
                blend_level,
            };
            match client.simple_blend(form).await? {
                BlendResponse::Success { blended_image } => {
                    write_base64_png(&out, &blended_image).await?;
                    println!("Blended image saved to {}", out.display());
                }
                BlendResponse::Failure { error } => bail!("server rejected blend: {error}"),
            }
        }
    }

    Ok(())
}
