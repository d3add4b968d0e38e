use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "overlay-translator",
    version,
    about = "Draw translated OCR text over the original image"
)]
struct Cli {
    /// Run the HTTP overlay service
    #[arg(long = "serve")]
    serve: bool,

    /// Address to listen on with --serve (overrides settings [server].addr)
    #[arg(long = "addr")]
    addr: Option<String>,

    /// Source image to draw on
    #[arg(long = "image")]
    image: Option<PathBuf>,

    /// JSON file with OCR results (array or {"ocrResults": [...]})
    #[arg(long = "regions")]
    regions: Option<PathBuf>,

    /// Where to write the PNG (default: overlay.png)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    overlay_translator::logging::init(cli.verbose)?;

    if cli.serve {
        let settings_path = cli.read_settings.as_deref().map(Path::new);
        let settings = overlay_translator::settings::load_settings(settings_path)?;
        let addr = cli.addr.unwrap_or_else(|| settings.server_addr.clone());
        return overlay_translator::run_server(settings, addr).await;
    }

    let (Some(image), Some(regions)) = (cli.image, cli.regions) else {
        return Err(anyhow!("--image and --regions are required unless --serve is set"));
    };
    let output = tokio::task::spawn_blocking(move || {
        overlay_translator::run(overlay_translator::Config {
            image,
            regions,
            output: cli.output,
            settings_path: cli.read_settings,
        })
    })
    .await??;

    println!("{}", output.display());
    Ok(())
}
