use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pulselens_signals::{read_blink_tsv, read_rgb_tsv, AnalysisConfig, AnalysisPipeline, ChannelOrder};

#[derive(Parser)]
#[command(name = "pulselens", version, about = "Heart rate from facial colour traces")]
struct Cli {
    /// Configuration file (TOML); PULSELENS_* environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze an RGB trace and print a JSON report
    Analyze {
        /// Colour table, three columns per frame
        #[arg(long)]
        rgb: PathBuf,
        /// Blink flag table, one flag per frame
        #[arg(long)]
        blink: Option<PathBuf>,
        /// Frame rate; defaults to `pipeline.fps` from the configuration
        #[arg(long)]
        fps: Option<f64>,
        /// Column order of the colour table (rgb or bgr)
        #[arg(long, default_value = "rgb")]
        channel_order: ChannelOrder,
        #[arg(long)]
        pretty: bool,
    },
    /// Print the effective configuration as TOML
    Config,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = AnalysisConfig::load_layered(None, cli.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(path) = &cli.config {
        if !path.exists() {
            log::warn!("config file {} not found, using defaults", path.display());
        }
    }

    match cli.cmd {
        Commands::Analyze {
            rgb,
            blink,
            fps,
            channel_order,
            pretty,
        } => {
            let fps = fps.unwrap_or(config.pipeline.fps);
            let trace = read_rgb_tsv(&rgb, channel_order, fps)
                .with_context(|| format!("failed to read {}", rgb.display()))?;
            let blink = blink
                .map(|path| {
                    read_blink_tsv(&path).with_context(|| format!("failed to read {}", path.display()))
                })
                .transpose()?;

            let report = AnalysisPipeline::new(config)
                .analyze(&trace, blink.as_ref())
                .context("analysis failed")?;
            let json = if pretty {
                serde_json::to_string_pretty(&report)?
            } else {
                serde_json::to_string(&report)?
            };
            println!("{json}");
        }
        Commands::Config => {
            print!("{}", config.to_toml_string()?);
        }
    }
    Ok(())
}
