use clap::{Parser, Subcommand};
use comfy_gallery::{config, server};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let hash = env!("GIT_HASH");
    if env!("ON_RELEASE_TAG") == "true" || hash.is_empty() {
        env!("CARGO_PKG_VERSION")
    } else {
        // Leaked once at startup
        Box::leak(format!("{}-dev@{hash}", env!("CARGO_PKG_VERSION")).into_boxed_str())
    }
}

#[derive(Parser)]
#[command(name = "comfy-gallery")]
#[command(about = "Local web gallery for generated images")]
#[command(long_about = "\
Local web gallery for generated images

Serves a page listing every image in a directory, newest first, with cached
JPEG thumbnails, a full-size viewer and the metadata each image carries
(ComfyUI prompt and workflow, PNG text chunks, JFIF fields).

Routes:
  GET /                          Gallery page
  GET /api/images                [{filename, mtime}], newest first
  GET /api/image/<file>          Original image
  GET /api/thumbnail/<file>      JPEG thumbnail, cached under cache_dir
  GET /api/metadata/<file>       Metadata as JSON

Settings come from gallery.toml (all optional); --image-dir and --port
override it. Run 'comfy-gallery gen-config' for a documented config file.

Logging follows RUST_LOG when set.")]
#[command(version = version_string())]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// Image directory (overrides the config file)
    #[arg(long, global = true)]
    image_dir: Option<PathBuf>,

    /// Listen port (overrides the config file)
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Debug logging for the gallery
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the web server (default)
    Serve,
    /// Print a stock gallery.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            init_tracing(cli.verbose);
            let mut config = config::load_config(&cli.config)?;
            if let Some(image_dir) = cli.image_dir {
                config.image_dir = image_dir;
            }
            if let Some(port) = cli.port {
                config.port = port;
            }
            config.validate()?;

            info!(config = %cli.config.display(), "configuration loaded");
            if !config.image_dir.is_dir() {
                warn!(
                    image_dir = %config.image_dir.display(),
                    "image directory does not exist; the gallery will be empty"
                );
            }

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(server::serve(config))?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install the log subscriber. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "comfy_gallery=debug,info"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
