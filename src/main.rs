use anyhow::Result;
use clap::Parser;
use plantcam::{PlantcamApp, PlantcamConfig};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "plantcam")]
#[command(about = "Take a photo of a plant and find out what it is")]
#[command(version)]
#[command(long_about = "Opens the rear camera, captures a still photo, and sends it to a \
plant identification service which returns the most likely species. Photos can be shared \
or saved as timestamped JPEG files.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "plantcam.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Capture and identify a single photo without the interactive UI
    #[arg(long, help = "Open the camera, take one photo, print the matches and exit")]
    once: bool,

    /// With --once, also share or download the photo
    #[arg(long, requires = "once", help = "Share or download the photo taken with --once")]
    save: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting plantcam v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match PlantcamConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    config.warn_if_missing_api_key();

    let mut app = PlantcamApp::new(config).map_err(|e| {
        error!("Failed to create application: {}", e);
        e
    })?;

    if args.once {
        let outcome = app.run_once(args.save).await;
        app.shutdown().await;

        match outcome {
            Ok(report) => {
                for line in &report.suggestions {
                    println!("{}", line);
                }
                if let Some(health) = &report.health {
                    println!("{}", health);
                }
                if let Some(saved) = &report.saved {
                    println!("Saved to {}", saved.destination());
                }
                return Ok(());
            }
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        }
    }

    let exit_code = app.run().await.map_err(|e| {
        error!("Error while running: {}", e);
        e
    })?;

    info!("plantcam exited with code: {}", exit_code);
    std::process::exit(exit_code);
}

/// Level for the `plantcam` target. Without an explicit flag the interactive
/// view only lets errors through, since stderr shares its terminal.
fn log_level(args: &Args) -> &'static str {
    if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else if args.once {
        "warn"
    } else {
        "error"
    }
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("plantcam={}", log_level(args))));

    // stdout belongs to the session view
    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("pretty") => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some("compact") | None => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using compact", format);
            fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_target(false)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# plantcam configuration file");
    println!("# Every value can be overridden with PLANTCAM__<SECTION>__<KEY>,");
    println!("# e.g. PLANTCAM__IDENTIFICATION__API_KEY");
    println!();
    println!("{}", PlantcamConfig::default_toml()?);
    Ok(())
}
