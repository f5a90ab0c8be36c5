//! route-control: Rule conflict resolution and activation daemon
//!
//! This is the main entry point for the production controller.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! route-control
//!
//! # Run with custom configuration
//! route-control -c /path/to/config.json
//!
//! # Run with environment overrides
//! ROUTE_CONTROL_LOG_LEVEL=debug route-control
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use route_control::config::{load_config_with_env, Config};
use route_control::pipeline::{load_population, run_rebuild_loop, ActivationEngine};
use route_control::render::{write_outputs, ProxyListRenderer, Renderer};

/// Command-line arguments
struct Args {
    /// Configuration file path
    config_path: PathBuf,
    /// Generate default configuration
    generate_config: bool,
    /// Check configuration only
    check_config: bool,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut config_path = PathBuf::from("/etc/route-control/config.json");
        let mut generate_config = false;
        let mut check_config = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-c" | "--config" => {
                    if let Some(path) = args.next() {
                        config_path = PathBuf::from(path);
                    }
                }
                "-g" | "--generate-config" => {
                    generate_config = true;
                }
                "--check" => {
                    check_config = true;
                }
                "-h" | "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "-v" | "--version" => {
                    println!("route-control v{}", route_control::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", arg);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        Self {
            config_path,
            generate_config,
            check_config,
        }
    }
}

fn print_help() {
    println!(
        r#"route-control v{}

Rule conflict resolution and activation engine for proxy backends.

USAGE:
    route-control [OPTIONS]

OPTIONS:
    -c, --config <PATH>     Configuration file path [default: /etc/route-control/config.json]
    -g, --generate-config   Generate default configuration and exit
    --check                 Check configuration and exit
    -h, --help             Print help information
    -v, --version          Print version information

ENVIRONMENT:
    ROUTE_CONTROL_LOG_LEVEL        Override log level (trace, debug, info, warn, error)
    ROUTE_CONTROL_POPULATION_FILE  Override population snapshot path
    ROUTE_CONTROL_OUTPUT_DIR       Override rendered output directory

SIGNALS:
    SIGHUP                 Reload the population snapshot and rebuild
    SIGINT/SIGTERM         Graceful shutdown

EXAMPLE:
    # Rebuild whenever the coordination substrate rewrites the population
    route-control -c /etc/route-control/config.json &
    kill -HUP $!
"#,
        route_control::VERSION
    );
}

/// Initialize logging
fn init_logging(config: &Config) {
    let level = match config.log.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.log.target);

    if config.log.format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Build the configured renderers
///
/// `validate()` only admits known names; "proxy-list" is the only built-in
/// backend today.
fn build_renderers(config: &Config) -> Vec<Box<dyn Renderer + Send + Sync>> {
    config
        .renderers
        .iter()
        .map(|name| {
            debug_assert_eq!(name, "proxy-list");
            Box::new(ProxyListRenderer::new()) as Box<dyn Renderer + Send + Sync>
        })
        .collect()
}

/// Main application entry point
#[tokio::main]
async fn main() -> Result<()> {
    let start_time = Instant::now();

    // Parse arguments
    let args = Args::parse();

    // Handle generate-config
    if args.generate_config {
        route_control::config::create_default_config(&args.config_path)?;
        println!("Generated default configuration at {:?}", args.config_path);
        return Ok(());
    }

    // Load configuration
    let config = load_config_with_env(&args.config_path).map_err(|e| {
        anyhow::anyhow!(
            "Failed to load configuration from {:?}: {}",
            args.config_path,
            e
        )
    })?;

    // Handle check-config
    if args.check_config {
        println!("Configuration is valid");
        return Ok(());
    }

    // Initialize logging
    init_logging(&config);

    info!("route-control v{}", route_control::VERSION);
    info!("Configuration loaded from {:?}", args.config_path);

    // Compile the token dictionary and create the engine
    let tokens = Arc::new(config.build_tokens()?);
    let engine = Arc::new(ActivationEngine::new(tokens));

    // Prepare the output directory
    std::fs::create_dir_all(&config.output_dir).map_err(|e| {
        anyhow::anyhow!(
            "Failed to create output directory {:?}: {}",
            config.output_dir,
            e
        )
    })?;

    // Load the initial population
    let initial = load_population(&config.population_file)
        .map_err(|e| anyhow::anyhow!("Failed to load initial population: {}", e))?;
    info!("Initial population: {} applications", initial.len());

    // Coalescing trigger queue: the watch channel keeps only the latest
    // population, so bursts of reload signals collapse into one rebuild
    let (population_tx, population_rx) = watch::channel(initial);

    // Spawn the rebuild loop; each published snapshot is rendered and its
    // digest written for the deployment waiter
    let renderers = build_renderers(&config);
    let output_dir = config.output_dir.clone();
    let loop_handle = tokio::spawn(run_rebuild_loop(
        Arc::clone(&engine),
        population_rx,
        move |snapshot| match write_outputs(snapshot, &renderers, &output_dir) {
            Ok(digests) => {
                for (name, digest) in digests {
                    info!("Published {} v{} (digest {})", name, snapshot.version, digest);
                }
            }
            Err(e) => warn!("Failed to write rendered outputs: {}", e),
        },
    ));

    info!(
        "Startup complete in {:.2}ms",
        start_time.elapsed().as_secs_f64() * 1000.0
    );

    // Reload the population on SIGHUP until SIGINT/SIGTERM
    let mut sighup = hangup_signal()?;
    loop {
        tokio::select! {
            _ = sighup.recv() => {
                info!("Received SIGHUP, reloading population snapshot");
                match load_population(&config.population_file) {
                    Ok(apps) => {
                        if population_tx.send(apps).is_err() {
                            warn!("Rebuild loop stopped unexpectedly");
                            break;
                        }
                    }
                    Err(e) => warn!("Population reload failed, keeping last state: {}", e),
                }
            }
            _ = signal::ctrl_c() => {
                info!("Received SIGINT, initiating shutdown...");
                break;
            }
            _ = wait_for_sigterm() => {
                info!("Received SIGTERM, initiating shutdown...");
                break;
            }
        }
    }

    // Graceful shutdown: dropping the sender ends the rebuild loop
    info!("Shutting down...");
    drop(population_tx);
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), loop_handle).await;

    let snapshot = engine.load();
    info!(
        "Final state: rebuild v{}, {} rules active, {} blocked, {} invalid",
        snapshot.version,
        snapshot.rules.len(),
        snapshot.blocked.len(),
        snapshot.invalid.len()
    );

    info!("Shutdown complete");
    Ok(())
}

/// SIGHUP stream for population reloads
#[cfg(unix)]
fn hangup_signal() -> Result<tokio::signal::unix::Signal> {
    use tokio::signal::unix::{signal, SignalKind};
    Ok(signal(SignalKind::hangup())?)
}

/// On non-Unix platforms there is no SIGHUP; reloads never fire
#[cfg(not(unix))]
fn hangup_signal() -> Result<NeverSignal> {
    Ok(NeverSignal)
}

#[cfg(not(unix))]
struct NeverSignal;

#[cfg(not(unix))]
impl NeverSignal {
    async fn recv(&mut self) -> Option<()> {
        std::future::pending().await
    }
}

/// Wait for SIGTERM signal
#[cfg(unix)]
async fn wait_for_sigterm() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler");
    sigterm.recv().await;
}

#[cfg(not(unix))]
async fn wait_for_sigterm() {
    // On non-Unix platforms, just wait forever
    std::future::pending::<()>().await
}
