use std::{error::Error, fs, process, sync::Arc};

use clap::{Parser, ValueHint};
use log::{debug, error, info, LevelFilter};
use url::Url;

use tonearm::{
    catalog::Album,
    classify::classify,
    config::Config,
    playlist,
    resolver::Resolver,
};

/// Profile to display when not built in release mode.
#[cfg(debug_assertions)]
const BUILD_PROFILE: &str = "debug";
/// Profile to display when built in release mode.
#[cfg(not(debug_assertions))]
const BUILD_PROFILE: &str = "release";

/// Group name for mutually exclusive logging options.
const ARGS_GROUP_LOGGING: &str = "logging";

/// Command line arguments as parsed by `clap`.
#[derive(Clone, Debug, Default, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Media URL to inspect
    ///
    /// Prints the delivery kind and the ordered fallback candidate chain the
    /// engine would attempt for this URL.
    #[arg(value_hint = ValueHint::Url)]
    url: Option<String>,

    /// Application origin
    ///
    /// Same-origin URLs play directly; relay candidates are constructed
    /// against this origin.
    #[arg(short, long, value_hint = ValueHint::Url, default_value_t = String::from("http://localhost:8080"))]
    origin: String,

    /// Catalog file
    ///
    /// JSON array of albums, as supplied by the ingestion pipeline.
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    catalog: Option<String>,

    /// Print a shuffled play order over the catalog
    #[arg(long, requires = "catalog", default_value_t = false)]
    shuffle: bool,

    /// Suppresses all output except warnings and errors.
    #[arg(short, long, default_value_t = false, group = ARGS_GROUP_LOGGING)]
    quiet: bool,

    /// Enable verbose logging
    ///
    /// Specify twice for trace logging.
    #[arg(short, long, action = clap::ArgAction::Count, group = ARGS_GROUP_LOGGING)]
    verbose: u8,
}

/// Initializes the logger facade.
///
/// The logging level is determined as follows, in order of precedence from
/// highest to lowest:
/// 1. Command line arguments
/// 2. `RUST_LOG` environment variable
/// 3. Hard coded default
fn init_logger(config: &Args) {
    let mut logger = env_logger::Builder::from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    if config.quiet || config.verbose > 0 {
        let level = match config.verbose {
            0 => {
                // Quiet and verbose are mutually exclusive, and `verbose` is
                // 0 by default. So this arm means: quiet mode.
                LevelFilter::Warn
            }
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        // Filter log messages of external crates.
        logger.filter_module(module_path!(), level);
    }

    logger.init();
}

/// Loads a catalog of albums from a JSON file.
fn load_catalog(path: &str) -> Result<Vec<Arc<Album>>, Box<dyn Error>> {
    let contents = fs::read_to_string(path)?;
    let albums: Vec<Album> = serde_json::from_str(&contents)?;
    Ok(albums.into_iter().map(Arc::new).collect())
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let origin = Url::parse(&args.origin)?;
    let config = Config::with_origin(origin);

    if let Some(url) = &args.url {
        let kind = classify(url);
        println!("{url}");
        println!("  kind: {kind:?}");

        let resolver = Resolver::new(&config);
        for (position, candidate) in resolver.resolve(url).iter().enumerate() {
            println!("  {}: {candidate}", position + 1);
        }
    }

    if let Some(path) = &args.catalog {
        let catalog = load_catalog(path)?;
        let track_count: usize = catalog.iter().map(|album| album.tracks.len()).sum();
        println!("catalog: {} album(s), {track_count} track(s)", catalog.len());

        if args.shuffle {
            for (position, entry) in playlist::build_shuffle(&catalog).iter().enumerate() {
                if let Some(track) = entry.track() {
                    println!("  {}: {} {}", position + 1, entry.album, track);
                }
            }
        }
    }

    Ok(())
}

fn main() {
    // `clap` handles our command line arguments and help text.
    let args = Args::parse();
    init_logger(&args);

    debug!("Command {args:#?}");
    info!(
        "starting {}/{}; {BUILD_PROFILE}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    if let Err(e) = run(&args) {
        error!("{e}");
        process::exit(1);
    }
}
