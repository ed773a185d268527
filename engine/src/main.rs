//! Sheetconf CLI - keep spreadsheet config tables in sync with a schema
//!
//! # Main Commands
//!
//! ```bash
//! sheetconf --schema game.json sync      # Create or migrate table sheets
//! sheetconf --schema game.json export    # Export sheets as JSON
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! sheetconf --schema game.json headers Item   # Show the column layout of a bean
//! ```
//!
//! Settings come from `--config <file.json>`, then `SHEETCONF_*` environment
//! variables (a `.env` file is loaded first), then `--set key=value`.

use clap::{Parser, Subcommand};
use sheetconf::logs::{log_error, log_info, set_verbose};
use sheetconf::{
    build_headers, export_package, sync_package, Config, CsvStore, Package, PlaceholderRenderer,
    SchemaError,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sheetconf")]
#[command(about = "Sync spreadsheet config tables with a schema and export them as JSON", long_about = None)]
struct Cli {
    /// Schema package (JSON)
    #[arg(short, long, global = true, default_value = "schema.json")]
    schema: PathBuf,

    /// Config file (flat JSON object)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override a setting, e.g. --set outdir=build
    #[arg(long = "set", value_name = "KEY=VALUE", global = true)]
    set: Vec<String>,

    /// Print debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Sheet column delimiter
    #[arg(short, long, global = true, default_value_t = ',')]
    delimiter: char,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create missing sheets and migrate headers of existing ones
    Sync,

    /// Export table sheets as JSON
    Export,

    /// Print the header layout of a bean as JSON
    Headers {
        /// Bean name
        bean: String,
    },
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        log_error(format!("Error: {}", e));
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::new(),
    };
    config.merge_process_env();
    for pair in &cli.set {
        config.set_pair(pair)?;
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&cli)?;
    set_verbose(cli.verbose || config.verbose());

    let delimiter = u8::try_from(cli.delimiter)
        .map_err(|_| format!("delimiter {:?} is not a single byte", cli.delimiter))?;
    let store = CsvStore::with_delimiter(delimiter);

    log_info(format!("Loading schema: {}", cli.schema.display()));
    let pkg = Package::load(&cli.schema)?;

    match cli.command {
        Commands::Sync => {
            sync_package(&pkg, &config, &store)?;
        }
        Commands::Export => {
            export_package(&pkg, &config, &store, &PlaceholderRenderer)?;
        }
        Commands::Headers { bean } => cmd_headers(&pkg, &bean, &cli.schema)?,
    }
    Ok(())
}

fn cmd_headers(pkg: &Package, bean: &str, schema: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let target = pkg
        .find_bean(bean)
        .ok_or_else(|| SchemaError::BeanNotFound(format!("{} in {}", bean, schema.display())))?;
    let headers = build_headers(pkg, target, "", "", "")?;
    println!("{}", serde_json::to_string_pretty(&headers)?);
    Ok(())
}
