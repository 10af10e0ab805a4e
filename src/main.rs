use clap::{ArgAction, CommandFactory, Parser};
use colored::Colorize;
use deploy_dir::config::{self, GzipMtime};
use deploy_dir::{Generated, generate_with_entries, output};
use dialoguer::Confirm;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn version_string() -> &'static str {
    let on_tag = env!("DEPLOY_DIR_ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("DEPLOY_DIR_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "deploy-dir")]
#[command(about = "Turn a directory of static files into a single edge worker script")]
#[command(long_about = "\
Read the files under the given directory and output the source code of a
Deno Deploy worker which serves the contents of that directory.

Every file is embedded in the worker as base64 data. Requests ending in '/'
are served index.html, and '/page' falls back to '/page.html'.")]
#[command(after_help = "\
Example:
  deploy-dir dist/ -o deploy.ts
      Reads the files under dist/ and writes deploy.ts, a worker which serves
      the contents of dist/.

  deploy-dir dist/ --gzip --cache /assets:max-age=86400 -o deploy.ts
      Same, with gzipped payloads and a cache-control header for /assets.")]
#[command(version = version_string(), disable_version_flag = true)]
struct Cli {
    /// Directory whose files are served
    dir: Option<PathBuf>,

    /// Root path the files are served under [default: /]
    #[arg(short, long, value_name = "PATH")]
    root: Option<String>,

    /// Write the source code to this file instead of stdout
    #[arg(short, long, value_name = "FILENAME")]
    output: Option<PathBuf>,

    /// Output plain JavaScript instead of TypeScript
    #[arg(long)]
    js: bool,

    /// Require basic authentication with these credentials
    #[arg(long, value_name = "USER:PASSWORD")]
    basic_auth: Option<String>,

    /// cache-control values per path prefix, e.g. /css:max-age=3600,/img:max-age=86400
    #[arg(long, value_name = "PREFIX:VALUE,...")]
    cache: Option<String>,

    /// Gzip the embedded files; clients that do not accept gzip get them decompressed
    #[arg(long)]
    gzip: bool,

    /// Timestamp for gzip headers, in seconds or "now" [default: 0]
    #[arg(long, value_name = "SECONDS|now")]
    gzip_mtime: Option<String>,

    /// Overwrite the output file without asking
    #[arg(short, long)]
    yes: bool,

    /// Read options from a TOML file; flags override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print a documented config file and exit
    #[arg(long)]
    gen_config: bool,

    /// Log progress to stderr
    #[arg(long)]
    verbose: bool,

    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    if cli.gen_config {
        print!("{}", config::stock_config_toml());
        return Ok(ExitCode::SUCCESS);
    }

    let Some(dir) = cli.dir.as_deref() else {
        eprintln!("{}", "Error: target directory is not given".red());
        Cli::command().print_help()?;
        return Ok(ExitCode::FAILURE);
    };

    let options = config::load_config(cli.config.as_deref(), cli_overrides(&cli)?)?;
    debug!(?options, "resolved options");

    let Generated { source, entries } = generate_with_entries(dir, &options.root, &options)?;

    let Some(output_path) = cli.output.as_deref() else {
        print!("{source}");
        return Ok(ExitCode::SUCCESS);
    };

    match std::fs::metadata(output_path) {
        Ok(meta) if meta.is_dir() => {
            eprintln!(
                "{}",
                format!("Error: the output path {} is a directory", output_path.display()).red()
            );
            return Ok(ExitCode::FAILURE);
        }
        Ok(_) => {
            if !cli.yes && !confirm_overwrite(output_path)? {
                println!("Aborting");
                return Ok(ExitCode::FAILURE);
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    println!("Writing the source code to '{}'", output_path.display());
    std::fs::write(output_path, &source)?;
    output::print_entries(&entries, options.compress);
    println!("Done");
    Ok(ExitCode::SUCCESS)
}

/// Flags given on the command line, as a TOML overlay for the config layers.
fn cli_overrides(cli: &Cli) -> Result<toml::Table, config::ConfigError> {
    let mut overrides = toml::Table::new();
    if let Some(root) = &cli.root {
        overrides.insert("root".into(), toml::Value::String(root.clone()));
    }
    if cli.js {
        overrides.insert("dialect".into(), toml::Value::String("javascript".into()));
    }
    if cli.gzip {
        overrides.insert("compress".into(), toml::Value::Boolean(true));
    }
    if let Some(mtime) = &cli.gzip_mtime {
        let mtime: GzipMtime = mtime.parse()?;
        overrides.insert("gzip_mtime".into(), mtime.to_toml());
    }
    if let Some(credentials) = &cli.basic_auth {
        overrides.insert("basic_auth".into(), toml::Value::String(credentials.clone()));
    }
    if let Some(cache) = &cli.cache {
        overrides.insert("cache".into(), config::parse_cache_option(cache)?.to_toml());
    }
    Ok(overrides)
}

fn confirm_overwrite(path: &Path) -> Result<bool, dialoguer::Error> {
    Confirm::new()
        .with_prompt(format!(
            "The output path {} already exists. Are you sure to write this file?",
            path.display()
        ))
        .default(false)
        .interact()
}

/// Diagnostics go to stderr so they never mix with source printed to stdout.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
