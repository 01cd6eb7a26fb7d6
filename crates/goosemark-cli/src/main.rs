//! goosemark CLI - render untrusted markdown to display-safe HTML.
//!
//! Reads markdown from a file or stdin and writes sanitized HTML to stdout or
//! to `--output`.

mod error;

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use goosemark_core::{DEFAULT_TABLE_CLASS, RenderOptions, Renderer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use error::CliError;

/// Largest accepted document, in bytes.
const DEFAULT_MAX_BYTES: usize = 512 * 1024;

/// Render markdown to sanitized HTML.
#[derive(Parser, Debug)]
#[command(name = "goosemark", version, about)]
struct Cli {
    /// Markdown file to render; reads stdin when omitted.
    input: Option<PathBuf>,

    /// Write HTML to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit code blocks as escaped text without highlighting.
    #[arg(long)]
    no_highlight: bool,

    /// Disable GFM tables and strikethrough.
    #[arg(long)]
    no_gfm: bool,

    /// Class added to every table.
    #[arg(long, value_name = "NAME", default_value = DEFAULT_TABLE_CLASS)]
    table_class: String,

    /// Leave tables without a class.
    #[arg(long, conflicts_with = "table_class")]
    no_table_class: bool,

    /// Reject input larger than this many bytes.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_BYTES)]
    max_bytes: usize,

    /// Enable info logging.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn render_options(&self) -> RenderOptions {
        RenderOptions {
            highlight: !self.no_highlight,
            gfm: !self.no_gfm,
            table_class: (!self.no_table_class).then(|| self.table_class.clone()),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // --verbose enables INFO level, otherwise use RUST_LOG
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run(&cli) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let source = read_source(cli.input.as_deref(), cli.max_bytes)?;
    let html = Renderer::new(cli.render_options()).render(&source);
    info!(input = source.len(), output = html.len(), "rendered document");

    match &cli.output {
        Some(path) => fs::write(path, &html).map_err(|source| CliError::Write {
            path: path.clone(),
            source,
        }),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(html.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
    }
}

fn read_source(input: Option<&Path>, limit: usize) -> Result<String, CliError> {
    let bytes = match input {
        Some(path) => {
            let file = File::open(path).map_err(|source| CliError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            read_capped(file, limit).map_err(|source| CliError::Read {
                path: path.to_path_buf(),
                source,
            })?
        }
        None => read_capped(io::stdin().lock(), limit)?,
    };
    if bytes.len() > limit {
        return Err(CliError::TooLarge { limit });
    }
    Ok(String::from_utf8(bytes)?)
}

/// Reads at most `limit + 1` bytes, enough to tell whether the input is over
/// the limit.
fn read_capped(reader: impl Read, limit: usize) -> io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    reader
        .take((limit as u64).saturating_add(1))
        .read_to_end(&mut bytes)?;
    Ok(bytes)
}
