//! Reflow a document dump to markup.
//!
//! Reads a JSON document dump (per-page text content plus structure tree),
//! reconstructs the logical document and prints its markup. With
//! `--overlay PAGE` the page's overlay is printed as JSON instead.
//!
//! Usage:
//!   cargo run --release --bin reflow_json -- document.json
//!   cargo run --release --bin reflow_json -- document.json --overlay 0 --scale 1.5

use pdf_reflow::config::SessionConfig;
use pdf_reflow::geometry::Viewport;
use pdf_reflow::session::{DocumentSession, InMemorySource};
use std::path::PathBuf;

struct CliConfig {
    input: PathBuf,
    overlay_page: Option<u32>,
    page_height: f32,
    scale: f32,
}

impl CliConfig {
    fn from_args() -> Result<Self, String> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let mut input = None;
        let mut overlay_page = None;
        let mut page_height = 792.0;
        let mut scale = 1.0;

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--overlay" | "--page-height" | "--scale" => {
                    let value = args
                        .get(i + 1)
                        .ok_or_else(|| format!("{} needs a value", args[i]))?;
                    match args[i].as_str() {
                        "--overlay" => {
                            overlay_page = Some(value.parse().map_err(|_| format!("bad page '{}'", value))?)
                        },
                        "--page-height" => {
                            page_height = value.parse().map_err(|_| format!("bad height '{}'", value))?
                        },
                        _ => scale = value.parse().map_err(|_| format!("bad scale '{}'", value))?,
                    }
                    i += 2;
                },
                other if input.is_none() => {
                    input = Some(PathBuf::from(other));
                    i += 1;
                },
                other => return Err(format!("unexpected argument '{}'", other)),
            }
        }

        Ok(Self {
            input: input.ok_or("missing input file")?,
            overlay_page,
            page_height,
            scale,
        })
    }
}

async fn run(config: CliConfig) -> pdf_reflow::Result<()> {
    let json = std::fs::read_to_string(&config.input)
        .map_err(|e| pdf_reflow::Error::Source(format!("{}: {}", config.input.display(), e)))?;
    let source = InMemorySource::from_json(&json)?;
    let session = DocumentSession::new(source, SessionConfig::default());

    match config.overlay_page {
        Some(page) => {
            session
                .render(page, &Viewport::new(config.page_height, config.scale))
                .await?;
            if let Some(overlay) = session.overlay(page) {
                println!("{}", serde_json::to_string_pretty(&*overlay)?);
            }
        },
        None => {
            if let Some(markup) = session.extract_document().await? {
                println!("{}", markup);
            }
        },
    }
    Ok(())
}

fn main() {
    env_logger::init();

    let config = match CliConfig::from_args() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Usage: reflow_json <document.json> [--overlay PAGE] [--page-height H] [--scale S]");
            std::process::exit(2);
        },
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            std::process::exit(1);
        },
    };

    if let Err(e) = runtime.block_on(run(config)) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
