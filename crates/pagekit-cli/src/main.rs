//! PageKit CLI - fetch one page and print its extracted text and metadata

use clap::{Parser, ValueEnum};
use pagekit::{Document, FetchOptions};
use std::error::Error;
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

/// Page fetched when no URL is given
const DEFAULT_URL: &str = "https://example.com";

/// Characters of body text shown in the text report
const PREVIEW_CHARS: usize = 100;

/// Output format
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    /// Human-readable report with a text preview
    #[default]
    Text,
    /// Full document as JSON
    Json,
}

/// PageKit - fetch a web page and extract its text for indexing
#[derive(Parser, Debug)]
#[command(name = "pagekit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// URL to fetch
    #[arg(default_value = DEFAULT_URL)]
    url: String,

    /// Output format
    #[arg(long, short, default_value = "text")]
    output: OutputFormat,

    /// Custom User-Agent
    #[arg(long)]
    user_agent: Option<String>,

    /// Print the JSON Schema of the output document and exit
    #[arg(long)]
    schema: bool,
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if cli.schema {
        writeln_safe(&to_json(&Document::json_schema()));
        std::process::exit(0);
    }

    let options = FetchOptions {
        user_agent: cli.user_agent,
        ..Default::default()
    };

    match pagekit::fetch_with_options(&cli.url, &options).await {
        Ok(document) => match cli.output {
            OutputFormat::Text => writeln_safe(&format_report(&document)),
            OutputFormat::Json => writeln_safe(&to_json(&document)),
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {}", cause);
                source = cause.source();
            }
            std::process::exit(1);
        }
    }
}

/// Log to stderr so stdout only carries the report
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pagekit=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        eprintln!("Error serializing output: {}", e);
        std::process::exit(1);
    })
}

/// Format the document as a short report
fn format_report(document: &Document) -> String {
    let mut output = String::new();
    output.push_str(&format!("URL: {}\n", document.url));
    output.push_str(&format!("Title: {}\n", document.meta.title));
    if !document.meta.description.is_empty() {
        output.push_str(&format!("Description: {}\n", document.meta.description));
    }
    output.push_str(&format!("Status: {}\n", document.meta.status_code));
    output.push_str(&format!("Time: {}\n", document.meta.timestamp));
    output.push_str(&format!("Text: {}", document.text_preview(PREVIEW_CHARS)));
    output
}

/// Write to stdout, exit silently on broken pipe
fn writeln_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", s) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        eprintln!("Error writing to stdout: {}", e);
        std::process::exit(1);
    }
}
