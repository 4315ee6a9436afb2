use anyhow::{bail, Context, Result};
use askdoc_core::{Config, OpenAiProvider, Pipeline, Source};
use clap::{ArgGroup, Parser};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "askdoc")]
#[command(about = "Answer a question grounded in a single document", long_about = None)]
#[command(version)]
#[command(group(
    ArgGroup::new("input")
        .required(true)
        .args(["url", "pdf", "text_file", "text"]),
))]
struct Cli {
    /// URL of the web page to analyze
    #[arg(long)]
    url: Option<String>,

    /// Path to the PDF file to analyze
    #[arg(long)]
    pdf: Option<PathBuf>,

    /// Path to the text file to analyze
    #[arg(long)]
    text_file: Option<PathBuf>,

    /// Direct text content to analyze
    #[arg(long)]
    text: Option<String>,

    /// Question to answer based on the content
    #[arg(short, long)]
    question: String,

    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Chunk size override, in characters
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Chunk overlap override, in characters
    #[arg(long)]
    chunk_overlap: Option<usize>,

    /// Number of chunks to retrieve per question
    #[arg(long)]
    top_k: Option<usize>,

    /// Maximum number of sentences in the final answer
    #[arg(long)]
    max_answer_length: Option<usize>,
}

impl Cli {
    fn source(&self) -> Source {
        if let Some(url) = &self.url {
            Source::Url(url.clone())
        } else if let Some(path) = &self.pdf {
            Source::Pdf(path.clone())
        } else if let Some(path) = &self.text_file {
            Source::TextFile(path.clone())
        } else {
            // clap's input group guarantees one of the four is present
            Source::DirectText(self.text.clone().unwrap_or_default())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = if cli.config.exists() {
        Config::load(&cli.config).context("Failed to load config")?
    } else {
        Config::default()
    };
    config.apply_env();

    if let Some(chunk_size) = cli.chunk_size {
        config.pipeline.chunk_size = chunk_size;
    }
    if let Some(chunk_overlap) = cli.chunk_overlap {
        config.pipeline.chunk_overlap = chunk_overlap;
    }
    if let Some(top_k) = cli.top_k {
        config.pipeline.top_k = top_k;
    }

    config.validate().context("Invalid configuration")?;

    if config.llm.api_key.is_empty() {
        bail!(
            "API key is not set. Set ASKDOC_API_KEY, or llm.api_key in {}",
            cli.config.display()
        );
    }

    let provider = Arc::new(OpenAiProvider::new(
        &config.llm.base_url,
        &config.llm.api_key,
    ));
    let pipeline = Pipeline::new(config, provider).context("Failed to build pipeline")?;

    let answer = pipeline
        .run(cli.source(), &cli.question, cli.max_answer_length)
        .await?;

    println!();
    println!("{} {}", "Question:".bold(), cli.question);
    println!();
    println!("{}", "Answer:".bold().green());
    println!("{answer}");

    Ok(())
}
