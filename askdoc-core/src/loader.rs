//! Document loaders for the supported source kinds.
//!
//! A source is resolved exactly once, here, into uniform [`Document`]s; the
//! rest of the pipeline never inspects the source kind again. Four kinds are
//! supported: a web URL (HTML stripped to text), a PDF file, a plain text
//! file, and raw text passed directly.

use crate::pipeline::types::Document;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// Errors that can occur while loading a source.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to parse {origin}: {reason}")]
    Parse { origin: String, reason: String },
}

pub type Result<T> = std::result::Result<T, LoadError>;

/// One document source, resolved at load time.
#[derive(Debug, Clone)]
pub enum Source {
    /// A web page to fetch and strip to text.
    Url(String),
    /// A PDF file on disk.
    Pdf(PathBuf),
    /// A plain UTF-8 text file on disk.
    TextFile(PathBuf),
    /// Raw text supplied directly by the caller.
    DirectText(String),
}

impl Source {
    /// Human-readable origin, used for document metadata and error text.
    pub fn origin(&self) -> String {
        match self {
            Source::Url(url) => url.clone(),
            Source::Pdf(path) | Source::TextFile(path) => path.display().to_string(),
            Source::DirectText(_) => "direct_text".to_string(),
        }
    }
}

/// Loads a source into normalized documents.
///
/// Every produced document carries a `source` metadata entry identifying
/// its origin.
pub async fn load(source: &Source) -> Result<Vec<Document>> {
    let documents = match source {
        Source::Url(url) => load_url(url).await?,
        Source::Pdf(path) => load_pdf(path).await?,
        Source::TextFile(path) => load_text_file(path).await?,
        Source::DirectText(text) => {
            vec![Document::new(text.clone()).with_metadata("source", "direct_text")]
        }
    };

    info!(origin = %source.origin(), "loaded {} document(s)", documents.len());
    Ok(documents)
}

async fn load_url(url: &str) -> Result<Vec<Document>> {
    let response = reqwest::get(url).await.map_err(|source| LoadError::Network {
        url: url.to_string(),
        source,
    })?;

    if !response.status().is_success() {
        return Err(LoadError::Parse {
            origin: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let body = response.text().await.map_err(|source| LoadError::Network {
        url: url.to_string(),
        source,
    })?;

    let text = html_to_text(&body);
    Ok(vec![Document::new(text).with_metadata("source", url)])
}

async fn load_pdf(path: &PathBuf) -> Result<Vec<Document>> {
    if !path.exists() {
        return Err(LoadError::FileNotFound(path.clone()));
    }

    // pdf parsing is CPU-bound, keep it off the async workers
    let origin = path.display().to_string();
    let parse_path = path.clone();
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text(&parse_path))
        .await
        .map_err(|e| LoadError::Parse {
            origin: origin.clone(),
            reason: e.to_string(),
        })?
        .map_err(|e| LoadError::Parse {
            origin: origin.clone(),
            reason: e.to_string(),
        })?;

    Ok(vec![Document::new(text).with_metadata("source", origin)])
}

async fn load_text_file(path: &PathBuf) -> Result<Vec<Document>> {
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            LoadError::FileNotFound(path.clone())
        } else {
            LoadError::Parse {
                origin: path.display().to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    Ok(vec![
        Document::new(text).with_metadata("source", path.display().to_string())
    ])
}

/// Strips HTML markup down to readable text.
///
/// Drops `<script>` and `<style>` bodies, decodes the common entities, and
/// collapses runs of blank lines. Plain-text bodies pass through with only
/// whitespace normalization.
fn html_to_text(html: &str) -> String {
    let mut text = String::with_capacity(html.len() / 2);
    let mut in_tag = false;
    let mut building_tag = false;
    let mut tag_name = String::new();
    let mut in_script = false;
    let mut in_style = false;

    for ch in html.chars() {
        if ch == '<' {
            in_tag = true;
            building_tag = true;
            tag_name.clear();
            continue;
        }
        if ch == '>' {
            in_tag = false;
            building_tag = false;
            let name = tag_name.trim_start_matches('/').to_lowercase();
            match name.as_str() {
                "script" => in_script = !tag_name.starts_with('/'),
                "style" => in_style = !tag_name.starts_with('/'),
                // block-level tags become line breaks
                "p" | "br" | "div" | "li" | "tr" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                    text.push('\n')
                }
                _ => {}
            }
            continue;
        }
        if in_tag {
            if building_tag && (ch.is_alphanumeric() || ch == '/') {
                tag_name.push(ch);
            } else {
                building_tag = false;
            }
            continue;
        }
        if in_script || in_style {
            continue;
        }
        text.push(ch);
    }

    let text = text
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ");

    let mut lines: Vec<&str> = text.lines().map(str::trim).collect();
    lines.dedup_by(|a, b| a.is_empty() && b.is_empty());
    lines
        .into_iter()
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
