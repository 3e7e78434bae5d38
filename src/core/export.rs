//! Writing papers to local Markdown files

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// File name suggested for a paper title
pub fn suggested_file_name(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    let stem = stem
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if stem.is_empty() {
        "paper.md".to_string()
    } else {
        format!("{}.md", stem.to_lowercase())
    }
}

/// Write `content` to `path`, adding a `.md` extension when there is none
pub fn export_markdown(path: &Path, content: &str) -> Result<PathBuf> {
    let path = if path.extension().is_none() {
        path.with_extension("md")
    } else {
        path.to_path_buf()
    };

    fs::write(&path, content)
        .with_context(|| format!("Failed to export paper: {}", path.display()))?;
    tracing::info!("Exported paper to: {}", path.display());
    Ok(path)
}
