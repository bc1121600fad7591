use std::path::Path;

use eyre::{Result, bail, eyre};
use log::{debug, warn};

/// Reads a resume into plain text. Plain-text and markdown files are read
/// directly, PDFs go through a blocking extraction pass on a worker thread.
pub async fn extract_text(path: &Path) -> Result<String> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default();

    let content = match extension.as_str() {
        "txt" | "md" => tokio::fs::read_to_string(path).await?,
        "pdf" => {
            let path = path.to_path_buf();
            tokio::task::spawn_blocking(move || pdf_extract::extract_text(&path))
                .await
                .map_err(|e| eyre!("pdf extraction task failed: {e}"))??
        }
        "docx" => bail!("docx resumes are not supported, export to pdf or plain text first"),
        other => bail!("unsupported resume format '.{other}'"),
    };

    if content.trim().is_empty() {
        warn!("resume at {} extracted to empty text", path.display());
    } else {
        debug!(
            "extracted {} characters of resume text from {}",
            content.len(),
            path.display()
        );
    }

    Ok(content)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[tokio::test]
    async fn reads_plain_text_resumes() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        writeln!(file, "Jane Doe\nSkills: Rust, Python").unwrap();

        let content = extract_text(file.path()).await.unwrap();
        assert!(content.contains("Jane Doe"));
    }

    #[tokio::test]
    async fn rejects_docx_resumes() {
        let file = tempfile::Builder::new().suffix(".docx").tempfile().unwrap();
        assert!(extract_text(file.path()).await.is_err());
    }

    #[tokio::test]
    async fn rejects_unknown_extensions() {
        let file = tempfile::Builder::new().suffix(".odt").tempfile().unwrap();
        assert!(extract_text(file.path()).await.is_err());
    }
}
