//! Text extraction for ingested files
//!
//! PDFs are read page by page with lopdf; text and markdown files are read
//! as-is. Pages are separated by a blank line so the chunker sees them as
//! separate paragraphs.

use crate::errors::IngestError;
use std::path::Path;
use tracing::{debug, warn};

/// Supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Text,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Result<Self, IngestError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Ok(FileKind::Pdf),
            "txt" | "md" | "markdown" => Ok(FileKind::Text),
            _ => Err(IngestError::UnsupportedFile(path.display().to_string())),
        }
    }
}

/// Read the text of a supported file
pub fn extract_text(path: &Path) -> Result<String, IngestError> {
    let text = match FileKind::from_path(path)? {
        FileKind::Pdf => extract_text_from_pdf(path)?,
        FileKind::Text => std::fs::read_to_string(path)?,
    };

    if text.trim().is_empty() {
        return Err(IngestError::EmptyDocument(path.display().to_string()));
    }

    Ok(text)
}

/// Extract text content from a PDF file
pub fn extract_text_from_pdf(path: &Path) -> Result<String, IngestError> {
    let doc = lopdf::Document::load(path).map_err(|e| IngestError::PdfParse {
        path: path.display().to_string(),
        message: format!("Failed to load PDF: {}", e),
    })?;

    let pages = doc.get_pages();
    debug!(page_count = pages.len(), "Extracting text from PDF");

    let mut page_texts = Vec::with_capacity(pages.len());
    for page_number in pages.keys() {
        match doc.extract_text(&[*page_number]) {
            Ok(text) => page_texts.push(clean_page(&text)),
            Err(e) => {
                warn!(page = page_number, error = %e, "Failed to extract text from page, skipping");
            }
        }
    }

    let text = page_texts
        .into_iter()
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    if text.is_empty() {
        return Err(IngestError::PdfParse {
            path: path.display().to_string(),
            message: "No text content extracted from PDF".to_string(),
        });
    }

    Ok(text)
}

/// Collapse runs of whitespace inside each line and drop empty lines
fn clean_page(text: &str) -> String {
    text.lines()
        .map(|line| {
            line.replace('\u{FEFF}', "")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_clean_page() {
        let input = "\u{FEFF}Jane   Doe\n\n   Staff\tEngineer  \n";
        assert_eq!(clean_page(input), "Jane Doe\nStaff Engineer");
    }

    #[test]
    fn test_file_kind() {
        assert_eq!(FileKind::from_path(Path::new("cv.PDF")).unwrap(), FileKind::Pdf);
        assert_eq!(FileKind::from_path(Path::new("notes.md")).unwrap(), FileKind::Text);
        assert!(matches!(
            FileKind::from_path(Path::new("photo.png")),
            Err(IngestError::UnsupportedFile(_))
        ));
        assert!(FileKind::from_path(Path::new("README")).is_err());
    }

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("{}-{}", uuid::Uuid::new_v4(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_extract_text_file() {
        let path = temp_file("about.md", "# About\n\nI build things.\n");
        assert_eq!(extract_text(&path).unwrap(), "# About\n\nI build things.\n");
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_blank_text_file_rejected() {
        let path = temp_file("blank.txt", " \n\n ");
        assert!(matches!(extract_text(&path), Err(IngestError::EmptyDocument(_))));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_invalid_pdf() {
        let path = temp_file("broken.pdf", "not a pdf");
        assert!(matches!(extract_text(&path), Err(IngestError::PdfParse { .. })));
        std::fs::remove_file(path).ok();
    }
}
