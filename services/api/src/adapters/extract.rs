//! services/api/src/adapters/extract.rs
//!
//! Implements the `DocumentExtractor` port for PDF, DOCX and plain-text uploads.
//! Parsing is CPU-bound, so it runs on the blocking thread pool.

use async_trait::async_trait;
use encoding_rs::WINDOWS_1252;
use lopdf::Document;
use testcase_core::domain::UploadedFile;
use testcase_core::ports::{DocumentExtractor, PortError, PortResult};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Pdf,
    Docx,
    Text,
}

impl DocumentKind {
    fn from_filename(filename: &str) -> Option<Self> {
        let (_, extension) = filename.rsplit_once('.')?;
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::Docx),
            "txt" | "text" | "md" => Some(DocumentKind::Text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FileExtractor;

#[async_trait]
impl DocumentExtractor for FileExtractor {
    async fn extract(&self, file: &UploadedFile) -> PortResult<String> {
        let kind = DocumentKind::from_filename(&file.filename).ok_or_else(|| {
            PortError::Unexpected(format!("Unsupported document type: {}", file.filename))
        })?;
        let bytes = file.bytes.clone();

        let text = tokio::task::spawn_blocking(move || match kind {
            DocumentKind::Pdf => extract_pdf(&bytes),
            DocumentKind::Docx => extract_docx(&bytes),
            DocumentKind::Text => Ok(decode_text(&bytes)),
        })
        .await
        .map_err(|e| PortError::Unexpected(format!("Extraction task failed: {}", e)))??;

        debug!(filename = %file.filename, chars = text.len(), "Extracted document text");
        Ok(text)
    }
}

//=========================================================================================
// Format-specific extraction
//=========================================================================================

fn extract_pdf(bytes: &[u8]) -> PortResult<String> {
    let document = Document::load_mem(bytes)
        .map_err(|e| PortError::Unexpected(format!("Failed to load PDF: {}", e)))?;

    let mut pages = Vec::new();
    for page_number in document.get_pages().keys() {
        // Pages without a text layer are skipped rather than failing the upload.
        if let Ok(page_text) = document.extract_text(&[*page_number]) {
            let trimmed = page_text.trim();
            if !trimmed.is_empty() {
                pages.push(trimmed.to_string());
            }
        }
    }
    Ok(pages.join("\n"))
}

fn extract_docx(bytes: &[u8]) -> PortResult<String> {
    let docx = docx_rs::read_docx(bytes)
        .map_err(|e| PortError::Unexpected(format!("Failed to parse DOCX: {}", e)))?;

    let mut lines = Vec::new();
    for child in &docx.document.children {
        match child {
            docx_rs::DocumentChild::Paragraph(paragraph) => {
                let text = paragraph_text(paragraph);
                if !text.trim().is_empty() {
                    lines.push(text);
                }
            }
            docx_rs::DocumentChild::Table(table) => table_lines(table, &mut lines),
            _ => {}
        }
    }
    Ok(lines.join("\n"))
}

fn paragraph_text(paragraph: &docx_rs::Paragraph) -> String {
    let mut buffer = String::new();
    for child in &paragraph.children {
        paragraph_child_text(child, &mut buffer);
    }
    buffer
}

fn paragraph_child_text(child: &docx_rs::ParagraphChild, buffer: &mut String) {
    match child {
        docx_rs::ParagraphChild::Run(run) => run_text(run, buffer),
        docx_rs::ParagraphChild::Hyperlink(link) => {
            for link_child in &link.children {
                paragraph_child_text(link_child, buffer);
            }
        }
        _ => {}
    }
}

fn run_text(run: &docx_rs::Run, buffer: &mut String) {
    for child in &run.children {
        match child {
            docx_rs::RunChild::Text(text) => buffer.push_str(&text.text),
            docx_rs::RunChild::Tab(_) => buffer.push('\t'),
            docx_rs::RunChild::Break(_) => buffer.push('\n'),
            _ => {}
        }
    }
}

/// One line per table row, cells joined with " | ".
fn table_lines(table: &docx_rs::Table, lines: &mut Vec<String>) {
    for row in &table.rows {
        let docx_rs::TableChild::TableRow(row) = row;
        let mut cells = Vec::new();
        for cell in &row.cells {
            let docx_rs::TableRowChild::TableCell(cell) = cell;
            let mut parts = Vec::new();
            for content in &cell.children {
                match content {
                    docx_rs::TableCellContent::Paragraph(paragraph) => {
                        let text = paragraph_text(paragraph);
                        if !text.trim().is_empty() {
                            parts.push(text);
                        }
                    }
                    docx_rs::TableCellContent::Table(nested) => {
                        let mut nested_lines = Vec::new();
                        table_lines(nested, &mut nested_lines);
                        if !nested_lines.is_empty() {
                            parts.push(nested_lines.join(" "));
                        }
                    }
                    _ => {}
                }
            }
            let text = parts.join(" ");
            if !text.trim().is_empty() {
                cells.push(text);
            }
        }
        if !cells.is_empty() {
            lines.push(cells.join(" | "));
        }
    }
}

/// UTF-8 first; anything else is read as Windows-1252, which never fails.
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (text, _, _) = WINDOWS_1252.decode(bytes);
            text.into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(filename: &str, bytes: &[u8]) -> UploadedFile {
        UploadedFile {
            filename: filename.to_string(),
            bytes: bytes.to_vec(),
        }
    }

    #[tokio::test]
    async fn plain_text_is_read_as_utf8() {
        let text = FileExtractor
            .extract(&upload("reqs.TXT", "Users can log in ✓".as_bytes()))
            .await
            .unwrap();
        assert_eq!(text, "Users can log in ✓");
    }

    #[tokio::test]
    async fn non_utf8_text_falls_back_to_latin1() {
        let text = FileExtractor
            .extract(&upload("reqs.txt", b"caf\xe9 menu"))
            .await
            .unwrap();
        assert_eq!(text, "café menu");
    }

    #[tokio::test]
    async fn unsupported_extensions_are_rejected() {
        for name in ["image.png", "no_extension"] {
            let result = FileExtractor.extract(&upload(name, b"data")).await;
            assert!(matches!(result, Err(PortError::Unexpected(_))), "{name}");
        }
    }

    #[tokio::test]
    async fn corrupt_documents_fail_to_extract() {
        assert!(FileExtractor
            .extract(&upload("spec.pdf", b"not a pdf"))
            .await
            .is_err());
        assert!(FileExtractor
            .extract(&upload("spec.docx", b"not a zip"))
            .await
            .is_err());
    }
}
