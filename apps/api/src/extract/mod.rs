//! Document text extraction for the three supported resume formats.
//! Consumed once per harvested attachment and by the direct-upload endpoint.

use std::io::Read;

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Uploaded file is empty.")]
    Empty,

    #[error("Unsupported file type. Use .txt, .pdf, or .docx")]
    Unsupported,

    #[error("No readable text found in uploaded file.")]
    NoText,

    #[error("Could not read {kind} content: {cause}")]
    Unreadable { kind: &'static str, cause: String },
}

/// Extracts plain text from a resume document. Format selection is by
/// filename extension first, declared content type second.
pub fn extract_text_from_bytes(
    raw: &[u8],
    filename: &str,
    content_type: Option<&str>,
) -> Result<String, ExtractError> {
    if raw.is_empty() {
        return Err(ExtractError::Empty);
    }

    let filename = filename.to_lowercase();
    let content_type = content_type.unwrap_or_default().to_lowercase();

    let text = if filename.ends_with(".txt") || content_type == "text/plain" {
        String::from_utf8_lossy(raw).into_owned()
    } else if filename.ends_with(".pdf") || content_type == "application/pdf" {
        extract_pdf_text(raw)?
    } else if filename.ends_with(".docx") || content_type == DOCX_MIME {
        extract_docx_text(raw)?
    } else {
        return Err(ExtractError::Unsupported);
    };

    let normalized = text.trim();
    if normalized.is_empty() {
        return Err(ExtractError::NoText);
    }
    Ok(normalized.to_string())
}

fn extract_pdf_text(raw: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(raw).map_err(|err| ExtractError::Unreadable {
        kind: "pdf",
        cause: err.to_string(),
    })
}

/// A docx file is a zip container; the document body lives in
/// `word/document.xml`. Paragraph boundaries become newlines, all other
/// markup is stripped.
fn extract_docx_text(raw: &[u8]) -> Result<String, ExtractError> {
    let unreadable = |cause: String| ExtractError::Unreadable { kind: "docx", cause };

    let cursor = std::io::Cursor::new(raw);
    let mut archive = zip::ZipArchive::new(cursor).map_err(|err| unreadable(err.to_string()))?;
    let mut document = archive
        .by_name("word/document.xml")
        .map_err(|err| unreadable(err.to_string()))?;

    let mut xml = String::new();
    document
        .read_to_string(&mut xml)
        .map_err(|err| unreadable(err.to_string()))?;

    let with_breaks = xml.replace("</w:p>", "\n");
    let stripped = tag_pattern().replace_all(&with_breaks, "");
    let decoded = decode_xml_entities(&stripped);

    let lines: Vec<&str> = decoded
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    Ok(lines.join("\n"))
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("<[^>]+>").expect("valid tag pattern"))
}

fn decode_xml_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_bytes(document_xml: &str) -> Vec<u8> {
        let mut buffer = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            let options = zip::write::FileOptions::default();
            writer.start_file("word/document.xml", options).unwrap();
            writer.write_all(document_xml.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        buffer.into_inner()
    }

    #[test]
    fn test_txt_extraction_by_extension() {
        let text = extract_text_from_bytes(b"  plain resume text  ", "resume.txt", None).unwrap();
        assert_eq!(text, "plain resume text");
    }

    #[test]
    fn test_txt_extraction_by_content_type() {
        let text =
            extract_text_from_bytes(b"resume body", "blob", Some("text/plain")).unwrap();
        assert_eq!(text, "resume body");
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(
            extract_text_from_bytes(b"", "resume.txt", None),
            Err(ExtractError::Empty)
        ));
    }

    #[test]
    fn test_unsupported_type_rejected() {
        assert!(matches!(
            extract_text_from_bytes(b"x", "resume.rtf", Some("application/rtf")),
            Err(ExtractError::Unsupported)
        ));
    }

    #[test]
    fn test_whitespace_only_text_rejected() {
        assert!(matches!(
            extract_text_from_bytes(b"   \n\t  ", "resume.txt", None),
            Err(ExtractError::NoText)
        ));
    }

    #[test]
    fn test_docx_paragraphs_become_lines() {
        let raw = docx_bytes(
            "<w:document><w:body>\
             <w:p><w:r><w:t>Jane Doe</w:t></w:r></w:p>\
             <w:p><w:r><w:t>Rust &amp; distributed systems</w:t></w:r></w:p>\
             </w:body></w:document>",
        );
        let text = extract_text_from_bytes(&raw, "resume.docx", None).unwrap();
        assert_eq!(text, "Jane Doe\nRust & distributed systems");
    }

    #[test]
    fn test_docx_without_document_xml_is_unreadable() {
        let mut buffer = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            let options = zip::write::FileOptions::default();
            writer.start_file("other.xml", options).unwrap();
            writer.write_all(b"<x/>").unwrap();
            writer.finish().unwrap();
        }
        let raw = buffer.into_inner();
        assert!(matches!(
            extract_text_from_bytes(&raw, "resume.docx", None),
            Err(ExtractError::Unreadable { kind: "docx", .. })
        ));
    }
}
