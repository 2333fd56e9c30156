//! Template intake
//!
//! A template is an opaque document blob plus the list of field identifiers
//! it exposes for filling. For DOCX templates the fields are discovered from
//! `{{ placeholder }}` tokens in the body text; anything else falls back to
//! [`DEFAULT_FIELDS`].

use std::io::{Cursor, Read, Seek};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use lazy_static::lazy_static;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TemplateError;

/// Fields assumed when the template gives no placeholders of its own
pub const DEFAULT_FIELDS: &[&str] = &[
    "client_name",
    "client_email",
    "contract_date",
    "company_name",
    "contract_value",
    "start_date",
    "end_date",
];

lazy_static! {
    static ref PLACEHOLDER: Regex =
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.]*)\s*\}\}").unwrap();
}

/// Where a template's field list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    /// Placeholders found in the template body
    Extracted,
    /// Template was not scannable or had no placeholders
    Default,
}

/// An uploaded template. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    bytes: Vec<u8>,
    fields: Vec<String>,
    source: FieldSource,
}

impl Template {
    /// Build a template from raw file bytes and discover its fields
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, TemplateError> {
        if bytes.is_empty() {
            return Err(TemplateError::Empty);
        }

        let name = name.into();
        let (fields, source) = match extract_docx_placeholders(&bytes) {
            Some(found) if !found.is_empty() => (found, FieldSource::Extracted),
            _ => (
                DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect(),
                FieldSource::Default,
            ),
        };

        debug!(template = %name, ?source, fields = fields.len(), "Template loaded");

        Ok(Self {
            name,
            bytes,
            fields,
            source,
        })
    }

    /// Build a template from a base64 string as sent by web clients
    pub fn from_base64(name: impl Into<String>, data: &str) -> Result<Self, TemplateError> {
        let bytes = BASE64
            .decode(data.trim())
            .map_err(|e| TemplateError::InvalidEncoding(e.to_string()))?;
        Self::from_bytes(name, bytes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn field_source(&self) -> FieldSource {
        self.source
    }

    /// Base64 form expected by the document-generation service
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }
}

/// Scan a DOCX for `{{ name }}` placeholders.
///
/// Returns `None` when the blob is not a readable DOCX. Placeholders are
/// returned in order of first appearance without duplicates.
pub fn extract_docx_placeholders(bytes: &[u8]) -> Option<Vec<String>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).ok()?;
    let paragraphs = read_paragraphs(&mut archive).ok()?;

    let mut fields: Vec<String> = Vec::new();
    for paragraph in &paragraphs {
        for cap in PLACEHOLDER.captures_iter(paragraph) {
            let name = cap[1].to_string();
            if !fields.contains(&name) {
                fields.push(name);
            }
        }
    }
    Some(fields)
}

/// Paragraph texts of `word/document.xml`. Word splits a paragraph into
/// several `w:t` runs, so placeholders only become visible once the runs of
/// a paragraph are joined.
fn read_paragraphs<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
) -> Result<Vec<String>, String> {
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| e.to_string())?
        .read_to_string(&mut xml)
        .map_err(|e| e.to_string())?;

    let mut reader = Reader::from_str(&xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text = true;
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text {
                    current.push_str(&e.decode().map_err(|e| e.to_string())?);
                }
            }
            // `&amp;`, `&#38;` and friends arrive as their own events
            Ok(Event::GeneralRef(e)) => {
                if in_text {
                    match e.resolve_char_ref().map_err(|e| e.to_string())? {
                        Some(ch) => current.push(ch),
                        None => {
                            let name = e.decode().map_err(|e| e.to_string())?;
                            if let Some(text) = resolve_predefined_entity(&name) {
                                current.push_str(text);
                            }
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("XML parsing error: {}", e)),
            _ => {}
        }
    }

    if !current.is_empty() {
        paragraphs.push(current);
    }
    Ok(paragraphs)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    pub(crate) fn docx_with_body(body: &str) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("word/document.xml", SimpleFileOptions::default())
            .unwrap();
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        );
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_extracts_placeholders_in_order() {
        let docx = docx_with_body(
            "<w:p><w:r><w:t>Agreement with {{client_name}}</w:t></w:r></w:p>\
             <w:p><w:r><w:t>Starts {{ start_date }}, again {{client_name}}</w:t></w:r></w:p>",
        );
        let template = Template::from_bytes("nda.docx", docx).unwrap();

        assert_eq!(template.field_source(), FieldSource::Extracted);
        assert_eq!(template.fields(), &["client_name", "start_date"]);
    }

    #[test]
    fn test_placeholder_split_across_runs() {
        let docx = docx_with_body(
            "<w:p><w:r><w:t>Value: {{contract</w:t></w:r><w:r><w:t>_value}}</w:t></w:r></w:p>",
        );
        let fields = extract_docx_placeholders(&docx).unwrap();
        assert_eq!(fields, vec!["contract_value".to_string()]);
    }

    #[test]
    fn test_entities_resolved_inside_placeholder_paragraph() {
        let docx = docx_with_body(
            "<w:p><w:r><w:t>Smith &amp; Sons &#8212; {{client_name}} &lt;{{client_email}}&gt;</w:t></w:r></w:p>",
        );
        let paragraphs = {
            let mut archive = zip::ZipArchive::new(Cursor::new(docx.as_slice())).unwrap();
            read_paragraphs(&mut archive).unwrap()
        };
        assert_eq!(
            paragraphs,
            vec!["Smith & Sons \u{2014} {{client_name}} <{{client_email}}>".to_string()]
        );

        let fields = extract_docx_placeholders(&docx).unwrap();
        assert_eq!(fields, vec!["client_name".to_string(), "client_email".to_string()]);
    }

    #[test]
    fn test_non_docx_falls_back_to_default_fields() {
        let template = Template::from_bytes("contract.pdf", b"%PDF-1.7 not a zip".to_vec()).unwrap();

        assert_eq!(template.field_source(), FieldSource::Default);
        assert_eq!(template.fields().len(), DEFAULT_FIELDS.len());
        assert_eq!(template.fields()[0], "client_name");
    }

    #[test]
    fn test_docx_without_placeholders_falls_back() {
        let docx = docx_with_body("<w:p><w:r><w:t>No fields here</w:t></w:r></w:p>");
        let template = Template::from_bytes("plain.docx", docx).unwrap();
        assert_eq!(template.field_source(), FieldSource::Default);
    }

    #[test]
    fn test_empty_template_rejected() {
        assert!(matches!(
            Template::from_bytes("empty.docx", Vec::new()),
            Err(TemplateError::Empty)
        ));
    }

    #[test]
    fn test_base64_roundtrip_of_blob() {
        let template = Template::from_base64("t.docx", "aGVsbG8=").unwrap();
        assert_eq!(template.bytes(), b"hello");
        assert_eq!(template.to_base64(), "aGVsbG8=");
    }

    #[test]
    fn test_invalid_base64_rejected() {
        assert!(matches!(
            Template::from_base64("t.docx", "not base64!!"),
            Err(TemplateError::InvalidEncoding(_))
        ));
    }
}
