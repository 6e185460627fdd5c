//! PDF Text Extractor — walks each page's content stream and collects the
//! payload of every text-showing operator.
//!
//! Output layout: each fragment is followed by a single space, each page by a
//! newline, and the whole string is trimmed. Order is content-stream order,
//! which is not necessarily visual reading order.
//!
//! String bytes are glyph codes, so they are decoded through the font selected
//! by the last `Tf`: its `/ToUnicode` CMap when present, else its `/Encoding`.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::panic;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Failed to load PDF: {0}")]
    Load(String),

    #[error("Failed to read content of page {page}: {message}")]
    PageContent { page: u32, message: String },
}

/// Extracts plain text from a PDF held in memory.
///
/// Returns `Ok("")` for a well-formed PDF with no text, and `Err` when the
/// bytes cannot be parsed as a PDF at all.
pub fn extract_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let doc = Document::load_mem(bytes).map_err(|e| ExtractionError::Load(e.to_string()))?;

    let mut text = String::new();

    // get_pages() is a BTreeMap keyed by 1-based page number: document order.
    for (page_num, page_id) in doc.get_pages() {
        let raw = doc
            .get_page_content(page_id)
            .map_err(|e| page_error(page_num, e))?;
        let content = Content::decode(&raw).map_err(|e| page_error(page_num, e))?;

        let fonts = page_fonts(&doc, doc.get_page_fonts(page_id));
        let mut current_font: Option<&FontDecoder> = None;

        for operation in &content.operations {
            if operation.operator == "Tf" {
                current_font = operation
                    .operands
                    .first()
                    .and_then(|name| name.as_name().ok())
                    .and_then(|name| fonts.get(name));
                continue;
            }
            if let Some(fragment) =
                fragment_payload(&operation.operator, &operation.operands, current_font)
            {
                text.push_str(&percent_decode(&fragment));
                text.push(' ');
            }
        }
        text.push('\n');
    }

    Ok(text.trim().to_string())
}

fn page_error(page: u32, e: lopdf::Error) -> ExtractionError {
    ExtractionError::PageContent {
        page,
        message: e.to_string(),
    }
}

fn page_fonts(
    doc: &Document,
    fonts: BTreeMap<Vec<u8>, &Dictionary>,
) -> HashMap<Vec<u8>, FontDecoder> {
    fonts
        .into_iter()
        .map(|(name, font)| {
            let decoder = FontDecoder::from_font(doc, &name, font);
            (name, decoder)
        })
        .collect()
}

/// How the string operands shown with one font map to text.
#[derive(Debug)]
struct FontDecoder {
    /// Name understood by `Document::decode_text`.
    encoding: String,
    /// Bytes per character code: 2 for composite (Type0) fonts, 1 otherwise.
    code_width: usize,
    to_unicode: Option<HashMap<u32, String>>,
}

impl FontDecoder {
    fn from_font(doc: &Document, name: &[u8], font: &Dictionary) -> Self {
        let composite = font.get(b"Subtype").and_then(Object::as_name_str).ok() == Some("Type0");
        let decoder = Self {
            encoding: font_encoding(doc, font),
            code_width: if composite { 2 } else { 1 },
            to_unicode: load_to_unicode(doc, name, font),
        };
        if composite && decoder.to_unicode.is_none() {
            warn!(
                "Font {} is composite without a ToUnicode map; its text is skipped",
                String::from_utf8_lossy(name)
            );
        }
        decoder
    }

    fn decode(&self, bytes: &[u8]) -> String {
        match &self.to_unicode {
            Some(map) => self.decode_mapped(map, bytes),
            // lopdf only decodes UCS-2 CMaps; Identity-H needs a ToUnicode map.
            None if self.code_width == 2 => match self.encoding.as_str() {
                "UniGB-UCS2-H" => Document::decode_text(Some(self.encoding.as_str()), bytes),
                _ => String::new(),
            },
            None => decode_utf16_with_bom(bytes)
                .unwrap_or_else(|| Document::decode_text(Some(self.encoding.as_str()), bytes)),
        }
    }

    fn decode_mapped(&self, map: &HashMap<u32, String>, bytes: &[u8]) -> String {
        let mut text = String::new();
        for code_bytes in bytes.chunks(self.code_width) {
            let code = code_bytes
                .iter()
                .fold(0u32, |code, &byte| (code << 8) | u32::from(byte));
            match map.get(&code) {
                Some(mapped) => text.push_str(mapped),
                // Simple fonts may map only some codes; the rest use the encoding.
                None if self.code_width == 1 => text.push_str(&Document::decode_text(
                    Some(self.encoding.as_str()),
                    code_bytes,
                )),
                None => {}
            }
        }
        text
    }
}

/// The `/Encoding` name, or the `/BaseEncoding` of an encoding dictionary.
/// `/Differences` arrays are not applied.
fn font_encoding(doc: &Document, font: &Dictionary) -> String {
    let base = font
        .get(b"Encoding")
        .and_then(|encoding| doc.dereference(encoding))
        .and_then(|(_, encoding)| match encoding {
            Object::Dictionary(dict) => dict.get(b"BaseEncoding").and_then(Object::as_name_str),
            other => other.as_name_str(),
        });
    base.unwrap_or("StandardEncoding").to_string()
}

fn load_to_unicode(
    doc: &Document,
    name: &[u8],
    font: &Dictionary,
) -> Option<HashMap<u32, String>> {
    let stream = font
        .get(b"ToUnicode")
        .and_then(|object| doc.dereference(object))
        .and_then(|(_, object)| object.as_stream())
        .ok()?;
    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    // The CMap parser panics on some malformed input instead of returning Err.
    match panic::catch_unwind(|| adobe_cmap_parser::get_unicode_map(&data)) {
        Ok(Ok(map)) => Some(
            map.into_iter()
                .map(|(code, utf16)| (code, decode_utf16be(&utf16)))
                .collect(),
        ),
        Ok(Err(e)) => {
            warn!("Ignoring ToUnicode map of font {}: {e}", String::from_utf8_lossy(name));
            None
        }
        Err(_) => {
            warn!("Ignoring malformed ToUnicode map of font {}", String::from_utf8_lossy(name));
            None
        }
    }
}

/// Returns the decoded string shown by a text operator, or `None` for any
/// other operator. Without a selected font, bytes are read as StandardEncoding.
fn fragment_payload(
    operator: &str,
    operands: &[Object],
    font: Option<&FontDecoder>,
) -> Option<String> {
    let decode = |object: &Object| string_operand(object, font);
    match operator {
        // (string) Tj   and   (string) '
        "Tj" | "'" => operands.first().and_then(decode),
        // aw ac (string) "
        "\"" => operands.get(2).and_then(decode),
        // [(str) kern (str) ...] TJ: one fragment, kerning numbers dropped
        "TJ" => match operands.first() {
            Some(Object::Array(items)) => {
                Some(items.iter().filter_map(decode).collect::<String>())
            }
            _ => None,
        },
        _ => None,
    }
}

fn string_operand(object: &Object, font: Option<&FontDecoder>) -> Option<String> {
    match object {
        Object::String(bytes, _) => Some(match font {
            Some(font) => font.decode(bytes),
            None => decode_utf16_with_bom(bytes)
                .unwrap_or_else(|| Document::decode_text(None, bytes)),
        }),
        _ => None,
    }
}

fn decode_utf16_with_bom(bytes: &[u8]) -> Option<String> {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => Some(decode_utf16be(rest)),
        _ => None,
    }
}

fn decode_utf16be(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Decodes URL escapes such as `%20`. A fragment whose escapes do not form
/// valid UTF-8 is kept verbatim.
fn percent_decode(fragment: &str) -> Cow<'_, str> {
    urlencoding::decode(fragment).unwrap_or(Cow::Borrowed(fragment))
}
