//! Pull ordered text runs out of a rendered PDF.
//!
//! A "run" is one string drawn by a text-showing operator. Browsers split
//! words across runs freely (kerning, font switches), so callers should glue
//! runs together before searching them.

use crate::error::{Error, Result};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;

/// Per-page text of a document, 1-based.
pub trait PageText {
    fn page_count(&self) -> u32;
    fn page_runs(&self, page: u32) -> Result<Vec<String>>;
}

pub struct PdfText {
    doc: Document,
    pages: Vec<ObjectId>,
}

impl PdfText {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let doc = Document::load_mem(bytes)?;
        let pages = doc.get_pages().into_values().collect();
        Ok(Self { doc, pages })
    }

    fn page_id(&self, page: u32) -> Result<ObjectId> {
        page.checked_sub(1)
            .and_then(|i| self.pages.get(i as usize))
            .copied()
            .ok_or(Error::PageOutOfRange {
                page,
                count: self.page_count(),
            })
    }

    /// Fonts visible to a page, keyed by resource name. Resources may be
    /// inherited from the page tree.
    fn page_fonts(&self, page_id: ObjectId) -> HashMap<Vec<u8>, Font> {
        let mut fonts = HashMap::new();
        let mut node = self.doc.get_dictionary(page_id).ok();
        while let Some(dict) = node {
            if let Some(font_dict) = dict
                .get(b"Resources")
                .ok()
                .and_then(|r| resolve_dict(&self.doc, r))
                .and_then(|r| r.get(b"Font").ok())
                .and_then(|f| resolve_dict(&self.doc, f))
            {
                for (name, font) in font_dict.iter() {
                    if let Some(font) = resolve_dict(&self.doc, font) {
                        fonts
                            .entry(name.clone())
                            .or_insert_with(|| Font::load(&self.doc, font));
                    }
                }
                break;
            }
            node = dict
                .get(b"Parent")
                .and_then(Object::as_reference)
                .and_then(|id| self.doc.get_dictionary(id))
                .ok();
        }
        fonts
    }
}

impl PageText for PdfText {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_runs(&self, page: u32) -> Result<Vec<String>> {
        let page_id = self.page_id(page)?;
        let fonts = self.page_fonts(page_id);
        let content = Content::decode(&self.doc.get_page_content(page_id)?)?;

        let mut font: Option<&Font> = None;
        let mut runs = vec![];
        let mut push = |obj: &Object, font: Option<&Font>| {
            if let Some(text) = decode_run(obj, font)
                && !text.is_empty()
            {
                runs.push(text);
            }
        };

        for op in &content.operations {
            match op.operator.as_str() {
                "Tf" => {
                    font = op
                        .operands
                        .first()
                        .and_then(|o| o.as_name().ok())
                        .and_then(|name| fonts.get(name));
                }
                "Tj" | "'" | "\"" => {
                    if let Some(obj) = op.operands.last() {
                        push(obj, font);
                    }
                }
                "TJ" => {
                    if let Some(Ok(items)) = op.operands.first().map(Object::as_array) {
                        for item in items {
                            push(item, font);
                        }
                    }
                }
                _ => (),
            }
        }
        Ok(runs)
    }
}

/// The bits of a font needed to turn string bytes into text.
#[derive(Debug, Default)]
struct Font {
    to_unicode: HashMap<u16, String>,
    two_byte: bool,
}

impl Font {
    fn load(doc: &Document, dict: &Dictionary) -> Self {
        let two_byte = matches!(dict.get(b"Subtype").and_then(Object::as_name), Ok(b"Type0"));
        let to_unicode = dict
            .get(b"ToUnicode")
            .ok()
            .and_then(|obj| resolve(doc, obj))
            .and_then(|obj| obj.as_stream().ok())
            .and_then(|stream| stream.get_plain_content().ok())
            .map(|bytes| parse_to_unicode(&String::from_utf8_lossy(&bytes)))
            .unwrap_or_default();
        Self {
            to_unicode,
            two_byte,
        }
    }

    fn decode(&self, bytes: &[u8]) -> Option<String> {
        if self.to_unicode.is_empty() {
            return None;
        }
        let code_at = |chunk: &[u8]| match chunk {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [b] => *b as u16,
            _ => 0,
        };
        let size = if self.two_byte { 2 } else { 1 };
        Some(
            bytes
                .chunks(size)
                .map(|chunk| {
                    let code = code_at(chunk);
                    match self.to_unicode.get(&code) {
                        Some(s) => s.clone(),
                        None => char::from_u32(code as u32).map(String::from).unwrap_or_default(),
                    }
                })
                .collect(),
        )
    }
}

fn decode_run(obj: &Object, font: Option<&Font>) -> Option<String> {
    let bytes = obj.as_str().ok()?;
    if let Some(text) = font.and_then(|f| f.decode(bytes)) {
        return Some(text);
    }
    lopdf::decode_text_string(obj)
        .ok()
        .or_else(|| Some(String::from_utf8_lossy(bytes).into_owned()))
}

fn resolve<'a>(doc: &'a Document, mut obj: &'a Object) -> Option<&'a Object> {
    while let Object::Reference(id) = obj {
        obj = doc.get_object(*id).ok()?;
    }
    Some(obj)
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    resolve(doc, obj)?.as_dict().ok()
}

/// Read the `bfchar` and `bfrange` sections of a ToUnicode CMap.
fn parse_to_unicode(cmap: &str) -> HashMap<u16, String> {
    #[derive(PartialEq)]
    enum Section {
        None,
        Char,
        Range,
    }

    let mut map = HashMap::new();
    let mut section = Section::None;
    for line in cmap.lines().map(str::trim) {
        if line.ends_with("beginbfchar") {
            section = Section::Char;
            continue;
        } else if line.ends_with("beginbfrange") {
            section = Section::Range;
            continue;
        } else if line.starts_with("endbf") {
            section = Section::None;
            continue;
        }

        let tokens = hex_tokens(line);
        match section {
            Section::None => (),
            Section::Char => {
                if let [src, dst, ..] = tokens.as_slice()
                    && let Some(code) = char_code(src)
                {
                    map.insert(code, utf16(dst));
                }
            }
            Section::Range => {
                let [start, end, rest @ ..] = tokens.as_slice() else {
                    continue;
                };
                let (Some(start), Some(end)) = (char_code(start), char_code(end)) else {
                    continue;
                };
                if start > end || rest.is_empty() {
                    continue;
                }
                if line.contains('[') {
                    // One destination per code.
                    for (code, dst) in (start..=end).zip(rest) {
                        map.insert(code, utf16(dst));
                    }
                } else {
                    // Consecutive codes map to consecutive characters.
                    let mut units: Vec<u16> = rest[0]
                        .chunks(2)
                        .map(|c| u16::from_be_bytes([c[0], *c.get(1).unwrap_or(&0)]))
                        .collect();
                    for code in start..=end {
                        map.insert(code, String::from_utf16_lossy(&units));
                        if let Some(last) = units.last_mut() {
                            *last = last.wrapping_add(1);
                        }
                    }
                }
            }
        }
    }
    map
}

/// All `<...>` hex strings on a line, decoded to bytes.
fn hex_tokens(line: &str) -> Vec<Vec<u8>> {
    line.split('<')
        .skip(1)
        .filter_map(|rest| rest.split_once('>'))
        .filter_map(|(hex, _)| {
            let digits: Vec<u8> = hex
                .chars()
                .filter(|c| !c.is_whitespace())
                .map(|c| c.to_digit(16).map(|d| d as u8))
                .collect::<Option<_>>()?;
            Some(
                digits
                    .chunks(2)
                    .map(|pair| (pair[0] << 4) | pair.get(1).copied().unwrap_or(0))
                    .collect(),
            )
        })
        .collect()
}

fn char_code(bytes: &[u8]) -> Option<u16> {
    match bytes {
        [b] => Some(*b as u16),
        [hi, lo] => Some(u16::from_be_bytes([*hi, *lo])),
        _ => None,
    }
}

fn utf16(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks(2)
        .map(|c| u16::from_be_bytes([c[0], *c.get(1).unwrap_or(&0)]))
        .collect();
    String::from_utf16_lossy(&units)
}
