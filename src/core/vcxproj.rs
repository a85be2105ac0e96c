//! Locating `ClCompile` items inside a Visual C++ project definition.
//!
//! Items are reported with the byte span they occupy in the original text so
//! that a removal can splice the file without re-serializing it.

use std::ops::Range;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

const ITEM_GROUP: &[u8] = b"ItemGroup";
const CL_COMPILE: &[u8] = b"ClCompile";
const INCLUDE: &[u8] = b"Include";
const BOM: char = '\u{FEFF}';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileItem {
    /// The unescaped `Include` attribute.
    pub include: String,
    /// Bytes from `<ClCompile` up to and including the closing `>`.
    pub span: Range<usize>,
}

struct OpenItem {
    include: String,
    start: usize,
    depth: usize,
}

/// Every `ClCompile` with an `Include` attribute that sits in an `ItemGroup`
/// directly below the root element, in document order.
pub fn compile_items(source: &str) -> Result<Vec<CompileItem>, quick_xml::Error> {
    // The reader skips a byte order mark without counting it, so positions
    // are taken against the text after it and shifted back at the end.
    let (offset, source) = match source.strip_prefix(BOM) {
        Some(rest) => (BOM.len_utf8(), rest),
        None => (0, source),
    };
    let mut reader = Reader::from_str(source);
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut open: Option<OpenItem> = None;
    let mut items = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if open.is_none()
                    && is_compile_item(&e, &stack)
                    && let Some(include) = include_of(&e)?
                {
                    let start = tag_start(source, reader.buffer_position(), &e);
                    open = Some(OpenItem {
                        include,
                        start,
                        depth: stack.len(),
                    });
                }
                stack.push(e.local_name().as_ref().to_vec());
            }
            Event::Empty(e) => {
                if open.is_none()
                    && is_compile_item(&e, &stack)
                    && let Some(include) = include_of(&e)?
                {
                    let end = reader.buffer_position();
                    items.push(CompileItem {
                        include,
                        span: tag_start(source, end, &e)..end,
                    });
                }
            }
            Event::End(_) => {
                stack.pop();
                if let Some(item) = open.take_if(|item| item.depth == stack.len()) {
                    items.push(CompileItem {
                        include: item.include,
                        span: item.start..reader.buffer_position(),
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    for item in &mut items {
        item.span = item.span.start + offset..item.span.end + offset;
    }
    Ok(items)
}

fn is_compile_item(e: &BytesStart<'_>, stack: &[Vec<u8>]) -> bool {
    e.local_name().as_ref() == CL_COMPILE && stack.len() == 2 && stack[1] == ITEM_GROUP
}

fn include_of(e: &BytesStart<'_>) -> Result<Option<String>, quick_xml::Error> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == INCLUDE {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

// The reader only reports where a tag ends, so walk back to its `<`.
fn tag_start(source: &str, end: usize, e: &BytesStart<'_>) -> usize {
    let needle = format!("<{}", String::from_utf8_lossy(e.name().as_ref()));
    source[..end].rfind(&needle).unwrap_or(end)
}

/// Removes `span` from `source`. When the element is alone on its line(s) the
/// whole line goes, so the file keeps its layout.
pub fn remove_span(source: &str, span: Range<usize>) -> String {
    let line_start = source[..span.start].rfind('\n').map_or(0, |i| i + 1);
    let line_end = source[span.end..]
        .find('\n')
        .map_or(source.len(), |i| span.end + i + 1);

    let leading_blank = source[line_start..span.start].trim().is_empty();
    let trailing_blank = source[span.end..line_end].trim().is_empty();

    let range = if leading_blank && trailing_blank {
        line_start..line_end
    } else {
        span
    };

    let mut out = String::with_capacity(source.len());
    out.push_str(&source[..range.start]);
    out.push_str(&source[range.end..]);
    out
}
