/// Highlighting an occurrence in the live document of a content script
use std::ops::Range;

use log::warn;
use wasm_bindgen::JsValue;
use web_sys::{Document, Node};

/// `NodeFilter.SHOW_TEXT`
const SHOW_TEXT: u32 = 0x4;

/// Node index and UTF-16 offset of a byte offset into the concatenated chunks
///
/// A start position at a node boundary lands at the beginning of the later
/// node; an end position lands at the end of the earlier one.
pub fn text_position(chunks: &[String], offset: usize, at_end: bool) -> Option<(usize, u32)> {
    let mut start = 0;
    for (i, chunk) in chunks.iter().enumerate() {
        let end = start + chunk.len();
        let inside = if at_end {
            offset > start && offset <= end
        } else {
            offset >= start && offset < end
        };
        if inside {
            let units = chunk.get(..offset - start)?.encode_utf16().count();
            return Some((i, units as u32));
        }
        start = end;
    }
    None
}

/// Select the byte range of the body text and scroll it into view
///
/// Offsets refer to the body's `textContent`, which is the text nodes
/// below it joined in document order.
pub fn highlight_match(range: Range<usize>) -> bool {
    match select_in_document(range) {
        Ok(selected) => selected,
        Err(e) => {
            warn!("Could not highlight match: {:?}", e);
            false
        }
    }
}

fn select_in_document(range: Range<usize>) -> Result<bool, JsValue> {
    let Some(window) = web_sys::window() else {
        return Ok(false);
    };
    let Some(document) = window.document() else {
        return Ok(false);
    };
    let (nodes, chunks) = text_nodes(&document)?;

    let Some((start_node, start_offset)) = text_position(&chunks, range.start, false) else {
        return Ok(false);
    };
    let end = if range.is_empty() {
        Some((start_node, start_offset))
    } else {
        text_position(&chunks, range.end, true)
    };
    let Some((end_node, end_offset)) = end else {
        return Ok(false);
    };

    let selected = document.create_range()?;
    selected.set_start(&nodes[start_node], start_offset)?;
    selected.set_end(&nodes[end_node], end_offset)?;

    if let Some(selection) = window.get_selection()? {
        selection.remove_all_ranges()?;
        selection.add_range(&selected)?;
    }
    if let Some(element) = nodes[start_node].parent_element() {
        element.scroll_into_view();
    }

    Ok(true)
}

fn text_nodes(document: &Document) -> Result<(Vec<Node>, Vec<String>), JsValue> {
    let mut nodes = Vec::new();
    let mut chunks = Vec::new();
    let Some(body) = document.body() else {
        return Ok((nodes, chunks));
    };

    let walker = document.create_tree_walker_with_what_to_show(&body, SHOW_TEXT)?;
    while let Some(node) = walker.next_node()? {
        chunks.push(node.text_content().unwrap_or_default());
        nodes.push(node);
    }

    Ok((nodes, chunks))
}
