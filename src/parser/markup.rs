//! Serialized block markup → [`BlockNode`] forest.
//!
//! Blocks are delimited by HTML comments:
//!
//! ```text
//! <!-- wp:accordion {"accordionJsonLdEnabled":true} --> … <!-- /wp:accordion -->
//! <!-- wp:spacer {"height":"20px"} /-->
//! ```
//!
//! Names without a namespace belong to `core/`. HTML between top-level blocks
//! becomes a freeform node with an empty type name. Inside a block, HTML goes
//! to `raw_markup` and `raw_fragments`, and every inner block leaves an empty
//! placeholder fragment where it sat.
//!
//! Parsing never fails, and malformed documents come out the way the host
//! parser leaves them:
//!
//! - unreadable attributes become an empty map;
//! - a closer with no open block turns the rest of the document, closer
//!   included, into one freeform node;
//! - blocks still open at the end are emitted at the top level, innermost
//!   first, each holding the HTML after its last collected offset;
//! - delimiters nested deeper than `max_depth` stay as HTML of the deepest
//!   open block.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use super::blocks::BlockNode;
use super::extract::DEFAULT_MAX_DEPTH;

static DELIMITER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)<!--\s+(?P<closer>/)?wp:(?P<namespace>[a-z][a-z0-9_-]*/)?(?P<name>[a-z][a-z0-9_-]*)\s+(?P<attrs>\{.*?\}\s+)?(?P<void>/)?-->",
    )
    .unwrap()
});

const DEFAULT_NAMESPACE: &str = "core/";

struct Frame {
    node: BlockNode,
    // first byte of the document not yet collected into `node`
    resume: usize,
}

pub fn parse_blocks(document: &str) -> Vec<BlockNode> {
    parse_blocks_with_depth(document, DEFAULT_MAX_DEPTH)
}

/// Like [`parse_blocks`], nesting blocks at most `max_depth` levels below the
/// top of the forest.
pub fn parse_blocks_with_depth(document: &str, max_depth: usize) -> Vec<BlockNode> {
    let mut output = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut offset = 0;
    // openers past `max_depth` whose closers are still to come
    let mut flattened = 0usize;

    for caps in DELIMITER_RE.captures_iter(document) {
        let Some(token) = caps.get(0) else { continue };
        let is_closer = caps.name("closer").is_some();
        let is_void = caps.name("void").is_some();

        // Offset stays put, so these delimiters reach the open block as HTML.
        if is_closer && flattened > 0 {
            flattened -= 1;
            continue;
        }
        if !is_closer && stack.len() > max_depth {
            if flattened == 0 {
                debug!(max_depth, "block nesting too deep, kept as HTML");
            }
            if !is_void {
                flattened += 1;
            }
            continue;
        }

        let name = format!(
            "{}{}",
            caps.name("namespace").map_or(DEFAULT_NAMESPACE, |m| m.as_str()),
            &caps["name"]
        );

        if is_closer && stack.is_empty() {
            debug!(block = %name, "stray block closer, rest of document is freeform");
            output.push(freeform(&document[offset..]));
            return output;
        }

        push_html(&document[offset..token.start()], token.start(), &mut stack, &mut output);
        offset = token.end();

        if is_closer {
            if let Some(frame) = stack.pop() {
                if frame.node.type_name != name {
                    debug!(open = %frame.node.type_name, close = %name, "mismatched block closer");
                }
                attach(frame.node, offset, &mut stack, &mut output);
            }
            continue;
        }

        let mut node = BlockNode::new(name).with_markup("");
        node.attributes = parse_attrs(caps.name("attrs").map(|m| m.as_str()));

        if is_void {
            attach(node, offset, &mut stack, &mut output);
        } else {
            stack.push(Frame { node, resume: offset });
        }
    }

    if stack.is_empty() {
        push_html(&document[offset..], document.len(), &mut stack, &mut output);
        return output;
    }

    while let Some(mut frame) = stack.pop() {
        debug!(block = %frame.node.type_name, "unclosed block moved to top level");
        append_html(&mut frame.node, &document[frame.resume..]);
        output.push(frame.node);
    }

    output
}

fn parse_attrs(raw: Option<&str>) -> Map<String, Value> {
    let Some(raw) = raw else {
        return Map::new();
    };
    match serde_json::from_str::<Map<String, Value>>(raw.trim()) {
        Ok(attrs) => attrs,
        Err(e) => {
            debug!(error = %e, "unreadable block attributes dropped");
            Map::new()
        }
    }
}

fn freeform(html: &str) -> BlockNode {
    BlockNode::new("").with_markup(html).with_fragments([html])
}

fn append_html(node: &mut BlockNode, html: &str) {
    if html.is_empty() {
        return;
    }
    node.raw_markup.get_or_insert_with(String::new).push_str(html);
    node.raw_fragments.push(html.to_string());
}

fn attach(node: BlockNode, end: usize, stack: &mut [Frame], output: &mut Vec<BlockNode>) {
    match stack.last_mut() {
        Some(parent) => {
            parent.node.raw_fragments.push(String::new());
            parent.node.children.push(node);
            parent.resume = end;
        }
        None => output.push(node),
    }
}

fn push_html(html: &str, end: usize, stack: &mut [Frame], output: &mut Vec<BlockNode>) {
    if html.is_empty() {
        return;
    }
    match stack.last_mut() {
        Some(parent) => {
            append_html(&mut parent.node, html);
            parent.resume = end;
        }
        None => output.push(freeform(html)),
    }
}
