use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::blocks::BlockNode;
use super::extract::DEFAULT_MAX_DEPTH;

// Decorative markup (toggle icons etc.) through its first closing tag.
static ARIA_HIDDEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<[^>]*aria-hidden=(?:"true"|'true')[^>]*>.*?</[^>]+>"#).unwrap()
});
static SCRIPT_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script[^>]*?>.*?</script>|<style[^>]*?>.*?</style>").unwrap()
});
// Quoted attribute values may hold `>`; an unterminated quote runs to the end.
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<!--.*?-->|<[^\s>](?:"[^"]*(?:"|\z)|'[^']*(?:'|\z)|[^'">])*(?:>|\z)"#).unwrap()
});
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\n\r\x0B\x0C]+").unwrap());

/// Plain text of a block: its children's text when it has children, else its
/// own markup or fragments, with decorative elements, tags and redundant
/// whitespace removed. Blocks nested more than [`DEFAULT_MAX_DEPTH`] levels
/// below `node` contribute nothing.
pub fn extract_text_from_block(node: &BlockNode) -> String {
    text_at_depth(node, 0)
}

fn text_at_depth(node: &BlockNode, depth: usize) -> String {
    let raw = if !node.children.is_empty() {
        if depth >= DEFAULT_MAX_DEPTH {
            debug!(block = %node.type_name, depth, "block text nested too deep, skipped");
            return String::new();
        }
        node.children
            .iter()
            .map(|child| format!(" {}", text_at_depth(child, depth + 1)))
            .collect::<String>()
    } else if let Some(markup) = &node.raw_markup {
        markup.clone()
    } else if !node.raw_fragments.is_empty() {
        node.raw_fragments.join(" ")
    } else {
        String::new()
    };

    sanitize(&raw)
}

/// Markup → single-spaced, trimmed text. Entities are left as they are.
pub fn sanitize(markup: &str) -> String {
    let text = ARIA_HIDDEN_RE.replace_all(markup, " ");
    let text = strip_all_tags(&text);
    trim_ws(&WS_RE.replace_all(&text, " ")).to_string()
}

fn strip_all_tags(markup: &str) -> String {
    let text = SCRIPT_STYLE_RE.replace_all(markup, "");
    TAG_RE.replace_all(&text, "").into_owned()
}

/// Trims the ASCII whitespace set (plus NUL) only; non-breaking spaces survive.
pub fn trim_ws(s: &str) -> &str {
    s.trim_matches(|c| matches!(c, ' ' | '\t' | '\n' | '\r' | '\0' | '\x0B'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decorative_icon_removed() {
        assert_eq!(
            sanitize(r#"<span aria-hidden="true">▾</span>Question text"#),
            "Question text"
        );
    }

    #[test]
    fn decorative_single_quotes_and_case() {
        assert_eq!(
            sanitize("<SPAN class='icon' ARIA-HIDDEN='TRUE'>+</SPAN> Answer"),
            "Answer"
        );
    }

    #[test]
    fn mismatched_quotes_are_not_decorative() {
        // only the tags go, the icon text stays
        assert_eq!(sanitize(r#"<span aria-hidden="true' x='y">+</span>Q"#), "+Q");
    }

    #[test]
    fn quoted_greater_than_stays_inside_tag() {
        assert_eq!(sanitize(r#"<button title="a > b">Why?</button>"#), "Why?");
        assert_eq!(sanitize("<a data-x='1>0' href=\"/\">Link</a> text"), "Link text");
    }

    #[test]
    fn unterminated_quote_swallows_rest() {
        assert_eq!(sanitize(r#"Before <span title="open>After"#), "Before");
    }

    #[test]
    fn aria_hidden_false_kept() {
        assert_eq!(sanitize(r#"<span aria-hidden="false">Shown</span> text"#), "Shown text");
    }

    #[test]
    fn decorative_removal_is_non_greedy() {
        let html = r#"<h3><button><span>Why?</span><span aria-hidden="true"><svg><path/></svg></span></button></h3>"#;
        // first closing tag after the hidden span ends the match
        assert_eq!(sanitize(html), "Why?");
    }

    #[test]
    fn tags_stripped_and_entities_untouched() {
        assert_eq!(sanitize("<p>Fish &amp; <strong>chips</strong></p>"), "Fish &amp; chips");
    }

    #[test]
    fn script_and_style_content_dropped() {
        assert_eq!(
            sanitize("<style>.a{}</style><p>Body</p><script>alert(1)</script>"),
            "Body"
        );
    }

    #[test]
    fn comments_dropped() {
        assert_eq!(sanitize("<!-- note --><p>Text</p>"), "Text");
    }

    #[test]
    fn lone_less_than_kept() {
        assert_eq!(sanitize("<p>1 < 2</p>"), "1 < 2");
    }

    #[test]
    fn whitespace_collapsed() {
        assert_eq!(sanitize("\n\t<p>  many \t\t spaces\n\nand lines </p>\r\n"), "many spaces and lines");
    }

    #[test]
    fn non_breaking_space_not_trimmed() {
        assert_eq!(sanitize("<p>\u{a0}x</p>"), "\u{a0}x");
    }

    #[test]
    fn children_take_precedence() {
        let node = BlockNode::new("core/accordion-panel")
            .with_markup("<div>ignored</div>")
            .with_children(vec![
                BlockNode::new("core/paragraph").with_markup("<p>First.</p>"),
                BlockNode::new("core/paragraph").with_markup("<p>Second.</p>"),
            ]);
        assert_eq!(extract_text_from_block(&node), "First. Second.");
    }

    #[test]
    fn nested_children() {
        let node = BlockNode::new("core/group").with_children(vec![
            BlockNode::new("core/list").with_children(vec![
                BlockNode::new("core/list-item").with_markup("<li>one</li>"),
                BlockNode::new("core/list-item").with_markup("<li>two</li>"),
            ]),
            BlockNode::new("core/paragraph").with_markup("<p>three</p>"),
        ]);
        assert_eq!(extract_text_from_block(&node), "one two three");
    }

    #[test]
    fn fragments_used_without_markup() {
        let node = BlockNode::new("core/accordion-header").with_fragments(["<h3>", "Title", "</h3>"]);
        assert_eq!(extract_text_from_block(&node), "Title");
    }

    #[test]
    fn empty_markup_wins_over_fragments() {
        let node = BlockNode::new("x/y").with_markup("").with_fragments(["ignored"]);
        assert_eq!(extract_text_from_block(&node), "");
    }

    #[test]
    fn text_depth_is_bounded() {
        let mut node = BlockNode::new("core/paragraph").with_markup("<p>bottom</p>");
        for _ in 0..DEFAULT_MAX_DEPTH {
            node = BlockNode::new("core/group").with_children(vec![node]);
        }
        assert_eq!(extract_text_from_block(&node), "bottom");

        node = BlockNode::new("core/group").with_children(vec![node]);
        assert_eq!(extract_text_from_block(&node), "");
    }

    #[test]
    fn very_deep_tree_text_and_drop() {
        let mut node = BlockNode::new("core/paragraph").with_markup("<p>bottom</p>");
        for _ in 0..100_000 {
            node = BlockNode::new("core/group").with_children(vec![node]);
        }
        let panel = BlockNode::new("core/accordion-panel")
            .with_children(vec![BlockNode::new("core/paragraph").with_markup("<p>top</p>"), node]);
        assert_eq!(extract_text_from_block(&panel), "top");
        drop(panel);
    }

    #[test]
    fn nothing_to_extract() {
        assert_eq!(extract_text_from_block(&BlockNode::new("core/accordion-panel")), "");
    }
}
