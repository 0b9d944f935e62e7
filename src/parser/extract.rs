use serde::Serialize;
use tracing::{debug, warn};

use super::blocks::{
    is_container, is_enabled_for_block, is_header, is_panel, is_qa_group, BlockNode,
};
use super::text::{extract_text_from_block, trim_ws};

pub const DEFAULT_MAX_DEPTH: usize = 128;

/// One question/answer pair. Both sides are trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QaItem {
    pub question: String,
    pub answer: String,
}

/// All question/answer pairs of a block forest, in document order.
pub fn extract_qa_items(blocks: &[BlockNode]) -> Vec<QaItem> {
    extract_qa_items_with_depth(blocks, DEFAULT_MAX_DEPTH)
}

/// Like [`extract_qa_items`], ignoring anything nested deeper than `max_depth`
/// levels below the top of the forest.
pub fn extract_qa_items_with_depth(blocks: &[BlockNode], max_depth: usize) -> Vec<QaItem> {
    let mut items = Vec::new();
    walk(blocks, 0, max_depth, &mut items);
    items
}

fn walk(blocks: &[BlockNode], depth: usize, max_depth: usize, items: &mut Vec<QaItem>) {
    for block in blocks {
        let name = block.type_name.as_str();

        // The opt-in gate only covers this block's own qa-group check; its
        // subtree is still walked below.
        let gated = is_container(name) && !is_enabled_for_block(block);
        if gated {
            debug!(block = name, depth, "container without JSON-LD opt-in");
        }

        if !gated && is_qa_group(name) {
            match extract_qa_from_group(block) {
                Some(qa) => items.push(qa),
                None => debug!(block = name, depth, "incomplete accordion item skipped"),
            }
        }

        if block.children.is_empty() {
            continue;
        }
        if depth + 1 > max_depth {
            warn!(block = name, depth, max_depth, "block nesting too deep, subtree skipped");
            continue;
        }
        walk(&block.children, depth + 1, max_depth, items);
    }
}

/// First header child → question, first panel child → answer.
pub fn extract_qa_from_group(block: &BlockNode) -> Option<QaItem> {
    if block.children.is_empty() {
        return None;
    }

    let mut question = String::new();
    let mut answer = String::new();

    for inner in &block.children {
        let name = inner.type_name.as_str();
        if question.is_empty() && is_header(name) {
            question = extract_text_from_block(inner);
            continue;
        }
        if answer.is_empty() && is_panel(name) {
            answer = extract_text_from_block(inner);
        }
    }

    let question = trim_ws(&question);
    let answer = trim_ws(&answer);
    if question.is_empty() || answer.is_empty() {
        return None;
    }

    Some(QaItem {
        question: question.to_string(),
        answer: answer.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::blocks::ENABLED_ATTRIBUTE;
    use serde_json::json;

    fn header(html: &str) -> BlockNode {
        BlockNode::new("core/accordion-header").with_markup(html)
    }

    fn panel(html: &str) -> BlockNode {
        BlockNode::new("core/accordion-panel").with_markup(html)
    }

    fn item(q: &str, a: &str) -> BlockNode {
        BlockNode::new("core/accordion-item").with_children(vec![header(q), panel(a)])
    }

    fn accordion(enabled: Option<serde_json::Value>, items: Vec<BlockNode>) -> BlockNode {
        let block = BlockNode::new("core/accordion").with_children(items);
        match enabled {
            Some(v) => block.with_attr(ENABLED_ATTRIBUTE, v),
            None => block,
        }
    }

    fn questions(items: &[QaItem]) -> Vec<&str> {
        items.iter().map(|i| i.question.as_str()).collect()
    }

    #[test]
    fn end_to_end_single_item() {
        let forest = vec![accordion(
            Some(json!(true)),
            vec![item("<p>What is X?</p>", "<p>X is Y.</p>")],
        )];
        assert_eq!(
            extract_qa_items(&forest),
            vec![QaItem {
                question: "What is X?".into(),
                answer: "X is Y.".into()
            }]
        );
    }

    #[test]
    fn document_order_across_depths() {
        let forest = vec![
            item("Q1", "A1"),
            BlockNode::new("core/group").with_children(vec![
                item("Q2", "A2"),
                BlockNode::new("core/column").with_children(vec![item("Q3", "A3")]),
            ]),
            accordion(Some(json!(true)), vec![item("Q4", "A4"), item("Q5", "A5")]),
        ];
        assert_eq!(questions(&extract_qa_items(&forest)), vec!["Q1", "Q2", "Q3", "Q4", "Q5"]);
    }

    #[test]
    fn disabled_container_descendants_still_scanned() {
        // the gate covers the container's own check only
        let forest = vec![
            accordion(None, vec![item("Q1", "A1")]),
            accordion(Some(json!(false)), vec![item("Q2", "A2")]),
        ];
        assert_eq!(questions(&extract_qa_items(&forest)), vec!["Q1", "Q2"]);
    }

    #[test]
    fn gate_suppresses_container_that_is_also_a_qa_group() {
        let both = |enabled: Option<serde_json::Value>| {
            let b = BlockNode::new("acme/accordion-item/accordion")
                .with_children(vec![header("Outer?"), panel("Outer."), item("Inner?", "Inner.")]);
            match enabled {
                Some(v) => b.with_attr(ENABLED_ATTRIBUTE, v),
                None => b,
            }
        };
        assert!(is_container("acme/accordion-item/accordion"));
        assert!(is_qa_group("acme/accordion-item/accordion"));

        assert_eq!(questions(&extract_qa_items(&[both(None)])), vec!["Inner?"]);
        assert_eq!(
            questions(&extract_qa_items(&[both(Some(json!("yes")))])),
            vec!["Outer?", "Inner?"]
        );
    }

    #[test]
    fn loose_truthy_flags_enable() {
        for v in [json!(true), json!(1), json!("yes"), serde_json::Value::Null] {
            let b = BlockNode::new("acme/accordion-item/accordion")
                .with_attr(ENABLED_ATTRIBUTE, v.clone())
                .with_children(vec![header("Q"), panel("A")]);
            assert_eq!(extract_qa_items(&[b]).len(), 1, "flag {v}");
        }
    }

    #[test]
    fn header_without_panel_dropped() {
        let forest = vec![
            BlockNode::new("core/accordion-item").with_children(vec![header("Q only")]),
            BlockNode::new("core/accordion-item").with_children(vec![panel("A only")]),
        ];
        assert!(extract_qa_items(&forest).is_empty());
    }

    #[test]
    fn blank_side_dropped() {
        let forest = vec![
            item("<p>  </p>", "<p>Answer</p>"),
            item(r#"<span aria-hidden="true">+</span>"#, "Answer"),
        ];
        assert!(extract_qa_items(&forest).is_empty());
    }

    #[test]
    fn first_header_wins() {
        let group = BlockNode::new("core/accordion-item").with_children(vec![
            header("First?"),
            header("Second?"),
            panel("Only."),
            panel("Ignored."),
        ]);
        assert_eq!(
            extract_qa_from_group(&group),
            Some(QaItem {
                question: "First?".into(),
                answer: "Only.".into()
            })
        );
    }

    #[test]
    fn panel_before_header() {
        let group = BlockNode::new("core/accordion-content").with_children(vec![
            BlockNode::new("core/paragraph").with_markup("<p>noise</p>"),
            panel("A"),
            header("Q"),
        ]);
        let qa = extract_qa_from_group(&group).unwrap();
        assert_eq!((qa.question.as_str(), qa.answer.as_str()), ("Q", "A"));
    }

    #[test]
    fn empty_first_header_does_not_lock_question() {
        // an empty first header leaves the question open for the next one
        let group = BlockNode::new("core/accordion-item").with_children(vec![
            header("<h3></h3>"),
            header("<h3>Real?</h3>"),
            panel("Yes."),
        ]);
        assert_eq!(extract_qa_from_group(&group).unwrap().question, "Real?");
    }

    #[test]
    fn group_without_children() {
        assert_eq!(extract_qa_from_group(&BlockNode::new("core/accordion-item")), None);
    }

    #[test]
    fn panel_text_from_nested_blocks() {
        let group = BlockNode::new("core/accordion-item").with_children(vec![
            BlockNode::new("core/accordion-heading")
                .with_markup("<h3><button>How?<span aria-hidden=\"true\">▾</span></button></h3>"),
            BlockNode::new("core/accordion-panel").with_children(vec![
                BlockNode::new("core/paragraph").with_markup("<p>Step one.</p>"),
                BlockNode::new("core/paragraph").with_markup("<p>Step\ntwo.</p>"),
            ]),
        ]);
        let qa = extract_qa_from_group(&group).unwrap();
        assert_eq!(qa.question, "How?");
        assert_eq!(qa.answer, "Step one. Step two.");
    }

    #[test]
    fn depth_limit_skips_deep_subtrees() {
        let mut deep = item("Deep?", "Yes.");
        for _ in 0..5 {
            deep = BlockNode::new("core/group").with_children(vec![deep]);
        }
        let forest = vec![item("Top?", "Yes."), deep];
        assert_eq!(questions(&extract_qa_items_with_depth(&forest, 3)), vec!["Top?"]);
        assert_eq!(questions(&extract_qa_items_with_depth(&forest, 5)), vec!["Top?", "Deep?"]);
    }

    #[test]
    fn input_untouched() {
        let forest = vec![accordion(Some(json!(true)), vec![item("Q", "A")])];
        let before = forest.clone();
        let _ = extract_qa_items(&forest);
        assert_eq!(forest, before);
    }
}
