//! DOM reduction helpers: tag skeletons and visible text
//!
//! Both walks use an explicit stack so deeply nested or malformed documents
//! cannot exhaust the call stack.

use scraper::{ElementRef, Html, Node};

/// Elements whose subtree carries no layout structure or visible text
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "meta", "link", "noscript", "template", "head",
];

enum Step<'a> {
    Enter(ElementRef<'a>, usize),
    Leave(&'a str),
}

/// Reduces a document's body to tag open/close names in document order
///
/// Attributes, text and comments are dropped, skipped elements are omitted
/// with their subtree and elements nested deeper than `max_depth` are ignored.
/// Returns `None` when the document has no usable body structure.
pub fn dom_skeleton(html: &str, max_depth: usize) -> Option<String> {
    let document = Html::parse_document(html);
    let body = document
        .root_element()
        .children()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "body")?;

    let mut skeleton = String::new();
    let mut elements = 0usize;
    let mut stack = vec![Step::Enter(body, 0)];

    while let Some(step) = stack.pop() {
        match step {
            Step::Leave(name) => {
                skeleton.push_str("</");
                skeleton.push_str(name);
                skeleton.push('>');
            }
            Step::Enter(element, depth) => {
                let name = element.value().name();
                if depth > max_depth || SKIPPED_TAGS.contains(&name) {
                    continue;
                }
                elements += 1;
                skeleton.push('<');
                skeleton.push_str(name);
                skeleton.push('>');
                stack.push(Step::Leave(name));
                let children: Vec<ElementRef<'_>> =
                    element.children().filter_map(ElementRef::wrap).collect();
                for child in children.into_iter().rev() {
                    stack.push(Step::Enter(child, depth + 1));
                }
            }
        }
    }

    // Only the body itself: nothing structural to compare
    if elements <= 1 {
        return None;
    }
    Some(skeleton)
}

/// Collects the document's visible text, space separated
///
/// Pieces are gathered per element rather than in strict document order,
/// which is all a bag-of-words fingerprint needs.
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut text = String::new();
    let mut stack = vec![document.root_element()];

    while let Some(element) = stack.pop() {
        if SKIPPED_TAGS.contains(&element.value().name()) {
            continue;
        }
        for child in element.children() {
            match child.value() {
                Node::Text(piece) => {
                    let piece = piece.trim();
                    if !piece.is_empty() {
                        text.push_str(piece);
                        text.push(' ');
                    }
                }
                Node::Element(_) => {
                    if let Some(el) = ElementRef::wrap(child) {
                        stack.push(el);
                    }
                }
                _ => {}
            }
        }
    }
    text
}
