//! HTML → visible text. Used for filter scoring and for scraped job pages.

use scraper::{ElementRef, Html, Node, Selector};

/// Elements whose text a reader never sees.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "head", "template"];

/// Elements that start a new line of visible text.
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "br", "tr", "td", "th",
    "table", "section", "article", "header", "footer", "blockquote", "pre",
];

/// Strips markup and returns the text a reader would see, one block per line.
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    element_text(document.root_element())
        .lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Returns the visible text of every `<li>` element, in document order.
pub fn list_items(html: &str) -> Vec<String> {
    let fragment = Html::parse_fragment(html);
    let Ok(selector) = Selector::parse("li") else {
        return Vec::new();
    };
    fragment
        .select(&selector)
        .map(|li| collapse_whitespace(&element_text(li)))
        .filter(|item| !item.is_empty())
        .collect()
}

/// Concatenated text nodes under `root`, skipping hidden subtrees, with a line
/// break before every block element. Entities are already decoded by the parser.
fn element_text(root: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in root.descendants() {
        match node.value() {
            Node::Element(el) if BLOCK_ELEMENTS.contains(&el.name()) => out.push('\n'),
            Node::Text(text) => {
                let hidden = node.ancestors().any(|a| {
                    matches!(a.value(), Node::Element(el) if HIDDEN_ELEMENTS.contains(&el.name()))
                });
                if !hidden {
                    out.push_str(text);
                }
            }
            _ => {}
        }
    }
    out
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
