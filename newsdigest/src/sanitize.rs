use scraper::{Html, Node};

/// Elements whose text never reaches the output (image captions, code).
const SKIPPED_ELEMENTS: &[&str] = &["figure", "figcaption", "script", "style", "noscript", "template"];

/// Elements that separate words even without surrounding whitespace.
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "tr", "td", "th",
    "blockquote", "section", "article", "header", "footer", "table", "pre", "hr",
];

/// Reduce an HTML fragment to a single line of plain text.
///
/// Markup is dropped, entities are decoded, figure/script/style subtrees are
/// skipped entirely and runs of whitespace collapse to one space.
pub fn to_plain_text(html: &str) -> String {
    if !html.contains('<') && !html.contains('&') {
        return collapse_whitespace(html);
    }

    let fragment = Html::parse_fragment(html);
    let mut out = String::with_capacity(html.len());

    for node in fragment.tree.root().descendants() {
        match node.value() {
            Node::Text(text) => {
                let hidden = node.ancestors().any(|ancestor| {
                    matches!(ancestor.value(), Node::Element(el) if SKIPPED_ELEMENTS.contains(&el.name()))
                });
                if !hidden {
                    out.push_str(text);
                }
            }
            Node::Element(el) if BLOCK_ELEMENTS.contains(&el.name()) => out.push(' '),
            _ => {}
        }
    }

    collapse_whitespace(&out)
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markup_and_figures() {
        let html = "<p>Hi <b>there</b></p><figure><img src=\"x.jpg\">img caption</figure>";
        assert_eq!(to_plain_text(html), "Hi there");
    }

    #[test]
    fn block_elements_separate_words() {
        assert_eq!(to_plain_text("<p>First</p><p>Second</p>"), "First Second");
        assert_eq!(to_plain_text("<b>Dub</b>ai"), "Dubai");
    }

    #[test]
    fn decodes_entities_and_skips_scripts() {
        let html = "Emaar &amp; Meraas<script>track()</script> launch <i>Creek&nbsp;Views</i>";
        assert_eq!(to_plain_text(html), "Emaar & Meraas launch Creek Views");
    }

    #[test]
    fn plain_text_only_collapses_whitespace() {
        assert_eq!(to_plain_text("  new\n\tdevelopment  "), "new development");
        assert_eq!(to_plain_text(""), "");
    }
}
