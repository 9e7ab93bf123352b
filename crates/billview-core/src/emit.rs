use crate::tree::{NodeId, NodeKind, Tree};
use ammonia::Builder;
use std::collections::{HashMap, HashSet};

const VOID_TAGS: [&str; 5] = ["br", "hr", "img", "input", "meta"];
const BLOCK_TAGS: [&str; 20] = [
    "article",
    "aside",
    "body",
    "details",
    "div",
    "figcaption",
    "figure",
    "h1",
    "h2",
    "h3",
    "h4",
    "header",
    "li",
    "main",
    "nav",
    "ol",
    "p",
    "section",
    "summary",
    "ul",
];

/// Serializes `node` without any whitespace between elements, so a browser
/// parsing the result sees exactly the tree's text nodes.
pub fn emit_html(tree: &Tree, node: NodeId) -> String {
    let mut writer = HtmlWriter::new(false);
    emit_node(&mut writer, tree, node);
    writer.finish()
}

/// Serializes the children of `node` only.
pub fn emit_inner_html(tree: &Tree, node: NodeId) -> String {
    let mut writer = HtmlWriter::new(false);
    for child in tree.children(node) {
        emit_node(&mut writer, tree, *child);
    }
    writer.finish()
}

/// Indented output for reading. Elements that hold text stay on one line,
/// so no text node gains whitespace.
pub fn emit_html_pretty(tree: &Tree, node: NodeId) -> String {
    let mut writer = HtmlWriter::new(true);
    emit_node(&mut writer, tree, node);
    writer.finish()
}

/// Emits `node` and sanitizes it against the view's allow-list. Highlight
/// wrappers and their data attributes survive; scripts and handlers do not.
pub fn emit_html_sanitized(tree: &Tree, node: NodeId) -> String {
    sanitize_html(&emit_html(tree, node))
}

pub fn sanitize_html(raw_html: &str) -> String {
    let tags: HashSet<&'static str> = [
        "a",
        "article",
        "aside",
        "b",
        "body",
        "br",
        "button",
        "details",
        "div",
        "em",
        "figcaption",
        "figure",
        "h2",
        "h3",
        "h4",
        "i",
        "img",
        "li",
        "nav",
        "ol",
        "p",
        "section",
        "span",
        "strong",
        "summary",
        "ul",
    ]
    .iter()
    .copied()
    .collect();

    let generic_attributes: HashSet<&'static str> =
        ["class", "id", "style", "aria-current", "aria-label"]
            .iter()
            .copied()
            .collect();

    let mut tag_attributes = HashMap::new();
    tag_attributes.insert("a", ["href", "title"].iter().copied().collect());
    tag_attributes.insert(
        "img",
        ["alt", "src", "title", "loading"].iter().copied().collect(),
    );
    tag_attributes.insert("button", ["type"].iter().copied().collect());
    tag_attributes.insert("details", ["open"].iter().copied().collect());

    let mut generic_attribute_prefixes = HashSet::new();
    generic_attribute_prefixes.insert("data-");

    Builder::new()
        .tags(tags)
        .generic_attributes(generic_attributes)
        .tag_attributes(tag_attributes)
        .generic_attribute_prefixes(generic_attribute_prefixes)
        .link_rel(None)
        .clean(raw_html)
        .to_string()
}

struct HtmlWriter {
    out: String,
    pretty: bool,
    indent: usize,
}

impl HtmlWriter {
    fn new(pretty: bool) -> Self {
        Self {
            out: String::new(),
            pretty,
            indent: 0,
        }
    }

    fn open_line(&mut self) {
        if !self.pretty {
            return;
        }
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
    }

    fn close_line(&mut self) {
        if self.pretty {
            self.out.push('\n');
        }
    }

    fn push(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn finish(mut self) -> String {
        if self.out.ends_with('\n') {
            self.out.pop();
        }
        self.out
    }
}

fn emit_node(writer: &mut HtmlWriter, tree: &Tree, node: NodeId) {
    match tree.kind(node) {
        NodeKind::Text(text) => writer.push(&escape_html(text)),
        NodeKind::Element(element) => {
            let open = open_tag(&element.tag, &element.attrs);
            if VOID_TAGS.contains(&element.tag.as_str()) {
                writer.open_line();
                writer.push(&format!("{} />", &open[..open.len() - 1]));
                writer.close_line();
                return;
            }
            let close = format!("</{}>", element.tag);
            if writer.pretty && breaks_lines(tree, node) {
                writer.open_line();
                writer.push(&open);
                writer.close_line();
                writer.indent += 1;
                for child in tree.children(node) {
                    emit_node(writer, tree, *child);
                }
                writer.indent -= 1;
                writer.open_line();
                writer.push(&close);
                writer.close_line();
                return;
            }

            let block = BLOCK_TAGS.contains(&element.tag.as_str());
            if block {
                writer.open_line();
            }
            writer.push(&open);
            let pretty = writer.pretty;
            writer.pretty = false;
            for child in tree.children(node) {
                emit_node(writer, tree, *child);
            }
            writer.pretty = pretty;
            writer.push(&close);
            if block {
                writer.close_line();
            }
        }
    }
}

/// Only elements made entirely of child elements, at least one of them a
/// block, get their children on separate lines.
fn breaks_lines(tree: &Tree, node: NodeId) -> bool {
    let children = tree.children(node);
    !children.is_empty()
        && children.iter().all(|child| !tree.is_text(*child))
        && children.iter().any(|child| {
            tree.tag(*child)
                .is_some_and(|tag| BLOCK_TAGS.contains(&tag) || VOID_TAGS.contains(&tag))
        })
}

fn open_tag(tag: &str, attrs: &[(String, String)]) -> String {
    let mut out = String::new();
    out.push('<');
    out.push_str(tag);
    for (name, value) in attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape_attr(value));
        out.push('"');
    }
    out.push('>');
    out
}

fn escape_html(text: &str) -> String {
    let mut out = String::new();
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_attr(text: &str) -> String {
    let mut out = String::new();
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{emit_html, emit_html_pretty, emit_html_sanitized, emit_inner_html};
    use crate::tree::Tree;
    use pretty_assertions::assert_eq;

    #[test]
    fn compact_output_has_no_inter_element_whitespace() {
        let mut tree = Tree::new();
        let root = tree.root();
        let p = tree.create_element_with_text("p", "a < b & \"c\"");
        tree.set_attr(p, "title", "x\"y");
        let img = tree.create_element("img");
        tree.set_attr(img, "src", "a.png");
        tree.append_child(root, p);
        tree.append_child(root, img);
        assert_eq!(
            emit_html(&tree, root),
            "<body><p title=\"x&quot;y\">a &lt; b &amp; \"c\"</p><img src=\"a.png\" /></body>"
        );
        assert_eq!(
            emit_inner_html(&tree, root),
            "<p title=\"x&quot;y\">a &lt; b &amp; \"c\"</p><img src=\"a.png\" />"
        );
    }

    #[test]
    fn pretty_output_keeps_text_on_one_line() {
        let mut tree = Tree::new();
        let root = tree.root();
        let article = tree.create_element("article");
        let p = tree.create_element("p");
        let text = tree.create_text("Hello ");
        let span = tree.create_element_with_text("span", "world");
        tree.append_child(root, article);
        tree.append_child(article, p);
        tree.append_child(p, text);
        tree.append_child(p, span);
        assert_eq!(
            emit_html_pretty(&tree, root),
            "<body>\n  <article>\n    <p>Hello <span>world</span></p>\n  </article>\n</body>"
        );
    }

    #[test]
    fn output_is_well_formed_xml() {
        let mut tree = Tree::new();
        let root = tree.root();
        let figure = tree.create_element("figure");
        let img = tree.create_element("img");
        tree.set_attr(img, "alt", "Seal & stamp");
        let caption = tree.create_element_with_text("figcaption", "<Seal>");
        tree.append_child(figure, img);
        tree.append_child(figure, caption);
        tree.append_child(root, figure);
        for html in [emit_html(&tree, root), emit_html_pretty(&tree, root)] {
            let doc = roxmltree::Document::parse(&html).expect("well-formed");
            let caption = doc
                .descendants()
                .find(|node| node.has_tag_name("figcaption"))
                .expect("caption");
            assert_eq!(caption.text(), Some("<Seal>"));
        }
    }

    #[test]
    fn sanitizer_keeps_highlights_and_drops_scripts() {
        let mut tree = Tree::new();
        let root = tree.root();
        let p = tree.create_element("p");
        tree.set_attr(p, "onclick", "steal()");
        let span = tree.create_element_with_text("span", "kept");
        tree.set_attr(span, "class", "user-highlight");
        tree.set_attr(span, "data-highlight-id", "hl_1");
        tree.set_attr(span, "data-color", "green");
        let script = tree.create_element_with_text("script", "alert(1)");
        let link = tree.create_element_with_text("a", "bad");
        tree.set_attr(link, "href", "javascript:alert(1)");
        tree.append_child(p, span);
        tree.append_child(p, script);
        tree.append_child(p, link);
        tree.append_child(root, p);

        let html = emit_html_sanitized(&tree, p);
        assert!(html.contains("class=\"user-highlight\""));
        assert!(html.contains("data-highlight-id=\"hl_1\""));
        assert!(html.contains("data-color=\"green\""));
        assert!(!html.contains("onclick"));
        assert!(!html.contains("script"));
        assert!(!html.contains("alert"));
        assert!(!html.contains("javascript:"));
    }
}
