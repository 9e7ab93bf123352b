use crate::ast::{Block, Document};
use crate::classify::is_safe_url;
use crate::context::chat_context;
use crate::parser::{ParseOptions, parse_with_options};
use crate::slug::SlugRegistry;
use crate::tree::{NodeId, Tree};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static SUBSECTION_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\(([a-z0-9]+)\)\s+").expect("subsection label pattern"));

pub const LETTER_SUMMARY: &str = "Letter to Attorney General";
const DEFAULT_IMAGE_ALT: &str = "Document image";
const DEFAULT_IMAGE_CAPTION: &str = "Referenced image";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RenderOutcome {
    pub order: usize,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TocEntry {
    pub id: String,
    pub label: String,
}

/// Why the document text could not be fetched.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoadErrorContext {
    /// Opened from `file:`, where browsers refuse the fetch.
    FileProtocol,
    Network,
}

/// Renders `blocks` into `container`, continuing the order count from
/// `start_order`. Level 1 and 2 headings get ids and a TOC entry in `toc`.
pub fn render_blocks(
    tree: &mut Tree,
    blocks: &[Block],
    container: NodeId,
    toc: NodeId,
    slugs: &mut SlugRegistry,
    start_order: usize,
) -> RenderOutcome {
    let mut order = start_order;

    for block in blocks {
        let element = match block {
            Block::Heading {
                level,
                text,
                is_act_title,
            } => {
                let tag = match level {
                    1 => "h2",
                    2 => "h3",
                    3 => "h4",
                    _ => "h3",
                };
                let element = tree.create_element_with_text(tag, text);
                if *is_act_title {
                    tree.add_class(element, "act-title");
                }
                if *level <= 2 {
                    let id = slugs.heading_id(text);
                    tree.set_attr(element, "id", id.clone());
                    append_toc_entry(tree, toc, &id, text);
                }
                element
            }
            Block::Paragraph { text } => create_paragraph(tree, text),
            Block::Image { alt, src } => {
                if !is_safe_url(src) {
                    tracing::debug!(src = %src, "skipping image with unsafe url");
                    continue;
                }
                create_figure(tree, alt, src)
            }
        };

        order += 1;
        tree.set_style_property(element, "--order", &order.to_string());
        tree.add_class(element, "reveal");
        tree.append_child(container, element);
    }

    RenderOutcome { order }
}

fn append_toc_entry(tree: &mut Tree, toc: NodeId, id: &str, label: &str) {
    let item = tree.create_element("li");
    let link = tree.create_element_with_text("a", label);
    tree.set_attr(link, "href", format!("#{}", id));
    tree.append_child(item, link);
    tree.append_child(toc, item);
}

fn create_paragraph(tree: &mut Tree, text: &str) -> NodeId {
    let element = tree.create_element("p");
    if let Some(caps) = SUBSECTION_LABEL.captures(text) {
        let whole = caps.get(0).map(|m| m.end()).unwrap_or(0);
        tree.add_class(element, "subsection");
        let label = tree.create_element_with_text("span", &format!("({})", &caps[1]));
        tree.set_attr(label, "class", "subsection-label");
        let rest = tree.create_text(&text[whole..]);
        tree.append_child(element, label);
        tree.append_child(element, rest);
        return element;
    }
    let body = tree.create_text(text);
    tree.append_child(element, body);
    element
}

fn create_figure(tree: &mut Tree, alt: &str, src: &str) -> NodeId {
    let figure = tree.create_element("figure");
    // The page script drops the figure when the image fails to load.
    tree.set_attr(figure, "data-remove-on-error", "true");
    let img = tree.create_element("img");
    tree.set_attr(img, "src", src);
    tree.set_attr(
        img,
        "alt",
        if alt.is_empty() { DEFAULT_IMAGE_ALT } else { alt },
    );
    tree.set_attr(img, "loading", "lazy");
    let caption = tree.create_element_with_text(
        "figcaption",
        if alt.is_empty() {
            DEFAULT_IMAGE_CAPTION
        } else {
            alt
        },
    );
    tree.append_child(figure, img);
    tree.append_child(figure, caption);
    figure
}

/// The reading surface: a content container and a table of contents list,
/// both owned by one tree.
#[derive(Clone, Debug)]
pub struct BillView {
    pub tree: Tree,
    pub content: NodeId,
    pub toc: NodeId,
    source: String,
}

impl Default for BillView {
    fn default() -> Self {
        Self::new()
    }
}

impl BillView {
    pub fn new() -> Self {
        let mut tree = Tree::new();
        let root = tree.root();
        let toc = tree.create_element("ul");
        tree.set_attr(toc, "id", "toc-list");
        let content = tree.create_element("article");
        tree.set_attr(content, "id", "bill-content");
        tree.append_child(root, toc);
        tree.append_child(root, content);
        Self {
            tree,
            content,
            toc,
            source: String::new(),
        }
    }

    pub fn render_text(&mut self, source: &str, options: &ParseOptions) -> RenderOutcome {
        let document = parse_with_options(source, options);
        self.render_source(source, &document)
    }

    /// Renders `document`, already parsed from `source`, and keeps the
    /// source as the text handed to the chat endpoint.
    pub fn render_source(&mut self, source: &str, document: &Document) -> RenderOutcome {
        let outcome = self.render(document);
        self.source = source.to_string();
        outcome
    }

    /// Replaces the content and TOC with `document`. The letter goes into a
    /// collapsible section ahead of the bill body. A document rendered this
    /// way has no source text.
    pub fn render(&mut self, document: &Document) -> RenderOutcome {
        self.source.clear();
        let tree = &mut self.tree;
        tree.clear_children(self.content);
        tree.clear_children(self.toc);

        let mut slugs = SlugRegistry::new();
        let mut order = 0;

        if !document.letter.is_empty() {
            let details = tree.create_element("details");
            tree.set_attr(details, "class", "letter-dropdown");
            let summary = tree.create_element_with_text("summary", LETTER_SUMMARY);
            tree.append_child(details, summary);

            let letter_content = tree.create_element("div");
            tree.set_attr(letter_content, "class", "letter-content");
            let outcome = render_blocks(
                tree,
                &document.letter,
                letter_content,
                self.toc,
                &mut slugs,
                order,
            );
            order = outcome.order;
            tree.append_child(details, letter_content);

            tree.set_style_property(details, "--order", "1");
            tree.add_class(details, "reveal");
            tree.append_child(self.content, details);
        }

        let outcome = render_blocks(
            tree,
            &document.bill,
            self.content,
            self.toc,
            &mut slugs,
            order,
        );
        tracing::debug!(order = outcome.order, "rendered bill");
        outcome
    }

    /// Swaps the content for a panel offering a local file instead.
    pub fn render_load_error(&mut self, context: LoadErrorContext) {
        self.source.clear();
        let tree = &mut self.tree;
        tree.clear_children(self.content);
        tree.clear_children(self.toc);

        let (message, hint) = match context {
            LoadErrorContext::FileProtocol => (
                "Browsers block file fetches. Run a local server or load the text manually.",
                "Example: python -m http.server (then open http://localhost:8000).",
            ),
            LoadErrorContext::Network => (
                "Please try again or load the text manually.",
                "You can load the text from a local .txt file.",
            ),
        };

        let wrapper = tree.create_element("div");
        tree.set_attr(wrapper, "class", "load-error");
        let title = tree.create_element_with_text("h3", "Unable to load bill text");
        let message = tree.create_element_with_text("p", message);
        let hint = tree.create_element_with_text("p", hint);
        let input = tree.create_element("input");
        tree.set_attr(input, "type", "file");
        tree.set_attr(input, "accept", ".txt,text/plain");
        for child in [title, message, hint, input] {
            tree.append_child(wrapper, child);
        }
        tree.append_child(self.content, wrapper);
    }

    pub fn toc_entries(&self) -> Vec<TocEntry> {
        self.tree
            .find_all(self.toc, |element| element.tag == "a")
            .into_iter()
            .filter_map(|link| {
                let href = self.tree.attr(link, "href")?;
                let id = href.strip_prefix('#')?;
                Some(TocEntry {
                    id: id.to_string(),
                    label: self.tree.text_content(link),
                })
            })
            .collect()
    }

    /// The text the offset space is measured over.
    pub fn plain_text(&self) -> String {
        self.tree.text_content(self.content)
    }

    /// The raw bill text last rendered, empty after a load error.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The source text wrapped for the chat endpoint, or an empty string
    /// when there is no text to offer.
    pub fn chat_context(&self) -> String {
        if self.source.is_empty() {
            return String::new();
        }
        chat_context(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::{BillView, LoadErrorContext, RenderOutcome, TocEntry, render_blocks};
    use crate::ast::{Block, Document};
    use crate::parser::parse;
    use crate::slug::SlugRegistry;
    use crate::tree::Tree;
    use pretty_assertions::assert_eq;

    fn render_into_root(blocks: &[Block]) -> (Tree, RenderOutcome) {
        let mut tree = Tree::new();
        let root = tree.root();
        let toc = tree.create_element("ul");
        let mut slugs = SlugRegistry::new();
        let outcome = render_blocks(&mut tree, blocks, root, toc, &mut slugs, 0);
        (tree, outcome)
    }

    #[test]
    fn headings_map_to_ranks_and_only_top_two_get_ids() {
        let blocks = vec![
            Block::heading(1, "Title"),
            Block::heading(2, "Part"),
            Block::heading(3, "Detail"),
        ];
        let (tree, outcome) = render_into_root(&blocks);
        let children = tree.children(tree.root()).to_vec();
        let tags: Vec<_> = children.iter().filter_map(|id| tree.tag(*id)).collect();
        assert_eq!(tags, vec!["h2", "h3", "h4"]);
        assert_eq!(tree.attr(children[0], "id"), Some("title"));
        assert_eq!(tree.attr(children[1], "id"), Some("part"));
        assert_eq!(tree.attr(children[2], "id"), None);
        assert_eq!(outcome.order, 3);
        assert_eq!(tree.attr(children[2], "style"), Some("--order: 3"));
        assert!(tree.has_class(children[2], "reveal"));
    }

    #[test]
    fn duplicate_headings_get_distinct_ids() {
        let mut view = BillView::new();
        let doc = Document {
            letter: vec![],
            bill: vec![Block::heading(2, "Overview"), Block::heading(2, "Overview")],
        };
        view.render(&doc);
        assert_eq!(
            view.toc_entries(),
            vec![
                TocEntry {
                    id: "overview".to_string(),
                    label: "Overview".to_string()
                },
                TocEntry {
                    id: "overview-2".to_string(),
                    label: "Overview".to_string()
                },
            ]
        );
    }

    #[test]
    fn subsection_labels_become_markers() {
        let (tree, _) = render_into_root(&[Block::paragraph("(a) The tax applies."), Block::paragraph("(see below) text")]);
        let children = tree.children(tree.root()).to_vec();
        let first = children[0];
        assert!(tree.has_class(first, "subsection"));
        let label = tree.children(first)[0];
        assert_eq!(tree.attr(label, "class"), Some("subsection-label"));
        assert_eq!(tree.text_content(label), "(a)");
        assert_eq!(tree.text_content(first), "(a)The tax applies.");
        assert!(!tree.has_class(children[1], "subsection"));
    }

    #[test]
    fn unsafe_images_are_skipped_without_consuming_order() {
        let blocks = vec![
            Block::image("x", "javascript:alert(1)"),
            Block::image("", "/img/a.png"),
        ];
        let (tree, outcome) = render_into_root(&blocks);
        let children = tree.children(tree.root()).to_vec();
        assert_eq!(children.len(), 1);
        assert_eq!(outcome.order, 1);
        let figure = children[0];
        let img = tree.children(figure)[0];
        assert_eq!(tree.attr(img, "alt"), Some("Document image"));
        assert_eq!(tree.attr(img, "loading"), Some("lazy"));
        assert_eq!(tree.text_content(figure), "Referenced image");
    }

    #[test]
    fn letter_renders_in_dropdown_and_numbering_continues() {
        let source = "# Cover\nDear AG.\n\n# THE 2026 BILLIONAIRE TAX ACT\n## Findings\nText.\n";
        let mut view = BillView::new();
        let outcome = view.render(&parse(source));
        assert_eq!(outcome.order, 5);

        let content = view.tree.children(view.content).to_vec();
        assert_eq!(view.tree.tag(content[0]), Some("details"));
        assert!(view.tree.has_class(content[0], "letter-dropdown"));
        assert_eq!(view.tree.attr(content[1], "class"), Some("act-title reveal"));
        assert_eq!(view.tree.attr(content[1], "style"), Some("--order: 3"));

        let ids: Vec<_> = view.toc_entries().into_iter().map(|entry| entry.id).collect();
        assert_eq!(ids, vec!["cover", "the-2026-billionaire-tax-act", "findings"]);
    }

    #[test]
    fn rerender_replaces_previous_content() {
        let mut view = BillView::new();
        view.render(&parse("# One\n"));
        view.render(&parse("# Two\n"));
        assert_eq!(view.plain_text(), "Two");
        assert_eq!(view.toc_entries().len(), 1);
    }

    #[test]
    fn load_error_panel_offers_file_picker() {
        let mut view = BillView::new();
        view.render(&parse("# One\n"));
        view.render_load_error(LoadErrorContext::FileProtocol);
        assert!(view.toc_entries().is_empty());
        let inputs = view
            .tree
            .find_all(view.content, |element| element.tag == "input");
        assert_eq!(inputs.len(), 1);
        assert_eq!(view.tree.attr(inputs[0], "accept"), Some(".txt,text/plain"));
        assert!(view.plain_text().contains("python -m http.server"));
    }
}
