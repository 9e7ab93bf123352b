//! Translation between tree positions and plain-text offsets.
//!
//! The offset space is the concatenated text of a container's text nodes in
//! document order, counted in chars. It is recomputed on every call because
//! the tree is rebuilt on each render while offsets are what gets stored.

use crate::tree::{NodeId, Tree, char_slice};
use serde::{Deserialize, Serialize};

/// A selection between two positions inside text nodes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TextRange {
    pub start_node: NodeId,
    pub start_offset: usize,
    pub end_node: NodeId,
    pub end_offset: usize,
}

impl TextRange {
    pub fn new(start_node: NodeId, start_offset: usize, end_node: NodeId, end_offset: usize) -> Self {
        Self {
            start_node,
            start_offset,
            end_node,
            end_offset,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start_node == self.end_node && self.start_offset == self.end_offset
    }
}

/// Half-open `[start, end)` span of the offset space.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Offsets {
    pub start: usize,
    pub end: usize,
}

impl Offsets {
    /// Orders the endpoints; `None` for an empty span.
    pub fn new(a: usize, b: usize) -> Option<Self> {
        if a == b {
            return None;
        }
        Some(Self {
            start: a.min(b),
            end: a.max(b),
        })
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Strict overlap; touching endpoints do not count.
    pub fn overlaps(&self, other: &Offsets) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// Total length of the container's text.
pub fn text_len(tree: &Tree, container: NodeId) -> usize {
    tree.text_nodes(container)
        .into_iter()
        .map(|node| tree.text_len(node))
        .sum()
}

pub fn to_offset(tree: &Tree, container: NodeId, node: NodeId, local: usize) -> Option<usize> {
    let mut offset = 0;
    for text in tree.text_nodes(container) {
        if text == node {
            return Some(offset + local);
        }
        offset += tree.text_len(text);
    }
    None
}

pub fn range_to_offsets(tree: &Tree, container: NodeId, range: &TextRange) -> Option<Offsets> {
    let start = to_offset(tree, container, range.start_node, range.start_offset)?;
    let end = to_offset(tree, container, range.end_node, range.end_offset)?;
    Offsets::new(start, end)
}

pub fn offsets_to_range(tree: &Tree, container: NodeId, start: usize, end: usize) -> Option<TextRange> {
    let mut offset = 0;
    let mut start_pos: Option<(NodeId, usize)> = None;

    for node in tree.text_nodes(container) {
        let len = tree.text_len(node);
        if start_pos.is_none() && offset + len >= start {
            start_pos = Some((node, start.saturating_sub(offset)));
        }
        if offset + len >= end {
            let (start_node, start_offset) = start_pos?;
            return Some(TextRange {
                start_node,
                start_offset,
                end_node: node,
                end_offset: end.saturating_sub(offset),
            });
        }
        offset += len;
    }
    None
}

/// Char offset of the `utf16`-th UTF-16 code unit of `text`, for
/// positions measured by a browser. `None` inside a surrogate pair or past
/// the end.
pub fn utf16_to_char_offset(text: &str, utf16: usize) -> Option<usize> {
    let mut units = 0;
    for (index, ch) in text.chars().enumerate() {
        if units == utf16 {
            return Some(index);
        }
        if units > utf16 {
            return None;
        }
        units += ch.len_utf16();
    }
    (units == utf16).then(|| text.chars().count())
}

/// UTF-16 position of the `chars`-th char of `text`, or `None` past the end.
pub fn char_to_utf16_offset(text: &str, chars: usize) -> Option<usize> {
    let mut units = 0;
    let mut iter = text.chars();
    for _ in 0..chars {
        units += iter.next()?.len_utf16();
    }
    Some(units)
}

/// Text nodes touched by `range`, from its start node to its end node.
pub fn range_text_nodes(tree: &Tree, container: NodeId, range: &TextRange) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut inside = false;
    for node in tree.text_nodes(container) {
        if node == range.start_node {
            inside = true;
        }
        if inside {
            out.push(node);
        }
        if node == range.end_node {
            break;
        }
    }
    if !inside { Vec::new() } else { out }
}

/// The selected text, like `Range.toString()` in a browser.
pub fn range_text(tree: &Tree, container: NodeId, range: &TextRange) -> String {
    let mut out = String::new();
    for node in range_text_nodes(tree, container, range) {
        let Some(text) = tree.text(node) else {
            continue;
        };
        let from = if node == range.start_node {
            range.start_offset
        } else {
            0
        };
        let to = if node == range.end_node {
            range.end_offset
        } else {
            tree.text_len(node)
        };
        out.push_str(char_slice(text, from, to));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{
        Offsets, TextRange, char_to_utf16_offset, offsets_to_range, range_text, range_to_offsets,
        to_offset, utf16_to_char_offset,
    };
    use crate::tree::{NodeId, Tree};

    // <p>Hello <b>bold</b> world</p><p>Next</p>
    fn sample() -> (Tree, NodeId, Vec<NodeId>) {
        let mut tree = Tree::new();
        let root = tree.root();
        let p1 = tree.create_element("p");
        let t1 = tree.create_text("Hello ");
        let b = tree.create_element("b");
        let t2 = tree.create_text("bold");
        let t3 = tree.create_text(" world");
        let p2 = tree.create_element("p");
        let t4 = tree.create_text("Next");
        tree.append_child(root, p1);
        tree.append_child(p1, t1);
        tree.append_child(p1, b);
        tree.append_child(b, t2);
        tree.append_child(p1, t3);
        tree.append_child(root, p2);
        tree.append_child(p2, t4);
        (tree, root, vec![t1, t2, t3, t4])
    }

    #[test]
    fn offsets_follow_document_order() {
        let (tree, root, texts) = sample();
        assert_eq!(to_offset(&tree, root, texts[0], 0), Some(0));
        assert_eq!(to_offset(&tree, root, texts[1], 2), Some(8));
        assert_eq!(to_offset(&tree, root, texts[3], 1), Some(17));
    }

    #[test]
    fn nodes_outside_container_are_unmappable() {
        let (mut tree, root, _) = sample();
        let stray = tree.create_text("detached");
        assert_eq!(to_offset(&tree, root, stray, 0), None);
        let range = TextRange::new(stray, 0, stray, 3);
        assert_eq!(range_to_offsets(&tree, root, &range), None);
    }

    #[test]
    fn backwards_selection_is_normalized() {
        let (tree, root, texts) = sample();
        let range = TextRange::new(texts[2], 3, texts[0], 1);
        assert_eq!(
            range_to_offsets(&tree, root, &range),
            Some(Offsets { start: 1, end: 13 })
        );
    }

    #[test]
    fn collapsed_selection_is_rejected() {
        let (tree, root, texts) = sample();
        // End of "Hello " and start of "bold" are the same offset.
        let range = TextRange::new(texts[0], 6, texts[1], 0);
        assert_eq!(range_to_offsets(&tree, root, &range), None);
    }

    #[test]
    fn offsets_to_range_spans_elements() {
        let (tree, root, texts) = sample();
        let range = offsets_to_range(&tree, root, 3, 12).expect("range");
        assert_eq!(range.start_node, texts[0]);
        assert_eq!(range.start_offset, 3);
        assert_eq!(range.end_node, texts[2]);
        assert_eq!(range_text(&tree, root, &range), "lo bold w");
    }

    #[test]
    fn offsets_past_the_end_are_unresolvable() {
        let (tree, root, _) = sample();
        assert!(offsets_to_range(&tree, root, 0, 20).is_some());
        assert!(offsets_to_range(&tree, root, 0, 21).is_none());
    }

    #[test]
    fn round_trip_over_every_span() {
        let (tree, root, _) = sample();
        let text: Vec<char> = tree.text_content(root).chars().collect();
        for a in 0..text.len() {
            for b in a + 1..=text.len() {
                let range = offsets_to_range(&tree, root, a, b).expect("range");
                let expected: String = text[a..b].iter().collect();
                assert_eq!(range_text(&tree, root, &range), expected);
                assert_eq!(
                    range_to_offsets(&tree, root, &range),
                    Some(Offsets { start: a, end: b })
                );
            }
        }
    }

    #[test]
    fn strict_overlap_ignores_touching_ranges() {
        let a = Offsets { start: 0, end: 5 };
        assert!(a.overlaps(&Offsets { start: 4, end: 8 }));
        assert!(!a.overlaps(&Offsets { start: 5, end: 8 }));
        assert_eq!(Offsets::new(7, 2), Some(Offsets { start: 2, end: 7 }));
        assert_eq!(Offsets::new(3, 3), None);
    }

    #[test]
    fn browser_positions_convert_around_astral_chars() {
        let text = "\u{1F4B0} tax";
        assert_eq!(utf16_to_char_offset(text, 3), Some(2));
        assert_eq!(utf16_to_char_offset(text, 6), Some(5));
        assert_eq!(utf16_to_char_offset(text, 1), None);
        assert_eq!(utf16_to_char_offset(text, 7), None);
        assert_eq!(char_to_utf16_offset(text, 2), Some(3));
        assert_eq!(char_to_utf16_offset(text, 5), Some(6));
        assert_eq!(char_to_utf16_offset(text, 6), None);
        assert_eq!(utf16_to_char_offset("", 0), Some(0));
    }
}
