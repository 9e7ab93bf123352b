use crate::error::Result;
use crate::offsets::{Offsets, TextRange, offsets_to_range, range_text, range_text_nodes, range_to_offsets};
use crate::storage::{COLOR_KEY, HIGHLIGHTS_KEY, KeyValueStore};
use crate::tree::{NodeId, Tree};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

pub const HIGHLIGHT_CLASS: &str = "user-highlight";
pub const FOCUS_CLASS: &str = "is-focus";
pub const FOCUS_DURATION: Duration = Duration::from_millis(1200);
pub const SNIPPET_MAX: usize = 140;
const SNIPPET_FALLBACK: &str = "Highlight";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightColor {
    #[default]
    Gold,
    Green,
    Blue,
    Pink,
}

impl HighlightColor {
    pub const ALL: [HighlightColor; 4] = [
        HighlightColor::Gold,
        HighlightColor::Green,
        HighlightColor::Blue,
        HighlightColor::Pink,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HighlightColor::Gold => "gold",
            HighlightColor::Green => "green",
            HighlightColor::Blue => "blue",
            HighlightColor::Pink => "pink",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|color| color.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for HighlightColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HighlightColor {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(value).ok_or_else(|| {
            format!(
                "unknown highlight color `{}` (expected gold, green, blue or pink)",
                value
            )
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub id: String,
    pub start: usize,
    pub end: usize,
    pub color: HighlightColor,
}

impl Highlight {
    pub fn new(offsets: Offsets, color: HighlightColor) -> Self {
        Self {
            id: new_highlight_id(),
            start: offsets.start,
            end: offsets.end,
            color,
        }
    }

    pub fn offsets(&self) -> Offsets {
        Offsets {
            start: self.start,
            end: self.end,
        }
    }
}

pub fn new_highlight_id() -> String {
    format!("hl_{}", Uuid::new_v4().simple())
}

/// Reads a stored highlight array. Storage is untrusted: anything that is
/// not an array yields nothing and malformed records are dropped.
pub fn parse_highlights(raw: &str) -> Vec<Highlight> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(error = %err, "unable to read highlights");
            return Vec::new();
        }
    };
    let Value::Array(items) = value else {
        return Vec::new();
    };
    let total = items.len();
    let highlights: Vec<Highlight> = items.iter().filter_map(highlight_from_value).collect();
    if highlights.len() < total {
        tracing::warn!(
            dropped = total - highlights.len(),
            "dropped invalid highlight records"
        );
    }
    highlights
}

fn highlight_from_value(value: &Value) -> Option<Highlight> {
    let id = value.get("id")?.as_str()?;
    let start = usize::try_from(value.get("start")?.as_u64()?).ok()?;
    let end = usize::try_from(value.get("end")?.as_u64()?).ok()?;
    if end <= start {
        return None;
    }
    let color = value
        .get("color")
        .and_then(Value::as_str)
        .and_then(HighlightColor::parse)
        .unwrap_or_default();
    Some(Highlight {
        id: id.to_string(),
        start,
        end,
        color,
    })
}

pub fn serialize_highlights(highlights: &[Highlight]) -> Result<String> {
    Ok(serde_json::to_string(highlights)?)
}

/// Folds `next` into `highlights` in one pass: every record overlapping the
/// growing merged span is absorbed. Records that only overlap each other
/// after the merge are left alone until a later apply touches them.
pub fn merge_highlight(highlights: &[Highlight], next: Highlight) -> Vec<Highlight> {
    let mut merged = next;
    let mut out: Vec<Highlight> = highlights
        .iter()
        .filter(|item| {
            if item.offsets().overlaps(&merged.offsets()) {
                merged.start = merged.start.min(item.start);
                merged.end = merged.end.max(item.end);
                false
            } else {
                true
            }
        })
        .cloned()
        .collect();
    out.push(merged);
    out.sort_by_key(|item| item.start);
    out
}

pub fn remove_highlight(highlights: &[Highlight], id: &str) -> Vec<Highlight> {
    highlights
        .iter()
        .filter(|item| item.id != id)
        .cloned()
        .collect()
}

/// Wraps the in-range part of every text node touched by `range` in a
/// highlight span. Text already inside a highlight is left as is.
pub fn wrap_range(tree: &mut Tree, container: NodeId, range: &TextRange, id: &str, color: HighlightColor) {
    for node in range_text_nodes(tree, container, range) {
        let Some(parent) = tree.parent(node) else {
            continue;
        };
        if tree.has_class(parent, HIGHLIGHT_CLASS) {
            continue;
        }
        let len = tree.text_len(node);
        let start = if node == range.start_node {
            range.start_offset
        } else {
            0
        };
        let end = if node == range.end_node {
            range.end_offset.min(len)
        } else {
            len
        };
        if end <= start {
            continue;
        }

        let middle = if start > 0 {
            match tree.split_text(node, start) {
                Some(middle) => middle,
                None => continue,
            }
        } else {
            node
        };
        if end - start < tree.text_len(middle) {
            tree.split_text(middle, end - start);
        }

        let wrapper = tree.create_element("span");
        tree.set_attr(wrapper, "class", HIGHLIGHT_CLASS);
        tree.set_attr(wrapper, "data-highlight-id", id);
        tree.set_attr(wrapper, "data-color", color.as_str());
        tree.wrap(middle, wrapper);
    }
}

pub fn apply_highlights(tree: &mut Tree, container: NodeId, highlights: &[Highlight]) {
    for highlight in highlights {
        let Some(range) = offsets_to_range(tree, container, highlight.start, highlight.end) else {
            tracing::debug!(id = %highlight.id, "highlight outside document text");
            continue;
        };
        wrap_range(tree, container, &range, &highlight.id, highlight.color);
    }
}

pub fn highlight_wrappers(tree: &Tree, container: NodeId, id: &str) -> Vec<NodeId> {
    tree.find_all(container, |element| {
        element.has_class(HIGHLIGHT_CLASS) && element.attr("data-highlight-id") == Some(id)
    })
}

/// Id of the highlight wrapping `node`, for click-to-remove.
pub fn highlight_id_at(tree: &Tree, node: NodeId) -> Option<String> {
    let wrapper = tree.closest(node, |element| element.has_class(HIGHLIGHT_CLASS))?;
    tree.attr(wrapper, "data-highlight-id").map(str::to_string)
}

fn unwrap_all(tree: &mut Tree, wrappers: Vec<NodeId>) {
    let mut parents = BTreeSet::new();
    for wrapper in wrappers {
        if let Some(parent) = tree.unwrap(wrapper) {
            parents.insert(parent);
        }
    }
    for parent in parents {
        tree.normalize(parent);
    }
}

pub fn unwrap_highlight(tree: &mut Tree, container: NodeId, id: &str) {
    let wrappers = highlight_wrappers(tree, container, id);
    unwrap_all(tree, wrappers);
}

pub fn clear_highlight_markup(tree: &mut Tree, container: NodeId) {
    let wrappers = tree.find_all(container, |element| element.has_class(HIGHLIGHT_CLASS));
    unwrap_all(tree, wrappers);
}

pub fn highlight_snippet(tree: &Tree, container: NodeId, highlight: &Highlight, max: usize) -> String {
    let Some(range) = offsets_to_range(tree, container, highlight.start, highlight.end) else {
        return SNIPPET_FALLBACK.to_string();
    };
    let raw = range_text(tree, container, &range)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if raw.is_empty() {
        return SNIPPET_FALLBACK.to_string();
    }
    if raw.chars().count() <= max {
        return raw;
    }
    let cut: String = raw.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", cut)
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct IndexEntry {
    pub id: String,
    pub number: usize,
    pub start: usize,
    pub color: HighlightColor,
    pub snippet: String,
}

pub fn highlight_index(
    highlights: &[Highlight],
    tree: &Tree,
    container: NodeId,
    snippet_max: usize,
) -> Vec<IndexEntry> {
    let mut sorted: Vec<&Highlight> = highlights.iter().collect();
    sorted.sort_by_key(|item| item.start);
    sorted
        .into_iter()
        .enumerate()
        .map(|(index, highlight)| IndexEntry {
            id: highlight.id.clone(),
            number: index + 1,
            start: highlight.start,
            color: highlight.color,
            snippet: highlight_snippet(tree, container, highlight, snippet_max),
        })
        .collect()
}

pub fn index_summary(count: usize) -> String {
    if count == 0 {
        "Highlights".to_string()
    } else {
        format!("Highlights ({})", count)
    }
}

/// Rebuilds the highlight list under `list`.
pub fn render_highlight_index(tree: &mut Tree, list: NodeId, entries: &[IndexEntry]) {
    tree.clear_children(list);
    if entries.is_empty() {
        let empty = tree.create_element_with_text("p", "No highlights yet.");
        tree.set_attr(empty, "class", "highlight-empty");
        tree.append_child(list, empty);
        return;
    }

    for entry in entries {
        let item = tree.create_element("button");
        tree.set_attr(item, "type", "button");
        tree.set_attr(item, "class", "highlight-item");
        tree.set_attr(item, "data-highlight-id", entry.id.as_str());
        tree.set_attr(item, "data-color", entry.color.as_str());

        let swatch = tree.create_element("span");
        tree.set_attr(swatch, "class", "highlight-swatch");
        let content = tree.create_element("div");
        let meta = tree.create_element_with_text("div", &format!("Highlight {}", entry.number));
        tree.set_attr(meta, "class", "highlight-meta");
        let snippet = tree.create_element_with_text("div", &entry.snippet);
        tree.set_attr(snippet, "class", "highlight-snippet");

        tree.append_child(content, meta);
        tree.append_child(content, snippet);
        tree.append_child(item, swatch);
        tree.append_child(item, content);
        tree.append_child(list, item);
    }
}

/// Marks every wrapper of `id` as focused and returns them; the first is
/// the one to scroll to. The host clears the mark after [`FOCUS_DURATION`].
pub fn focus_highlight(tree: &mut Tree, container: NodeId, id: &str) -> Vec<NodeId> {
    let wrappers = highlight_wrappers(tree, container, id);
    for wrapper in &wrappers {
        tree.add_class(*wrapper, FOCUS_CLASS);
    }
    wrappers
}

pub fn blur_highlight(tree: &mut Tree, container: NodeId, id: &str) {
    for wrapper in highlight_wrappers(tree, container, id) {
        tree.remove_class(wrapper, FOCUS_CLASS);
    }
}

/// The persisted highlight set plus the active color.
///
/// Every mutation updates memory, then the tree, then storage. A failed
/// write is logged and the in-memory set stays authoritative.
#[derive(Debug)]
pub struct HighlightStore<S: KeyValueStore> {
    storage: S,
    highlights: Vec<Highlight>,
    color: HighlightColor,
    snippet_max: usize,
}

impl<S: KeyValueStore> HighlightStore<S> {
    pub fn load(storage: S) -> Self {
        let highlights = match storage.get(HIGHLIGHTS_KEY) {
            Ok(Some(raw)) => parse_highlights(&raw),
            Ok(None) => Vec::new(),
            Err(err) => {
                tracing::warn!(error = %err, "unable to read highlights");
                Vec::new()
            }
        };
        let color = match storage.get(COLOR_KEY) {
            Ok(value) => value
                .as_deref()
                .and_then(HighlightColor::parse)
                .unwrap_or_default(),
            Err(err) => {
                tracing::warn!(error = %err, "unable to read highlight color");
                HighlightColor::default()
            }
        };
        tracing::debug!(count = highlights.len(), "loaded highlights");
        Self {
            storage,
            highlights,
            color,
            snippet_max: SNIPPET_MAX,
        }
    }

    pub fn with_snippet_max(mut self, snippet_max: usize) -> Self {
        self.snippet_max = snippet_max;
        self
    }

    pub fn highlights(&self) -> &[Highlight] {
        &self.highlights
    }

    pub fn len(&self) -> usize {
        self.highlights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.highlights.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Highlight> {
        self.highlights.iter().find(|item| item.id == id)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    pub fn color(&self) -> HighlightColor {
        self.color
    }

    pub fn set_color(&mut self, color: HighlightColor) {
        self.color = color;
        if let Err(err) = self.storage.set(COLOR_KEY, color.as_str()) {
            tracing::warn!(error = %err, "unable to save highlight color");
        }
    }

    fn persist(&mut self) {
        let result = serialize_highlights(&self.highlights)
            .and_then(|json| self.storage.set(HIGHLIGHTS_KEY, &json));
        if let Err(err) = result {
            tracing::warn!(error = %err, "unable to save highlights");
        }
    }

    /// Wraps every stored highlight in a freshly rendered tree.
    pub fn render(&self, tree: &mut Tree, container: NodeId) {
        apply_highlights(tree, container, &self.highlights);
    }

    /// Adds a highlight in the active color. Returns the stored record,
    /// which spans any highlights it absorbed.
    pub fn apply(&mut self, tree: &mut Tree, container: NodeId, offsets: Offsets) -> Highlight {
        self.apply_with_color(tree, container, offsets, self.color)
    }

    pub fn apply_with_color(
        &mut self,
        tree: &mut Tree,
        container: NodeId,
        offsets: Offsets,
        color: HighlightColor,
    ) -> Highlight {
        let record = Highlight::new(offsets, color);
        let id = record.id.clone();
        self.highlights = merge_highlight(&self.highlights, record);
        clear_highlight_markup(tree, container);
        apply_highlights(tree, container, &self.highlights);
        self.persist();

        let stored = self
            .highlights
            .iter()
            .find(|item| item.id == id)
            .cloned();
        stored.unwrap_or_else(|| Highlight {
            id,
            start: offsets.start,
            end: offsets.end,
            color,
        })
    }

    /// Highlights a selection. Unmappable or empty selections are a no-op.
    pub fn apply_selection(
        &mut self,
        tree: &mut Tree,
        container: NodeId,
        range: &TextRange,
    ) -> Option<Highlight> {
        let offsets = range_to_offsets(tree, container, range)?;
        Some(self.apply(tree, container, offsets))
    }

    pub fn remove(&mut self, tree: &mut Tree, container: NodeId, id: &str) -> bool {
        let before = self.highlights.len();
        self.highlights = remove_highlight(&self.highlights, id);
        let removed = self.highlights.len() != before;
        unwrap_highlight(tree, container, id);
        if removed {
            self.persist();
        }
        removed
    }

    pub fn clear(&mut self, tree: &mut Tree, container: NodeId) {
        self.highlights.clear();
        clear_highlight_markup(tree, container);
        self.persist();
    }

    pub fn index(&self, tree: &Tree, container: NodeId) -> Vec<IndexEntry> {
        highlight_index(&self.highlights, tree, container, self.snippet_max)
    }

    /// Rebuilds the index list and returns its summary label.
    pub fn rebuild_index(&self, tree: &mut Tree, container: NodeId, list: NodeId) -> String {
        let entries = self.index(tree, container);
        render_highlight_index(tree, list, &entries);
        index_summary(entries.len())
    }
}
