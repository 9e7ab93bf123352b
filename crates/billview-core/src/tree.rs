//! Arena-backed element/text tree standing in for the browser DOM.
//!
//! Nodes are addressed by [`NodeId`]. Detaching only unlinks a node;
//! `remove`, `clear_children`, `unwrap` and `normalize` release the nodes
//! they drop and their slots are handed out again, so an id must not be
//! used after its node was released. Text offsets are counted in `char`s.

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Element(Element),
    Text(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.attrs.retain(|(key, _)| key != name);
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|value| value.split_whitespace().any(|item| item == class))
            .unwrap_or(false)
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let next = match self.attr("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing, class),
            _ => class.to_string(),
        };
        self.set_attr("class", next);
    }

    pub fn remove_class(&mut self, class: &str) {
        let Some(existing) = self.attr("class") else {
            return;
        };
        let remaining: Vec<&str> = existing
            .split_whitespace()
            .filter(|item| *item != class)
            .collect();
        if remaining.is_empty() {
            self.remove_attr("class");
        } else {
            let joined = remaining.join(" ");
            self.set_attr("class", joined);
        }
    }

    /// Sets one declaration inside the inline `style` attribute.
    pub fn set_style_property(&mut self, name: &str, value: &str) {
        let mut declarations: Vec<(String, String)> = self
            .attr("style")
            .unwrap_or_default()
            .split(';')
            .filter_map(|decl| {
                let (key, value) = decl.split_once(':')?;
                Some((key.trim().to_string(), value.trim().to_string()))
            })
            .filter(|(key, _)| !key.is_empty())
            .collect();
        match declarations.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = value.to_string(),
            None => declarations.push((name.to_string(), value.to_string())),
        }
        let style = declarations
            .iter()
            .map(|(key, value)| format!("{}: {}", key, value))
            .collect::<Vec<_>>()
            .join("; ");
        self.set_attr("style", style);
    }
}

#[derive(Clone, Debug)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
    released: bool,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            kind,
            released: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Tree {
    nodes: Vec<Node>,
    free: Vec<NodeId>,
    root: NodeId,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: NodeId(0),
        };
        tree.root = tree.create_element("body");
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.nodes[id.0] = Node::new(kind);
            return id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(kind));
        id
    }

    /// Nodes currently allocated, attached or not.
    pub fn live_nodes(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Slots in the arena, live or waiting for reuse.
    pub fn slot_count(&self) -> usize {
        self.nodes.len()
    }

    /// Marks `id` and everything under it free. The caller has already
    /// unlinked `id` from its parent.
    fn release(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if next == self.root || self.node(next).released {
                continue;
            }
            let node = self.node_mut(next);
            stack.append(&mut node.children);
            node.parent = None;
            node.kind = NodeKind::Text(String::new());
            node.released = true;
            self.free.push(next);
        }
    }

    /// Detaches `id` and frees it with its whole subtree.
    pub fn remove(&mut self, id: NodeId) {
        self.detach(id);
        self.release(id);
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element(Element::new(tag)))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    /// Creates `<tag>text</tag>` detached.
    pub fn create_element_with_text(&mut self, tag: &str, text: &str) -> NodeId {
        let element = self.create_element(tag);
        let text = self.create_text(text);
        self.append_child(element, text);
        element
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.node(id).kind {
            NodeKind::Element(element) => Some(element),
            NodeKind::Text(_) => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.node_mut(id).kind {
            NodeKind::Element(element) => Some(element),
            NodeKind::Text(_) => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Text(text) => Some(text),
            NodeKind::Element(_) => None,
        }
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind, NodeKind::Text(_))
    }

    /// Length of a text node in chars; elements have no own length.
    pub fn text_len(&self, id: NodeId) -> usize {
        self.text(id).map(|text| text.chars().count()).unwrap_or(0)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|element| element.tag.as_str())
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|element| element.attr(name))
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(element) = self.element_mut(id) {
            element.set_attr(name, value);
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id)
            .map(|element| element.has_class(class))
            .unwrap_or(false)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if let Some(element) = self.element_mut(id) {
            element.add_class(class);
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if let Some(element) = self.element_mut(id) {
            element.remove_class(class);
        }
    }

    pub fn set_style_property(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(element) = self.element_mut(id) {
            element.set_style_property(name, value);
        }
    }

    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node(id).parent {
            self.node_mut(parent).children.retain(|child| *child != id);
            self.node_mut(id).parent = None;
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.node_mut(parent).children.push(child);
        self.node_mut(child).parent = Some(parent);
    }

    /// Inserts `child` into `parent` right before `reference`, or at the end
    /// when `reference` is not a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        self.detach(child);
        let children = &mut self.node_mut(parent).children;
        match children.iter().position(|item| *item == reference) {
            Some(index) => children.insert(index, child),
            None => children.push(child),
        }
        self.node_mut(child).parent = Some(parent);
    }

    pub fn insert_after(&mut self, reference: NodeId, child: NodeId) {
        let Some(parent) = self.parent(reference) else {
            return;
        };
        self.detach(child);
        let children = &mut self.node_mut(parent).children;
        match children.iter().position(|item| *item == reference) {
            Some(index) => children.insert(index + 1, child),
            None => children.push(child),
        }
        self.node_mut(child).parent = Some(parent);
    }

    /// Drops every child of `id`, the equivalent of `innerHTML = ""`.
    pub fn clear_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.node_mut(id).children);
        for child in children {
            self.node_mut(child).parent = None;
            self.release(child);
        }
    }

    /// Inclusive ancestry check.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Nearest inclusive ancestor that satisfies `predicate`.
    pub fn closest(&self, node: NodeId, predicate: impl Fn(&Element) -> bool) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            if let Some(element) = self.element(id)
                && predicate(element)
            {
                return Some(id);
            }
            current = self.parent(id);
        }
        None
    }

    /// Descendants of `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Text nodes under `id` in document order.
    pub fn text_nodes(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|node| self.is_text(*node))
            .collect()
    }

    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        let mut out = String::new();
        for node in self.text_nodes(id) {
            if let Some(text) = self.text(node) {
                out.push_str(text);
            }
        }
        out
    }

    pub fn find_all(&self, id: NodeId, predicate: impl Fn(&Element) -> bool) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|node| self.element(*node).map(&predicate).unwrap_or(false))
            .collect()
    }

    pub fn find_by_id(&self, root: NodeId, id: &str) -> Option<NodeId> {
        self.find_all(root, |element| element.attr("id") == Some(id))
            .into_iter()
            .next()
    }

    /// Splits a text node at `offset` chars. The original node keeps the
    /// leading part and a new sibling holding the rest is returned.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Option<NodeId> {
        let text = self.text(id)?.to_string();
        let byte = char_to_byte(&text, offset)?;
        let (head, tail) = text.split_at(byte);
        let tail = tail.to_string();
        if let NodeKind::Text(slot) = &mut self.node_mut(id).kind {
            *slot = head.to_string();
        }
        let next = self.create_text(tail);
        if self.parent(id).is_some() {
            self.insert_after(id, next);
        }
        Some(next)
    }

    /// Moves `node` into `wrapper`, placing the wrapper where `node` was.
    pub fn wrap(&mut self, node: NodeId, wrapper: NodeId) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        self.insert_before(parent, wrapper, node);
        self.append_child(wrapper, node);
    }

    /// Replaces an element with its children and frees it. Returns the
    /// former parent.
    pub fn unwrap(&mut self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let children = self.children(id).to_vec();
        for child in children {
            self.insert_before(parent, child, id);
        }
        self.remove(id);
        Some(parent)
    }

    /// Merges adjacent text nodes and drops empty ones, recursively.
    pub fn normalize(&mut self, id: NodeId) {
        let children = self.children(id).to_vec();
        let mut kept: Vec<NodeId> = Vec::with_capacity(children.len());
        for child in children {
            let Some(text) = self.text(child).map(str::to_string) else {
                self.normalize(child);
                kept.push(child);
                continue;
            };
            if text.is_empty() {
                self.node_mut(child).parent = None;
                self.release(child);
                continue;
            }
            if let Some(&last) = kept.last()
                && self.is_text(last)
            {
                if let NodeKind::Text(slot) = &mut self.node_mut(last).kind {
                    slot.push_str(&text);
                }
                self.node_mut(child).parent = None;
                self.release(child);
                continue;
            }
            kept.push(child);
        }
        self.node_mut(id).children = kept;
    }
}

/// Byte index of the `offset`-th char, or `None` past the end.
pub(crate) fn char_to_byte(text: &str, offset: usize) -> Option<usize> {
    if offset == 0 {
        return Some(0);
    }
    let mut count = 0;
    for (byte, _) in text.char_indices() {
        if count == offset {
            return Some(byte);
        }
        count += 1;
    }
    if count == offset { Some(text.len()) } else { None }
}

/// Substring by char positions, clamped to the text.
pub(crate) fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let len = text.chars().count();
    let start = start.min(len);
    let end = end.clamp(start, len);
    let from = char_to_byte(text, start).unwrap_or(text.len());
    let to = char_to_byte(text, end).unwrap_or(text.len());
    &text[from..to]
}
