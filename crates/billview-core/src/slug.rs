use std::collections::{HashMap, HashSet};

/// Lowercases `text` and turns every run outside `[a-z0-9]` into one `-`.
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_dash = false;
    for ch in text.to_lowercase().chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch);
        } else {
            pending_dash = true;
        }
    }
    out
}

/// Heading ids handed out during one render, deduplicated by occurrence.
#[derive(Clone, Debug, Default)]
pub struct SlugRegistry {
    counts: HashMap<String, usize>,
    issued: HashSet<String>,
    fallback: usize,
}

impl SlugRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn heading_id(&mut self, text: &str) -> String {
        let base = slugify(text);
        if base.is_empty() {
            loop {
                self.fallback += 1;
                let id = format!("section-{}", self.fallback);
                if self.issued.insert(id.clone()) {
                    return id;
                }
            }
        }
        let count = self.counts.entry(base.clone()).or_insert(0);
        loop {
            *count += 1;
            let id = if *count == 1 {
                base.clone()
            } else {
                format!("{}-{}", base, count)
            };
            // A literal "Overview 2" heading may already own "overview-2".
            if self.issued.insert(id.clone()) {
                return id;
            }
        }
    }
}
