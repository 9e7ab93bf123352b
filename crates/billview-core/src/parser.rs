use crate::ast::{Block, Document};
use crate::classify::{is_all_caps_short, is_stamp_date};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;

pub const DEFAULT_ACT_TITLE: &str = "THE 2026 BILLIONAIRE TAX ACT";

static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,3})\s+(.*)$").expect("heading pattern"));
static IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^!\[(.*?)\]\((.*?)\)$").expect("image pattern"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// Markers that split the cover letter from the statute and identify the
/// receipt stamp boilerplate to drop.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ParseOptions {
    pub act_title: String,
    pub stamp_headings: Vec<String>,
    pub stamp_lines: Vec<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            act_title: DEFAULT_ACT_TITLE.to_string(),
            stamp_headings: vec!["RECEIVED".to_string()],
            stamp_lines: vec![
                "INITIATIVE COORDINATOR".to_string(),
                "ATTORNEY GENERAL'S OFFICE".to_string(),
            ],
        }
    }
}

pub fn parse(source: &str) -> Document {
    parse_with_options(source, &ParseOptions::default())
}

pub fn parse_with_options(source: &str, options: &ParseOptions) -> Document {
    let normalized = source.replace("\r\n", "\n");
    let mut parser = Parser::new(options);
    for line in normalized.split('\n') {
        parser.line(line);
    }
    let document = parser.finish();
    tracing::debug!(
        letter = document.letter.len(),
        bill = document.bill.len(),
        "parsed bill text"
    );
    document
}

struct Parser {
    act_title: String,
    stamp_headings: HashSet<String>,
    stamp_lines: HashSet<String>,
    document: Document,
    paragraph: Vec<String>,
    skip_stamp_block: bool,
    found_act_title: bool,
}

impl Parser {
    fn new(options: &ParseOptions) -> Self {
        Self {
            act_title: options.act_title.to_uppercase(),
            stamp_headings: upper_set(&options.stamp_headings),
            stamp_lines: upper_set(&options.stamp_lines),
            document: Document::default(),
            paragraph: Vec::new(),
            skip_stamp_block: false,
            found_act_title: false,
        }
    }

    fn target(&mut self) -> &mut Vec<Block> {
        if self.found_act_title {
            &mut self.document.bill
        } else {
            &mut self.document.letter
        }
    }

    fn flush_paragraph(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }
        let joined = self.paragraph.join(" ");
        self.paragraph.clear();
        let text = WHITESPACE.replace_all(&joined, " ").trim().to_string();
        if !text.is_empty() {
            self.target().push(Block::Paragraph { text });
        }
    }

    fn line(&mut self, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            self.flush_paragraph();
            return;
        }

        if let Some(caps) = HEADING.captures(trimmed) {
            self.flush_paragraph();
            let level = caps[1].len() as u8;
            let text = caps[2].trim().to_string();
            self.heading(level, text);
            return;
        }

        if self.skip_stamp_block {
            let key = trimmed.to_uppercase();
            if self.stamp_lines.contains(&key)
                || is_stamp_date(trimmed)
                || is_all_caps_short(trimmed)
            {
                self.flush_paragraph();
                return;
            }
            self.skip_stamp_block = false;
        }

        if let Some(caps) = IMAGE.captures(trimmed) {
            self.flush_paragraph();
            let block = Block::Image {
                alt: caps[1].to_string(),
                src: caps[2].to_string(),
            };
            self.target().push(block);
            return;
        }

        self.paragraph.push(trimmed.to_string());
    }

    fn heading(&mut self, level: u8, text: String) {
        let key = text.to_uppercase();

        if key.contains(&self.act_title) {
            // One-way switch: everything after the act title is statute.
            self.found_act_title = true;
            self.document.bill.push(Block::Heading {
                level,
                text,
                is_act_title: true,
            });
            return;
        }

        if self.stamp_headings.contains(&key) {
            self.skip_stamp_block = true;
            return;
        }
        if self.skip_stamp_block && is_stamp_date(&text) {
            return;
        }

        self.skip_stamp_block = false;
        self.target().push(Block::Heading {
            level,
            text,
            is_act_title: false,
        });
    }

    fn finish(mut self) -> Document {
        self.flush_paragraph();
        self.document
    }
}

fn upper_set(values: &[String]) -> HashSet<String> {
    values.iter().map(|value| value.to_uppercase()).collect()
}
