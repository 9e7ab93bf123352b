use std::panic;

use billview_core::{
    BillView, Block, HighlightColor, HighlightStore, MemoryStore, Offsets, ParseOptions,
    emit_html, highlight_wrappers, merge_highlight, offsets_to_range, parse, range_text,
    range_to_offsets,
};

const CASES: usize = 200;
const MAX_LEN: usize = 512;
const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789 \
\n\n\n\t##!![]()'&-.,:/";

#[test]
fn parser_never_panics_on_random_input() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = Lcg::new(0x7f4a_2d91_13b4_55a1);
    for case in 0..CASES {
        let len = rng.gen_range(0, MAX_LEN + 1);
        let source = random_string(&mut rng, len);
        let result = panic::catch_unwind(|| parse(&source));
        if result.is_err() {
            return Err(format!("parse panicked for case {}: {:?}", case, source).into());
        }
    }
    Ok(())
}

#[test]
fn parsed_blocks_are_well_formed() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = Lcg::new(0x91d4_2f8e_c1a3_044f);
    for case in 0..CASES {
        let len = rng.gen_range(0, MAX_LEN + 1);
        let source = random_string(&mut rng, len);
        let document = parse(&source);
        for block in document.blocks() {
            if let Err(message) = check_block(block) {
                return Err(format!(
                    "block check failed for case {}: {}\nSource:\n---\n{}\n---",
                    case, message, source
                )
                .into());
            }
        }
        let titles = document
            .blocks()
            .filter(|block| matches!(block, Block::Heading { is_act_title: true, .. }))
            .count();
        if titles > 0 && !matches!(document.bill.first(), Some(Block::Heading { is_act_title: true, .. })) {
            return Err(format!("bill does not open with the act title in case {}", case).into());
        }
    }
    Ok(())
}

#[test]
fn paragraph_words_survive_parsing() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = Lcg::new(0x0c3e_77a1_5b20_9d13);
    for case in 0..CASES {
        let paragraphs: Vec<String> = (0..rng.gen_range(1, 6))
            .map(|_| random_words(&mut rng))
            .collect();
        let source = paragraphs.join("\n\n");
        let document = parse(&source);
        let texts: Vec<&str> = document.blocks().map(Block::text).collect();
        if texts != paragraphs.iter().map(String::as_str).collect::<Vec<_>>() {
            return Err(format!(
                "paragraphs changed for case {}: {:?} -> {:?}",
                case, paragraphs, texts
            )
            .into());
        }
    }
    Ok(())
}

#[test]
fn offsets_round_trip_on_rendered_documents() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = Lcg::new(0x5a17_c0de_2026_0001);
    for case in 0..CASES / 4 {
        let len = rng.gen_range(1, MAX_LEN + 1);
        let source = random_string(&mut rng, len);
        let mut view = BillView::new();
        view.render_text(&source, &ParseOptions::default());
        let text: Vec<char> = view.plain_text().chars().collect();
        if text.len() < 2 {
            continue;
        }
        for _ in 0..20 {
            let start = rng.gen_range(0, text.len());
            let end = rng.gen_range(start + 1, text.len() + 1);
            let range = offsets_to_range(&view.tree, view.content, start, end)
                .ok_or_else(|| format!("unresolvable [{}, {}) in case {}", start, end, case))?;
            let expected: String = text[start..end].iter().collect();
            let actual = range_text(&view.tree, view.content, &range);
            if actual != expected {
                return Err(format!(
                    "range text mismatch for [{}, {}) in case {}: {:?} vs {:?}",
                    start, end, case, actual, expected
                )
                .into());
            }
            let back = range_to_offsets(&view.tree, view.content, &range);
            if back != Some(Offsets { start, end }) {
                return Err(format!(
                    "offsets did not round trip for [{}, {}) in case {}: {:?}",
                    start, end, case, back
                )
                .into());
            }
        }
    }
    Ok(())
}

#[test]
fn merging_from_empty_keeps_set_disjoint_and_sorted() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = Lcg::new(0x3141_5926_5358_9793);
    for case in 0..CASES {
        let mut set = Vec::new();
        for step in 0..rng.gen_range(1, 30) {
            let start = rng.gen_range(0, 200);
            let end = rng.gen_range(start + 1, start + 40);
            let record = billview_core::Highlight {
                id: format!("h{}", step),
                start,
                end,
                color: HighlightColor::Gold,
            };
            set = merge_highlight(&set, record);
            if !set.iter().any(|item| item.id == format!("h{}", step)) {
                return Err(format!("new record missing after step {} in case {}", step, case).into());
            }
            for pair in set.windows(2) {
                if pair[0].end > pair[1].start {
                    return Err(format!(
                        "records overlap or are unsorted in case {}: {:?}",
                        case, set
                    )
                    .into());
                }
            }
        }
    }
    Ok(())
}

#[test]
fn highlights_never_change_document_text() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = Lcg::new(0x2718_2818_2845_9045);
    for case in 0..CASES / 4 {
        let len = rng.gen_range(1, MAX_LEN + 1);
        let source = random_string(&mut rng, len);
        let mut view = BillView::new();
        view.render_text(&source, &ParseOptions::default());
        let before_html = emit_html(&view.tree, view.content);
        let text: Vec<char> = view.plain_text().chars().collect();
        if text.len() < 2 {
            continue;
        }

        let mut store = HighlightStore::load(MemoryStore::new());
        for _ in 0..rng.gen_range(1, 8) {
            let start = rng.gen_range(0, text.len());
            let end = rng.gen_range(start + 1, text.len() + 1);
            store.apply(&mut view.tree, view.content, Offsets { start, end });
        }
        let after: Vec<char> = view.plain_text().chars().collect();
        if after != text {
            return Err(format!("highlighting changed text in case {}", case).into());
        }
        for highlight in store.highlights() {
            let wrapped: String = highlight_wrappers(&view.tree, view.content, &highlight.id)
                .into_iter()
                .map(|wrapper| view.tree.text_content(wrapper))
                .collect();
            let expected: String = text[highlight.start..highlight.end].iter().collect();
            if wrapped != expected {
                return Err(format!(
                    "wrapper text mismatch in case {}: {:?} vs {:?}",
                    case, wrapped, expected
                )
                .into());
            }
        }

        store.clear(&mut view.tree, view.content);
        if emit_html(&view.tree, view.content) != before_html {
            return Err(format!("clearing did not restore markup in case {}", case).into());
        }
    }
    Ok(())
}

fn check_block(block: &Block) -> Result<(), String> {
    match block {
        Block::Heading { level, text, .. } => {
            if !(1..=3).contains(level) {
                return Err(format!("heading level {} out of range", level));
            }
            if text.contains('\n') {
                return Err(format!("heading text spans lines: {:?}", text));
            }
        }
        Block::Paragraph { text } => {
            if text.is_empty() || text.trim() != text {
                return Err(format!("paragraph not trimmed: {:?}", text));
            }
            if text.contains("  ") || text.contains('\n') || text.contains('\t') {
                return Err(format!("paragraph whitespace not collapsed: {:?}", text));
            }
        }
        Block::Image { .. } => {}
    }
    Ok(())
}

fn random_string(rng: &mut Lcg, len: usize) -> String {
    let mut out = String::with_capacity(len);
    for _ in 0..len {
        let idx = rng.gen_range(0, CHARSET.len());
        let byte = CHARSET.get(idx).copied().unwrap_or(b' ');
        out.push(byte as char);
    }
    out
}

/// Lowercase words joined by single spaces; never a heading, image or stamp.
fn random_words(rng: &mut Lcg) -> String {
    let count = rng.gen_range(1, 12);
    let words: Vec<String> = (0..count)
        .map(|_| {
            let len = rng.gen_range(1, 9);
            (0..len)
                .map(|_| (b'a' + rng.gen_range(0, 26) as u8) as char)
                .collect()
        })
        .collect();
    words.join(" ")
}

struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        self.state
    }

    fn gen_range(&mut self, min: usize, max: usize) -> usize {
        if max <= min {
            return min;
        }
        let span = max - min;
        let value = (self.next() >> 1) as usize;
        min + (value % span)
    }
}
