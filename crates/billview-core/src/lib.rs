mod ast;
mod classify;
mod config;
mod context;
mod emit;
mod error;
mod highlight;
mod offsets;
mod parser;
mod prefs;
mod render;
mod slug;
mod storage;
mod tree;

pub use ast::{Block, Document};
pub use classify::{is_all_caps_short, is_safe_url, is_stamp_date};
pub use config::{CONFIG_ENV, CONFIG_FILE, Config, DEFAULT_DOCUMENT, DEFAULT_STORE, HighlightSettings};
pub use context::{CONTEXT_END, CONTEXT_START, chat_context};
pub use emit::{emit_html, emit_html_pretty, emit_html_sanitized, emit_inner_html, sanitize_html};
pub use error::{Error, Result};
pub use highlight::{
    FOCUS_CLASS, FOCUS_DURATION, HIGHLIGHT_CLASS, Highlight, HighlightColor, HighlightStore,
    IndexEntry, SNIPPET_MAX, apply_highlights, blur_highlight, clear_highlight_markup,
    focus_highlight, highlight_id_at, highlight_index, highlight_snippet, highlight_wrappers,
    index_summary, merge_highlight, new_highlight_id, parse_highlights, remove_highlight,
    render_highlight_index, serialize_highlights, unwrap_highlight, wrap_range,
};
pub use offsets::{
    Offsets, TextRange, char_to_utf16_offset, offsets_to_range, range_text, range_text_nodes,
    range_to_offsets, text_len, to_offset, utf16_to_char_offset,
};
pub use parser::{DEFAULT_ACT_TITLE, ParseOptions, parse, parse_with_options};
pub use prefs::{DisplayTheme, load_theme, save_theme, stored_theme, toggle_theme};
pub use render::{BillView, LETTER_SUMMARY, LoadErrorContext, RenderOutcome, TocEntry, render_blocks};
pub use slug::{SlugRegistry, slugify};
pub use storage::{COLOR_KEY, FileStore, HIGHLIGHTS_KEY, KeyValueStore, MemoryStore, THEME_KEY};
pub use tree::{Element, NodeId, NodeKind, Tree};
