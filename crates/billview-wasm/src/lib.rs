use billview_core::{
    BillView, Error, FOCUS_DURATION, Highlight, HighlightColor, HighlightStore, KeyValueStore,
    LoadErrorContext, NodeId, Offsets, ParseOptions, blur_highlight, char_to_utf16_offset,
    emit_html, emit_inner_html, focus_highlight, load_theme, toggle_theme, utf16_to_char_offset,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// `window.localStorage`, or nothing when the browser denies it. Reads and
/// writes against a missing storage fail and the store keeps going in memory.
pub struct LocalStorage {
    storage: Option<web_sys::Storage>,
}

impl LocalStorage {
    pub fn open() -> Self {
        let storage = web_sys::window().and_then(|window| window.local_storage().ok().flatten());
        if storage.is_none() {
            tracing::warn!("localStorage unavailable, highlights will not persist");
        }
        Self { storage }
    }

    fn storage(&self) -> billview_core::Result<&web_sys::Storage> {
        self.storage
            .as_ref()
            .ok_or_else(|| Error::StorageUnavailable("localStorage".to_string()))
    }
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> billview_core::Result<Option<String>> {
        self.storage()?
            .get_item(key)
            .map_err(|err| Error::StorageUnavailable(js_message(&err)))
    }

    fn set(&mut self, key: &str, value: &str) -> billview_core::Result<()> {
        self.storage()?
            .set_item(key, value)
            .map_err(|err| Error::StorageWrite {
                key: key.to_string(),
                message: js_message(&err),
            })
    }
}

fn js_message(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|err| JsValue::from_str(&err.to_string()))
}

/// The reading view for one page: document tree, highlight store and the
/// highlight index list, all owned here.
#[wasm_bindgen]
pub struct Viewer {
    view: BillView,
    store: HighlightStore<LocalStorage>,
    options: ParseOptions,
    index_list: NodeId,
}

#[wasm_bindgen]
impl Viewer {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Viewer {
        console_error_panic_hook::set_once();
        let mut view = BillView::new();
        let index_list = view.tree.create_element("div");
        Viewer {
            view,
            store: HighlightStore::load(LocalStorage::open()),
            options: ParseOptions::default(),
            index_list,
        }
    }

    /// Overrides the act title marker used to split letter from bill.
    #[wasm_bindgen(js_name = setActTitle)]
    pub fn set_act_title(&mut self, title: &str) {
        self.options.act_title = title.to_string();
    }

    /// Renders `text`, applies stored highlights and returns the content HTML.
    #[wasm_bindgen(js_name = loadText)]
    pub fn load_text(&mut self, text: &str) -> String {
        self.view.render_text(text, &self.options);
        self.store.render(&mut self.view.tree, self.view.content);
        self.html()
    }

    #[wasm_bindgen(js_name = loadError)]
    pub fn load_error(&mut self, file_protocol: bool) -> String {
        let context = if file_protocol {
            LoadErrorContext::FileProtocol
        } else {
            LoadErrorContext::Network
        };
        self.view.render_load_error(context);
        self.html()
    }

    pub fn html(&self) -> String {
        emit_inner_html(&self.view.tree, self.view.content)
    }

    #[wasm_bindgen(js_name = tocHtml)]
    pub fn toc_html(&self) -> String {
        emit_inner_html(&self.view.tree, self.view.toc)
    }

    pub fn toc(&self) -> Result<JsValue, JsValue> {
        to_js(&self.view.toc_entries())
    }

    #[wasm_bindgen(js_name = plainText)]
    pub fn plain_text(&self) -> String {
        self.view.plain_text()
    }

    #[wasm_bindgen(js_name = chatContext)]
    pub fn chat_context(&self) -> String {
        self.view.chat_context()
    }

    /// Highlights `[start, end)` in the active color. Returns the stored
    /// record, or `null` for an empty range.
    pub fn apply(&mut self, start: usize, end: usize) -> Result<JsValue, JsValue> {
        let Some(offsets) = Offsets::new(start, end) else {
            return Ok(JsValue::NULL);
        };
        let applied = self
            .store
            .apply(&mut self.view.tree, self.view.content, offsets);
        to_js(&applied)
    }

    /// Same as `apply`, with `start` and `end` in UTF-16 code units as a
    /// DOM `Range` or `TreeWalker` walk measures them.
    #[wasm_bindgen(js_name = applyUtf16)]
    pub fn apply_utf16(&mut self, start: usize, end: usize) -> Result<JsValue, JsValue> {
        let text = self.view.plain_text();
        let (Some(start), Some(end)) = (
            utf16_to_char_offset(&text, start),
            utf16_to_char_offset(&text, end),
        ) else {
            return Err(JsValue::from_str("offset outside the document text"));
        };
        self.apply(start, end)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.store
            .remove(&mut self.view.tree, self.view.content, id)
    }

    pub fn clear(&mut self) {
        self.store.clear(&mut self.view.tree, self.view.content);
    }

    pub fn highlights(&self) -> Result<JsValue, JsValue> {
        to_js(&self.store.highlights())
    }

    #[wasm_bindgen(js_name = setColor)]
    pub fn set_color(&mut self, color: &str) -> Result<(), JsValue> {
        let color: HighlightColor = color.parse().map_err(|err: String| JsValue::from_str(&err))?;
        self.store.set_color(color);
        Ok(())
    }

    pub fn color(&self) -> String {
        self.store.color().to_string()
    }

    pub fn index(&self) -> Result<JsValue, JsValue> {
        to_js(&self.store.index(&self.view.tree, self.view.content))
    }

    /// Rebuilds the index list and returns `[summary, html]`.
    #[wasm_bindgen(js_name = indexHtml)]
    pub fn index_html(&mut self) -> Result<JsValue, JsValue> {
        let summary =
            self.store
                .rebuild_index(&mut self.view.tree, self.view.content, self.index_list);
        let html = emit_inner_html(&self.view.tree, self.index_list);
        to_js(&(summary, html))
    }

    /// Marks the highlight focused and returns the number of wrappers. The
    /// caller blurs it after `focusDurationMs()`.
    pub fn focus(&mut self, id: &str) -> usize {
        focus_highlight(&mut self.view.tree, self.view.content, id).len()
    }

    pub fn blur(&mut self, id: &str) {
        blur_highlight(&mut self.view.tree, self.view.content, id);
    }

    pub fn theme(&self) -> String {
        load_theme(self.store.storage()).to_string()
    }

    #[wasm_bindgen(js_name = toggleTheme)]
    pub fn toggle_theme(&mut self) -> String {
        toggle_theme(self.store.storage_mut()).to_string()
    }

    /// Full `<body>` markup, for hosts that swap the whole view at once.
    #[wasm_bindgen(js_name = documentHtml)]
    pub fn document_html(&self) -> String {
        emit_html(&self.view.tree, self.view.tree.root())
    }
}

impl Default for Viewer {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen(js_name = parseBill)]
pub fn parse_bill(text: &str) -> Result<JsValue, JsValue> {
    to_js(&billview_core::parse(text))
}

/// Merges `next` into `set`, both plain `{id,start,end,color}` objects.
#[wasm_bindgen(js_name = mergeHighlight)]
pub fn merge_highlight(set: JsValue, next: JsValue) -> Result<JsValue, JsValue> {
    let set: Vec<Highlight> =
        serde_wasm_bindgen::from_value(set).map_err(|err| JsValue::from_str(&err.to_string()))?;
    let next: Highlight =
        serde_wasm_bindgen::from_value(next).map_err(|err| JsValue::from_str(&err.to_string()))?;
    to_js(&billview_core::merge_highlight(&set, next))
}

#[wasm_bindgen(js_name = isSafeUrl)]
pub fn is_safe_url(url: &str) -> bool {
    billview_core::is_safe_url(url)
}

#[wasm_bindgen(js_name = utf16ToCharOffset)]
pub fn utf16_to_char(text: &str, offset: usize) -> Option<usize> {
    utf16_to_char_offset(text, offset)
}

#[wasm_bindgen(js_name = charToUtf16Offset)]
pub fn char_to_utf16(text: &str, offset: usize) -> Option<usize> {
    char_to_utf16_offset(text, offset)
}

#[wasm_bindgen(js_name = focusDurationMs)]
pub fn focus_duration_ms() -> u32 {
    FOCUS_DURATION.as_millis() as u32
}

#[wasm_bindgen(js_name = newHighlightId)]
pub fn new_highlight_id() -> String {
    billview_core::new_highlight_id()
}

/// Page stylesheet for `auto`, `light` or `dark`.
#[wasm_bindgen]
pub fn stylesheet(theme: &str) -> Result<String, JsValue> {
    let theme: billview_renderer::Theme = theme.parse().map_err(|err: String| JsValue::from_str(&err))?;
    Ok(billview_renderer::Renderer::new(theme).stylesheet())
}
