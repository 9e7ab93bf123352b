use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;

const BASE_CSS: &str = include_str!("../assets/billview.css");
const BASE_JS: &str = include_str!("../assets/billview.js");

const HIGHLIGHT_COLORS: [(&str, &str, &str); 4] = [
    ("gold", "rgba(250, 204, 21, 0.45)", "rgba(250, 204, 21, 0.35)"),
    ("green", "rgba(74, 222, 128, 0.4)", "rgba(74, 222, 128, 0.3)"),
    ("blue", "rgba(96, 165, 250, 0.4)", "rgba(96, 165, 250, 0.32)"),
    ("pink", "rgba(244, 114, 182, 0.4)", "rgba(244, 114, 182, 0.32)"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Auto,
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Auto => "auto",
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Theme::Auto),
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme `{}` (expected auto, light or dark)", other)),
        }
    }
}

/// The pieces of the reading page, each already serialized.
#[derive(Debug, Clone, Default)]
pub struct PageParts {
    pub title: String,
    pub toc_html: String,
    pub content_html: String,
    pub highlights_summary: String,
    pub highlights_html: String,
}

#[derive(Debug, Clone)]
pub struct Renderer {
    theme: Theme,
    title: Option<String>,
    custom_vars: BTreeMap<String, String>,
}

impl Renderer {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            title: None,
            custom_vars: BTreeMap::new(),
        }
    }

    /// Sets the document `<title>` written by `embed_html`.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_vars.insert(key.into(), value.into());
        self
    }

    /// Theme variables followed by the base stylesheet. An explicit
    /// `data-theme` on the root always wins over the media query.
    pub fn stylesheet(&self) -> String {
        let mut out = String::new();
        let (light_vars, dark_vars) = default_theme_vars();

        match self.theme {
            Theme::Auto => {
                out.push_str(&root_block(":root", &light_vars));
                out.push_str("@media (prefers-color-scheme: dark) {\n");
                out.push_str(&indent(&root_block(":root:not([data-theme=\"light\"])", &dark_vars)));
                out.push_str("}\n");
            }
            Theme::Light => out.push_str(&root_block(":root", &light_vars)),
            Theme::Dark => out.push_str(&root_block(":root", &dark_vars)),
        }
        out.push_str(&root_block(":root[data-theme=\"light\"]", &light_vars));
        out.push_str(&root_block(":root[data-theme=\"dark\"]", &dark_vars));

        if !self.custom_vars.is_empty() {
            out.push_str(&root_block(":root", &self.custom_vars));
        }

        out.push_str(BASE_CSS);
        out
    }

    /// Lays out the header, table of contents, document and highlight
    /// drawer around already-emitted fragments.
    pub fn layout(&self, parts: &PageParts) -> String {
        let mut out = String::new();
        out.push_str("<header class=\"page-header\">\n");
        out.push_str(&format!("  <h1>{}</h1>\n", escape_html(&parts.title)));
        out.push_str("  <button type=\"button\" id=\"theme-toggle\" aria-label=\"Toggle theme\">Theme</button>\n");
        out.push_str("</header>\n");
        out.push_str("<div class=\"page\">\n");
        out.push_str("<nav class=\"toc\" aria-label=\"Contents\">\n");
        out.push_str(&parts.toc_html);
        out.push_str("\n</nav>\n");
        out.push_str("<main>\n");
        out.push_str(&parts.content_html);
        out.push_str("\n</main>\n");
        out.push_str("<aside id=\"highlight-drawer\">\n");
        out.push_str(&format!(
            "<h2 id=\"highlight-summary\">{}</h2>\n",
            escape_html(&parts.highlights_summary)
        ));
        out.push_str("<div id=\"highlight-list\">");
        out.push_str(&parts.highlights_html);
        out.push_str("</div>\n");
        out.push_str("<button type=\"button\" id=\"clear-highlights\">Clear highlights</button>\n");
        out.push_str("</aside>\n");
        out.push_str("</div>\n");
        out.push_str(&highlight_toolbar());
        out
    }

    pub fn embed_html(&self, html: &str, with_inline_css: bool, with_inline_js: bool) -> String {
        let mut out = String::new();
        out.push_str("<!DOCTYPE html>\n");
        match self.theme {
            Theme::Auto => out.push_str("<html lang=\"en\">\n"),
            theme => out.push_str(&format!("<html lang=\"en\" data-theme=\"{}\">\n", theme)),
        }
        out.push_str("<head>\n");
        out.push_str("  <meta charset=\"utf-8\" />\n");
        out.push_str("  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />\n");
        if let Some(title) = &self.title {
            out.push_str(&format!("  <title>{}</title>\n", escape_html(title)));
        }
        if with_inline_css {
            out.push_str("  <style>\n");
            out.push_str(&self.stylesheet());
            out.push_str("\n  </style>\n");
        }
        out.push_str("</head>\n");
        out.push_str("<body>\n");
        out.push_str(html);
        if !html.ends_with('\n') {
            out.push('\n');
        }
        if with_inline_js {
            out.push_str("  <script>\n");
            out.push_str(BASE_JS);
            out.push_str("\n  </script>\n");
        }
        out.push_str("</body>\n");
        out.push_str("</html>\n");
        out
    }

    pub fn generate_files(&self, out_dir: &Path) -> io::Result<()> {
        fs::create_dir_all(out_dir)?;
        fs::write(out_dir.join("billview.css"), self.stylesheet())?;
        fs::write(out_dir.join("billview.js"), BASE_JS)?;
        Ok(())
    }
}

/// Floating toolbar shown over a text selection: one chip per color and
/// the apply button.
fn highlight_toolbar() -> String {
    let mut out = String::from(
        "<div class=\"highlight-toolbar\" id=\"highlight-toolbar\" data-open=\"false\" aria-hidden=\"true\">\n",
    );
    for (name, _, _) in HIGHLIGHT_COLORS {
        out.push_str(&format!(
            "  <button type=\"button\" class=\"color-chip\" data-color=\"{name}\" aria-label=\"{name}\"></button>\n"
        ));
    }
    out.push_str("  <button type=\"button\" id=\"apply-highlight\">Highlight</button>\n");
    out.push_str("</div>\n");
    out
}

fn default_theme_vars() -> (BTreeMap<String, String>, BTreeMap<String, String>) {
    let mut light = BTreeMap::from([
        ("--billview-bg".to_string(), "#fbfaf6".to_string()),
        ("--billview-fg".to_string(), "#1c1f24".to_string()),
        ("--billview-muted".to_string(), "#5f6873".to_string()),
        ("--billview-border".to_string(), "#d9dde2".to_string()),
        ("--billview-accent".to_string(), "#9a6b00".to_string()),
        ("--billview-panel".to_string(), "#f2f0e9".to_string()),
    ]);
    let mut dark = BTreeMap::from([
        ("--billview-bg".to_string(), "#101318".to_string()),
        ("--billview-fg".to_string(), "#e7ebf0".to_string()),
        ("--billview-muted".to_string(), "#98a2ad".to_string()),
        ("--billview-border".to_string(), "#29303a".to_string()),
        ("--billview-accent".to_string(), "#f5c451".to_string()),
        ("--billview-panel".to_string(), "#181d24".to_string()),
    ]);
    for (name, on_light, on_dark) in HIGHLIGHT_COLORS {
        light.insert(format!("--billview-hl-{}", name), on_light.to_string());
        dark.insert(format!("--billview-hl-{}", name), on_dark.to_string());
    }
    (light, dark)
}

fn root_block(selector: &str, vars: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    out.push_str(selector);
    out.push_str(" {\n");
    for (key, value) in vars {
        out.push_str("  ");
        out.push_str(key);
        out.push_str(": ");
        out.push_str(value);
        out.push_str(";\n");
    }
    out.push_str("}\n");
    out
}

fn indent(block: &str) -> String {
    block.lines().map(|line| format!("  {}\n", line)).collect()
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
