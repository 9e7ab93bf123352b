use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use billview_core::{
    BillView, Block, Config, DisplayTheme, FileStore, HighlightColor, HighlightStore,
    LoadErrorContext, Offsets, Tree, emit_html, emit_html_pretty, emit_inner_html,
    index_summary, load_theme, parse_with_options, sanitize_html, save_theme, stored_theme,
    text_len, toggle_theme,
};
use billview_renderer::{PageParts, Renderer, Theme};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

const DEFAULT_TITLE: &str = "Bill";

#[derive(Parser)]
#[command(name = "billview", version)]
#[command(about = "Render a bill for reading and manage its highlights")]
struct Cli {
    /// Config file (defaults to $BILLVIEW_CONFIG, then ./billview.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render the document as an HTML page or fragment
    Render(RenderArgs),
    /// Print the table of contents as `id<TAB>label` lines
    Toc(InputArgs),
    /// Add, remove or list highlights in the store
    Highlight {
        /// Bill text the offsets refer to (defaults to the configured document)
        #[arg(long, global = true)]
        input: Option<PathBuf>,

        #[arg(long, global = true)]
        store: Option<PathBuf>,

        #[command(subcommand)]
        action: HighlightAction,
    },
    /// Show, set or toggle the stored display theme
    Theme {
        #[arg(long)]
        store: Option<PathBuf>,

        /// `light`, `dark` or `toggle`; prints the current theme when omitted
        value: Option<String>,
    },
    /// Print the document text wrapped for the chat endpoint
    Context(InputArgs),
    /// Write the stylesheet and script next to a `--raw` fragment
    Assets {
        dir: PathBuf,

        #[arg(long)]
        theme: Option<Theme>,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Bill text; `-` reads stdin. Defaults to the configured document.
    input: Option<PathBuf>,

    /// Highlight store (defaults to the configured store)
    #[arg(long)]
    store: Option<PathBuf>,
}

#[derive(Args)]
struct RenderArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Emit only the document fragment
    #[arg(long)]
    raw: bool,

    /// Run the output through the HTML sanitizer
    #[arg(long)]
    sanitized: bool,

    /// Indent the emitted markup
    #[arg(long)]
    pretty: bool,

    #[arg(long)]
    theme: Option<Theme>,

    /// Skip stored highlights
    #[arg(long)]
    no_highlights: bool,

    /// Leave out the inline page script
    #[arg(long)]
    no_script: bool,

    /// Render the load-error panel instead of failing when the input is unreadable
    #[arg(long)]
    fallback_html: bool,

    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum HighlightAction {
    /// Highlight `[START, END)` in document character offsets
    Add {
        start: usize,
        end: usize,

        #[arg(long)]
        color: Option<HighlightColor>,
    },
    Remove {
        id: String,
    },
    Clear,
    /// Print highlights in document order
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show or set the color used for new highlights
    Color {
        color: Option<HighlightColor>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Render(args) => render(&config, args),
        Command::Toc(input) => toc(&config, &input),
        Command::Highlight {
            input,
            store,
            action,
        } => highlight(&config, input.as_deref(), store.as_deref(), action),
        Command::Theme { store, value } => theme(&config, store, value.as_deref()),
        Command::Context(input) => context(&config, &input),
        Command::Assets { dir, theme } => {
            let theme = resolve_theme(&config, theme)?;
            Renderer::new(theme)
                .generate_files(&dir)
                .with_context(|| format!("failed to write assets to {}", dir.display()))
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn read_source(config: &Config, input: Option<&Path>) -> Result<String> {
    let path = input.unwrap_or(&config.document);
    if path == Path::new("-") {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read stdin")?;
        return Ok(buffer);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn store_path<'a>(config: &'a Config, store: Option<&'a Path>) -> &'a Path {
    store.unwrap_or(&config.store)
}

fn open_store(config: &Config, store: Option<&Path>) -> HighlightStore<FileStore> {
    let path = store_path(config, store);
    tracing::debug!(store = %path.display(), "opening highlight store");
    HighlightStore::load(FileStore::new(path)).with_snippet_max(config.highlights.snippet_max)
}

/// Parses and renders the input, returning the view and the page title.
fn load_view(config: &Config, input: Option<&Path>) -> Result<(BillView, String)> {
    let source = read_source(config, input)?;
    let document = parse_with_options(&source, &config.parser);
    let title = document
        .bill
        .iter()
        .chain(document.letter.iter())
        .find_map(|block| match block {
            Block::Heading { text, .. } => Some(text.clone()),
            _ => None,
        })
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());
    let mut view = BillView::new();
    view.render_source(&source, &document);
    Ok((view, title))
}

fn resolve_theme(config: &Config, flag: Option<Theme>) -> Result<Theme> {
    if let Some(theme) = flag {
        return Ok(theme);
    }
    config
        .theme
        .parse::<Theme>()
        .map_err(anyhow::Error::msg)
        .context("invalid `theme` in config")
}

fn render(config: &Config, args: RenderArgs) -> Result<()> {
    let store = args.input.store.as_deref();
    let (mut view, title) = match load_view(config, args.input.input.as_deref()) {
        Ok(loaded) => loaded,
        Err(err) if args.fallback_html => {
            tracing::warn!(error = %format!("{:#}", err), "rendering load-error panel");
            let mut view = BillView::new();
            view.render_load_error(LoadErrorContext::Network);
            (view, DEFAULT_TITLE.to_string())
        }
        Err(err) => return Err(err),
    };

    let highlights = open_store(config, store);
    let list = view.tree.create_element("div");
    let summary = if args.no_highlights {
        index_summary(0)
    } else {
        highlights.render(&mut view.tree, view.content);
        highlights.rebuild_index(&mut view.tree, view.content, list)
    };

    let emit = |tree: &Tree, node| {
        let html = if args.pretty {
            emit_html_pretty(tree, node)
        } else {
            emit_html(tree, node)
        };
        if args.sanitized { sanitize_html(&html) } else { html }
    };

    let html = if args.raw {
        emit(&view.tree, view.content)
    } else {
        let mut theme = resolve_theme(config, args.theme)?;
        if args.theme.is_none() && theme == Theme::Auto {
            if let Some(stored) = stored_theme(highlights.storage()) {
                theme = display_to_page(stored);
            }
        }
        let highlights_html = if args.sanitized {
            sanitize_html(&emit_inner_html(&view.tree, list))
        } else {
            emit_inner_html(&view.tree, list)
        };
        let parts = PageParts {
            title,
            toc_html: emit(&view.tree, view.toc),
            content_html: emit(&view.tree, view.content),
            highlights_summary: summary,
            highlights_html,
        };
        let renderer = Renderer::new(theme).with_title(parts.title.clone());
        renderer.embed_html(&renderer.layout(&parts), true, !args.no_script)
    };

    write_output(args.output.as_deref(), &html)
}

fn display_to_page(theme: DisplayTheme) -> Theme {
    match theme {
        DisplayTheme::Dark => Theme::Dark,
        DisplayTheme::Light => Theme::Light,
    }
}

fn write_output(path: Option<&Path>, html: &str) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, html).with_context(|| format!("failed to write {}", path.display()))
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(html.as_bytes())?;
            if !html.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
            Ok(())
        }
    }
}

fn toc(config: &Config, input: &InputArgs) -> Result<()> {
    let (view, _) = load_view(config, input.input.as_deref())?;
    for entry in view.toc_entries() {
        println!("{}\t{}", entry.id, entry.label);
    }
    Ok(())
}

fn context(config: &Config, input: &InputArgs) -> Result<()> {
    let (view, _) = load_view(config, input.input.as_deref())?;
    println!("{}", view.chat_context());
    Ok(())
}

fn highlight(
    config: &Config,
    input: Option<&Path>,
    store: Option<&Path>,
    action: HighlightAction,
) -> Result<()> {
    let mut store = open_store(config, store);

    match action {
        HighlightAction::Color { color } => {
            match color {
                Some(color) => store.set_color(color),
                None => println!("{}", store.color()),
            }
            return Ok(());
        }
        HighlightAction::Clear => {
            let mut tree = Tree::new();
            let root = tree.root();
            let count = store.len();
            store.clear(&mut tree, root);
            println!("cleared {} highlight(s)", count);
            return Ok(());
        }
        _ => {}
    }

    let (mut view, _) = load_view(config, input)?;
    store.render(&mut view.tree, view.content);

    match action {
        HighlightAction::Add { start, end, color } => {
            let total = text_len(&view.tree, view.content);
            let Some(offsets) = Offsets::new(start, end) else {
                bail!("highlight range is empty");
            };
            if offsets.end > total {
                bail!(
                    "highlight [{}, {}) is outside the document ({} characters)",
                    offsets.start,
                    offsets.end,
                    total
                );
            }
            let color = color.unwrap_or(store.color());
            let applied = store.apply_with_color(&mut view.tree, view.content, offsets, color);
            println!("{}\t{}\t{}\t{}", applied.id, applied.start, applied.end, applied.color);
        }
        HighlightAction::Remove { id } => {
            if !store.remove(&mut view.tree, view.content, &id) {
                bail!("no highlight with id {}", id);
            }
            println!("removed {}", id);
        }
        HighlightAction::List { json } => {
            let entries = store.index(&view.tree, view.content);
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                println!("{}", index_summary(entries.len()));
                for entry in entries {
                    println!(
                        "{}\t{}\t{}\t{}\t{}",
                        entry.number, entry.id, entry.color, entry.start, entry.snippet
                    );
                }
            }
        }
        HighlightAction::Color { .. } | HighlightAction::Clear => {}
    }
    Ok(())
}

fn theme(config: &Config, store: Option<PathBuf>, value: Option<&str>) -> Result<()> {
    let mut storage = FileStore::new(store_path(config, store.as_deref()));
    let theme = match value {
        None => load_theme(&storage),
        Some("toggle") => toggle_theme(&mut storage),
        Some(other) => {
            let Some(theme) = DisplayTheme::parse(other) else {
                bail!("unknown theme `{}` (expected light, dark or toggle)", other);
            };
            save_theme(&mut storage, theme);
            theme
        }
    };
    println!("{}", theme);
    Ok(())
}
