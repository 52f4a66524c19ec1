mod echo;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use readlater_core::advisor::OPENAI_CHAT_URL;
use readlater_core::{
    AdvisorConfig, Document, FetchConfig, ItemQuery, JsonFileStore, KeyValueStore, Library, LoadedPages, OpenAiAdvisor,
    SavePipeline, SavedItem, Settings, SortOrder, Tab, extract, fetch_file, fetch_stdin, fetch_url, initialize,
};
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::echo::*;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Items shown by `list --recent`, matching the popup
const RECENT_LIMIT: usize = 5;

/// Save web pages to read later, with optional AI-assisted cleanup
#[derive(Parser, Debug)]
#[command(name = "readlater")]
#[command(version)]
#[command(about = "Save web pages to read later", long_about = None)]
struct Cli {
    /// Store file (default: <data dir>/readlater/store.json)
    #[arg(long, global = true, value_name = "FILE")]
    store: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract a page and save it
    Save {
        /// URL to fetch, local HTML file, or "-" for stdin
        #[arg(value_name = "INPUT")]
        input: String,

        /// Tag to attach (repeatable)
        #[arg(short = 't', long = "tag", value_name = "TAG")]
        tags: Vec<String>,

        /// Page URL to save under (required for stdin)
        #[arg(long, value_name = "URL")]
        url: Option<String>,

        /// HTTP timeout in seconds
        #[arg(long, default_value = "30", value_name = "SECS")]
        timeout: u64,

        /// Custom User-Agent for HTTP requests
        #[arg(long, value_name = "UA")]
        user_agent: Option<String>,

        /// Chat-completion endpoint used for AI parsing
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,
    },

    /// Save a link without fetching it
    Link {
        #[arg(value_name = "URL")]
        url: String,

        /// Title to store (defaults to the URL)
        #[arg(long)]
        title: Option<String>,

        /// Tag to attach (repeatable)
        #[arg(short = 't', long = "tag", value_name = "TAG")]
        tags: Vec<String>,
    },

    /// Print what the extractor captures from a page, as JSON
    Extract {
        /// URL to fetch, local HTML file, or "-" for stdin
        #[arg(value_name = "INPUT")]
        input: String,

        /// Base URL for resolving image sources
        #[arg(long, value_name = "URL")]
        url: Option<String>,

        /// HTTP timeout in seconds
        #[arg(long, default_value = "30", value_name = "SECS")]
        timeout: u64,

        /// Custom User-Agent for HTTP requests
        #[arg(long, value_name = "UA")]
        user_agent: Option<String>,
    },

    /// List saved items
    List {
        /// Only items with any of these tags (repeatable)
        #[arg(short = 't', long = "tag", value_name = "TAG")]
        tags: Vec<String>,

        /// Only unread items
        #[arg(long)]
        unread: bool,

        /// Case-insensitive search over title, text, tags, URL and description
        #[arg(short, long, value_name = "TERM")]
        search: Option<String>,

        /// Sort order (newest, oldest, title)
        #[arg(long, default_value = "newest", value_name = "ORDER")]
        sort: SortOrder,

        /// Maximum number of items
        #[arg(short = 'n', long, value_name = "NUM")]
        limit: Option<usize>,

        /// Show only the most recent items, as the popup does
        #[arg(long, conflicts_with_all = ["tags", "unread", "search", "limit"])]
        recent: bool,

        /// Print items as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print an item's saved text and mark it read
    Read { id: i64 },

    /// Flip an item between read and unread
    ToggleRead { id: i64 },

    /// Replace an item's tags
    Tag {
        id: i64,
        #[arg(value_name = "TAG")]
        tags: Vec<String>,
    },

    /// List every tag in use
    Tags,

    /// Delete an item
    Delete { id: i64 },

    /// Show or change settings
    Settings {
        /// Send saves through the AI advisor
        #[arg(long, value_name = "BOOL")]
        ai_parsing: Option<bool>,

        /// Reader dark mode
        #[arg(long, value_name = "BOOL")]
        dark_mode: Option<bool>,

        /// API key for the advisor
        #[arg(long, value_name = "KEY")]
        api_key: Option<String>,

        /// Model name sent to the advisor
        #[arg(long, value_name = "MODEL")]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        print_banner();
        print_info("Debug logging enabled");
        eprintln!();
    }

    if let Err(e) = run(cli).await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let store = open_store(cli.store)?;
    initialize(store.as_ref()).await.context("Failed to initialize store")?;
    let library = Library::new(store.clone());
    let verbose = cli.verbose;

    match cli.command {
        Command::Save { input, tags, url, timeout, user_agent, endpoint } => {
            let fetch = fetch_config(timeout, user_agent);
            let settings = Settings::load(store.as_ref()).await.context("Failed to load settings")?;

            if verbose {
                print_step(1, 3, &format!("Loading {}", input.bright_white()));
            }
            let page_url = page_url(&input, url.as_deref())?;
            let html = read_input(&input, &fetch).await?;
            let title = tab_title(&html, &page_url);
            let tab = Tab { id: 1, url: page_url, title };

            if verbose {
                print_detail("Size", &format_size(html.len()));
                print_detail("URL", &tab.url);
                print_step(2, 3, "Extracting content");
            }
            if settings.use_ai_parsing && !settings.ai_enabled() {
                print_warning("AI parsing is on but no API key is set, saving without refinement");
            } else if verbose && settings.ai_enabled() {
                print_detail("Advisor", settings.model());
            }

            let advisor = OpenAiAdvisor::new(AdvisorConfig {
                endpoint: endpoint.unwrap_or_else(|| OPENAI_CHAT_URL.to_string()),
                timeout: Some(timeout),
            })
            .context("Failed to build advisor client")?;
            let pages = Arc::new(LoadedPages::new());
            pages.insert(tab.id, html).await;
            let pipeline = SavePipeline::new(store, Arc::new(advisor), pages);

            if verbose {
                print_step(3, 3, "Saving");
            }
            let item = pipeline.save(&tab, &tags, &settings).await.context("Failed to save page")?;
            report_saved(&item);
        }
        Command::Link { url, title, tags } => {
            let url = normalize_url(&url)?;
            let title = title.unwrap_or_else(|| url.clone());
            let pipeline = SavePipeline::new(store, Arc::new(OpenAiAdvisor::default()), Arc::new(LoadedPages::new()));
            let item = pipeline.save_link(&url, &title, &tags).await.context("Failed to save link")?;
            report_saved(&item);
        }
        Command::Extract { input, url, timeout, user_agent } => {
            let html = read_input(&input, &fetch_config(timeout, user_agent)).await?;
            let base = url.or_else(|| is_http(&input).then(|| input.clone()));
            let doc = match base {
                Some(base) => Document::parse_with_url(&html, &base).context("Invalid base URL")?,
                None => Document::parse(&html),
            };
            let snapshot = extract(&doc);
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Command::List { tags, unread, search, sort, limit, recent, json } => {
            let items = if recent {
                library.recent(RECENT_LIMIT).await?
            } else {
                let mut items = library.query(&ItemQuery { tags, unread_only: unread, search, sort }).await?;
                if let Some(limit) = limit {
                    items.truncate(limit);
                }
                items
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else if items.is_empty() {
                print_info("No saved items");
            } else {
                for item in &items {
                    println!("{}", format_item(item));
                }
            }
        }
        Command::Read { id } => {
            let mut item = library.mark_read(id).await?.with_context(|| format!("No item with id {id}"))?;
            if item.content.is_empty() && is_http(&item.url) {
                item = match fill_from_page(&library, &item, verbose).await {
                    Ok(filled) => filled,
                    Err(e) => {
                        print_warning(&format!("Could not load the page, open it directly: {e:#}"));
                        item
                    }
                };
            }
            println!("{}\n{}\n", item.title.bold(), item.url.dimmed());
            if item.text_content.is_empty() {
                print_info("No saved text for this item");
            } else {
                println!("{}", item.text_content);
            }
        }
        Command::ToggleRead { id } => {
            let item = library.toggle_read(id).await?.with_context(|| format!("No item with id {id}"))?;
            let state = if item.is_read { "read" } else { "unread" };
            print_success(&format!("Marked {} as {}", item.id, state));
        }
        Command::Tag { id, tags } => {
            let item = library.set_tags(id, &tags).await?.with_context(|| format!("No item with id {id}"))?;
            println!("{}", item.tags.iter().cloned().collect::<Vec<_>>().join(" "));
        }
        Command::Tags => {
            for tag in library.all_tags().await? {
                println!("{tag}");
            }
        }
        Command::Delete { id } => {
            if !library.delete(id).await? {
                bail!("No item with id {id}");
            }
            print_success(&format!("Deleted {id}"));
        }
        Command::Settings { ai_parsing, dark_mode, api_key, model } => {
            let mut settings = Settings::load(store.as_ref()).await.context("Failed to load settings")?;
            let changed = ai_parsing.is_some() || dark_mode.is_some() || api_key.is_some() || model.is_some();

            if let Some(value) = ai_parsing {
                settings.use_ai_parsing = value;
            }
            if let Some(value) = dark_mode {
                settings.dark_mode = value;
            }
            if let Some(value) = api_key {
                settings.openai_api_key = value;
            }
            if let Some(value) = model {
                settings.openai_model = value;
            }

            if changed {
                settings.save(store.as_ref()).await.context("Failed to save settings")?;
                print_success("Settings saved");
            }

            let mut shown = settings;
            if !shown.openai_api_key.is_empty() {
                shown.openai_api_key = "********".to_string();
            }
            println!("{}", serde_json::to_string_pretty(&shown)?);
        }
    }

    Ok(())
}

fn open_store(path: Option<PathBuf>) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    let path = match path {
        Some(path) => path,
        None => JsonFileStore::default_path().context("No data directory available, pass --store")?,
    };
    tracing::debug!(path = %path.display(), "opening store");
    Ok(Arc::new(JsonFileStore::new(path)))
}

fn fetch_config(timeout: u64, user_agent: Option<String>) -> FetchConfig {
    let defaults = FetchConfig::default();
    FetchConfig { timeout, user_agent: user_agent.unwrap_or(defaults.user_agent) }
}

fn is_http(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

async fn read_input(input: &str, config: &FetchConfig) -> anyhow::Result<String> {
    if input == "-" {
        fetch_stdin().await.context("Failed to read from stdin")
    } else if is_http(input) {
        fetch_url(input, config).await.context("Failed to fetch URL")
    } else {
        fetch_file(input).await.with_context(|| format!("Failed to read file: {input}"))
    }
}

/// Canonical form of a URL, so the same page always maps to the same item
fn normalize_url(url: &str) -> anyhow::Result<String> {
    Ok(Url::parse(url).with_context(|| format!("Invalid URL: {url}"))?.to_string())
}

/// Fetch and extract a link saved without content, storing what was found
async fn fill_from_page(library: &Library, item: &SavedItem, verbose: bool) -> anyhow::Result<SavedItem> {
    if verbose {
        print_info(&format!("Loading {}", item.url));
    }
    let html = fetch_url(&item.url, &FetchConfig::default()).await.context("Failed to fetch URL")?;
    let snapshot = {
        let doc = Document::parse_with_url(&html, &item.url).context("Invalid page URL")?;
        extract(&doc)
    };
    library
        .fill_content(item.id, &snapshot)
        .await?
        .with_context(|| format!("No item with id {}", item.id))
}

/// URL the page is saved under: `--url`, the fetched URL, or the file's `file://` URL
fn page_url(input: &str, explicit: Option<&str>) -> anyhow::Result<String> {
    if let Some(url) = explicit {
        return normalize_url(url);
    }
    if is_http(input) {
        return normalize_url(input);
    }
    if input == "-" {
        bail!("--url is required when reading from stdin");
    }

    let absolute = std::fs::canonicalize(input).with_context(|| format!("Failed to read file: {input}"))?;
    Url::from_file_path(&absolute)
        .map(|u| u.to_string())
        .map_err(|_| anyhow::anyhow!("Cannot build a file URL for {}", absolute.display()))
}

/// What a browser tab would show as its title
fn tab_title(html: &str, page_url: &str) -> String {
    let title = Document::parse(html).title();
    if title.is_empty() { page_url.to_string() } else { title }
}

fn report_saved(item: &SavedItem) {
    print_success(&format!("Saved {}", item.title.bright_white()));
    println!("{}", item.id);
}
