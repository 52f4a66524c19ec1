//! The save flow: extract a tab, optionally refine with the advisor, persist.
//!
//! Each save is one sequential chain. Extraction, advisor and refinement
//! failures degrade the saved content instead of failing the save; only store
//! errors reach the caller.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use readlater_core::{LoadedPages, MemoryStore, OpenAiAdvisor, SavePipeline, Settings, Tab};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> readlater_core::Result<()> {
//! let pages = Arc::new(LoadedPages::new());
//! pages.insert(1, "<html><body><article><p>Hello</p></article></body></html>").await;
//!
//! let pipeline = SavePipeline::new(Arc::new(MemoryStore::new()), Arc::new(OpenAiAdvisor::default()), pages);
//! let tab = Tab { id: 1, url: "https://example.com/hello".into(), title: "Hello".into() };
//! let item = pipeline.save(&tab, &["greetings".to_string()], &Settings::default()).await?;
//! assert_eq!(item.text_content, "Hello");
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use time::OffsetDateTime;

use crate::Result;
use crate::advisor::{Advisor, AdvisorRequest};
use crate::extract::PageSnapshot;
use crate::library::{ItemDraft, Library, SavedItem};
use crate::page::{PageContext, PageTask, Tab, TaskOutput};
use crate::settings::Settings;
use crate::store::KeyValueStore;

/// Coordinates page extraction, advisor refinement and persistence
#[derive(Clone)]
pub struct SavePipeline {
    library: Library,
    advisor: Arc<dyn Advisor>,
    page: Arc<dyn PageContext>,
}

impl SavePipeline {
    pub fn new(store: Arc<dyn KeyValueStore>, advisor: Arc<dyn Advisor>, page: Arc<dyn PageContext>) -> Self {
        Self { library: Library::new(store), advisor, page }
    }

    /// The library items are saved into
    pub fn library(&self) -> &Library {
        &self.library
    }

    /// Save the page shown in `tab` with `tags`.
    ///
    /// # Errors
    ///
    /// Only store read/write failures are returned.
    pub async fn save(&self, tab: &Tab, tags: &[String], settings: &Settings) -> Result<SavedItem> {
        let Some(snapshot) = self.snapshot(tab).await else {
            tracing::warn!(url = tab.url.as_str(), "page could not be extracted, saving link only");
            return self.persist(ItemDraft::bare(&tab.url, &tab.title, tags)).await;
        };

        let content = if settings.ai_enabled() {
            self.refined_content(tab, &snapshot, settings).await
        } else {
            snapshot.content.clone()
        };

        let draft = ItemDraft {
            url: tab.url.clone(),
            title: snapshot.title,
            tags: tags.iter().cloned().collect(),
            content,
            text_content: snapshot.text_excerpt,
            meta_description: snapshot.meta_description,
        };
        self.persist(draft).await
    }

    /// Save a link without visiting it
    pub async fn save_link(&self, url: &str, title: &str, tags: &[String]) -> Result<SavedItem> {
        self.persist(ItemDraft::bare(url, title, tags)).await
    }

    async fn persist(&self, draft: ItemDraft) -> Result<SavedItem> {
        let item = self.library.upsert(draft, OffsetDateTime::now_utc()).await?;
        tracing::info!(id = item.id, url = item.url.as_str(), tags = item.tags.len(), "saved item");
        Ok(item)
    }

    /// First frame's snapshot, or `None` on any transport failure
    async fn snapshot(&self, tab: &Tab) -> Option<PageSnapshot> {
        match self.page.execute(tab, PageTask::Extract).await {
            Ok(slots) => {
                let snapshot = slots.into_iter().next().flatten().and_then(TaskOutput::into_snapshot);
                if snapshot.is_none() {
                    tracing::debug!(url = tab.url.as_str(), "extraction returned no snapshot");
                }
                snapshot
            }
            Err(e) => {
                tracing::debug!(url = tab.url.as_str(), error = %e, "extraction could not run");
                None
            }
        }
    }

    /// Advisor-refined HTML, or the snapshot's raw content when any step fails
    async fn refined_content(&self, tab: &Tab, snapshot: &PageSnapshot, settings: &Settings) -> String {
        let request = AdvisorRequest::from_snapshot(&tab.url, snapshot, settings);

        let suggestion = match self.advisor.suggest(&request).await {
            Ok(suggestion) => suggestion,
            Err(e) => {
                tracing::warn!(url = tab.url.as_str(), error = %e, "advisor failed, keeping raw content");
                return snapshot.content.clone();
            }
        };
        tracing::debug!(?suggestion, "advisor suggestion");

        match self.page.execute(tab, PageTask::Refine(suggestion)).await {
            Ok(slots) => match slots.into_iter().next().flatten().and_then(TaskOutput::into_refined) {
                Some(html) => html,
                None => {
                    tracing::warn!(url = tab.url.as_str(), "refinement returned nothing, keeping raw content");
                    snapshot.content.clone()
                }
            },
            Err(e) => {
                tracing::warn!(url = tab.url.as_str(), error = %e, "refinement failed, keeping raw content");
                snapshot.content.clone()
            }
        }
    }
}
