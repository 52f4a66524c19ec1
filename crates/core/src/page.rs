//! Running extraction and refinement inside a loaded page.
//!
//! A [`PageContext`] executes a [`PageTask`] in every frame of a tab and
//! returns one result slot per frame. Slots are `None` when a frame failed.
//! [`LoadedPages`] is the in-process host: it keeps the HTML of each tab and
//! runs the task against a freshly parsed document.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::advisor::AiSuggestion;
use crate::extract::{PageSnapshot, extract};
use crate::parse::Document;
use crate::refine::refine;
use crate::{ReadLaterError, Result};

/// A browser tab as the pipeline sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub id: u64,
    pub url: String,
    pub title: String,
}

/// Work to run in the page
#[derive(Debug, Clone)]
pub enum PageTask {
    Extract,
    Refine(AiSuggestion),
}

/// Result of a [`PageTask`] in one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutput {
    Snapshot(PageSnapshot),
    Refined(String),
}

impl TaskOutput {
    pub fn into_snapshot(self) -> Option<PageSnapshot> {
        match self {
            Self::Snapshot(snapshot) => Some(snapshot),
            Self::Refined(_) => None,
        }
    }

    pub fn into_refined(self) -> Option<String> {
        match self {
            Self::Refined(html) => Some(html),
            Self::Snapshot(_) => None,
        }
    }
}

/// Capability to run code in a tab's page
#[async_trait]
pub trait PageContext: Send + Sync {
    /// Run `task` in `tab`.
    ///
    /// # Errors
    ///
    /// Returns [`ReadLaterError::Injection`] when the tab cannot be reached at all.
    async fn execute(&self, tab: &Tab, task: PageTask) -> Result<Vec<Option<TaskOutput>>>;
}

/// Pages held in memory by tab id
#[derive(Debug, Default)]
pub struct LoadedPages {
    pages: RwLock<HashMap<u64, String>>,
}

impl LoadedPages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load (or replace) the HTML shown in tab `id`
    pub async fn insert(&self, id: u64, html: impl Into<String>) {
        self.pages.write().await.insert(id, html.into());
    }

    /// Close tab `id`
    pub async fn remove(&self, id: u64) -> Option<String> {
        self.pages.write().await.remove(&id)
    }
}

#[async_trait]
impl PageContext for LoadedPages {
    async fn execute(&self, tab: &Tab, task: PageTask) -> Result<Vec<Option<TaskOutput>>> {
        let html = self
            .pages
            .read()
            .await
            .get(&tab.id)
            .cloned()
            .ok_or_else(|| ReadLaterError::Injection(format!("no page loaded in tab {}", tab.id)))?;

        Ok(vec![Some(run_task(&html, &tab.url, &task))])
    }
}

/// Parse `html` and run `task` against it, without crossing an await point
pub fn run_task(html: &str, page_url: &str, task: &PageTask) -> TaskOutput {
    let doc = match Document::parse_with_url(html, page_url) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::debug!(url = page_url, error = %e, "page url unusable as base, parsing without it");
            Document::parse(html)
        }
    };

    match task {
        PageTask::Extract => TaskOutput::Snapshot(extract(&doc)),
        PageTask::Refine(suggestion) => TaskOutput::Refined(refine(&doc, suggestion)),
    }
}
