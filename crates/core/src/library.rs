//! Saved items and the operations the list and popup views perform on them.
//!
//! The whole collection lives under one store key and every mutation is a
//! read-modify-write of that document. URL is the identity for saving
//! (one item per URL); `id` is the identity for editing and deleting.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::Result;
use crate::extract::PageSnapshot;
use crate::store::{self, KeyValueStore};

/// Store key of the item collection
pub const ITEMS_KEY: &str = "readLater";

/// A saved page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedItem {
    /// Creation time in milliseconds, stable across re-saves
    pub id: i64,
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub text_content: String,
    #[serde(default)]
    pub meta_description: String,
    /// Time of the latest save
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    #[serde(default)]
    pub is_read: bool,
}

/// The fields a save provides
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemDraft {
    pub url: String,
    pub title: String,
    pub tags: BTreeSet<String>,
    pub content: String,
    pub text_content: String,
    pub meta_description: String,
}

impl ItemDraft {
    /// A draft with only a URL, title and tags
    pub fn bare(url: &str, title: &str, tags: &[String]) -> Self {
        Self {
            url: url.to_string(),
            title: title.to_string(),
            tags: tags.iter().cloned().collect(),
            ..Default::default()
        }
    }
}

/// Ordering for list views
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    Title,
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            "title" => Ok(Self::Title),
            _ => Err(format!("Invalid sort order: {}. Valid options: newest, oldest, title", s)),
        }
    }
}

/// Filters applied by the list view
#[derive(Debug, Clone, Default)]
pub struct ItemQuery {
    /// Keep items carrying any of these tags (empty keeps all)
    pub tags: Vec<String>,
    /// Keep only unread items
    pub unread_only: bool,
    /// Case-insensitive term matched against title, text, tags, URL and description
    pub search: Option<String>,
    pub sort: SortOrder,
}

impl ItemQuery {
    /// Whether `item` passes the tag, read-state and search filters
    pub fn matches(&self, item: &SavedItem) -> bool {
        if !self.tags.is_empty() && !self.tags.iter().any(|t| item.tags.contains(t)) {
            return false;
        }

        if self.unread_only && item.is_read {
            return false;
        }

        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                item.title.to_lowercase().contains(&term)
                    || item.text_content.to_lowercase().contains(&term)
                    || item.tags.iter().any(|t| t.to_lowercase().contains(&term))
                    || item.url.to_lowercase().contains(&term)
                    || item.meta_description.to_lowercase().contains(&term)
            }
            _ => true,
        }
    }
}

/// Sort items in place
pub fn sort_items(items: &mut [SavedItem], order: SortOrder) {
    items.sort_by(|a, b| match order {
        SortOrder::Newest => b.date.cmp(&a.date),
        SortOrder::Oldest => a.date.cmp(&b.date),
        SortOrder::Title => a.title.cmp(&b.title),
    });
}

/// Insert `draft`, or update the item with the same URL.
///
/// An update keeps the existing `id` and read state, overwrites title,
/// content, text, description and date, and unions the tag sets.
pub fn upsert_into(items: &mut Vec<SavedItem>, draft: ItemDraft, now: OffsetDateTime) -> SavedItem {
    if let Some(existing) = items.iter_mut().find(|item| item.url == draft.url) {
        existing.title = draft.title;
        existing.tags.extend(draft.tags);
        existing.content = draft.content;
        existing.text_content = draft.text_content;
        existing.meta_description = draft.meta_description;
        existing.date = now;
        return existing.clone();
    }

    let item = SavedItem {
        id: next_id(items, now),
        url: draft.url,
        title: draft.title,
        tags: draft.tags,
        content: draft.content,
        text_content: draft.text_content,
        meta_description: draft.meta_description,
        date: now,
        is_read: false,
    };
    items.push(item.clone());
    item
}

/// Creation timestamp in ms, bumped past the largest id if already taken
fn next_id(items: &[SavedItem], now: OffsetDateTime) -> i64 {
    let millis = i64::try_from(now.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX);
    if items.iter().any(|item| item.id == millis) {
        items.iter().map(|item| item.id).max().map_or(millis, |max| max.saturating_add(1))
    } else {
        millis
    }
}

/// Typed access to the item collection in a store
#[derive(Clone)]
pub struct Library {
    store: Arc<dyn KeyValueStore>,
}

impl Library {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// All items in stored order
    pub async fn items(&self) -> Result<Vec<SavedItem>> {
        Ok(store::load(self.store.as_ref(), ITEMS_KEY).await?.unwrap_or_default())
    }

    async fn replace(&self, items: &[SavedItem]) -> Result<()> {
        store::save(self.store.as_ref(), ITEMS_KEY, items).await
    }

    pub async fn get(&self, id: i64) -> Result<Option<SavedItem>> {
        Ok(self.items().await?.into_iter().find(|item| item.id == id))
    }

    /// Insert or update by URL, stamping the item with `now`
    pub async fn upsert(&self, draft: ItemDraft, now: OffsetDateTime) -> Result<SavedItem> {
        let mut items = self.items().await?;
        let item = upsert_into(&mut items, draft, now);
        self.replace(&items).await?;
        Ok(item)
    }

    /// Remove the item with `id`; returns whether one was removed
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let mut items = self.items().await?;
        let before = items.len();
        items.retain(|item| item.id != id);
        if items.len() == before {
            return Ok(false);
        }
        self.replace(&items).await?;
        Ok(true)
    }

    /// Flip the read state of `id`
    pub async fn toggle_read(&self, id: i64) -> Result<Option<SavedItem>> {
        self.update(id, |item| item.is_read = !item.is_read).await
    }

    /// Mark `id` as read, as opening it in the reader does
    pub async fn mark_read(&self, id: i64) -> Result<Option<SavedItem>> {
        self.update(id, |item| item.is_read = true).await
    }

    /// Store content extracted later for `id`, e.g. for a link saved without fetching.
    /// A title that is empty or just the URL is replaced by the page title, if it has one.
    pub async fn fill_content(&self, id: i64, snapshot: &PageSnapshot) -> Result<Option<SavedItem>> {
        self.update(id, |item| {
            item.content = snapshot.content.clone();
            item.text_content = snapshot.text_excerpt.clone();
            item.meta_description = snapshot.meta_description.clone();
            if !snapshot.title.is_empty() && (item.title.trim().is_empty() || item.title == item.url) {
                item.title = snapshot.title.clone();
            }
        })
        .await
    }

    /// Replace the tags of `id`
    pub async fn set_tags(&self, id: i64, tags: &[String]) -> Result<Option<SavedItem>> {
        let tags: BTreeSet<String> = tags.iter().map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect();
        self.update(id, move |item| item.tags = tags).await
    }

    async fn update(&self, id: i64, change: impl FnOnce(&mut SavedItem)) -> Result<Option<SavedItem>> {
        let mut items = self.items().await?;
        let Some(item) = items.iter_mut().find(|item| item.id == id) else {
            return Ok(None);
        };
        change(item);
        let updated = item.clone();
        self.replace(&items).await?;
        Ok(Some(updated))
    }

    /// Every tag in use, sorted and deduplicated
    pub async fn all_tags(&self) -> Result<Vec<String>> {
        let tags: BTreeSet<String> = self.items().await?.into_iter().flat_map(|item| item.tags).collect();
        Ok(tags.into_iter().collect())
    }

    /// Items passing `query`, in its sort order
    pub async fn query(&self, query: &ItemQuery) -> Result<Vec<SavedItem>> {
        let mut items: Vec<SavedItem> = self.items().await?.into_iter().filter(|item| query.matches(item)).collect();
        sort_items(&mut items, query.sort);
        Ok(items)
    }

    /// The `limit` most recently saved items
    pub async fn recent(&self, limit: usize) -> Result<Vec<SavedItem>> {
        let mut items = self.items().await?;
        sort_items(&mut items, SortOrder::Newest);
        items.truncate(limit);
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use time::macros::datetime;

    fn tags(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    fn draft(url: &str, title: &str, tag_list: &[&str]) -> ItemDraft {
        ItemDraft { url: url.to_string(), title: title.to_string(), tags: tags(tag_list), ..Default::default() }
    }

    fn library() -> Library {
        Library::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_resave_merges_tags_and_keeps_identity() {
        let mut items = Vec::new();
        let first = upsert_into(&mut items, draft("https://a.test/", "Old", &["A"]), datetime!(2024-01-01 10:00 UTC));
        items[0].is_read = true;

        let second = upsert_into(
            &mut items,
            ItemDraft { content: "<p>new</p>".to_string(), ..draft("https://a.test/", "New", &["B"]) },
            datetime!(2024-01-02 10:00 UTC),
        );

        assert_eq!(items.len(), 1);
        assert_eq!(second.id, first.id);
        assert_eq!(second.tags, tags(&["A", "B"]));
        assert_eq!(second.title, "New");
        assert_eq!(second.content, "<p>new</p>");
        assert_eq!(second.date, datetime!(2024-01-02 10:00 UTC));
        assert!(second.is_read);
    }

    #[test]
    fn test_resave_without_tags_keeps_old_tags() {
        let mut items = Vec::new();
        upsert_into(&mut items, draft("u", "t", &["keep"]), datetime!(2024-01-01 0:00 UTC));
        let item = upsert_into(&mut items, draft("u", "t", &[]), datetime!(2024-01-01 0:01 UTC));

        assert_eq!(item.tags, tags(&["keep"]));
    }

    #[test]
    fn test_id_is_creation_millis() {
        let mut items = Vec::new();
        let now = datetime!(2024-03-01 12:00 UTC);
        let item = upsert_into(&mut items, draft("u", "t", &[]), now);

        assert_eq!(item.id, now.unix_timestamp() * 1000);
        assert!(!item.is_read);
    }

    #[test]
    fn test_ids_stay_unique_within_same_millisecond() {
        let mut items = Vec::new();
        let now = datetime!(2024-03-01 12:00 UTC);
        let a = upsert_into(&mut items, draft("a", "a", &[]), now);
        let b = upsert_into(&mut items, draft("b", "b", &[]), now);

        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_item_wire_format() {
        let mut items = Vec::new();
        let item = upsert_into(&mut items, draft("https://x.test", "X", &["b", "a"]), datetime!(2024-05-06 7:08:09 UTC));
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["date"], "2024-05-06T07:08:09Z");
        assert_eq!(json["tags"], serde_json::json!(["a", "b"]));
        assert_eq!(json["isRead"], false);
        assert!(json.get("textContent").is_some());
        assert!(json.get("metaDescription").is_some());

        let back: SavedItem = serde_json::from_value(json).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn test_query_filters() {
        let mut items = Vec::new();
        upsert_into(&mut items, draft("https://rust.test/a", "Ownership", &["rust"]), datetime!(2024-01-01 0:00 UTC));
        upsert_into(&mut items, draft("https://go.test/b", "Goroutines", &["go"]), datetime!(2024-01-02 0:00 UTC));
        let mut c = draft("https://misc.test/c", "Misc", &[]);
        c.meta_description = "All about RUST lifetimes".to_string();
        upsert_into(&mut items, c, datetime!(2024-01-03 0:00 UTC));
        items[1].is_read = true;

        let by_tag = ItemQuery { tags: vec!["rust".to_string(), "go".to_string()], ..Default::default() };
        assert_eq!(items.iter().filter(|i| by_tag.matches(i)).count(), 2);

        let unread = ItemQuery { unread_only: true, ..Default::default() };
        assert_eq!(items.iter().filter(|i| unread.matches(i)).count(), 2);

        let search = ItemQuery { search: Some("rust".to_string()), ..Default::default() };
        let hits: Vec<_> = items.iter().filter(|i| search.matches(i)).map(|i| i.title.as_str()).collect();
        assert_eq!(hits, vec!["Ownership", "Misc"]);

        let by_url = ItemQuery { search: Some("GO.TEST".to_string()), ..Default::default() };
        assert_eq!(items.iter().filter(|i| by_url.matches(i)).count(), 1);
    }

    #[test]
    fn test_sort_orders() {
        let mut items = Vec::new();
        upsert_into(&mut items, draft("1", "Bravo", &[]), datetime!(2024-01-02 0:00 UTC));
        upsert_into(&mut items, draft("2", "Alpha", &[]), datetime!(2024-01-01 0:00 UTC));
        upsert_into(&mut items, draft("3", "Charlie", &[]), datetime!(2024-01-03 0:00 UTC));

        let titles = |items: &[SavedItem]| items.iter().map(|i| i.title.clone()).collect::<Vec<_>>();

        sort_items(&mut items, SortOrder::Newest);
        assert_eq!(titles(&items), ["Charlie", "Bravo", "Alpha"]);
        sort_items(&mut items, SortOrder::Oldest);
        assert_eq!(titles(&items), ["Alpha", "Bravo", "Charlie"]);
        sort_items(&mut items, SortOrder::Title);
        assert_eq!(titles(&items), ["Alpha", "Bravo", "Charlie"]);
    }

    #[test]
    fn test_sort_order_from_str() {
        assert_eq!("Oldest".parse::<SortOrder>().unwrap(), SortOrder::Oldest);
        assert!("random".parse::<SortOrder>().is_err());
    }

    #[tokio::test]
    async fn test_delete_removes_exactly_one() {
        let lib = library();
        let a = lib.upsert(draft("https://site.test/a", "A", &["x"]), datetime!(2024-01-01 0:00 UTC)).await.unwrap();
        let b = lib.upsert(draft("https://site.test/a/b", "B", &["x"]), datetime!(2024-01-01 0:01 UTC)).await.unwrap();
        let c = lib.upsert(draft("https://site.test/c", "C", &["x"]), datetime!(2024-01-01 0:02 UTC)).await.unwrap();

        assert!(lib.delete(a.id).await.unwrap());
        assert!(!lib.delete(a.id).await.unwrap());

        let remaining = lib.items().await.unwrap();
        assert_eq!(remaining, vec![b, c]);
    }

    #[tokio::test]
    async fn test_toggle_mark_and_tag_edits() {
        let lib = library();
        let item = lib.upsert(draft("u", "T", &["old"]), datetime!(2024-01-01 0:00 UTC)).await.unwrap();

        assert!(lib.toggle_read(item.id).await.unwrap().unwrap().is_read);
        assert!(!lib.toggle_read(item.id).await.unwrap().unwrap().is_read);
        assert!(lib.mark_read(item.id).await.unwrap().unwrap().is_read);
        assert!(lib.mark_read(item.id).await.unwrap().unwrap().is_read);

        let updated = lib
            .set_tags(item.id, &["new".to_string(), " ".to_string(), "other".to_string()])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.tags, tags(&["new", "other"]));

        assert_eq!(lib.toggle_read(42).await.unwrap(), None);
        assert_eq!(lib.get(item.id).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn test_fill_content_keeps_identity() {
        let lib = library();
        let link = lib.upsert(draft("https://a.test/", "https://a.test/", &["later"]), datetime!(2024-01-01 0:00 UTC)).await.unwrap();
        let snapshot = PageSnapshot {
            title: "Fetched".to_string(),
            content: "<article>Body</article>".to_string(),
            text_excerpt: "Body".to_string(),
            meta_description: "About".to_string(),
            images: vec![],
        };

        let filled = lib.fill_content(link.id, &snapshot).await.unwrap().unwrap();
        assert_eq!(filled.id, link.id);
        assert_eq!(filled.title, "Fetched");
        assert_eq!(filled.content, "<article>Body</article>");
        assert_eq!(filled.text_content, "Body");
        assert_eq!(filled.meta_description, "About");
        assert_eq!(filled.tags, tags(&["later"]));
        assert_eq!(lib.items().await.unwrap(), vec![filled]);

        let named = lib.upsert(draft("https://b.test/", "Mine", &[]), datetime!(2024-01-02 0:00 UTC)).await.unwrap();
        assert_eq!(lib.fill_content(named.id, &snapshot).await.unwrap().unwrap().title, "Mine");
        assert_eq!(lib.fill_content(42, &snapshot).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_all_tags_and_recent() {
        let lib = library();
        for (i, (url, tag_list)) in [("a", vec!["z", "m"]), ("b", vec!["a"]), ("c", vec!["m"])].iter().enumerate() {
            let now = datetime!(2024-01-01 0:00 UTC) + time::Duration::minutes(i as i64);
            lib.upsert(draft(url, url, tag_list), now).await.unwrap();
        }

        assert_eq!(lib.all_tags().await.unwrap(), vec!["a", "m", "z"]);

        let recent = lib.recent(2).await.unwrap();
        assert_eq!(recent.iter().map(|i| i.url.as_str()).collect::<Vec<_>>(), vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_query_through_store() {
        let lib = library();
        lib.upsert(draft("a", "Zebra", &["t"]), datetime!(2024-01-01 0:00 UTC)).await.unwrap();
        lib.upsert(draft("b", "Aardvark", &[]), datetime!(2024-01-02 0:00 UTC)).await.unwrap();

        let query = ItemQuery { sort: SortOrder::Title, ..Default::default() };
        let titles: Vec<_> = lib.query(&query).await.unwrap().into_iter().map(|i| i.title).collect();
        assert_eq!(titles, vec!["Aardvark", "Zebra"]);
    }
}
