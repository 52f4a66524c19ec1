pub mod advisor;
pub mod dom_tree;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod library;
pub mod page;
pub mod parse;
pub mod pipeline;
pub mod postprocess;
pub mod preprocess;
pub mod refine;
pub mod settings;
pub mod store;

pub use advisor::{Advisor, AdvisorConfig, AdvisorRequest, AiSuggestion, OpenAiAdvisor};
#[doc(hidden)]
pub use dom_tree::DomTree;
pub use error::{ReadLaterError, Result};
pub use extract::{ImageRef, PageSnapshot, extract};
pub use fetch::FetchConfig;
pub use fetch::{fetch_file, fetch_stdin, fetch_url};
pub use library::{ItemDraft, ItemQuery, Library, SavedItem, SortOrder};
pub use page::{LoadedPages, PageContext, PageTask, Tab, TaskOutput};
pub use parse::Document;
pub use pipeline::SavePipeline;
#[doc(hidden)]
pub use preprocess::PreprocessConfig;
pub use refine::refine;
pub use settings::{Settings, initialize};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
