// src/topics/mod.rs
pub mod clock;
pub mod error;
pub mod scheduler;
pub mod source;
pub mod store;
pub mod types;
pub mod view;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::FetchError;
pub use source::{FileSource, HttpSource, TopicSource};
pub use store::{categories_of, Retrieval, StoreSnapshot, TopicStore, CACHE_TTL};
pub use types::{Topic, TopicsResponse};
pub use view::{apply_filters, FilterState, FilteredView, SortKey};
