//! drillbook: browse a basketball drill catalog, assemble and save training
//! sessions, share them as links and export them as printable A4 PDFs.

pub mod assets;
pub mod catalog;
pub mod compose;
pub mod config;
pub mod error;
pub mod layout;
pub mod metrics;
pub mod model;
pub mod sessions;
pub mod share;
pub mod store;

pub use catalog::{Catalog, DrillDraft, DrillFilter, SortKey};
pub use compose::{ComposeRequest, ComposedPdf, Composer};
pub use config::{LayoutConfig, Settings};
pub use error::{AppError, AssetError, CompositionError, StoreError};
pub use model::{DrillRecord, SessionRecord};
pub use sessions::{Cart, SessionStore};
pub use store::{FileStore, KeyValueStore, MemoryStore};
