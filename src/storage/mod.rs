//! Shape persistence
//!
//! - `schema`: on-disk document format
//! - `store`: one JSON file per owner
//! - `flush`: background writer that coalesces saves

pub mod flush;
pub mod schema;
pub mod store;

pub use flush::FlushWorker;
pub use schema::{OwnerDocument, ShapeRecord};
pub use store::ShapeStore;

use crate::core::types::{OwnerId, Result};

/// Where the registry loads and saves owner documents
pub trait ShapePersistence: Send + Sync {
    /// Read the stored document for `owner`
    fn load(&self, owner: OwnerId) -> Result<OwnerDocument>;

    /// Persist a snapshot. Failures are logged, never returned.
    fn flush(&self, owner: OwnerId, doc: OwnerDocument);

    /// Block until every snapshot passed to `flush` has been written
    fn sync(&self);
}
