//! Per-owner shape collections and the sample budget that bounds them

pub mod budget;
pub mod collection;
pub mod shared;

pub use budget::{BudgetLedger, SampleLimit};
pub use collection::{Accepted, DeleteTarget, OwnerShapes, Removed, ShapeSummary};
pub use shared::ShapeRegistry;
