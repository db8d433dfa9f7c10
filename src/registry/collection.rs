//! One owner's shapes and their sample ledger.

use std::collections::BTreeMap;

use crate::core::error::Error;
use crate::core::types::Result;
use crate::registry::budget::BudgetLedger;
use crate::shape::{Shape, ShapeKind};
use crate::storage::schema::{OwnerDocument, ShapeRecord};
use crate::world::WorldCatalog;

/// Which shapes a delete applies to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeleteTarget {
    Named(String),
    All,
}

impl DeleteTarget {
    /// `"all"` (any case) selects every shape of the kind; anything else is a name
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("all") {
            DeleteTarget::All
        } else {
            DeleteTarget::Named(s.to_string())
        }
    }
}

/// Successful proposal
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Accepted {
    /// Cost of the new shape
    pub samples: u64,
    /// Owner total after the change
    pub total: u64,
    /// Whether a shape with the same kind and name was replaced
    pub replaced: bool,
}

/// Successful delete
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Removed {
    /// Live shapes removed
    pub shapes: usize,
    /// Samples released
    pub samples: u64,
    /// Owner total after the change
    pub total: u64,
}

/// Listing entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShapeSummary {
    pub name: String,
    pub world: String,
    pub samples: u64,
}

/// Circles, spheres and lines of one owner, keyed by name within each kind.
///
/// Records whose world was not loaded (or that failed validation) when the
/// owner joined are kept as dormant records. They are not rendered and cost
/// nothing, but are written back on every save.
#[derive(Clone, Debug, Default)]
pub struct OwnerShapes {
    circles: BTreeMap<String, Shape>,
    spheres: BTreeMap<String, Shape>,
    lines: BTreeMap<String, Shape>,
    ledger: BudgetLedger,
    dormant: OwnerDocument,
}

impl OwnerShapes {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self, kind: ShapeKind) -> &BTreeMap<String, Shape> {
        match kind {
            ShapeKind::Circle => &self.circles,
            ShapeKind::Sphere => &self.spheres,
            ShapeKind::Line => &self.lines,
        }
    }

    fn map_mut(&mut self, kind: ShapeKind) -> &mut BTreeMap<String, Shape> {
        match kind {
            ShapeKind::Circle => &mut self.circles,
            ShapeKind::Sphere => &mut self.spheres,
            ShapeKind::Line => &mut self.lines,
        }
    }

    pub fn get(&self, kind: ShapeKind, name: &str) -> Option<&Shape> {
        self.map(kind).get(name)
    }

    /// Number of live shapes
    pub fn len(&self) -> usize {
        self.circles.len() + self.spheres.len() + self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached sample total
    pub fn total_samples(&self) -> u64 {
        self.ledger.used()
    }

    pub fn ledger(&self) -> &BudgetLedger {
        &self.ledger
    }

    /// Records kept for worlds that are not loaded
    pub fn dormant(&self) -> &OwnerDocument {
        &self.dormant
    }

    /// Sum of sample counts over all live shapes
    pub fn recount(&self) -> u64 {
        self.shapes().map(|(_, _, shape)| shape.sample_count()).sum()
    }

    /// All live shapes, circles first, each kind in name order
    pub fn shapes(&self) -> impl Iterator<Item = (ShapeKind, &str, &Shape)> {
        ShapeKind::ALL.into_iter().flat_map(move |kind| {
            self.map(kind).iter().map(move |(name, shape)| (kind, name.as_str(), shape))
        })
    }

    /// Store `shape` under `name` if the owner's total stays within `limit`.
    ///
    /// A rejected proposal leaves the collection untouched.
    pub fn propose(&mut self, name: &str, shape: Shape, limit: u64) -> Result<Accepted> {
        let kind = shape.kind();
        let samples = shape.sample_count();
        let released = self.get(kind, name).map_or(0, Shape::sample_count);

        let total = self.ledger.project(released, samples, limit)?;

        let replaced = self.map_mut(kind).insert(name.to_string(), shape).is_some();
        self.dormant.remove(kind, name);
        self.ledger.commit(total);
        debug_assert_eq!(self.ledger.used(), self.recount());

        Ok(Accepted { samples, total, replaced })
    }

    /// Remove one named shape or every shape of `kind`
    pub fn delete(&mut self, kind: ShapeKind, target: &DeleteTarget) -> Result<Removed> {
        let (shapes, samples) = match target {
            DeleteTarget::Named(name) => {
                let had_dormant = self.dormant.remove(kind, name);
                match self.map_mut(kind).remove(name) {
                    Some(shape) => (1, shape.sample_count()),
                    None if had_dormant => (0, 0),
                    None => {
                        return Err(Error::NotFound { kind, name: name.clone() });
                    }
                }
            }
            DeleteTarget::All => {
                let map = std::mem::take(self.map_mut(kind));
                let had_dormant = self.dormant.has_kind(kind);
                if map.is_empty() && !had_dormant {
                    return Err(Error::Empty { kind });
                }
                self.dormant.clear_kind(kind);
                (map.len(), map.values().map(Shape::sample_count).sum())
            }
        };

        self.ledger.release(samples);
        debug_assert_eq!(self.ledger.used(), self.recount());

        Ok(Removed { shapes, samples, total: self.ledger.used() })
    }

    /// Live shapes of one kind in name order
    pub fn list(&self, kind: ShapeKind) -> Vec<ShapeSummary> {
        self.map(kind)
            .iter()
            .map(|(name, shape)| ShapeSummary {
                name: name.clone(),
                world: shape.world().to_string(),
                samples: shape.sample_count(),
            })
            .collect()
    }

    /// Snapshot for persistence: live shapes plus dormant records
    pub fn to_document(&self) -> OwnerDocument {
        let mut doc = OwnerDocument::new();
        for (_, name, shape) in self.shapes() {
            doc.insert(name, ShapeRecord::from_shape(shape));
        }
        doc.merge_missing(&self.dormant);
        doc
    }

    /// Rebuild from a stored document.
    ///
    /// Records in unloaded worlds, records that fail validation and records
    /// that could not be decoded at all stay dormant. The limit is not
    /// enforced on load.
    pub fn from_document(doc: OwnerDocument, worlds: &dyn WorldCatalog) -> Self {
        let mut owner = Self::new();
        let (records, unreadable) = doc.into_records();
        owner.dormant.unreadable = unreadable;

        for (name, record) in records {
            let kind = record.kind();
            if !worlds.is_loaded(record.world()) {
                let reason = Error::WorldUnavailable(record.world().to_string());
                log::warn!("Keeping {kind} '{name}' dormant: {reason}");
                owner.dormant.insert(name, record);
                continue;
            }
            match record.to_shape() {
                Ok(shape) => {
                    owner.map_mut(kind).insert(name, shape);
                }
                Err(e) => {
                    log::warn!("Keeping {kind} '{name}' dormant: {e}");
                    owner.dormant.insert(name, record);
                }
            }
        }

        owner.ledger.commit(owner.recount());
        owner
    }
}
