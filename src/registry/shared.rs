//! Process-wide registry of every owner's shapes.
//!
//! Owners are independent: each sits behind its own mutex, so proposals for
//! different owners never contend and a render pass only blocks the owner it
//! is currently drawing. The outer map lock is held just long enough to find
//! or insert an owner.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use rayon::prelude::*;

use crate::core::error::Error;
use crate::core::types::{OwnerId, Result};
use crate::registry::budget::{BudgetLedger, SampleLimit};
use crate::registry::collection::{Accepted, DeleteTarget, OwnerShapes, Removed, ShapeSummary};
use crate::render::pass::{RenderStats, draw_owner};
use crate::render::sink::SampleSink;
use crate::shape::{Shape, ShapeKind};
use crate::storage::ShapePersistence;
use crate::world::WorldCatalog;

type OwnerSlot = Arc<Mutex<OwnerShapes>>;

fn lock(slot: &Mutex<OwnerShapes>) -> MutexGuard<'_, OwnerShapes> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct ShapeRegistry {
    owners: RwLock<HashMap<OwnerId, OwnerSlot>>,
    limit: Arc<SampleLimit>,
    worlds: Arc<dyn WorldCatalog>,
    persistence: Option<Arc<dyn ShapePersistence>>,
}

impl ShapeRegistry {
    /// In-memory registry. Nothing is saved unless persistence is attached.
    pub fn new(limit: u64, worlds: Arc<dyn WorldCatalog>) -> Self {
        Self {
            owners: RwLock::new(HashMap::new()),
            limit: Arc::new(SampleLimit::new(limit)),
            worlds,
            persistence: None,
        }
    }

    pub fn with_persistence(mut self, persistence: Arc<dyn ShapePersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    pub fn limit(&self) -> u64 {
        self.limit.get()
    }

    /// Change the per-owner limit. Shapes already stored are kept.
    pub fn set_limit(&self, limit: u64) {
        let previous = self.limit.get();
        self.limit.set(limit);
        log::info!("Sample limit changed from {previous} to {limit}");
    }

    /// Owners currently held in memory
    pub fn owner_count(&self) -> usize {
        self.owners.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn lookup(&self, owner: OwnerId) -> Option<OwnerSlot> {
        self.owners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&owner)
            .cloned()
    }

    /// Collection for `owner`, loading it from persistence on first use.
    ///
    /// Fails without creating anything if the stored file cannot be read, so
    /// a later save never replaces a file that was not loaded.
    fn slot(&self, owner: OwnerId) -> Result<OwnerSlot> {
        if let Some(slot) = self.lookup(owner) {
            return Ok(slot);
        }
        let loaded = self.load(owner)?;
        let slot = self
            .owners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(owner)
            .or_insert_with(|| Arc::new(Mutex::new(loaded)))
            .clone();
        Ok(slot)
    }

    fn load(&self, owner: OwnerId) -> Result<OwnerShapes> {
        let Some(persistence) = &self.persistence else {
            return Ok(OwnerShapes::new());
        };
        let shapes = OwnerShapes::from_document(persistence.load(owner)?, &*self.worlds);
        log::info!(
            "Loaded {} shapes ({} samples, {} dormant) for {owner}",
            shapes.len(),
            shapes.total_samples(),
            shapes.dormant().len()
        );
        Ok(shapes)
    }

    /// Queue a snapshot. Called with the owner lock held so snapshots reach
    /// the writer in mutation order.
    fn persist(&self, owner: OwnerId, shapes: &OwnerShapes) {
        if let Some(persistence) = &self.persistence {
            persistence.flush(owner, shapes.to_document());
        }
    }

    // --- Mutations ---

    /// Store `shape` under `name` for `owner`, replacing a same-kind shape of
    /// that name, if the owner's total stays within the limit.
    pub fn propose(&self, owner: OwnerId, name: &str, shape: Shape) -> Result<Accepted> {
        if !self.worlds.is_loaded(shape.world()) {
            return Err(Error::WorldUnavailable(shape.world().to_string()));
        }
        let kind = shape.kind();

        let slot = self.slot(owner)?;
        let mut shapes = lock(&slot);
        let accepted = shapes.propose(name, shape, self.limit.get())?;
        self.persist(owner, &shapes);
        drop(shapes);

        log::info!(
            "{owner} {} {kind} '{name}' ({} samples, {} / {} used)",
            if accepted.replaced { "replaced" } else { "created" },
            accepted.samples,
            accepted.total,
            self.limit.get(),
        );
        Ok(accepted)
    }

    /// Delete one named shape or all shapes of `kind`
    pub fn delete(&self, owner: OwnerId, kind: ShapeKind, target: &DeleteTarget) -> Result<Removed> {
        let slot = match self.lookup(owner) {
            Some(slot) => slot,
            // Nothing stored anywhere: same outcome as an empty collection
            None if self.persistence.is_none() => return OwnerShapes::new().delete(kind, target),
            None => self.slot(owner)?,
        };

        let mut shapes = lock(&slot);
        let removed = shapes.delete(kind, target)?;
        self.persist(owner, &shapes);
        drop(shapes);

        log::info!(
            "{owner} deleted {} {kind}(s), freed {} samples",
            removed.shapes,
            removed.samples
        );
        Ok(removed)
    }

    // --- Queries ---

    pub fn list(&self, owner: OwnerId, kind: ShapeKind) -> Vec<ShapeSummary> {
        self.lookup(owner).map(|slot| lock(&slot).list(kind)).unwrap_or_default()
    }

    pub fn get(&self, owner: OwnerId, kind: ShapeKind, name: &str) -> Option<Shape> {
        self.lookup(owner).and_then(|slot| lock(&slot).get(kind, name).cloned())
    }

    pub fn total_samples(&self, owner: OwnerId) -> u64 {
        self.lookup(owner).map_or(0, |slot| lock(&slot).total_samples())
    }

    /// Samples `owner` may still add; negative after the limit was lowered
    pub fn available(&self, owner: OwnerId) -> i64 {
        let limit = self.limit.get();
        match self.lookup(owner) {
            Some(slot) => lock(&slot).ledger().available(limit),
            None => BudgetLedger::new().available(limit),
        }
    }

    // --- Lifecycle ---

    /// Load `owner`'s stored shapes, replacing anything held in memory.
    ///
    /// Returns the number of live shapes.
    pub fn join(&self, owner: OwnerId) -> Result<usize> {
        let shapes = match self.load(owner) {
            Ok(shapes) => shapes,
            Err(e) => {
                log::error!("Cannot load shapes for {owner}; leaving the stored file untouched: {e}");
                return Err(e);
            }
        };
        let live = shapes.len();

        self.owners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(owner, Arc::new(Mutex::new(shapes)));
        Ok(live)
    }

    /// Save and evict `owner`. Returns false if the owner was not held.
    pub fn leave(&self, owner: OwnerId) -> bool {
        let removed = self.owners.write().unwrap_or_else(PoisonError::into_inner).remove(&owner);
        match removed {
            Some(slot) => {
                self.persist(owner, &lock(&slot));
                log::debug!("{owner} left");
                true
            }
            None => false,
        }
    }

    /// Save every owner and wait for the writes to finish
    pub fn shutdown(&self) {
        let owners: Vec<(OwnerId, OwnerSlot)> = self
            .owners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, slot)| (*id, slot.clone()))
            .collect();

        for (owner, slot) in &owners {
            self.persist(*owner, &lock(slot));
        }
        if let Some(persistence) = &self.persistence {
            persistence.sync();
        }
        log::info!("Saved shapes for {} owners", owners.len());
    }

    // --- Rendering ---

    /// Render every owner's live shapes, owners in parallel
    pub fn draw(&self, sink: &dyn SampleSink, size: f32) -> RenderStats {
        let slots: Vec<OwnerSlot> = self
            .owners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        slots
            .par_iter()
            .map(|slot| draw_owner(&lock(slot), sink, size))
            .reduce(RenderStats::default, RenderStats::merge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DVec3;
    use crate::render::sink::CollectingSink;
    use crate::shape::{Circle, Line, Rgb, Sphere};
    use crate::storage::store::ShapeStore;
    use crate::world::StaticWorlds;
    use tempfile::TempDir;

    fn worlds() -> Arc<dyn WorldCatalog> {
        Arc::new(StaticWorlds::new(["world", "world_nether"]))
    }

    /// Line with `samples` samples
    fn line(samples: u64) -> Shape {
        let end = DVec3::new(samples as f64 - 1.0, 0.0, 0.0);
        Shape::new("world", Rgb::LIME, Line::new(DVec3::ZERO, end)).unwrap()
    }

    #[test]
    fn test_budget_example() {
        let registry = ShapeRegistry::new(100, worlds());
        let owner = OwnerId::new_v4();

        registry.propose(owner, "a", line(40)).unwrap();
        let err = registry.propose(owner, "b", line(70)).unwrap_err();
        assert!(matches!(err, Error::BudgetExceeded { available: 60, requested: 70 }));
        assert_eq!(registry.total_samples(owner), 40);
        assert!(registry.get(owner, ShapeKind::Line, "b").is_none());

        registry.propose(owner, "b", line(60)).unwrap();
        assert_eq!(registry.total_samples(owner), 100);
        assert_eq!(registry.available(owner), 0);
    }

    #[test]
    fn test_owners_are_independent() {
        let registry = ShapeRegistry::new(50, worlds());
        let a = OwnerId::new_v4();
        let b = OwnerId::new_v4();

        registry.propose(a, "x", line(50)).unwrap();
        registry.propose(b, "x", line(50)).unwrap();
        assert_eq!(registry.owner_count(), 2);
        assert_eq!(registry.total_samples(a), 50);
        assert_eq!(registry.total_samples(b), 50);
    }

    #[test]
    fn test_unloaded_world_rejected() {
        let registry = ShapeRegistry::new(100, worlds());
        let shape = Shape::new("world_the_end", Rgb::LIME, Sphere::new(DVec3::ZERO, 2.0)).unwrap();
        let err = registry.propose(OwnerId::new_v4(), "s", shape).unwrap_err();
        assert!(matches!(err, Error::WorldUnavailable(w) if w == "world_the_end"));
    }

    #[test]
    fn test_delete_for_unknown_owner() {
        let registry = ShapeRegistry::new(100, worlds());
        let owner = OwnerId::new_v4();
        assert!(matches!(
            registry.delete(owner, ShapeKind::Line, &DeleteTarget::All),
            Err(Error::Empty { kind: ShapeKind::Line })
        ));
        assert!(matches!(
            registry.delete(owner, ShapeKind::Circle, &DeleteTarget::parse("ring")),
            Err(Error::NotFound { .. })
        ));
        assert_eq!(registry.owner_count(), 0);
    }

    #[test]
    fn test_lowered_limit_keeps_shapes() {
        let registry = ShapeRegistry::new(100, worlds());
        let owner = OwnerId::new_v4();
        registry.propose(owner, "a", line(80)).unwrap();

        registry.set_limit(50);
        assert_eq!(registry.limit(), 50);
        assert_eq!(registry.total_samples(owner), 80);
        assert_eq!(registry.available(owner), -30);
        assert!(matches!(
            registry.propose(owner, "b", line(1)),
            Err(Error::BudgetExceeded { available: -30, .. })
        ));

        // Shrinking an existing shape below the new limit is allowed
        registry.propose(owner, "a", line(20)).unwrap();
        assert_eq!(registry.total_samples(owner), 20);
    }

    #[test]
    fn test_concurrent_proposals_respect_limit() {
        let registry = ShapeRegistry::new(100, worlds());
        let owner = OwnerId::new_v4();

        let accepted: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|t| {
                    let registry = &registry;
                    scope.spawn(move || {
                        (0..5)
                            .filter(|i| registry.propose(owner, &format!("t{t}-{i}"), line(10)).is_ok())
                            .count()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(accepted, 10);
        assert_eq!(registry.total_samples(owner), 100);
        assert_eq!(registry.list(owner, ShapeKind::Line).len(), 10);
    }

    #[test]
    fn test_draw_all_owners() {
        let registry = ShapeRegistry::new(1000, worlds());
        let a = OwnerId::new_v4();
        let b = OwnerId::new_v4();
        registry
            .propose(a, "ring", Shape::new("world", Rgb::RED, Circle::new(DVec3::ZERO, 10.0)).unwrap())
            .unwrap();
        registry.propose(b, "beam", line(12)).unwrap();

        let sink = CollectingSink::new();
        let stats = registry.draw(&sink, 1.5);
        assert_eq!(stats.owners, 2);
        assert_eq!(stats.shapes, 2);
        assert_eq!(stats.samples, 49);
        assert_eq!(sink.len(), 49);
    }

    #[test]
    fn test_every_mutation_is_saved() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(ShapeStore::open(dir.path()).unwrap());
        let registry = ShapeRegistry::new(1000, worlds()).with_persistence(store.clone());
        let owner = OwnerId::new_v4();

        registry.propose(owner, "beam", line(5)).unwrap();
        assert_eq!(store.load(owner).unwrap().lines.len(), 1);

        registry.delete(owner, ShapeKind::Line, &DeleteTarget::All).unwrap();
        assert!(store.load(owner).unwrap().is_empty());
    }

    #[test]
    fn test_join_leave_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(ShapeStore::open(dir.path()).unwrap());
        let owner = OwnerId::new_v4();

        let registry = ShapeRegistry::new(1000, worlds()).with_persistence(store.clone());
        registry
            .propose(owner, "ball", Shape::new("world_nether", Rgb::AQUA, Sphere::new(DVec3::new(0.0, 40.0, 0.0), 6.0)).unwrap())
            .unwrap();
        registry.propose(owner, "beam", line(7)).unwrap();
        let total = registry.total_samples(owner);
        assert!(registry.leave(owner));
        assert!(!registry.leave(owner));
        assert_eq!(registry.owner_count(), 0);

        let restored = ShapeRegistry::new(1000, worlds()).with_persistence(store);
        assert_eq!(restored.join(owner).unwrap(), 2);
        assert_eq!(restored.total_samples(owner), total);
        assert_eq!(restored.list(owner, ShapeKind::Sphere)[0].world, "world_nether");
    }

    #[test]
    fn test_join_keeps_unloaded_world_shapes() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(ShapeStore::open(dir.path()).unwrap());
        let owner = OwnerId::new_v4();

        let full = ShapeRegistry::new(1000, worlds()).with_persistence(store.clone());
        full.propose(owner, "home", line(3)).unwrap();
        full.propose(owner, "away", Shape::new("world_nether", Rgb::RED, Line::new(DVec3::ZERO, DVec3::Y)).unwrap())
            .unwrap();
        full.shutdown();

        let partial = ShapeRegistry::new(1000, Arc::new(StaticWorlds::new(["world"])))
            .with_persistence(store.clone());
        assert_eq!(partial.join(owner).unwrap(), 1);
        assert_eq!(partial.total_samples(owner), 3);

        // A later save still carries the nether line
        partial.propose(owner, "home", line(4)).unwrap();
        let saved = store.load(owner).unwrap();
        assert_eq!(saved.lines.len(), 2);
        assert_eq!(saved.lines["away"].world, "world_nether");
    }

    const GOOD_AND_BAD_LINES: &str = r#"{
        "lines": {
            "good": { "world": "world",
                      "start": { "x": 0.0, "y": 0.0, "z": 0.0 },
                      "end": { "x": 4.0, "y": 0.0, "z": 0.0 },
                      "color": 65280 },
            "bad": { "world": "world",
                     "start": { "x": 0.0, "y": 0.0, "z": 0.0 },
                     "end": { "x": 1.0, "y": 0.0, "z": 0.0 } }
        }
    }"#;

    #[test]
    fn test_damaged_record_does_not_cost_the_file() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(ShapeStore::open(dir.path()).unwrap());
        let owner = OwnerId::new_v4();
        std::fs::write(store.path_for(owner), GOOD_AND_BAD_LINES).unwrap();

        let registry = ShapeRegistry::new(1000, worlds()).with_persistence(store.clone());
        assert_eq!(registry.join(owner).unwrap(), 1);
        assert_eq!(registry.total_samples(owner), 5);

        registry.propose(owner, "new", line(3)).unwrap();

        let saved = store.load(owner).unwrap();
        let names: Vec<_> = saved.lines.keys().cloned().collect();
        assert_eq!(names, vec!["good".to_string(), "new".to_string()]);
        assert!(saved.unreadable.lines.contains_key("bad"));
    }

    #[test]
    fn test_unreadable_file_is_never_overwritten() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(ShapeStore::open(dir.path()).unwrap());
        let owner = OwnerId::new_v4();
        let path = store.path_for(owner);
        std::fs::write(&path, "{ \"lines\": [ truncated").unwrap();

        let registry = ShapeRegistry::new(1000, worlds()).with_persistence(store);
        assert!(registry.join(owner).is_err());
        assert!(matches!(registry.propose(owner, "new", line(3)), Err(Error::Format(_))));
        assert!(registry.delete(owner, ShapeKind::Line, &DeleteTarget::All).is_err());

        assert_eq!(registry.owner_count(), 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ \"lines\": [ truncated");
    }

    #[test]
    fn test_propose_before_join_keeps_stored_shapes() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(ShapeStore::open(dir.path()).unwrap());
        let owner = OwnerId::new_v4();
        std::fs::write(store.path_for(owner), GOOD_AND_BAD_LINES).unwrap();

        let registry = ShapeRegistry::new(1000, worlds()).with_persistence(store.clone());
        let accepted = registry.propose(owner, "new", line(3)).unwrap();
        assert_eq!(accepted.total, 8);

        let saved = store.load(owner).unwrap();
        assert!(saved.lines.contains_key("good"));
        assert!(saved.lines.contains_key("new"));
        assert!(saved.unreadable.lines.contains_key("bad"));
    }
}
