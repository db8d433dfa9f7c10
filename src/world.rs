//! Host world catalog

use std::collections::HashSet;

/// Answers whether a world is currently loaded on the host
pub trait WorldCatalog: Send + Sync {
    fn is_loaded(&self, world: &str) -> bool;
}

/// Fixed set of loaded worlds
#[derive(Clone, Debug, Default)]
pub struct StaticWorlds {
    names: HashSet<String>,
}

impl StaticWorlds {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { names: names.into_iter().map(Into::into).collect() }
    }
}

impl WorldCatalog for StaticWorlds {
    fn is_loaded(&self, world: &str) -> bool {
        self.names.contains(world)
    }
}
