use crate::room::data::*;
use crate::room::name::*;
use log::*;
use std::collections::HashMap;
use std::sync::Arc;

/// Hauling routes keyed by node, shared by every territory. Entries are rebuilt from the
/// persisted road tiles on first use and only dropped by explicit invalidation.
#[derive(Default)]
pub struct RouteCache {
    routes: HashMap<NodeId, Arc<Vec<Position>>>,
    rebuilds: u32,
}

impl RouteCache {
    pub fn new() -> RouteCache {
        RouteCache::default()
    }

    pub fn get_or_build(&mut self, info: &ResourceNodeInfo) -> Arc<Vec<Position>> {
        if let Some(route) = self.routes.get(&info.id) {
            return route.clone();
        }

        trace!("Rebuilding cached route - Node: {}", info.id);

        self.rebuilds += 1;

        let route = Arc::new(info.road_positions());

        self.routes.insert(info.id.clone(), route.clone());

        route
    }

    pub fn get(&self, node: &NodeId) -> Option<Arc<Vec<Position>>> {
        self.routes.get(node).cloned()
    }

    pub fn invalidate(&mut self, node: &NodeId) {
        self.routes.remove(node);
    }

    pub fn clear(&mut self) {
        self.routes.clear();
    }

    pub fn rebuilds(&self) -> u32 {
        self.rebuilds
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
