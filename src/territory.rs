use crate::creep::*;
use crate::economy::accounting::TerritoryEconomy;
use crate::host::*;
use crate::pathing::routecache::*;
use crate::room::name::*;
use crate::store::*;
use log::*;
use specs::prelude::*;
use specs::Component;
use std::collections::{HashMap, HashSet};

/// Owned room tracked by the engine.
#[derive(Component, Clone, Debug)]
pub struct TerritoryData {
    pub name: RoomName,
    pub economy: TerritoryEconomy,
}

impl TerritoryData {
    pub fn new(name: RoomName) -> TerritoryData {
        TerritoryData {
            name,
            economy: TerritoryEconomy::default(),
        }
    }
}

#[derive(Default)]
pub struct TerritoryMapping {
    pub territories: HashMap<RoomName, Entity>,
}

impl TerritoryMapping {
    pub fn get(&self, name: RoomName) -> Option<Entity> {
        self.territories.get(&name).copied()
    }
}

#[derive(SystemData)]
pub struct TerritorySyncSystemData<'a> {
    entities: Entities<'a>,
    territory_data: WriteStorage<'a, TerritoryData>,
    mapping: Write<'a, TerritoryMapping>,
    store: Write<'a, MemoryStore>,
    route_cache: Write<'a, RouteCache>,
}

/// Mirrors the host's owned rooms into territory entities and drops state that belonged to
/// rooms or agents that are gone.
pub struct TerritorySyncSystem<'h> {
    host: &'h dyn HostEnvironment,
}

impl<'h> TerritorySyncSystem<'h> {
    pub fn new(host: &'h dyn HostEnvironment) -> TerritorySyncSystem<'h> {
        TerritorySyncSystem { host }
    }

    fn forget_territory(store: &mut MemoryStore, route_cache: &mut RouteCache, name: RoomName) {
        store.active_sources.remove(&name);
        store.remotes.remove(&name);
        store.spawn_balances.remove(&name);

        let lost: Vec<_> = store.nodes.values().filter(|info| info.home_room == name).map(|info| info.id.clone()).collect();

        for id in lost.iter() {
            store.nodes.remove(id);
            route_cache.invalidate(id);
        }
    }
}

impl<'a, 'h> System<'a> for TerritorySyncSystem<'h> {
    type SystemData = TerritorySyncSystemData<'a>;

    fn run(&mut self, mut data: Self::SystemData) {
        let owned: HashSet<RoomName> = self.host.territories().into_iter().collect();

        for (entity, territory) in (&data.entities, &data.territory_data).join() {
            if owned.contains(&territory.name) {
                continue;
            }

            info!("Territory lost - Room: {}", territory.name);

            data.mapping.territories.remove(&territory.name);

            Self::forget_territory(&mut data.store, &mut data.route_cache, territory.name);

            if let Err(err) = data.entities.delete(entity) {
                warn!("Failed to delete territory entity - Room: {} - Error: {}", territory.name, err);
            }
        }

        let mut added: Vec<RoomName> = owned.iter().filter(|name| !data.mapping.territories.contains_key(name)).copied().collect();
        added.sort();

        for name in added {
            info!("Territory added - Room: {}", name);

            let entity = data.entities.create();

            match data.territory_data.insert(entity, TerritoryData::new(name)) {
                Ok(_) => {
                    data.mapping.territories.insert(name, entity);
                }
                Err(err) => {
                    warn!("Failed to create territory entity - Room: {} - Error: {}", name, err);
                }
            }
        }

        let alive: HashSet<AgentId> = owned.iter().flat_map(|name| self.host.live_agents_of(*name)).map(|agent| agent.id).collect();

        let pruned = data.store.prune_agents(&alive);

        if pruned > 0 {
            debug!("Pruned agent records - Count: {}", pruned);
        }
    }
}
