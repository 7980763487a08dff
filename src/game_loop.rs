use crate::algorithms::mincut::*;
use crate::config::*;
use crate::creep::*;
use crate::economy::accounting::TerritoryEconomy;
use crate::economy::activesources;
use crate::economy::system::*;
use crate::error::*;
use crate::host::*;
use crate::pathing::costmatrix::*;
use crate::pathing::cursor::*;
use crate::pathing::route;
use crate::pathing::route::PathOptions;
use crate::pathing::routecache::*;
use crate::pathing::search::SearchGoal;
use crate::room::coord::*;
use crate::room::data::*;
use crate::room::name::*;
use crate::spawnsystem::*;
use crate::store::*;
use crate::territory::*;
use crate::transfer::transfersystem::*;
use itertools::Itertools;
use log::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use specs::prelude::*;
use std::sync::Arc;

/// The engine's world: persisted store, per tick scratch resources and one entity per
/// territory. Systems run in dependency order each tick: territory sync, economy, transport and
/// finally spawning, so every demand filed this tick is seen by the spawn queue.
pub struct Engine {
    world: World,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Engine {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Engine with a fixed seed for its stochastic cache refreshes.
    pub fn with_seed(config: EngineConfig, seed: u64) -> Engine {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: EngineConfig, rng: StdRng) -> Engine {
        let mut world = World::new();

        world.register::<TerritoryData>();

        world.insert(CostMatrixCache::new(config.cache.cost_matrix_refresh_chance));
        world.insert(config);
        world.insert(rng);
        world.insert(MemoryStore::new());
        world.insert(SpawnQueue::default());
        world.insert(TransportAssignments::default());
        world.insert(RouteCache::new());
        world.insert(TerritoryMapping::default());

        Engine { world }
    }

    pub fn tick(&mut self, host: &mut dyn HostEnvironment) {
        debug!("Engine tick - Time: {}", host.time());

        TerritorySyncSystem::new(&*host).run_now(&self.world);
        self.world.maintain();

        EconomySystem::new(&*host).run_now(&self.world);
        TransportSystem::new(&*host).run_now(&self.world);
        SpawnSystem::new(host).run_now(&self.world);

        self.world.maintain();
    }

    pub fn save(&self, backend: &mut dyn StorageBackend) -> EngineResult<()> {
        self.world.read_resource::<MemoryStore>().save(backend)
    }

    /// Replaces the store with the persisted one. Cached routes are rebuilt from it on demand.
    pub fn load(&mut self, backend: &dyn StorageBackend) -> EngineResult<()> {
        let store = MemoryStore::load(backend)?;

        info!("Loaded engine state - Nodes: {} - Agents: {}", store.nodes.len(), store.agents.len());

        *self.world.write_resource::<MemoryStore>() = store;
        self.world.write_resource::<RouteCache>().clear();

        Ok(())
    }

    pub fn config(&self) -> EngineConfig {
        (*self.world.read_resource::<EngineConfig>()).clone()
    }

    /// Active source set of a territory, reusing the cached one while it is valid.
    pub fn compute_active_sources(&mut self, host: &dyn HostEnvironment, territory: RoomName) -> EngineResult<ActiveSourceSet> {
        let view = host.territory(territory).ok_or_else(|| EngineError::StaleReference(format!("territory {}", territory)))?;

        let config = self.world.read_resource::<EngineConfig>();
        let mut store = self.world.write_resource::<MemoryStore>();
        let mut rng = self.world.write_resource::<StdRng>();

        activesources::compute_active_sources(host, &view, &mut store, &config, host.time(), &mut *rng)
    }

    /// Partitions a room so `sources` are walled off from `exits`. Without a grid the room's
    /// terrain is used.
    pub fn compute_mincut(&self, map: &dyn MapView, room: RoomName, sources: &[Coord], exits: &[Coord], grid: Option<&FlowGrid>) -> EngineResult<MincutResult> {
        let result = match grid {
            Some(grid) => compute_mincut(grid, sources, exits),
            None => {
                let terrain = map.terrain(room).ok_or_else(|| EngineError::InvalidInput(format!("no terrain for {}", room)))?;

                compute_mincut(&FlowGrid::from_terrain(terrain), sources, exits)
            }
        };

        if let Err(EngineError::InfeasibleNetwork) = result {
            warn!("Mincut did not converge - Room: {}", room);
        }

        result
    }

    /// Files a spawn request for a territory. Energy consumers are moved to the urgent band while
    /// the territory keeps a surplus.
    pub fn enqueue_spawn_request(&mut self, territory: RoomName, request: SpawnRequest) -> EngineResult<()> {
        let capacity = self.world.read_resource::<EngineConfig>().spawn.queue_capacity;

        let request = {
            let store = self.world.read_resource::<MemoryStore>();

            match store.spawn_balances.get(&territory) {
                Some(balance) => escalate_consumer(request, balance),
                None => request,
            }
        };

        let role = request.role;
        let result = self.world.write_resource::<SpawnQueue>().request(territory, request, capacity);

        if let Err(err) = &result {
            debug!("Spawn request rejected - Territory: {} - Role: {} - Error: {}", territory, role, err);
        }

        result
    }

    pub fn pending_spawns(&self, territory: RoomName) -> Vec<SpawnRequest> {
        self.world
            .read_resource::<SpawnQueue>()
            .iter_requests(territory)
            .cloned()
            .sorted_by_key(request_key)
            .collect()
    }

    /// A consumer ran dry: lowers the territory's spawn balance, once per tick.
    pub fn report_energy_shortage(&mut self, territory: RoomName, time: u32) -> bool {
        self.world.write_resource::<MemoryStore>().spawn_balance_mut(territory).subtract(time)
    }

    pub fn spawn_balance(&self, territory: RoomName) -> f32 {
        self.world.read_resource::<MemoryStore>().spawn_balance(territory)
    }

    pub fn get_transport_assignment(&self, agent: &AgentId) -> Option<TransportDirective> {
        self.world.read_resource::<TransportAssignments>().get(agent).cloned()
    }

    /// Hauling route from a territory's anchor to one of its nodes.
    pub fn get_cached_route(&self, territory: RoomName, node: &NodeId) -> Option<Arc<Vec<Position>>> {
        let store = self.world.read_resource::<MemoryStore>();

        let info = store.node(node).filter(|info| info.home_room == territory)?;

        Some(self.world.write_resource::<RouteCache>().get_or_build(info))
    }

    /// Steps an agent along the cached route of a node. A stuck agent drops the cached route so
    /// it is rebuilt from the store.
    pub fn advance_on_route(&mut self, territory: RoomName, agent: &AgentId, node: &NodeId, current: Position, time: u32, reverse: bool) -> EngineResult<CursorStep> {
        let route = self
            .get_cached_route(territory, node)
            .filter(|route| !route.is_empty())
            .ok_or_else(|| EngineError::StaleReference(format!("route to node {}", node)))?;

        let repath_if_stuck = self.world.read_resource::<EngineConfig>().movement.repath_if_stuck;

        let step = {
            let mut store = self.world.write_resource::<MemoryStore>();

            let cursor = store.agent_mut(agent).cursor.get_or_insert_with(|| PathCursor::new(reverse));

            cursor.set_reverse(reverse);

            let step = cursor.resume(&route, current, time, repath_if_stuck);

            if step == CursorStep::Repath {
                cursor.restart();
            }

            step
        };

        if step == CursorStep::Repath {
            debug!("Agent stuck on route - Agent: {} - Node: {}", agent, node);

            self.world.write_resource::<RouteCache>().invalidate(node);
        }

        Ok(step)
    }

    /// Tile path using the memoized default cost matrices of the rooms it crosses.
    pub fn find_path(&mut self, map: &dyn MapView, start: Position, goals: &[SearchGoal], time: u32) -> EngineResult<Vec<Position>> {
        let options = PathOptions::from_config(&self.world.read_resource::<EngineConfig>().movement);

        let mut cache = self.world.write_resource::<CostMatrixCache>();
        let mut rng = self.world.write_resource::<StdRng>();

        route::find_path(map, start, goals, &options, |room| {
            Some(cache.get_or_build(room, time, &mut *rng, || default_room_matrix(map, room, None)).clone())
        })
    }

    pub fn register_mission(&mut self, mission: MissionId, territory: RoomName) {
        self.world.write_resource::<MemoryStore>().register_mission(mission, territory);
    }

    /// Tears a mission down. Its agents lose their records and its queued spawns are dropped on
    /// the next tick.
    pub fn remove_mission(&mut self, mission: &MissionId) -> Vec<AgentId> {
        let mut store = self.world.write_resource::<MemoryStore>();

        let agents = store.remove_mission(mission);

        for agent in agents.iter() {
            store.agents.remove(agent);
        }

        agents
    }

    pub fn agent_record(&self, agent: &AgentId) -> Option<AgentRecord> {
        self.world.read_resource::<MemoryStore>().agent(agent).cloned()
    }

    pub fn agents_of(&self, owner: &AgentOwner) -> Vec<AgentId> {
        self.world.read_resource::<MemoryStore>().agents_of(owner).to_vec()
    }

    pub fn node_info(&self, node: &NodeId) -> Option<ResourceNodeInfo> {
        self.world.read_resource::<MemoryStore>().node(node).cloned()
    }

    pub fn remotes_of(&self, territory: RoomName) -> Vec<RemoteInfo> {
        self.world
            .read_resource::<MemoryStore>()
            .remotes_of(territory)
            .map(|remotes| remotes.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Summary of the last economy pass over a territory.
    pub fn economy(&self, territory: RoomName) -> Option<TerritoryEconomy> {
        let entity = self.world.read_resource::<TerritoryMapping>().get(territory)?;

        self.world.read_storage::<TerritoryData>().get(entity).map(|data| data.economy.clone())
    }

    pub fn territories(&self) -> Vec<RoomName> {
        self.world.read_resource::<TerritoryMapping>().territories.keys().copied().sorted().collect()
    }
}
