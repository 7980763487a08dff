//! Minimal in-process game host for driving the engine tick by tick.

#![allow(dead_code)]

use screeps_steward::creep::*;
use screeps_steward::host::*;
use screeps_steward::room::coord::*;
use screeps_steward::room::data::*;
use screeps_steward::room::name::*;
use screeps_steward::room::terrain::*;
use screeps_steward::transfer::requests::*;
use std::collections::HashMap;

pub fn room(name: &str) -> RoomName {
    name.parse().unwrap()
}

pub fn pos(name: &str, x: u8, y: u8) -> Position {
    Position::new(room(name), Coord::new(x, y).unwrap())
}

fn role_from_name(name: &str) -> AgentRole {
    match name.split('_').next() {
        Some("m") => AgentRole::Miner,
        Some("h") => AgentRole::Hauler,
        Some("p") => AgentRole::Porter,
        Some("r") => AgentRole::Reserver,
        Some("k") => AgentRole::KeeperKiller,
        Some("b") => AgentRole::Builder,
        Some("u") => AgentRole::Upgrader,
        _ => AgentRole::Scout,
    }
}

#[derive(Default)]
pub struct SimHost {
    pub time: u32,
    pub terrains: HashMap<RoomName, RoomTerrain>,
    pub territories: HashMap<RoomName, TerritoryView>,
    pub agents: HashMap<RoomName, Vec<AgentView>>,
    pub fill_targets: HashMap<RoomName, Vec<FillTarget>>,
    /// Every successful spawn as (name, body).
    pub spawned: Vec<(String, Vec<Part>)>,
}

impl SimHost {
    /// One owned room on plain terrain with a single free spawn.
    pub fn with_territory(name: &str, energy: u32, capacity: u32) -> SimHost {
        let mut host = SimHost {
            time: 100,
            ..SimHost::default()
        };

        host.terrains.insert(room(name), RoomTerrain::plain());
        host.territories.insert(
            room(name),
            TerritoryView {
                name: room(name),
                level: 2,
                energy_available: energy,
                energy_capacity_available: capacity,
                num_spawns: 1,
                free_spawns: vec![SpawnSlot {
                    id: format!("spawn-{}", name),
                    pos: pos(name, 25, 25),
                }],
                anchor: Some(pos(name, 25, 27)),
                nodes: Vec::new(),
                storage: None,
                controller: None,
                controller_num_carry: 0,
            },
        );

        host
    }

    pub fn view_mut(&mut self, name: &str) -> &mut TerritoryView {
        self.territories.get_mut(&room(name)).unwrap()
    }

    pub fn add_node(&mut self, territory: &str, id: &str, at: Position, container: Coord) {
        self.view_mut(territory).nodes.push(LocalNode {
            id: NodeId::new(id),
            pos: at,
            container_coord: Some(container),
            linked: false,
            constructed: false,
            constructing: false,
            num_open: 3,
        });
    }

    pub fn add_agent(&mut self, territory: &str, agent: AgentView) {
        self.agents.entry(room(territory)).or_default().push(agent);
    }

    /// Refills the spawn energy and frees the spawn for the next tick.
    pub fn next_tick(&mut self) {
        self.time += 1;

        for view in self.territories.values_mut() {
            view.energy_available = view.energy_capacity_available;
            view.free_spawns = vec![SpawnSlot {
                id: format!("spawn-{}", view.name),
                pos: Position::new(view.name, Coord::new(25, 25).unwrap()),
            }];
        }
    }
}

pub fn hauler(id: &str, at: Position, energy: u32) -> AgentView {
    AgentView {
        id: AgentId::new(id),
        role: AgentRole::Hauler,
        pos: at,
        ticks_to_live: Some(1200),
        body: vec![Part::Carry, Part::Move, Part::Carry, Part::Move],
        energy,
    }
}

pub fn extension(id: &str, at: Position) -> FillTarget {
    FillTarget {
        id: TargetId::Structure(id.to_owned()),
        kind: FillKind::Extension,
        pos: at,
        free_capacity: 50,
        capacity: 50,
        use_rate: 0.0,
    }
}

impl MapView for SimHost {
    fn terrain(&self, room: RoomName) -> Option<&RoomTerrain> {
        self.terrains.get(&room)
    }

    fn adjacent_rooms(&self, _room: RoomName) -> Vec<RoomName> {
        Vec::new()
    }

    fn room_structures(&self, _room: RoomName) -> Option<Vec<StructureView>> {
        None
    }

    fn room_intel(&self, _room: RoomName) -> Option<RoomIntel> {
        None
    }
}

impl HostEnvironment for SimHost {
    fn time(&self) -> u32 {
        self.time
    }

    fn territories(&self) -> Vec<RoomName> {
        self.territories.keys().copied().collect()
    }

    fn territory(&self, room: RoomName) -> Option<TerritoryView> {
        self.territories.get(&room).cloned()
    }

    fn live_agents_of(&self, territory: RoomName) -> Vec<AgentView> {
        self.agents.get(&territory).cloned().unwrap_or_default()
    }

    fn objects_in_range(&self, _pos: Position, _radius: u32, _kind: ObjectKind) -> Vec<ObjectRef> {
        Vec::new()
    }

    fn fill_targets(&self, territory: RoomName) -> Vec<FillTarget> {
        self.fill_targets.get(&territory).cloned().unwrap_or_default()
    }

    fn node_status(&self, _node: &NodeId) -> Option<NodeStatus> {
        None
    }

    fn reservation_ticks(&self, _room: RoomName) -> i32 {
        0
    }

    fn spawn_agent(&mut self, slot: &SpawnSlot, body: &[Part], name: &str) -> Result<(), SpawnFailure> {
        if self.agents.values().flatten().any(|agent| agent.id.as_str() == name) {
            return Err(SpawnFailure::NameExists);
        }

        let Some(view) = self.territories.values_mut().find(|view| view.free_spawns.iter().any(|s| s.id == slot.id)) else {
            return Err(SpawnFailure::Busy);
        };

        let cost = body_cost(body);

        if cost > view.energy_available {
            return Err(SpawnFailure::NotEnoughEnergy);
        }

        view.energy_available -= cost;
        view.free_spawns.retain(|s| s.id != slot.id);

        let territory = view.name;

        self.agents.entry(territory).or_default().push(AgentView {
            id: AgentId::new(name),
            role: role_from_name(name),
            pos: slot.pos,
            ticks_to_live: None,
            body: body.to_vec(),
            energy: 0,
        });

        self.spawned.push((name.to_owned(), body.to_vec()));

        Ok(())
    }
}
