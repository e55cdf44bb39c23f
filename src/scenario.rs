//! Static scenario configuration: a RON description of the system
//! hierarchy (composition, masses, sizes, initial state) loaded once at
//! startup to produce the node tree. Malformed or empty scenarios are
//! fatal; the engine cannot run without a valid initial state.

use std::fs;
use std::path::Path;

use glam::DVec3;
use serde::Deserialize;

use crate::rotation::{Rotation, RotationParams};
use crate::simulation::Simulation;
use crate::tree::{Category, NodeId, Rank, Tree};
use crate::{OrreryError, OrreryResult};

#[derive(Debug, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    /// Scenario start time, seconds since J2000
    #[serde(default)]
    pub epoch: f64,
    pub root: SystemConfig,
}

#[derive(Debug, Deserialize)]
pub struct SystemConfig {
    pub name: String,
    #[serde(default = "default_rank")]
    pub rank: Rank,
    /// Initial state of this system's frame relative to its parent (km, km/s)
    #[serde(default)]
    pub position: (f64, f64, f64),
    #[serde(default)]
    pub velocity: (f64, f64, f64),
    #[serde(default)]
    pub systems: Vec<SystemConfig>,
    #[serde(default)]
    pub objects: Vec<ObjectConfig>,
}

#[derive(Debug, Deserialize)]
pub struct ObjectConfig {
    pub name: String,
    pub category: Category,
    #[serde(default = "default_rank")]
    pub rank: Rank,
    /// kg
    pub mass: f64,
    /// km
    #[serde(default)]
    pub radius: f64,
    /// Parent-frame state (km, km/s)
    pub position: (f64, f64, f64),
    pub velocity: (f64, f64, f64),
    pub rotation: Option<RotationParams>,
}

fn default_rank() -> Rank {
    Rank::Primary
}

/// Parse a scenario and stand up a ready simulation.
pub fn load_str(source: &str) -> OrreryResult<Simulation> {
    let config: ScenarioConfig = ron::from_str(source)?;
    build(config)
}

pub fn load_path(path: impl AsRef<Path>) -> OrreryResult<Simulation> {
    let source = fs::read_to_string(path)?;
    load_str(&source)
}

fn build(config: ScenarioConfig) -> OrreryResult<Simulation> {
    let mut tree = Tree::new();
    let root = insert_system(&mut tree, None, &config.root);

    let objects = tree.ids().filter(|&id| !tree.node(id).is_system()).count();
    if objects == 0 {
        return Err(OrreryError::Scenario(format!(
            "scenario '{}' contains no objects",
            config.name
        )));
    }

    log::info!(
        "loaded scenario '{}': {} nodes ({objects} objects)",
        config.name,
        tree.len()
    );

    Simulation::new(tree, root, config.epoch)
}

fn insert_system(tree: &mut Tree, parent: Option<NodeId>, config: &SystemConfig) -> NodeId {
    let id = tree.add_system(parent, &config.name, config.rank);
    tree.node_mut(id).position = to_vec(config.position);
    tree.node_mut(id).velocity = to_vec(config.velocity);

    for sub in &config.systems {
        insert_system(tree, Some(id), sub);
    }
    for object in &config.objects {
        let object_id = tree.add_object(
            id,
            &object.name,
            object.category,
            object.rank,
            object.mass,
            object.radius,
            to_vec(object.position),
            to_vec(object.velocity),
        );
        tree.node_mut(object_id).rotation = object.rotation.and_then(Rotation::new);
    }
    id
}

fn to_vec((x, y, z): (f64, f64, f64)) -> DVec3 {
    DVec3::new(x, y, z)
}
