//! Hierarchical node model: systems-of-systems containing objects, stored
//! in an arena and addressed by stable [`NodeId`] indices. Parent and host
//! links are indices, never owning references, so the hierarchy has no
//! ownership cycles and node identity is stable for the lifetime of the
//! simulation (nodes are mutated in place, never replaced).

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::{OrreryError, OrreryResult, orbit::Orbit, rotation::Rotation};

/// A host must be at least this fraction of the primary's mass to count as
/// a barycenter partner (binary detection).
const BINARY_MASS_RATIO: f64 = 0.01;

/// Stable arena index of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    System,
    Star,
    Planet,
    Asteroid,
    Tno,
    Moon,
}

/// Priority rank of a node within its system.
///
/// Ordering is by priority value, which is *inverted* with respect to
/// prominence: `Primary` carries value 1, so `Primary < Quaternary` under
/// `<` and primary bodies sort first. Do not "fix" this by reversing the
/// comparison; sorting ascending puts the primary first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Primary = 1,
    Secondary = 2,
    Tertiary = 3,
    Quaternary = 4,
}

/// Externally supplied authoritative kinematic state, in km and km/s.
/// Position and velocity travel together so they are always applied
/// atomically.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateVector {
    pub position: DVec3,
    pub velocity: DVec3,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    System {
        /// Child systems, integrated before child objects compose
        child_systems: Vec<NodeId>,
        child_objects: Vec<NodeId>,
        /// Characteristic stable timestep for this system's children (s)
        system_step: f64,
        /// True when the primary hosts off another child (near-equal-mass
        /// pair); such systems integrate with a 10× finer step
        binary: bool,
    },
    Object,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub category: Category,
    pub rank: Rank,

    /// Mass in kg; for systems, the sum of the children's masses
    pub mass: f64,
    /// Radius-like scalar in km; 0 for pure system nodes
    pub size: f64,

    /// Position relative to the parent system's frame (km)
    pub position: DVec3,
    /// Velocity relative to the parent system's frame (km/s)
    pub velocity: DVec3,

    /// Owning system (None only for the root)
    pub parent: Option<NodeId>,
    /// Dominant gravitational influence: a sibling, or None when this node
    /// is its system's reference frame
    pub host: Option<NodeId>,

    /// Timestep this node needs for stable integration (s); 0 until derived
    pub integration_step: f64,
    /// Time accumulated since this node's last integration update (s)
    pub integration_elapsed: f64,

    /// Cadence for authoritative ephemeris polling (s); 0 disables polling
    pub ephemeris_step: f64,
    pub ephemeris_elapsed: f64,
    /// Forces an authoritative fetch on the next reconcile regardless of
    /// cadence (cold start, node entering view)
    pub guaranteed_update: bool,

    pub orbit: Option<Orbit>,
    pub rotation: Option<Rotation>,

    pub kind: NodeKind,
}

impl Node {
    pub fn is_system(&self) -> bool {
        matches!(self.kind, NodeKind::System { .. })
    }
}

/// Arena of nodes. Structure is fixed after load: positions, velocities,
/// and derived orbit/rotation state mutate every tick, but nodes are never
/// added or removed.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids of every node. Captures no borrow of the tree, so callers may
    /// mutate nodes while iterating.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + use<> {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn add_system(
        &mut self,
        parent: Option<NodeId>,
        name: impl Into<String>,
        rank: Rank,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            id,
            name: name.into(),
            category: Category::System,
            rank,
            mass: 0.0,
            size: 0.0,
            position: DVec3::ZERO,
            velocity: DVec3::ZERO,
            parent,
            host: None,
            integration_step: 0.0,
            integration_elapsed: 0.0,
            ephemeris_step: 0.0,
            ephemeris_elapsed: 0.0,
            guaranteed_update: false,
            orbit: None,
            rotation: None,
            kind: NodeKind::System {
                child_systems: Vec::new(),
                child_objects: Vec::new(),
                system_step: 0.0,
                binary: false,
            },
        });
        if let Some(parent) = parent {
            match &mut self.nodes[parent.0].kind {
                NodeKind::System { child_systems, .. } => child_systems.push(id),
                NodeKind::Object => unreachable!("objects cannot own children"),
            }
        }
        id
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_object(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        category: Category,
        rank: Rank,
        mass: f64,
        size: f64,
        position: DVec3,
        velocity: DVec3,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            id,
            name: name.into(),
            category,
            rank,
            mass,
            size,
            position,
            velocity,
            parent: Some(parent),
            host: None,
            integration_step: 0.0,
            integration_elapsed: 0.0,
            ephemeris_step: 0.0,
            ephemeris_elapsed: 0.0,
            guaranteed_update: false,
            orbit: None,
            rotation: None,
            kind: NodeKind::Object,
        });
        match &mut self.nodes[parent.0].kind {
            NodeKind::System { child_objects, .. } => child_objects.push(id),
            NodeKind::Object => unreachable!("objects cannot own children"),
        }
        id
    }

    /// Direct children of a system, child systems first.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        match &self.node(id).kind {
            NodeKind::System {
                child_systems,
                child_objects,
                ..
            } => child_systems.iter().chain(child_objects).copied().collect(),
            NodeKind::Object => Vec::new(),
        }
    }

    pub fn child_systems(&self, id: NodeId) -> Vec<NodeId> {
        match &self.node(id).kind {
            NodeKind::System { child_systems, .. } => child_systems.clone(),
            NodeKind::Object => Vec::new(),
        }
    }

    pub fn child_objects(&self, id: NodeId) -> Vec<NodeId> {
        match &self.node(id).kind {
            NodeKind::System { child_objects, .. } => child_objects.clone(),
            NodeKind::Object => Vec::new(),
        }
    }

    /// Depth-first flattening of the subtree rooted at `id`, self first.
    pub fn flattened(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = vec![id];
        for child in self.children(id) {
            out.extend(self.flattened(child));
        }
        out
    }

    /// Chain of ancestors from the root down to (and including) `id`.
    pub fn parent_chain(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }

    /// The system a node belongs to (itself, for systems).
    pub fn system_of(&self, id: NodeId) -> NodeId {
        if self.node(id).is_system() {
            id
        } else {
            self.node(id).parent.unwrap_or(id)
        }
    }

    /// Position in the root frame, composed along the parent chain.
    pub fn global_position(&self, id: NodeId) -> DVec3 {
        self.parent_chain(id)
            .iter()
            .map(|&n| self.node(n).position)
            .sum()
    }

    pub fn global_velocity(&self, id: NodeId) -> DVec3 {
        self.parent_chain(id)
            .iter()
            .map(|&n| self.node(n).velocity)
            .sum()
    }

    /// Mass-weighted average position of a system's direct children.
    pub fn center_of_mass(&self, id: NodeId) -> DVec3 {
        self.weighted_average(id, |node| node.position)
    }

    /// Mass-weighted average velocity of a system's direct children.
    pub fn center_of_mass_velocity(&self, id: NodeId) -> DVec3 {
        self.weighted_average(id, |node| node.velocity)
    }

    fn weighted_average(&self, id: NodeId, f: impl Fn(&Node) -> DVec3) -> DVec3 {
        let mut total_mass = 0.0;
        let mut weighted = DVec3::ZERO;
        for child in self.children(id) {
            let node = self.node(child);
            total_mass += node.mass;
            weighted += f(node) * node.mass;
        }
        if total_mass > 0.0 {
            weighted / total_mass
        } else {
            DVec3::ZERO
        }
    }

    /// Largest direct-child distance from the system origin; sizes the
    /// external view.
    pub fn scale_distance(&self, id: NodeId) -> f64 {
        self.children(id)
            .iter()
            .map(|&c| self.node(c).position.length())
            .fold(0.0, f64::max)
    }

    /// Like [`scale_distance`](Self::scale_distance) but over child objects
    /// only, ignoring subsystem frames.
    pub fn primary_scale_distance(&self, id: NodeId) -> f64 {
        self.child_objects(id)
            .iter()
            .map(|&c| self.node(c).position.length())
            .fold(0.0, f64::max)
    }

    /// The system's dominant object: its heaviest direct child object.
    pub fn primary_object(&self, id: NodeId) -> Option<NodeId> {
        self.child_objects(id)
            .into_iter()
            .max_by(|&a, &b| {
                self.node(a)
                    .mass
                    .total_cmp(&self.node(b).mass)
            })
    }

    /// Assign each child's dominant gravitational influence, recursively.
    ///
    /// The primary object (coincident with the system itself) hosts off the
    /// heaviest *other* child of at least [`BINARY_MASS_RATIO`] of its own
    /// mass when one exists. Such a partner shares the barycenter of a
    /// near-equal-mass pair and marks the system as binary. Every other
    /// child hosts off the primary.
    pub fn assign_hosts(&mut self, id: NodeId) {
        let Some(primary) = self.primary_object(id) else {
            return;
        };

        let children = self.children(id);
        let primary_mass = self.node(primary).mass;

        let partner = children
            .iter()
            .copied()
            .filter(|&c| c != primary && self.node(c).mass >= primary_mass * BINARY_MASS_RATIO)
            .max_by(|&a, &b| self.node(a).mass.total_cmp(&self.node(b).mass));

        for child in &children {
            self.node_mut(*child).host = if *child == primary {
                partner
            } else {
                Some(primary)
            };
        }

        if let NodeKind::System { binary, .. } = &mut self.node_mut(id).kind {
            *binary = partner.is_some();
        }

        for sub in self.child_systems(id) {
            self.assign_hosts(sub);
        }
    }

    /// Recompute system masses bottom-up as the sum of child masses.
    pub fn aggregate_masses(&mut self, id: NodeId) -> f64 {
        if !self.node(id).is_system() {
            return self.node(id).mass;
        }
        let mass = self
            .children(id)
            .into_iter()
            .map(|c| self.aggregate_masses(c))
            .sum();
        self.node_mut(id).mass = mass;
        mass
    }

    /// Derive each system's characteristic timestep from its children.
    ///
    /// A system's step is the minimum of its direct children's steps,
    /// excluding the primary object. The primary's own step depends
    /// circularly on its host (the system) and is backfilled from that
    /// minimum when still unknown. Binary systems get the whole family of
    /// steps divided by 10 to control the larger truncation error of
    /// comparably-massed mutual orbits. Cascades into child systems after
    /// the local step is set.
    pub fn derive_steps(&mut self, id: NodeId) {
        let primary = self.primary_object(id);
        let children = self.children(id);

        let min_step = children
            .iter()
            .copied()
            .filter(|&c| Some(c) != primary)
            .map(|c| self.node(c).integration_step)
            .filter(|&s| s > 0.0)
            .fold(f64::INFINITY, f64::min);

        if min_step.is_finite() {
            if let Some(primary) = primary
                && self.node(primary).integration_step == 0.0
            {
                self.node_mut(primary).integration_step = min_step;
            }

            let binary = matches!(self.node(id).kind, NodeKind::System { binary: true, .. });
            let divisor = if binary { 10.0 } else { 1.0 };

            if let NodeKind::System { system_step, .. } = &mut self.node_mut(id).kind {
                *system_step = min_step / divisor;
            }
            if binary {
                for child in &children {
                    self.node_mut(*child).integration_step /= 10.0;
                }
            }
        }

        for sub in self.child_systems(id) {
            self.derive_steps(sub);
        }
    }

    /// Construction-time invariant checks. Violations are configuration or
    /// programmer errors and abort the load; they are never guarded at use
    /// sites.
    pub fn validate(&self, root: NodeId) -> OrreryResult<()> {
        let reachable = self.flattened(root);
        if reachable.len() != self.len() {
            return Err(OrreryError::Scenario(format!(
                "{} of {} nodes unreachable from the root",
                self.len() - reachable.len(),
                self.len()
            )));
        }

        for id in self.ids() {
            let node = self.node(id);

            if id != root && node.parent.is_none() {
                return Err(OrreryError::Scenario(format!(
                    "node '{}' has no parent",
                    node.name
                )));
            }

            // Walking the parent chain must terminate at the root; a cycle
            // would revisit this node first.
            let mut seen = 0;
            let mut current = id;
            while let Some(parent) = self.node(current).parent {
                seen += 1;
                if seen > self.len() {
                    return Err(OrreryError::Scenario(format!(
                        "cycle in hierarchy at node '{}'",
                        node.name
                    )));
                }
                current = parent;
            }

            if let Some(host) = node.host {
                if host == id {
                    return Err(OrreryError::Scenario(format!(
                        "node '{}' hosts itself",
                        node.name
                    )));
                }
                if self.node(host).parent != node.parent {
                    return Err(OrreryError::Scenario(format!(
                        "host of '{}' is not a sibling",
                        node.name
                    )));
                }
            }
        }

        Ok(())
    }

    /// Relative state of a node against its host, if it has one:
    /// (position km, velocity km/s, host mass kg).
    pub fn host_relative_state(&self, id: NodeId) -> Option<(DVec3, DVec3, f64)> {
        let node = self.node(id);
        let host = self.node(node.host?);
        Some((
            node.position - host.position,
            node.velocity - host.velocity,
            host.mass,
        ))
    }

    /// Build (or rebuild) a node's orbit from its current host-relative
    /// state. Returns `None`, clearing nothing, for hostless nodes.
    pub fn make_orbit(&self, id: NodeId) -> Option<Orbit> {
        let (position, velocity, host_mass) = self.host_relative_state(id)?;
        Orbit::from_state(position, velocity, self.node(id).mass, host_mass)
    }
}
