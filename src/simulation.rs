//! Simulation orchestrator: owns the wall-clock to virtual-time mapping
//! and the user speed control, drives the integrator each tick, refreshes
//! derived orbit/rotation state, and exposes the identity and hierarchy
//! queries the external viewer needs.
//!
//! The whole tick runs synchronously inside [`Simulation::advance`];
//! consumers must treat the tree as read-only between ticks.

use crate::OrreryResult;
use crate::ephemeris::{self, EphemerisProvider};
use crate::integrator;
use crate::math::SECONDS_PER_DAY;
use crate::tree::{Node, NodeId, Tree};

/// Integration step as a fraction of a node's orbital period (≥1000
/// substeps per orbit).
const STEP_FRACTION: f64 = 1.0e-3;

/// Default ephemeris cadence: well below the integration rate, clamped so
/// fast satellites don't hammer the provider and slow outer bodies still
/// refresh at least daily.
const EPHEMERIS_STEP_FACTOR: f64 = 100.0;
const EPHEMERIS_MIN_STEP: f64 = 1.0;
const EPHEMERIS_MAX_STEP: f64 = SECONDS_PER_DAY;

pub struct Simulation {
    tree: Tree,
    root: NodeId,
    /// Virtual seconds per wall second; zero pauses, negative rewinds
    speed: f64,
    /// Virtual seconds since the J2000 epoch
    virtual_time: f64,
    tick: u64,
    /// External UI focus; the core only stores and resolves it
    selected: Option<NodeId>,
}

impl Simulation {
    /// Finish construction of a loaded tree and wrap it: aggregates system
    /// masses, assigns hosts, derives orbits and timesteps, validates the
    /// hierarchy, and flags every node for an authoritative cold-start
    /// fetch. `epoch` is the scenario's virtual time in seconds since
    /// J2000.
    pub fn new(mut tree: Tree, root: NodeId, epoch: f64) -> OrreryResult<Self> {
        tree.aggregate_masses(root);
        tree.assign_hosts(root);
        tree.validate(root)?;

        for id in tree.ids() {
            let orbit = tree.make_orbit(id);
            let node = tree.node_mut(id);
            if let Some(orbit) = orbit {
                node.integration_step = orbit.period * STEP_FRACTION;
                node.orbit = Some(orbit);
            }
            node.guaranteed_update = true;
        }
        tree.derive_steps(root);
        for id in tree.ids() {
            let node = tree.node_mut(id);
            if node.integration_step > 0.0 {
                node.ephemeris_step = (node.integration_step * EPHEMERIS_STEP_FACTOR)
                    .clamp(EPHEMERIS_MIN_STEP, EPHEMERIS_MAX_STEP);
            }
            if let Some(rotation) = &mut node.rotation {
                rotation.update(epoch);
            }
        }

        log::info!(
            "simulation ready: {} nodes, epoch {epoch}s past J2000",
            tree.len()
        );

        Ok(Self {
            tree,
            root,
            speed: 1.0,
            virtual_time: epoch,
            tick: 0,
            selected: None,
        })
    }

    /// Advance by `wall_dt` seconds of wall-clock time, scaled by the
    /// current speed. Called once per external tick; a zero interval (or a
    /// zero speed) changes nothing.
    pub fn advance(&mut self, wall_dt: f64) {
        let dt = wall_dt * self.speed;
        if dt == 0.0 {
            return;
        }

        integrator::advance(&mut self.tree, self.root, dt);
        self.virtual_time += dt;
        self.tick += 1;
        ephemeris::accrue(&mut self.tree, dt);
        self.refresh_derived();
    }

    /// Recompute per-tick derived state: orbit anomalies (and periodically
    /// the full element sets) and rotation orientations.
    fn refresh_derived(&mut self) {
        for id in self.tree.ids() {
            if let Some((position, velocity, host_mass)) = self.tree.host_relative_state(id) {
                let mass = self.tree.node(id).mass;
                match &mut self.tree.node_mut(id).orbit {
                    Some(orbit) => orbit.update(position, velocity, mass, host_mass),
                    orbit @ None => {
                        *orbit = crate::orbit::Orbit::from_state(position, velocity, mass, host_mass);
                    }
                }
            }

            let time = self.virtual_time;
            if let Some(rotation) = &mut self.tree.node_mut(id).rotation {
                rotation.update(time);
            }
        }
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn virtual_time(&self) -> f64 {
        self.virtual_time
    }

    /// Count of non-trivial ticks advanced so far.
    pub fn ticks(&self) -> u64 {
        self.tick
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        self.tree.node(id)
    }

    /// Find a node by name (load-time identity; names are unique per
    /// scenario by convention).
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.tree.ids().find(|&id| self.tree.node(id).name == name)
    }

    pub fn select(&mut self, id: Option<NodeId>) {
        self.selected = id;
        // Visual smoothness beats fetch economy for the focused body
        if let Some(id) = id {
            self.tree.node_mut(id).guaranteed_update = true;
        }
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    /// Ancestor chain from the root down to `id`, for zoom/focus
    /// resolution in the viewer.
    pub fn parent_chain(&self, id: NodeId) -> Vec<NodeId> {
        self.tree.parent_chain(id)
    }

    /// Force an authoritative fetch for a node on the next reconcile,
    /// e.g. when it enters view.
    pub fn request_priority_update(&mut self, id: NodeId) {
        self.tree.node_mut(id).guaranteed_update = true;
    }

    /// Incremental per-node ephemeris polling against the provider.
    pub fn reconcile(&mut self, provider: &mut dyn EphemerisProvider) {
        ephemeris::reconcile(&mut self.tree, provider, self.virtual_time);
    }

    /// One-shot bulk synchronization of the whole tree.
    pub fn synchronize(&mut self, provider: &mut dyn EphemerisProvider) {
        let states = provider.fetch_all(self.virtual_time);
        ephemeris::apply_states(&mut self.tree, &states);
    }
}
