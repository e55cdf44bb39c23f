//! Reconciliation of externally supplied authoritative ephemeris state
//! with the live simulation.
//!
//! Each node polls on its own cadence, tracked exactly like the
//! integrator's per-node timing but orthogonal to it: a node may receive
//! authoritative data far less often than it is integrated. Missing or
//! failed fetches never disturb integration; the node continues on its
//! last computed dynamics.

use std::collections::HashMap;

use glam::DVec3;

use crate::tree::{NodeId, StateVector, Tree};

/// Source of authoritative state vectors, typically backed by an external
/// ephemeris service. Both operations are fallible and may be stale or
/// absent without aborting the simulation; the core only ever consumes
/// completed results, so any async transport stays on the caller's side.
pub trait EphemerisProvider {
    /// State of `node` relative to `reference`, at `time` seconds since
    /// J2000. `None` when the entry is unavailable. The caller composes
    /// the reference's own frame offset back in on application.
    fn fetch(&mut self, node: NodeId, reference: NodeId, time: f64) -> Option<StateVector>;

    /// Bulk snapshot across the tree, e.g. from a single batched query.
    /// States here are parent-frame and applied verbatim.
    fn fetch_all(&mut self, time: f64) -> HashMap<NodeId, StateVector>;
}

/// Advance every node's polling accumulator by the tick's virtual elapsed
/// time. Rewinding still ages the cadence, so magnitude is what counts.
pub fn accrue(tree: &mut Tree, dt: f64) {
    for id in tree.ids() {
        tree.node_mut(id).ephemeris_elapsed += dt.abs();
    }
}

/// Poll the provider for every node whose cadence is due or whose
/// `guaranteed_update` flag is set, and apply the results.
///
/// Position and velocity are applied together, never independently. On a
/// miss the previous computed state is retained; the cadence accumulator
/// still resets so a dead entry is not hammered every tick, but a pending
/// guaranteed update stays pending until it succeeds.
pub fn reconcile(tree: &mut Tree, provider: &mut dyn EphemerisProvider, time: f64) {
    for id in tree.ids() {
        let node = tree.node(id);

        let due = node.guaranteed_update
            || (node.ephemeris_step > 0.0 && node.ephemeris_elapsed >= node.ephemeris_step);
        if !due {
            continue;
        }

        let Some(reference) = node.host.or(node.parent) else {
            continue;
        };

        match provider.fetch(id, reference, time) {
            Some(state) => {
                // A sibling host sits off the frame origin after barycentric
                // re-centering; its parent-frame state is composed back in.
                // The parent itself is the frame origin.
                let (frame_position, frame_velocity) = if Some(reference) == tree.node(id).parent {
                    (DVec3::ZERO, DVec3::ZERO)
                } else {
                    let host = tree.node(reference);
                    (host.position, host.velocity)
                };
                let node = tree.node_mut(id);
                node.position = frame_position + state.position;
                node.velocity = frame_velocity + state.velocity;
                node.guaranteed_update = false;
                node.ephemeris_elapsed = 0.0;
            }
            None => {
                log::warn!(
                    "no ephemeris for '{}', continuing on computed state",
                    node.name
                );
                tree.node_mut(id).ephemeris_elapsed = 0.0;
            }
        }
    }
}

/// Overwrite matching nodes' state from a bulk mapping. This is the
/// one-shot initial synchronization path; unknown ids are ignored.
pub fn apply_states(tree: &mut Tree, states: &HashMap<NodeId, StateVector>) {
    let mut applied = 0usize;
    for id in tree.ids() {
        if let Some(state) = states.get(&id) {
            let node = tree.node_mut(id);
            node.position = state.position;
            node.velocity = state.velocity;
            node.guaranteed_update = false;
            node.ephemeris_elapsed = 0.0;
            applied += 1;
        }
    }
    log::info!("bulk ephemeris sync applied to {applied} nodes");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Category, Rank};
    use glam::DVec3;

    struct MapProvider {
        states: HashMap<NodeId, StateVector>,
        fetches: usize,
    }

    impl MapProvider {
        fn new(states: HashMap<NodeId, StateVector>) -> Self {
            Self { states, fetches: 0 }
        }
    }

    impl EphemerisProvider for MapProvider {
        fn fetch(&mut self, node: NodeId, _reference: NodeId, _time: f64) -> Option<StateVector> {
            self.fetches += 1;
            self.states.get(&node).copied()
        }

        fn fetch_all(&mut self, _time: f64) -> HashMap<NodeId, StateVector> {
            self.states.clone()
        }
    }

    fn small_tree() -> (Tree, NodeId, NodeId) {
        let mut tree = Tree::new();
        let root = tree.add_system(None, "system", Rank::Primary);
        tree.add_object(
            root,
            "star",
            Category::Star,
            Rank::Primary,
            1.0e30,
            1.0,
            DVec3::ZERO,
            DVec3::ZERO,
        );
        let planet = tree.add_object(
            root,
            "planet",
            Category::Planet,
            Rank::Secondary,
            1.0e24,
            1.0,
            DVec3::new(1.0e8, 0.0, 0.0),
            DVec3::new(0.0, 30.0, 0.0),
        );
        tree.assign_hosts(root);
        tree.node_mut(planet).ephemeris_step = 100.0;
        (tree, root, planet)
    }

    fn authoritative() -> StateVector {
        StateVector {
            position: DVec3::new(2.0e8, 1.0, 0.0),
            velocity: DVec3::new(0.5, 25.0, 0.0),
        }
    }

    #[test]
    fn test_cadence_gates_polling() {
        let (mut tree, _, planet) = small_tree();
        let mut provider = MapProvider::new(HashMap::from([(planet, authoritative())]));

        accrue(&mut tree, 50.0);
        reconcile(&mut tree, &mut provider, 0.0);
        // Not due yet: state untouched
        assert_eq!(provider.fetches, 0);
        assert_eq!(tree.node(planet).position, DVec3::new(1.0e8, 0.0, 0.0));

        accrue(&mut tree, 60.0);
        reconcile(&mut tree, &mut provider, 0.0);
        assert_eq!(provider.fetches, 1);
        assert_eq!(tree.node(planet).position, authoritative().position);
        assert_eq!(tree.node(planet).velocity, authoritative().velocity);
        assert_eq!(tree.node(planet).ephemeris_elapsed, 0.0);
    }

    #[test]
    fn test_guaranteed_update_bypasses_cadence() {
        let (mut tree, _, planet) = small_tree();
        let mut provider = MapProvider::new(HashMap::from([(planet, authoritative())]));

        tree.node_mut(planet).guaranteed_update = true;
        reconcile(&mut tree, &mut provider, 0.0);

        assert_eq!(provider.fetches, 1);
        assert!(!tree.node(planet).guaranteed_update);
        assert_eq!(tree.node(planet).position, authoritative().position);
    }

    #[test]
    fn test_host_relative_state_composes_host_frame() {
        let (mut tree, _, planet) = small_tree();
        let star = tree.node(planet).host.unwrap();
        // Re-centering leaves the host off the frame origin
        tree.node_mut(star).position = DVec3::new(-4670.0, 0.0, 0.0);
        tree.node_mut(star).velocity = DVec3::new(0.0, -0.012, 0.0);

        let mut provider = MapProvider::new(HashMap::from([(planet, authoritative())]));
        tree.node_mut(planet).guaranteed_update = true;
        reconcile(&mut tree, &mut provider, 0.0);

        assert_eq!(
            tree.node(planet).position,
            DVec3::new(-4670.0, 0.0, 0.0) + authoritative().position
        );
        assert_eq!(
            tree.node(planet).velocity,
            DVec3::new(0.0, -0.012, 0.0) + authoritative().velocity
        );
    }

    #[test]
    fn test_miss_retains_computed_state() {
        let (mut tree, _, planet) = small_tree();
        let mut provider = MapProvider::new(HashMap::new());

        tree.node_mut(planet).guaranteed_update = true;
        reconcile(&mut tree, &mut provider, 0.0);

        assert_eq!(tree.node(planet).position, DVec3::new(1.0e8, 0.0, 0.0));
        assert_eq!(tree.node(planet).velocity, DVec3::new(0.0, 30.0, 0.0));
        // A cold start must eventually be authoritative: the flag survives
        assert!(tree.node(planet).guaranteed_update);
    }

    #[test]
    fn test_rewind_still_ages_cadence() {
        let (mut tree, _, planet) = small_tree();
        accrue(&mut tree, -150.0);
        assert!(tree.node(planet).ephemeris_elapsed >= 100.0);
    }

    #[test]
    fn test_bulk_sync() {
        let (mut tree, _, planet) = small_tree();
        tree.node_mut(planet).guaranteed_update = true;

        let states = HashMap::from([(planet, authoritative())]);
        apply_states(&mut tree, &states);

        assert_eq!(tree.node(planet).position, authoritative().position);
        assert_eq!(tree.node(planet).velocity, authoritative().velocity);
        assert!(!tree.node(planet).guaranteed_update);
    }
}
