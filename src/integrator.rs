//! Multi-rate leapfrog integration over the node hierarchy.
//!
//! Each system advances its child systems first (they integrate their own
//! sub-hierarchy with their own, generally much smaller, step), then splits
//! the requested interval into substeps no larger than its characteristic
//! step. Within the substep loop every child accumulates elapsed time and
//! only integrates once its personal step is reached, so fast bodies update
//! every substep while slow ones skip several. A final unconditional flush
//! guarantees every node is updated at least once per outer call, and a
//! barycentric re-centering pins each system's internal center of mass to
//! its local origin.
//!
//! Not reentrant mid-pass: the half-kick state of a node is only consistent
//! once the full pass completes, which the `&mut Tree` borrow enforces.

use glam::DVec3;

use crate::math::gravitational_acceleration;
use crate::tree::{NodeId, NodeKind, Tree};

/// Advance the subtree rooted at `system` by `dt` virtual seconds.
/// Zero is a no-op; negative values rewind symmetrically.
pub fn advance(tree: &mut Tree, system: NodeId, dt: f64) {
    if dt == 0.0 {
        return;
    }
    advance_system(tree, system, dt);
}

fn advance_system(tree: &mut Tree, system: NodeId, total: f64) {
    for sub in tree.child_systems(system) {
        advance_system(tree, sub, total);
    }

    let system_step = match tree.node(system).kind {
        NodeKind::System { system_step, .. } => system_step,
        NodeKind::Object => return,
    };
    let children = tree.children(system);
    if children.is_empty() {
        return;
    }

    // Equal substeps, each no larger in magnitude than the system's step
    let steps = if system_step > 0.0 {
        (total.abs() / system_step).ceil().max(1.0) as u64
    } else {
        1
    };
    let dt = total / steps as f64;

    for _ in 0..steps {
        for &child in &children {
            tree.node_mut(child).integration_elapsed += dt;

            let node = tree.node(child);
            if node.integration_elapsed.abs() >= node.integration_step {
                let elapsed = node.integration_elapsed;
                leapfrog(tree, system, child, elapsed);
                tree.node_mut(child).integration_elapsed = 0.0;
            }
        }
    }

    // Flush whatever remains so every node moved at least once this call;
    // a slow body being actively viewed must not hold still.
    for &child in &children {
        let elapsed = tree.node(child).integration_elapsed;
        if elapsed != 0.0 {
            leapfrog(tree, system, child, elapsed);
            tree.node_mut(child).integration_elapsed = 0.0;
        }
    }

    recenter(tree, system, &children);
}

/// Kick-drift-kick velocity Verlet for one node, with the acceleration
/// re-evaluated at the drifted position for the second kick.
fn leapfrog(tree: &mut Tree, system: NodeId, id: NodeId, dt: f64) {
    let half = 0.5 * dt;

    let a = acceleration(tree, system, id);
    {
        let node = tree.node_mut(id);
        node.velocity += a * half;
        let drift = node.velocity * dt;
        node.position += drift;
    }

    let a = acceleration(tree, system, id);
    tree.node_mut(id).velocity += a * half;
}

/// Gravitational acceleration on a node, in km/s².
///
/// The common case reads only the dominant host (two-body approximation,
/// O(1)). A node without a host is its system's reference frame and feels
/// the sum of all sibling contributions instead (O(n), top of a system
/// only).
fn acceleration(tree: &Tree, system: NodeId, id: NodeId) -> DVec3 {
    let node = tree.node(id);
    match node.host {
        Some(host) => {
            let host = tree.node(host);
            gravitational_acceleration(host.mass, host.position - node.position)
        }
        None => tree
            .children(system)
            .into_iter()
            .filter(|&sibling| sibling != id)
            .map(|sibling| {
                let other = tree.node(sibling);
                gravitational_acceleration(other.mass, other.position - node.position)
            })
            .sum(),
    }
}

/// Subtract the direct children's barycenter (position and velocity) from
/// every child, pinning the system's internal frame to its origin against
/// accumulated integration error.
fn recenter(tree: &mut Tree, system: NodeId, children: &[NodeId]) {
    let com = tree.center_of_mass(system);
    let com_velocity = tree.center_of_mass_velocity(system);
    for &child in children {
        let node = tree.node_mut(child);
        node.position -= com;
        node.velocity -= com_velocity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{GRAVITATIONAL_CONSTANT_KM, SOLAR_MASS};
    use crate::tree::{Category, Rank};

    const ORBIT_RADIUS_KM: f64 = 1.496e8;

    /// Sun plus a circularly-orbiting planet, steps derived for ~1000
    /// substeps per orbit. Returns (tree, root, planet, orbital period).
    fn circular_two_body() -> (Tree, NodeId, NodeId, f64) {
        let mut tree = Tree::new();
        let root = tree.add_system(None, "system", Rank::Primary);
        tree.add_object(
            root,
            "star",
            Category::Star,
            Rank::Primary,
            SOLAR_MASS,
            696_000.0,
            DVec3::ZERO,
            DVec3::ZERO,
        );
        // Planet mass negligible so the analytic two-body solution applies
        let mu = GRAVITATIONAL_CONSTANT_KM * SOLAR_MASS;
        let speed = (mu / ORBIT_RADIUS_KM).sqrt();
        let planet = tree.add_object(
            root,
            "planet",
            Category::Planet,
            Rank::Secondary,
            1.0e3,
            1.0,
            DVec3::new(ORBIT_RADIUS_KM, 0.0, 0.0),
            DVec3::new(0.0, speed, 0.0),
        );
        tree.aggregate_masses(root);
        tree.assign_hosts(root);

        let period = crate::math::TAU * (ORBIT_RADIUS_KM.powi(3) / mu).sqrt();
        tree.node_mut(planet).integration_step = period / 1000.0;
        tree.derive_steps(root);

        (tree, root, planet, period)
    }

    #[test]
    fn test_zero_dt_is_noop() {
        let (mut tree, root, planet, _) = circular_two_body();
        let before_pos = tree.node(planet).position;
        let before_vel = tree.node(planet).velocity;

        advance(&mut tree, root, 0.0);

        assert_eq!(tree.node(planet).position, before_pos);
        assert_eq!(tree.node(planet).velocity, before_vel);
    }

    #[test]
    fn test_circular_orbit_radius_holds_over_one_period() {
        let (mut tree, root, planet, period) = circular_two_body();
        let star = tree.node(planet).host.unwrap();

        let dt = period / 1000.0;
        for _ in 0..1000 {
            advance(&mut tree, root, dt);
            let radius = (tree.node(planet).position - tree.node(star).position).length();
            assert!(
                (radius - ORBIT_RADIUS_KM).abs() / ORBIT_RADIUS_KM < 1e-3,
                "radius drifted to {radius}"
            );
        }
    }

    #[test]
    fn test_recentering_invariant() {
        let (mut tree, root, _, period) = circular_two_body();

        advance(&mut tree, root, period / 10.0);

        assert!(tree.center_of_mass(root).length() < 1e-3);
        assert!(tree.center_of_mass_velocity(root).length() < 1e-9);
    }

    #[test]
    fn test_elapsed_never_exceeds_twice_step() {
        let (mut tree, root, _, period) = circular_two_body();

        for _ in 0..7 {
            advance(&mut tree, root, period / 313.0);
            for id in tree.ids() {
                let node = tree.node(id);
                if node.integration_step > 0.0 {
                    assert!(node.integration_elapsed.abs() <= 2.0 * node.integration_step);
                }
            }
        }
    }

    #[test]
    fn test_reverse_advance_restores_state() {
        let (mut tree, root, planet, period) = circular_two_body();
        let before_pos = tree.node(planet).position;
        let before_vel = tree.node(planet).velocity;

        let span = period / 50.0;
        advance(&mut tree, root, span);
        advance(&mut tree, root, -span);

        let pos_error = (tree.node(planet).position - before_pos).length() / ORBIT_RADIUS_KM;
        let vel_error =
            (tree.node(planet).velocity - before_vel).length() / before_vel.length();
        assert!(pos_error < 1e-4, "position error {pos_error}");
        assert!(vel_error < 1e-4, "velocity error {vel_error}");
    }

    #[test]
    fn test_nested_system_integrates_subsystem_first() {
        // A planet-moon subsystem inside a stellar system: both orbits must
        // stay bounded through a combined advance.
        let mut tree = Tree::new();
        let root = tree.add_system(None, "system", Rank::Primary);
        tree.add_object(
            root,
            "star",
            Category::Star,
            Rank::Primary,
            SOLAR_MASS,
            696_000.0,
            DVec3::ZERO,
            DVec3::ZERO,
        );

        let mu_star = GRAVITATIONAL_CONSTANT_KM * SOLAR_MASS;
        let sub = tree.add_system(Some(root), "planet system", Rank::Secondary);
        tree.node_mut(sub).position = DVec3::new(ORBIT_RADIUS_KM, 0.0, 0.0);
        tree.node_mut(sub).velocity = DVec3::new(0.0, (mu_star / ORBIT_RADIUS_KM).sqrt(), 0.0);

        let planet_mass = 5.972e24;
        tree.add_object(
            sub,
            "planet",
            Category::Planet,
            Rank::Primary,
            planet_mass,
            6371.0,
            DVec3::ZERO,
            DVec3::ZERO,
        );
        let moon_radius = 384_400.0;
        let moon_mass = 7.35e22;
        // Relative circular speed uses the pair's combined mass
        let mu_pair = GRAVITATIONAL_CONSTANT_KM * (planet_mass + moon_mass);
        let moon = tree.add_object(
            sub,
            "moon",
            Category::Moon,
            Rank::Secondary,
            moon_mass,
            1737.0,
            DVec3::new(moon_radius, 0.0, 0.0),
            DVec3::new(0.0, (mu_pair / moon_radius).sqrt(), 0.0),
        );

        tree.aggregate_masses(root);
        tree.assign_hosts(root);

        let moon_period = crate::math::TAU * (moon_radius.powi(3) / mu_pair).sqrt();
        let sub_period = crate::math::TAU * (ORBIT_RADIUS_KM.powi(3) / mu_star).sqrt();
        tree.node_mut(moon).integration_step = moon_period / 1000.0;
        tree.node_mut(sub).integration_step = sub_period / 1000.0;
        tree.derive_steps(root);

        // Two lunar months in substeps well above the subsystem's own step
        let dt = moon_period / 20.0;
        for _ in 0..40 {
            advance(&mut tree, root, dt);
            let planet_id = tree.primary_object(sub).unwrap();
            let lunar_radius =
                (tree.node(moon).position - tree.node(planet_id).position).length();
            assert!(
                (lunar_radius - moon_radius).abs() / moon_radius < 0.01,
                "lunar orbit drifted to {lunar_radius}"
            );
        }
        assert!(tree.center_of_mass(sub).length() < 1.0);
    }
}
