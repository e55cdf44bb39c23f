use anyhow::Result;
use orrery::math::{SECONDS_PER_DAY, time};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let scenario_file = if args.len() > 1 {
        args[1].clone()
    } else {
        "demos/inner_system.ron".to_string()
    };
    let days = if args.len() > 2 {
        args[2].parse::<f64>().unwrap_or(365.0)
    } else {
        365.0
    };

    log::info!("Using scenario file: {scenario_file}");

    let mut sim = orrery::scenario::load_path(&scenario_file)?;

    // One simulated day per tick
    sim.set_speed(SECONDS_PER_DAY);
    for _ in 0..days.ceil() as u64 {
        sim.advance(1.0);
    }

    println!(
        "t = {:.1} days past J2000",
        time::seconds_to_days(sim.virtual_time())
    );
    for id in sim.tree().ids() {
        let node = sim.node(id);
        let position = sim.tree().global_position(id);
        print!(
            "{:<16} [{:>12.3e} {:>12.3e} {:>12.3e}] km",
            node.name, position.x, position.y, position.z
        );
        if let Some(orbit) = &node.orbit {
            print!(
                "  e={:.4} period={:.1}d",
                orbit.eccentricity,
                orbit.period / SECONDS_PER_DAY
            );
        }
        println!();
    }

    Ok(())
}
