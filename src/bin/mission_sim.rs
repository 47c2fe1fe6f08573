//! Fly a named mission profile against the in-process simulator.
//!
//! Usage: mission_sim [PROFILE] [--pole X,Y,R] [--ceiling H] [KEY=VALUE ...]
//!
//! KEY=VALUE pairs override the profile's configuration (e.g. `threshold=0.4`).
//! Ctrl+C requests a manual abort, which lands the vehicle.

use anyhow::{anyhow, bail, Context, Result};
use log::{info, warn};
use reactive_nav::sim::{Pole, SimVehicle};
use reactive_nav::{simulated_mission, Profile};
use std::collections::HashMap;

struct Args {
    profile: Profile,
    poles: Vec<Pole>,
    ceiling: Option<f64>,
    overrides: HashMap<String, f64>,
}

fn parse_pole(text: &str) -> Result<Pole> {
    let parts = text
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("bad pole '{}'", text))?;
    match parts[..] {
        [x, y, radius] => Ok(Pole { x, y, radius }),
        _ => bail!("pole must be X,Y,R, got '{}'", text),
    }
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        profile: Profile::TimedSequence,
        poles: Vec::new(),
        ceiling: None,
        overrides: HashMap::new(),
    };

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--pole" => {
                let pole = it.next().ok_or_else(|| anyhow!("--pole needs X,Y,R"))?;
                args.poles.push(parse_pole(&pole)?);
            }
            "--ceiling" => {
                let h = it.next().ok_or_else(|| anyhow!("--ceiling needs a height"))?;
                args.ceiling = Some(h.parse().with_context(|| format!("bad ceiling '{}'", h))?);
            }
            kv if kv.contains('=') => {
                let (key, value) = kv.split_once('=').unwrap_or_default();
                let value: f64 = value
                    .parse()
                    .with_context(|| format!("bad value for '{}'", key))?;
                args.overrides.insert(key.to_string(), value);
            }
            name => args.profile = name.parse()?,
        }
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args()?;
    let vehicle = SimVehicle::new();
    for pole in &args.poles {
        vehicle.add_obstacle(*pole);
    }
    vehicle.set_ceiling(args.ceiling);

    let mission = simulated_mission(args.profile, &vehicle, &args.overrides)
        .with_context(|| format!("building {} mission", args.profile))?;
    let abort = mission.abort_handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl+C received, aborting mission");
            abort.abort();
        }
    });

    info!("Flying profile {}", args.profile);
    let report = mission.run().await;

    println!("\n=== Mission report ({}) ===", args.profile);
    println!("{}", report);
    println!("commands sent: {}", vehicle.commands().len());

    if report.is_success() {
        Ok(())
    } else {
        bail!("mission did not complete: {:?}", report.outcome)
    }
}
