use std::fs;
use std::path::{Path, PathBuf};

use bridge::BridgeConfig;
use clap::{Parser, Subcommand};
use foundation::bounds::Aabb3;
use foundation::math::projection::resolve;
use foundation::math::{Vec3, geodetic_to_ecef};
use serde_json::json;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect point-cloud/globe bridge configurations")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse and validate a configuration file
    Check { config: PathBuf },

    /// Print the ordered asset load plan for a configuration
    Plan {
        config: PathBuf,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Project a local point through the configured globe projection
    Project {
        config: PathBuf,
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
        #[arg(allow_negative_numbers = true)]
        z: f64,

        /// Dataset bounds for fixed-anchor mode: minX,minY,minZ,maxX,maxY,maxZ
        #[arg(long, allow_hyphen_values = true)]
        anchor_bounds: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), String> {
    match Args::parse().command {
        Command::Check { config } => cmd_check(&config),
        Command::Plan { config, json } => cmd_plan(&config, json),
        Command::Project {
            config,
            x,
            y,
            z,
            anchor_bounds,
        } => cmd_project(&config, Vec3::new(x, y, z), anchor_bounds.as_deref()),
    }
}

fn load_config(path: &Path) -> Result<BridgeConfig, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("read {path:?}: {e}"))?;
    let config = BridgeConfig::from_json(&text).map_err(|e| format!("{path:?}: {e}"))?;
    debug!(path = %path.display(), container = %config.container_id, "config loaded");
    Ok(config)
}

fn cmd_check(path: &Path) -> Result<(), String> {
    let config = load_config(path)?;
    let v = &config.viewer;
    println!("container: #{}", config.container_id);
    println!(
        "viewer: fov {} | budget {} (ceiling {}) | edl {} | controls {} | sidebar {}",
        v.fov,
        v.effective_point_budget(),
        v.point_budget_ceiling,
        v.edl_enabled,
        v.control_mode.as_str(),
        v.show_sidebar,
    );
    match config.enabled_globe() {
        Some(globe) => {
            let provider = globe.imagery_source.provider();
            println!(
                "globe: #{} | projection {} | imagery {}",
                config.globe_container_id(),
                globe.projection.kind(),
                provider.url,
            );
        }
        None => println!("globe: disabled"),
    }
    println!("assets: {} (cesium base {})", config.assets.base_path, config.cesium_base_url());
    println!("ok");
    Ok(())
}

fn cmd_plan(path: &Path, as_json: bool) -> Result<(), String> {
    let config = load_config(path)?;
    let plan = config.load_plan();
    if as_json {
        let payload = json!({
            "id": plan.id().as_str(),
            "scripts": plan.scripts(),
            "styles": plan.styles(),
            "requiredGlobals": plan.required_globals(),
        });
        let text = serde_json::to_string_pretty(&payload).map_err(|e| format!("json: {e}"))?;
        println!("{text}");
        return Ok(());
    }

    println!("manifest {}", plan.id());
    println!("scripts (in load order):");
    for (i, url) in plan.scripts().iter().enumerate() {
        println!("  {:>2}. {url}", i + 1);
    }
    println!("styles:");
    for url in plan.styles() {
        println!("  - {url}");
    }
    println!("required globals: {}", plan.required_globals().join(", "));
    Ok(())
}

fn cmd_project(path: &Path, local: Vec3, anchor_bounds: Option<&str>) -> Result<(), String> {
    let config = load_config(path)?;
    let globe = config
        .enabled_globe()
        .ok_or_else(|| "config has no enabled globe section".to_string())?;
    let mut transform =
        resolve(&globe.projection, globe.vertical_offset).map_err(|e| e.to_string())?;

    if let Some(text) = anchor_bounds {
        let bounds = parse_bounds(text)?;
        if !transform.observe_bounds(&bounds) && transform.needs_reference() {
            return Err(format!("unusable --anchor-bounds: {text}"));
        }
    }

    let geo = transform.forward(local).map_err(|e| format!("cannot project {local:?}: {e}"))?;
    let ecef = geodetic_to_ecef(geo);
    println!("projection: {}", globe.projection.kind());
    if let Some(reference) = transform.reference() {
        println!("reference: {} {} {}", reference.x, reference.y, reference.z);
    }
    println!("lon {:.8} lat {:.8} height {:.3}", geo.lon_deg(), geo.lat_deg(), geo.alt_m);
    println!("ecef {:.3} {:.3} {:.3}", ecef.x, ecef.y, ecef.z);
    Ok(())
}

fn parse_bounds(text: &str) -> Result<Aabb3, String> {
    let values = text
        .split(',')
        .map(|s| s.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("bounds {text:?}: {e}"))?;
    let [min_x, min_y, min_z, max_x, max_y, max_z] = values[..] else {
        return Err(format!("bounds {text:?}: expected six comma-separated numbers"));
    };
    Ok(Aabb3::new([min_x, min_y, min_z], [max_x, max_y, max_z]))
}
