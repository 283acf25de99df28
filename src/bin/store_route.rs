// Plan a shopping route from a JSON request
//
//   store_route --request request.json [--config nav.toml] [--plot route.png]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn};

use store_navigation::utils::Visualizer;
use store_navigation::{plan_store_route, NavigationConfig, NavigationResult, RouteRequest, RouteResponse};

#[derive(Parser, Debug)]
#[command(name = "store_route", about = "Plan a walking route through a store")]
struct Args {
    /// JSON file with obstacles, waypoints and cart positions
    #[arg(short, long)]
    request: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the grid resolution (cells per unit)
    #[arg(long)]
    resolution: Option<f64>,

    /// Render the route to a PNG file (requires gnuplot)
    #[arg(long)]
    plot: Option<PathBuf>,

    /// Pretty-print the JSON response
    #[arg(long)]
    pretty: bool,
}

fn load_config(args: &Args) -> NavigationResult<NavigationConfig> {
    let mut config = match &args.config {
        Some(path) => NavigationConfig::load(path)?,
        None => NavigationConfig::default(),
    };
    if let Some(resolution) = args.resolution {
        config.resolution = resolution;
    }
    config.validate()?;
    Ok(config)
}

fn plot(path: &PathBuf, request: &RouteRequest, config: &NavigationConfig, response: &RouteResponse) {
    let mut vis = Visualizer::new();
    vis.set_title("Store route")
        .plot_obstacles(&request.active_obstacles())
        .plot_keep_out_zones(&config.keep_out_zones)
        .plot_start(response.start)
        .plot_route(&response.path);

    let file = path.to_string_lossy();
    match vis.save_png(&file, 800, 600) {
        Ok(()) => info!("plot saved to: {}", file),
        Err(e) => warn!("could not save plot: {}", e),
    }
}

fn run(args: &Args) -> NavigationResult<()> {
    let config = load_config(args)?;
    let request = RouteRequest::from_json(&std::fs::read_to_string(&args.request)?)?;
    info!(
        "{} obstacles, {} waypoints, resolution {}",
        request.obstacles.len(),
        request.waypoints.len(),
        config.resolution
    );

    let response = plan_store_route(&request, &config)?;
    if response.is_partial() {
        warn!("items without a route: {:?}", response.skipped);
    }
    println!("{}", response.to_json(args.pretty)?);

    if let Some(path) = &args.plot {
        plot(path, &request, &config, &response);
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
