use clap::Parser;
use dispersion_core::{
    CancellationToken, Celsius, ChemicalCatalog, CurrentSample, Degrees, DispersionEngine,
    EngineConfig, EnvironmentalSeries, GridConfig, GridPreset, MetersPerSecond, PlumeMode,
    SimulationResult, SpillRegistry, SpillSnapshot, StabilityMode, StaticEnvironment,
    WeatherSample,
};
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Chemical spill dispersion demo with configurable parameters
#[derive(Parser, Debug)]
#[command(name = "dispersion-demo")]
#[command(about = "Surface-water chemical spill dispersion demo", long_about = None)]
#[allow(clippy::struct_excessive_bools)]
struct Args {
    /// Release latitude in degrees
    #[arg(long, default_value_t = 29.30, allow_hyphen_values = true)]
    lat: f64,

    /// Release longitude in degrees
    #[arg(long, default_value_t = -94.80, allow_hyphen_values = true)]
    lon: f64,

    /// Released volume in liters
    #[arg(short, long, default_value_t = 10_000.0)]
    volume: f64,

    /// Water depth at the release point in meters
    #[arg(long, default_value_t = 12.0)]
    depth: f64,

    /// Chemical name (crude oil, diesel, benzene, toluene, methanol)
    #[arg(short, long, default_value = "crude oil")]
    chemical: String,

    /// Simulated horizon in hours
    #[arg(short = 't', long, default_value_t = 6.0)]
    hours: f64,

    /// Wind speed in m/s
    #[arg(short, long, default_value_t = 5.0)]
    wind_speed: f64,

    /// Direction the wind blows from, in degrees (0=North, 90=East)
    #[arg(long, default_value_t = 270.0)]
    wind_direction: f64,

    /// Air temperature in °C
    #[arg(long, default_value_t = 20.0, allow_hyphen_values = true)]
    temperature: f64,

    /// Current speed in m/s (ignored with --synthetic-tide)
    #[arg(long, default_value_t = 0.3)]
    current_speed: f64,

    /// Direction the current flows toward, in degrees
    #[arg(long, default_value_t = 0.0)]
    current_direction: f64,

    /// Grid preset (coarse, standard, fine)
    #[arg(short = 'p', long)]
    preset: Option<String>,

    /// Engine configuration as JSON; command-line flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use the closed-form plume instead of time stepping
    #[arg(long)]
    closed_form: bool,

    /// Reclassify atmospheric stability at every step
    #[arg(long)]
    per_step_stability: bool,

    /// Drive currents with a synthetic semi-diurnal tide
    #[arg(long)]
    synthetic_tide: bool,

    /// Pretend the weather feed is down (default conditions are used)
    #[arg(long)]
    no_weather: bool,

    /// Print every Nth transport step (0 = none)
    #[arg(short, long, default_value_t = 12)]
    report_interval: usize,

    /// Write the full result as JSON to this path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log level filter (error, warn, info, debug, trace)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Print the resolved configuration and exit
    #[arg(long)]
    show_config: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let config = build_config(args)?;
    if args.show_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    println!("=== Chemical Spill Dispersion Demo ===\n");
    println!(
        "Grid: {0}x{0} cells of {1:.0} m ({2:.1} km radius), {3} steps/h, {4:?} plume",
        config.grid.size,
        config.grid.cell_size,
        config.grid.radius_meters() / 1000.0,
        config.steps_per_hour,
        config.plume_mode
    );

    let engine = DispersionEngine::new(config)?;

    let spill = SpillSnapshot::new(
        "demo-spill",
        args.lat,
        args.lon,
        args.volume,
        args.depth,
        args.chemical.as_str(),
    );
    println!(
        "Spill: {:.0} L of '{}' at ({:.4}, {:.4}), depth {:.1} m",
        spill.volume_liters,
        spill.chemical_type_id,
        spill.latitude,
        spill.longitude,
        spill.water_depth_meters
    );

    let mut spills = SpillRegistry::new();
    spills.insert(spill.clone());
    let chemicals = ChemicalCatalog::with_presets();
    let environment = build_environment(args);

    let result = engine.simulate_spill(
        &spill.id,
        args.hours,
        &spills,
        &chemicals,
        &environment,
        &CancellationToken::new(),
    )?;

    print_report(&result, args.report_interval);

    if let Some(path) = &args.output {
        fs::write(path, serde_json::to_string_pretty(&result)?)?;
        println!("\nResult written to {}", path.display());
    }

    Ok(())
}

fn build_config(args: &Args) -> Result<EngineConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => serde_json::from_str::<EngineConfig>(&fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };

    if let Some(name) = &args.preset {
        let preset = match name.to_lowercase().as_str() {
            "coarse" => GridPreset::Coarse,
            "fine" => GridPreset::Fine,
            "standard" => GridPreset::Standard,
            _ => {
                println!("Unknown preset '{}', using standard", name);
                GridPreset::Standard
            }
        };
        config.grid = GridConfig::from_preset(preset);
    }
    if args.closed_form {
        config.plume_mode = PlumeMode::ClosedForm;
    }
    if args.per_step_stability {
        config.stability_mode = StabilityMode::PerStep;
    }

    Ok(config)
}

fn build_environment(args: &Args) -> StaticEnvironment {
    let hours = args.hours.max(0.0).ceil() as usize;

    let weather = if args.no_weather {
        Vec::new()
    } else {
        vec![WeatherSample {
            offset_seconds: 0.0,
            wind_speed: MetersPerSecond::new(args.wind_speed),
            wind_direction: Degrees::new(args.wind_direction),
            temperature: Celsius::new(args.temperature),
            humidity: None,
            pressure: None,
        }]
    };

    if args.synthetic_tide {
        return StaticEnvironment::with_synthetic_tide(weather, hours);
    }

    let currents = vec![CurrentSample {
        offset_seconds: 0.0,
        current_speed: MetersPerSecond::new(args.current_speed),
        current_direction: Degrees::new(args.current_direction),
        water_level: None,
    }];
    StaticEnvironment::new(EnvironmentalSeries::new(weather, currents))
}

fn print_report(result: &SimulationResult, report_interval: usize) {
    if report_interval > 0 && !result.steps.is_empty() {
        println!("\nStep | Velocity (m/s)   | Courant | Substeps | D (m²/s) | Diffusion dt (s) | Evaporation");
        println!("-----|------------------|---------|----------|----------|------------------|------------");
        for (n, step) in result.steps.iter().enumerate() {
            if (n + 1) % report_interval != 0 && n + 1 != result.steps.len() {
                continue;
            }
            let evaporation = step
                .evaporation_factor
                .map_or_else(|| "-".to_string(), |f| format!("{f:.4}"));
            println!(
                "{:4} | ({:6.3}, {:6.3}) | {:7.3} | {:8} | {:8.2} | {:16.1} | {}",
                n + 1,
                step.velocity.x,
                step.velocity.y,
                step.courant_number,
                step.advection_substeps,
                step.diffusivity,
                step.diffusion_dt,
                evaporation
            );
        }
    }

    println!("\n=== Simulation Complete ===");
    println!("Chemical: {}", result.chemical.name);
    println!("Stability class: {}", result.stability_class);
    println!("Horizon: {:.1} h", result.simulation_hours);
    println!("Max concentration: {:.6}", result.max_concentration);
    println!("Max depth-averaged: {:.6} kg/m³", result.max_depth_averaged);
    println!(
        "Mass: {:.2} kg remaining of {:.2} kg released",
        result.total_mass, result.initial_mass
    );
    println!("Affected area: {:.3} km²", result.affected_area_km2);

    if result.contours.is_empty() {
        println!("Contours: none above the configured levels");
    } else {
        println!("Contours:");
        for contour in &result.contours {
            println!("  {:>10}: {} blocks", contour.label, contour.len());
        }
    }

    let defaults = result.defaults_used;
    if defaults.any() {
        println!("\nDefaults substituted:");
        if defaults.chemical {
            println!("  chemical profile -> {}", result.chemical.name);
        }
        if defaults.weather {
            println!("  weather");
        }
        if defaults.currents {
            println!("  currents");
        }
    }
}
