//! Life Engine CLI - run simulations and classify patterns.

use std::fs;
use std::path::PathBuf;
use std::process;
use std::time::Instant;

use life_engine::{
    compute::{PatternAnalyzer, Simulation, SimulationStats, comparison_report},
    schema::{AnalysisConfig, PatternLibrary, SimulationConfig},
    snapshot::{CompressionType, Snapshot, load_snapshot, save_snapshot},
};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        process::exit(1);
    }

    let rest = &args[2..];
    match args[1].as_str() {
        "--example" => print_example_config(),
        "run" => run(rest),
        "resume" => resume(rest),
        "analyze" => analyze(rest),
        "compare" => compare(rest),
        "patterns" => list_patterns(),
        other => {
            eprintln!("Unknown command: {}", other);
            eprintln!();
            print_usage(&args[0]);
            process::exit(1);
        }
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} <command> [arguments]", program);
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  run <config.json> [generations] [--save <file>]");
    eprintln!("                       Run a simulation from JSON configuration");
    eprintln!("  resume <file> [generations] [--save <file>]");
    eprintln!("                       Continue a saved snapshot");
    eprintln!("  analyze <pattern> [max_generations] [--json]");
    eprintln!("                       Classify a library pattern");
    eprintln!("  compare <pattern>... Classify several patterns side by side");
    eprintln!("  patterns             List the pattern library");
    eprintln!("  --example            Print example configurations");
    eprintln!();
    eprintln!("Set RUST_LOG=debug for analyzer tracing.");
}

fn fail(context: &str, e: impl std::fmt::Display) -> ! {
    eprintln!("{}: {}", context, e);
    process::exit(1);
}

/// Value following `flag`, if present.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn run(args: &[String]) {
    let Some(config_path) = args.first().map(PathBuf::from) else {
        fail("Missing argument", "run needs a config.json path");
    };
    let generations: u64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(100);

    // Load configuration
    let config_str =
        fs::read_to_string(&config_path).unwrap_or_else(|e| fail("Error reading config file", e));
    let config: SimulationConfig =
        serde_json::from_str(&config_str).unwrap_or_else(|e| fail("Error parsing config", e));

    let library = PatternLibrary::standard();
    let sim = Simulation::from_config(&config, &library)
        .unwrap_or_else(|e| fail("Error building simulation", e));

    println!("Life Simulation");
    println!("===============");
    println!("Grid: {}x{} ({})", config.width, config.height, config.boundary);
    println!("Rule: {}", config.rule);
    match &config.pattern {
        Some(name) => println!("Seed: {}", name),
        None => println!("Seed: random fill at density {}", config.density),
    }
    println!("Generations: {}", generations);
    println!();

    drive(sim, generations, flag_value(args, "--save"));
}

fn resume(args: &[String]) {
    let Some(path) = args.first() else {
        fail("Missing argument", "resume needs a snapshot path");
    };
    let generations: u64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(100);

    let snapshot = load_snapshot(path).unwrap_or_else(|e| fail("Error loading snapshot", e));

    println!("Resuming {}", path);
    println!(
        "Grid: {}x{} ({}), rule {}, generation {}",
        snapshot.grid.width(),
        snapshot.grid.height(),
        snapshot.grid.boundary(),
        snapshot.rule,
        snapshot.generation
    );
    println!();

    drive(snapshot.into_simulation(), generations, flag_value(args, "--save"));
}

/// Step a simulation with progress output, optionally saving the result.
fn drive(mut sim: Simulation, generations: u64, save_path: Option<&str>) {
    let initial = SimulationStats::from_simulation(&sim);
    println!("Initial state:");
    print_stats(&initial);
    println!();

    println!("Running simulation...");
    let start = Instant::now();

    for i in 0..generations {
        sim.step();

        // Print progress every 10%
        if (i + 1) % (generations / 10).max(1) == 0 {
            let stats = SimulationStats::from_simulation(&sim);
            let elapsed = start.elapsed().as_secs_f32();
            println!(
                "  Generation {}: population={}, {:.1} generations/s",
                stats.generation,
                stats.population,
                (i + 1) as f32 / elapsed
            );
        }
    }

    let elapsed = start.elapsed();
    let cells = sim.grid().cell_count() as f64 * generations as f64;

    println!();
    println!("Final state:");
    print_stats(&SimulationStats::from_simulation(&sim));
    println!();
    println!(
        "Time: {:.2}s ({:.1} Mcells/s)",
        elapsed.as_secs_f32(),
        cells / elapsed.as_secs_f64().max(f64::EPSILON) / 1e6
    );

    if let Some(path) = save_path {
        let snapshot = Snapshot::from_simulation(&sim);
        save_snapshot(path, &snapshot, CompressionType::Lz4)
            .unwrap_or_else(|e| fail("Error saving snapshot", e));
        println!("Saved generation {} to {}", snapshot.generation, path);
    }
}

fn print_stats(stats: &SimulationStats) {
    println!("  Generation: {}", stats.generation);
    println!("  Population: {}", stats.population);
    println!("  Density: {:.4}", stats.density);
    match stats.bounding_box {
        Some(b) => println!(
            "  Bounding box: ({}, {})-({}, {}), {}x{}",
            b.min_x,
            b.min_y,
            b.max_x,
            b.max_y,
            b.width(),
            b.height()
        ),
        None => println!("  Bounding box: empty"),
    }
}

fn analyze(args: &[String]) {
    let Some(name) = args.first() else {
        fail("Missing argument", "analyze needs a pattern name");
    };
    let json = args.iter().any(|a| a == "--json");

    let mut config = AnalysisConfig::default();
    if let Some(max) = args.get(1).and_then(|s| s.parse().ok()) {
        config.max_generations = max;
    }

    let library = PatternLibrary::standard();
    let pattern = library.get_by_name(name).unwrap_or_else(|e| {
        eprintln!("{}", e);
        eprintln!("Available patterns: {}", library.names().join(", "));
        process::exit(1);
    });

    let analyzer = PatternAnalyzer::with_library(config, &library)
        .unwrap_or_else(|e| fail("Invalid analysis configuration", e));
    let result = analyzer
        .analyze_centered(pattern)
        .unwrap_or_else(|e| fail("Analysis failed", e));

    if json {
        let out = serde_json::to_string_pretty(&result)
            .unwrap_or_else(|e| fail("Error encoding result", e));
        println!("{}", out);
    } else {
        print!("{}", result.report());
    }
}

fn compare(args: &[String]) {
    if args.is_empty() {
        fail("Missing argument", "compare needs at least one pattern name");
    }

    let library = PatternLibrary::standard();
    let analyzer = PatternAnalyzer::with_library(AnalysisConfig::default(), &library)
        .unwrap_or_else(|e| fail("Invalid analysis configuration", e));

    let mut placements = Vec::with_capacity(args.len());
    for name in args {
        let pattern = library
            .get_by_name(name)
            .unwrap_or_else(|e| fail("Lookup failed", e));
        let (x, y) = analyzer
            .seed_offset(pattern)
            .unwrap_or_else(|e| fail("Placement failed", e));
        placements.push((pattern, x, y));
    }

    let results = analyzer
        .compare_patterns(&placements)
        .unwrap_or_else(|e| fail("Comparison failed", e));
    print!("{}", comparison_report(&results));
}

fn list_patterns() {
    let library = PatternLibrary::standard();
    println!("{:<14} {:<12} {:>7} {:>5}  Description", "Name", "Category", "Size", "Cells");
    for p in library.iter() {
        let category = p.category().map(|c| c.to_string()).unwrap_or_default();
        println!(
            "{:<14} {:<12} {:>7} {:>5}  {}",
            p.name(),
            category,
            format!("{}x{}", p.width(), p.height()),
            p.population(),
            p.description()
        );
    }
}

fn print_example_config() {
    let config = SimulationConfig {
        pattern: Some("glider_gun".to_string()),
        random_seed: Some(42),
        ..Default::default()
    };
    let analysis = AnalysisConfig::default();

    println!("Example configuration (config.json):");
    println!("{}", serde_json::to_string_pretty(&config).unwrap());
    println!();
    println!("Example analysis settings:");
    println!("{}", serde_json::to_string_pretty(&analysis).unwrap());
}
