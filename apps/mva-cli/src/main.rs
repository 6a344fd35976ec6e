use clap::{Parser, Subcommand};
use mva_app::{AppError, AppResult, SolveOptions, SolveRequest};
use mva_model::ModelResults;
use mva_solver::SolverKind;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mva-cli")]
#[command(about = "Mean value analysis of closed, open and mixed queueing networks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate model file syntax and structure
    Validate {
        /// Path to the model YAML or JSON file
        model_path: PathBuf,
    },
    /// List the chains of a model
    Chains {
        /// Path to the model YAML or JSON file
        model_path: PathBuf,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Solve a model
    Solve {
        /// Path to the model YAML or JSON file
        model_path: PathBuf,
        /// exact, linearizer, fast-linearizer, schweitzer, one-step or one-step-linearizer
        #[arg(long, default_value = "linearizer")]
        solver: SolverKind,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
        /// Store the report in .mva/runs beside the model
        #[arg(long)]
        save: bool,
        /// Reuse a stored report for the same model and solver
        #[arg(long)]
        cached: bool,
    },
    /// Solve several independent models in parallel
    Batch {
        /// Model files
        #[arg(required = true)]
        model_paths: Vec<PathBuf>,
        #[arg(long, default_value = "linearizer")]
        solver: SolverKind,
    },
    /// List stored runs
    Runs {
        /// Report store directory (usually .mva/runs beside a model)
        store_dir: PathBuf,
    },
    /// Show a stored run
    ShowRun {
        /// Report store directory
        store_dir: PathBuf,
        /// Run ID to display
        run_id: String,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { model_path } => cmd_validate(&model_path),
        Commands::Chains { model_path, json } => cmd_chains(&model_path, json),
        Commands::Solve {
            model_path,
            solver,
            json,
            save,
            cached,
        } => cmd_solve(&model_path, solver, json, save, cached),
        Commands::Batch {
            model_paths,
            solver,
        } => cmd_batch(&model_paths, solver),
        Commands::Runs { store_dir } => cmd_runs(&store_dir),
        Commands::ShowRun {
            store_dir,
            run_id,
            json,
        } => cmd_show_run(&store_dir, &run_id, json),
    }
}

fn cmd_validate(model_path: &Path) -> AppResult<()> {
    println!("Validating model: {}", model_path.display());
    let model = mva_app::load_model(model_path)?;
    mva_app::validate_model(&model)?;
    mva_model::build_model(&model)?;
    println!(
        "✓ Model '{}' is valid ({} chains, {} stations)",
        model.name,
        model.chains.len(),
        model.stations.len()
    );
    Ok(())
}

fn cmd_chains(model_path: &Path, json: bool) -> AppResult<()> {
    let model = mva_app::load_model(model_path)?;
    let chains = mva_app::list_chains(&model);

    if json {
        return print_json(&chains);
    }

    println!("Chains in model '{}':", model.name);
    for chain in chains {
        let detail = match (chain.population, chain.arrival_rate) {
            (Some(n), _) => format!(
                "N = {}, Z = {}, priority {}",
                n,
                chain.think_time.unwrap_or(0.0),
                chain.priority
            ),
            (None, Some(rate)) => format!("lambda = {}", rate),
            (None, None) => String::new(),
        };
        println!(
            "  [{} {}] {} - {} (stations: {})",
            chain.kind,
            chain.index,
            chain.name,
            detail,
            chain.stations.join(", ")
        );
    }
    Ok(())
}

fn cmd_solve(
    model_path: &Path,
    solver: SolverKind,
    json: bool,
    save: bool,
    cached: bool,
) -> AppResult<()> {
    let request = SolveRequest {
        model_path,
        options: SolveOptions {
            solver,
            use_cache: cached,
            save,
            ..SolveOptions::default()
        },
    };
    let response = mva_app::ensure_run(&request)?;

    if json {
        return print_json(&response.results);
    }

    if response.loaded_from_cache {
        println!("✓ Loaded from cache: {}", response.run_id);
    } else if response.manifest.is_some() {
        println!("✓ Saved run: {}", response.run_id);
    }
    print_results(&response.results);
    Ok(())
}

fn cmd_batch(model_paths: &[PathBuf], solver: SolverKind) -> AppResult<()> {
    let items = mva_app::solve_batch(model_paths, solver);
    let failed = items.iter().filter(|i| !i.is_ok()).count();

    for item in &items {
        match &item.result {
            Ok(results) => {
                println!("✓ {} ({})", item.path.display(), results.status);
                for chain in &results.chains {
                    println!(
                        "    {:<16} X = {:<12.6} R = {:.6}",
                        chain.name, chain.throughput, chain.response_time
                    );
                }
                for open in &results.open {
                    println!("    {:<16} R = {:.6}", open.name, open.response_time);
                }
            }
            Err(e) => println!("✗ {}: {}", item.path.display(), e),
        }
    }

    if failed > 0 {
        return Err(AppError::InvalidInput(format!(
            "{} of {} models failed",
            failed,
            items.len()
        )));
    }
    Ok(())
}

fn cmd_runs(store_dir: &Path) -> AppResult<()> {
    let runs = mva_app::list_runs(store_dir)?;

    if runs.is_empty() {
        println!("No stored runs in {}", store_dir.display());
    } else {
        println!("Stored runs in {}:", store_dir.display());
        for manifest in runs {
            println!(
                "  {} {} [{}] {} ({})",
                manifest.run_id,
                manifest.model,
                manifest.solver,
                if manifest.converged { "converged" } else { "diverged" },
                manifest.timestamp
            );
        }
    }
    Ok(())
}

fn cmd_show_run(store_dir: &Path, run_id: &str, json: bool) -> AppResult<()> {
    let (manifest, results) = mva_app::load_run(store_dir, run_id)?;

    if json {
        return print_json(&results);
    }

    println!("Run {}", manifest.run_id);
    println!("  Model:     {}", manifest.model);
    println!("  Solver:    {} ({})", manifest.solver, manifest.solver_version);
    println!("  Timestamp: {}", manifest.timestamp);
    print_results(&results);
    Ok(())
}

fn print_results(results: &ModelResults) {
    println!("\nModel '{}': {}", results.model, results.status);

    if !results.chains.is_empty() {
        println!("\nClosed chains:");
        println!(
            "  {:<16} {:>6} {:>12} {:>12}",
            "chain", "N", "throughput", "response"
        );
        for chain in &results.chains {
            println!(
                "  {:<16} {:>6} {:>12.6} {:>12.6}",
                chain.name, chain.population, chain.throughput, chain.response_time
            );
        }
    }

    if !results.open.is_empty() {
        println!("\nOpen chains:");
        println!("  {:<16} {:>12} {:>12}", "chain", "lambda", "response");
        for open in &results.open {
            println!(
                "  {:<16} {:>12.6} {:>12.6}",
                open.name, open.arrival_rate, open.response_time
            );
        }
    }

    println!("\nStations:");
    println!(
        "  {:<16} {:<20} {:>10} {:>10} {:>10}",
        "station", "kind", "util", "queue", "open util"
    );
    for station in &results.stations {
        println!(
            "  {:<16} {:<20} {:>10.4} {:>10.4} {:>10.4}",
            station.name,
            station.kind,
            station.utilization,
            station.queue_length,
            station.open_utilization
        );
        for class in &station.classes {
            println!(
                "    {:<14} X = {:.6}  U = {:.4}  L = {:.4}  R = {:.6}",
                class.chain, class.throughput, class.utilization, class.queue_length,
                class.residence_time
            );
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> AppResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::InvalidInput(format!("Failed to serialize output: {}", e)))?;
    println!("{}", text);
    Ok(())
}
