use std::error::Error;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Parser;
use env_logger::Builder;

use dag_lower_bound::config::EstimatorConfig;
use dag_lower_bound::dag::DAG;
use dag_lower_bound::experiment::Experiment;
use dag_lower_bound::lower_bound::makespan_lower_bound;
use dag_lower_bound::resource::read_capacities;
use dag_lower_bound::run_stats::ResultSummary;

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
/// Estimates makespan lower bounds of DAGs
struct Args {
    /// Path to YAML file with experiment configuration
    #[arg(short, long, required_unless_present = "dag", conflicts_with = "dag")]
    config: Option<PathBuf>,

    /// Path to produced JSON file with experiment results
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of threads to use (default - use all available cores)
    #[arg(short, long, default_value_t = std::thread::available_parallelism().map_or(1, |n| n.get()))]
    threads: usize,

    /// Print aggregate statistics of experiment results
    #[arg(short, long)]
    summary: bool,

    /// Path to a single DAG file in YAML or JSON format
    #[arg(long, requires = "capacities")]
    dag: Option<PathBuf>,

    /// Path to system capacities in YAML or JSON format (used with --dag)
    #[arg(long)]
    capacities: Option<PathBuf>,

    /// Path to YAML file with estimator settings for the single DAG (used with --dag)
    #[arg(short, long, requires = "dag", conflicts_with = "config")]
    estimator: Option<PathBuf>,

    /// Partition the single DAG at cut points and report NewLB (used with --dag)
    #[arg(long, requires = "dag", conflicts_with = "config")]
    partition: bool,
}

fn default_output(config: &Path) -> PathBuf {
    let stem = config.file_stem().and_then(|s| s.to_str()).unwrap_or("experiment");
    config.with_file_name([stem, "-results"].concat()).with_extension("json")
}

fn run_single(args: &Args, dag_path: &Path, capacities_path: &Path) -> Result<(), Box<dyn Error>> {
    let dag = DAG::from_file(dag_path)?;
    let capacities = read_capacities(capacities_path)?;
    let mut config = match &args.estimator {
        Some(path) => EstimatorConfig::load(path)?,
        None => EstimatorConfig::default(),
    };
    config.partition |= args.partition;
    let report = makespan_lower_bound(&dag, &capacities, &config)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_experiment(args: &Args, config_path: &Path) -> Result<(), Box<dyn Error>> {
    let experiment = Experiment::load(config_path)?;
    let results = experiment.run(args.threads);

    let output = args.output.clone().unwrap_or_else(|| default_output(config_path));
    std::fs::File::create(&output)?.write_all(serde_json::to_string_pretty(&results)?.as_bytes())?;
    log::info!("Results are written to {}", output.display());

    if args.summary {
        println!("{}", serde_json::to_string_pretty(&ResultSummary::new(&results))?);
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    let args = Args::parse();

    match (&args.dag, &args.capacities, &args.config) {
        (Some(dag), Some(capacities), _) => run_single(&args, dag, capacities),
        (_, _, Some(config)) => run_experiment(&args, config),
        _ => unreachable!("clap requires either --config or --dag with --capacities"),
    }
}
