//! spkcmp - Spike-Sorting Comparison CLI
//!
//! Command-line interface for comparing spike-sorting outputs.

use clap::{Args, Parser, Subcommand, ValueEnum};
use spike_compare::comparison::{
    compare_multiple_sorters, compare_sorter_to_ground_truth, compare_two_sorters,
};
use spike_compare::config::ComparisonConfig;
use spike_compare::data::{Sorting, TimeBase};
use spike_compare::error::Result;
use spike_compare::logging::init_tracing;
use spike_compare::report::ComparisonReport;
use spike_compare::synthetic::{generate_toy_sortings, SyntheticConfig};
use std::path::{Path, PathBuf};
use tracing::info;

/// Output format of reports
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable tables
    Text,
    /// Pretty-printed JSON
    Json,
    /// YAML document
    Yaml,
}

/// Toy data presets
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    /// Sorter output identical to ground truth
    Perfect,
    /// Small jitter, few missed and spurious spikes
    Default,
    /// Many missed spikes plus noise units
    Noisy,
}

/// Options shared by the comparison subcommands
#[derive(Debug, Args)]
struct CommonArgs {
    /// Comparison configuration YAML
    #[arg(long)]
    config: Option<PathBuf>,

    /// Matching tolerance in milliseconds (overrides the config file)
    #[arg(long)]
    delta_ms: Option<f64>,

    /// Sampling frequency of the spike tables in Hz
    #[arg(long)]
    fs: f64,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

/// Spike-sorting comparison
#[derive(Parser)]
#[command(name = "spkcmp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare a sorter output with ground truth
    Gt {
        /// Ground-truth spike table (unit_id<TAB>frame)
        #[arg(long)]
        gt: PathBuf,

        /// Sorter spike table (unit_id<TAB>frame)
        #[arg(long)]
        tested: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Compare two sorter outputs
    Pair {
        /// First spike table
        #[arg(long)]
        first: PathBuf,

        /// Second spike table
        #[arg(long)]
        second: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Compare several sorter outputs and extract consensus units
    Multi {
        /// Named spike table, as name=path (repeat for every sorting)
        #[arg(long = "sorting", value_parser = parse_named_path, required = true)]
        sortings: Vec<(String, PathBuf)>,

        /// Minimum number of sortings a consensus unit must span
        #[arg(long)]
        minimum_matching: Option<usize>,

        /// Write the consensus sorting to this spike table
        #[arg(long)]
        consensus_out: Option<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Write a toy ground truth and sorter output
    Simulate {
        /// Output directory (gt.tsv and tested.tsv are written there)
        #[arg(short, long)]
        out_dir: PathBuf,

        /// Error profile of the simulated sorter
        #[arg(long, value_enum, default_value = "default")]
        preset: Preset,

        /// Number of ground-truth units
        #[arg(long, default_value = "10")]
        units: usize,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Write the default comparison configuration
    ExampleConfig {
        /// Output path for the YAML file
        #[arg(short, long, default_value = "spkcmp.yaml")]
        output: PathBuf,
    },
}

fn parse_named_path(s: &str) -> std::result::Result<(String, PathBuf), String> {
    match s.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok((name.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected name=path, got '{}'", s)),
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Gt { gt, tested, common } => cmd_gt(&gt, &tested, &common),
        Commands::Pair {
            first,
            second,
            common,
        } => cmd_pair(&first, &second, &common),
        Commands::Multi {
            sortings,
            minimum_matching,
            consensus_out,
            common,
        } => cmd_multi(&sortings, minimum_matching, consensus_out.as_ref(), &common),
        Commands::Simulate {
            out_dir,
            preset,
            units,
            seed,
        } => cmd_simulate(&out_dir, preset, units, seed),
        Commands::ExampleConfig { output } => cmd_example_config(&output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(common: &CommonArgs) -> Result<ComparisonConfig> {
    let mut config = match &common.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            ComparisonConfig::from_yaml(&std::fs::read_to_string(path)?)?
        }
        None => ComparisonConfig::default(),
    };
    if let Some(delta_ms) = common.delta_ms {
        config = config.with_delta_ms(delta_ms);
    }
    config.validate()?;
    Ok(config)
}

fn load_sorting(path: &Path, time_base: TimeBase) -> Result<Sorting> {
    let sorting = Sorting::from_tsv(path, time_base)?;
    info!(
        "Loaded {:?}: {} units, {} spikes",
        path,
        sorting.n_units(),
        sorting.total_spikes()
    );
    Ok(sorting)
}

fn sorting_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_report(report: &ComparisonReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", report),
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Yaml => print!("{}", report.to_yaml()?),
    }
    Ok(())
}

/// Compare a sorter with ground truth
fn cmd_gt(gt_path: &Path, tested_path: &Path, common: &CommonArgs) -> Result<()> {
    let config = load_config(common)?;
    let time_base = TimeBase::new(common.fs)?;
    let gt = load_sorting(gt_path, time_base)?;
    let tested = load_sorting(tested_path, time_base)?;

    let comparison = compare_sorter_to_ground_truth(&gt, &tested, &config)?;
    let summary = &comparison.performance().summary;
    info!(
        "Matched {}/{} ground-truth units, {} false-positive units",
        summary.n_matched_gt_units, summary.n_gt_units, summary.n_false_positive_units
    );

    print_report(&comparison.report()?, common.format)
}

/// Compare two sorters
fn cmd_pair(first_path: &Path, second_path: &Path, common: &CommonArgs) -> Result<()> {
    let config = load_config(common)?;
    let time_base = TimeBase::new(common.fs)?;
    let first = load_sorting(first_path, time_base)?;
    let second = load_sorting(second_path, time_base)?;

    let (name_a, name_b) = (sorting_name(first_path), sorting_name(second_path));
    let comparison = compare_two_sorters(
        (name_a.as_str(), &first),
        (name_b.as_str(), &second),
        &config,
    )?;
    info!(
        "{} of {} units matched",
        comparison.table().n_matched_a(),
        first.n_units()
    );

    print_report(&comparison.report()?, common.format)
}

/// Compare several sorters
fn cmd_multi(
    named_paths: &[(String, PathBuf)],
    minimum_matching: Option<usize>,
    consensus_out: Option<&PathBuf>,
    common: &CommonArgs,
) -> Result<()> {
    let mut config = load_config(common)?;
    if let Some(n) = minimum_matching {
        config = config.with_minimum_matching(n);
        config.validate()?;
    }
    let time_base = TimeBase::new(common.fs)?;

    let loaded = named_paths
        .iter()
        .map(|(name, path)| -> Result<(&str, Sorting)> {
            Ok((name.as_str(), load_sorting(path, time_base)?))
        })
        .collect::<Result<Vec<_>>>()?;
    let sortings: Vec<(&str, &Sorting)> = loaded.iter().map(|(n, s)| (*n, s)).collect();

    let comparison = compare_multiple_sorters(&sortings, &config)?;
    info!(
        "{} agreement sets spanning at least {} sortings",
        comparison.agreement_sets().len(),
        config.minimum_matching
    );

    if let Some(path) = consensus_out {
        let consensus = comparison.agreement_sorting(&sortings)?;
        consensus.to_tsv(path)?;
        info!("Wrote consensus sorting ({} units) to {:?}", consensus.n_units(), path);
    }

    print_report(&comparison.report()?, common.format)
}

/// Generate toy data
fn cmd_simulate(out_dir: &Path, preset: Preset, units: usize, seed: u64) -> Result<()> {
    let config = match preset {
        Preset::Perfect => SyntheticConfig::perfect(),
        Preset::Default => SyntheticConfig::default(),
        Preset::Noisy => SyntheticConfig::noisy(),
    }
    .with_units(units)
    .with_seed(seed);

    let data = generate_toy_sortings(&config)?;
    std::fs::create_dir_all(out_dir)?;
    let gt_path = out_dir.join("gt.tsv");
    let tested_path = out_dir.join("tested.tsv");
    data.ground_truth.to_tsv(&gt_path)?;
    data.tested.to_tsv(&tested_path)?;

    info!(
        "Wrote {} ground-truth units to {:?} and {} sorted units to {:?}",
        data.ground_truth.n_units(),
        gt_path,
        data.tested.n_units(),
        tested_path
    );
    println!("sampling_frequency\t{}", config.sampling_frequency);
    println!("gt_unit\ttested_unit");
    for (gt, tested) in &data.true_mapping {
        println!("{}\t{}", gt, tested);
    }
    Ok(())
}

/// Write the default configuration
fn cmd_example_config(output_path: &Path) -> Result<()> {
    let yaml = ComparisonConfig::default().to_yaml()?;
    std::fs::write(output_path, &yaml)?;
    info!("Wrote default configuration to {:?}", output_path);
    println!("{}", yaml);
    Ok(())
}
