use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use lineagekit::{
    coalescent::CoalescentTree,
    config::Config,
    genealogy::{GenealogicalGraph, Genealogy},
    io::PedigreeParser,
    kinship::{KinshipEngine, KinshipMode},
    reports::ReportGenerator,
    types::*,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "lineagekit")]
#[command(about = "Kinship, ascending genealogies and coalescent-tree clades for large pedigrees")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format (json, text); overrides the configuration
    #[arg(short, long)]
    output: Option<String>,

    /// Output file path (defaults to stdout)
    #[arg(short = 'f', long)]
    output_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Kinship of one pair, or the kinship matrix of the probands
    Kinship {
        /// Pedigree file
        input: PathBuf,

        /// Compute a single pair instead of the proband matrix
        #[arg(long, num_args = 2, value_names = ["FIRST", "SECOND"])]
        pair: Option<Vec<VertexId>>,

        /// Computation mode (full-retention, incremental-eviction)
        #[arg(short, long)]
        mode: Option<KinshipMode>,

        /// Restrict the matrix to these individuals instead of the sinks
        #[arg(short, long, value_delimiter = ',')]
        probands: Vec<VertexId>,
    },

    /// Ascending genealogy of a set of individuals, by level
    Ascending {
        /// Genealogy file
        input: PathBuf,

        /// Individuals whose ancestors are collected
        #[arg(short, long, value_delimiter = ',', required = true)]
        seeds: Vec<VertexId>,

        /// Write the ascending genealogy to this file
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Structural statistics of a genealogy
    Stats {
        /// Genealogy file
        input: PathBuf,
    },

    /// Largest clade of a coalescent tree
    Clade {
        /// Coalescent tree file (`child parent` lines)
        input: PathBuf,

        /// Metric used to rank clades
        #[arg(long, value_enum, default_value = "probands")]
        by: CladeMetric,

        /// Contract unary vertices first
        #[arg(long)]
        remove_unary: bool,

        /// Build the tree from the ascending genealogy of these probands
        #[arg(short, long, value_delimiter = ',')]
        probands: Vec<VertexId>,
    },

    /// Contribution factors of the founders to a set of targets
    Contribution {
        /// Pedigree file
        input: PathBuf,

        /// Target individuals (defaults to the sinks)
        #[arg(short, long, value_delimiter = ',')]
        targets: Vec<VertexId>,
    },

    /// Simulate parentage errors
    Perturb {
        /// Genealogy file
        input: PathBuf,

        /// Per-individual error rate; overrides the configuration
        #[arg(short, long)]
        rate: Option<f64>,

        /// Random seed; overrides the configuration
        #[arg(short, long)]
        seed: Option<u64>,

        /// Expand the pedigree into ploids and move whole parent individuals
        #[arg(long)]
        ploid: bool,

        /// Write the perturbed genealogy to this file
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Initialize configuration file
    Init {
        /// Configuration file path
        #[arg(short, long, default_value = "lineagekit.yml")]
        config_file: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CladeMetric {
    Size,
    Probands,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(&cli.log_level)?;

    // Load configuration
    let config = load_config(cli.config.as_deref())?;
    let format = cli.output.clone().unwrap_or_else(|| config.output.format.clone());
    let parser = PedigreeParser::new(config.graph.parser.clone());

    let report = match cli.command {
        Commands::Kinship {
            input,
            pair,
            mode,
            probands,
        } => kinship(&parser, &input, pair, mode.unwrap_or(config.kinship.mode), probands)?,

        Commands::Ascending { input, seeds, save } => {
            let graph = parser.read_graph(&input, config.graph.max_parents)?;
            ascending(&parser, &graph, seeds, save.as_deref())?
        }

        Commands::Stats { input } => {
            let graph = parser.read_graph(&input, config.graph.max_parents)?;
            Report::Statistics(graph.statistics()?)
        }

        Commands::Clade {
            input,
            by,
            remove_unary,
            probands,
        } => {
            let tree = if probands.is_empty() {
                parser.read_coalescent_tree(&input)?
            } else {
                let graph = parser.read_graph(&input, config.graph.max_parents)?;
                CoalescentTree::from_ascending(&graph, &probands)?
            };
            clade(tree, by, remove_unary)?
        }

        Commands::Contribution { input, targets } => {
            let pedigree = parser.read_pedigree(&input)?;
            let targets = (!targets.is_empty()).then_some(targets);
            let factors = pedigree.contribution_factors(targets.as_deref())?;

            let target_count = targets.map_or_else(|| pedigree.graph().sinks().len(), |t| t.len());
            let mut founders: Vec<ContributionEntry> = pedigree
                .graph()
                .founders()
                .into_iter()
                .map(|vertex| ContributionEntry {
                    vertex,
                    factor: factors.get(&vertex).copied().unwrap_or(0.0),
                })
                .collect();
            founders.sort_by(|a, b| b.factor.total_cmp(&a.factor).then(a.vertex.cmp(&b.vertex)));

            Report::Contribution(ContributionReport {
                target_count,
                founders,
            })
        }

        Commands::Perturb {
            input,
            rate,
            seed,
            ploid,
            save,
        } => {
            let rate = rate.unwrap_or(config.errors.rate);
            let seed = seed.or(config.errors.seed);
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };

            let (mut graph, candidates, errors) = if ploid {
                let pedigree = parser.read_pedigree(&input)?;
                let individuals = pedigree.graph().vertex_count();
                let graph = pedigree.to_ploid_graph()?;
                let errors = graph.simulate_ploid_parentage_errors(rate, &mut rng)?;
                (graph, individuals - pedigree.graph().founders().len(), errors)
            } else {
                let graph = parser.read_graph(&input, config.graph.max_parents)?;
                let errors = graph.simulate_parentage_errors(rate, &mut rng)?;
                let candidates = graph.vertex_count() - graph.founders().len();
                (graph, candidates, errors)
            };

            if let Some(path) = save {
                graph.apply_errors(&errors)?;
                parser.write_graph(&graph, &path)?;
                info!("Perturbed genealogy written to: {:?}", path);
            }

            Report::Perturbation(PerturbationReport {
                error_rate: rate,
                seed,
                candidates,
                errors,
            })
        }

        Commands::Init { config_file, force } => return init_config(&config_file, force),
    };

    output_report(&report, &format, cli.output_file.as_deref())
}

/// Initialize tracing with the specified log level
fn init_tracing(log_level: &str) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(log_level))
        .context("Failed to create env filter")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(true)
                .with_level(true),
        )
        .with(env_filter)
        .init();

    Ok(())
}

/// Load configuration from file or use defaults
fn load_config(config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(path) if path.exists() => {
            info!("Loading configuration from: {:?}", path);
            Config::load(Some(path))
        }
        Some(path) => {
            warn!("Configuration file not found: {:?}. Using defaults.", path);
            Config::load(None)
        }
        None => Config::load(None),
    }
}

fn kinship(
    parser: &PedigreeParser,
    input: &Path,
    pair: Option<Vec<VertexId>>,
    mode: KinshipMode,
    probands: Vec<VertexId>,
) -> Result<Report> {
    let pedigree = parser.read_pedigree(input)?;
    let engine = KinshipEngine::new(&pedigree);

    if let Some(pair) = pair {
        let (first, second) = match pair.as_slice() {
            [first, second] => (*first, *second),
            _ => return Err(anyhow::anyhow!("--pair expects exactly two individuals")),
        };
        let kinship = engine.calculate_kinship(first, second)?;
        return Ok(Report::Kinship(KinshipReport {
            mode,
            vertices: vec![first, second],
            entries: vec![KinshipEntry {
                first: first.min(second),
                second: first.max(second),
                kinship,
            }],
            stats: None,
        }));
    }

    let subset = (!probands.is_empty()).then_some(probands.as_slice());
    let (matrix, stats) = engine.calculate_probands_kinship_with_stats(mode, subset)?;
    let entries = matrix
        .non_zero_entries()
        .into_iter()
        .map(|(first, second, kinship)| KinshipEntry {
            first,
            second,
            kinship,
        })
        .collect();

    Ok(Report::Kinship(KinshipReport {
        mode,
        vertices: matrix.ids().to_vec(),
        entries,
        stats: Some(stats),
    }))
}

fn ascending(
    parser: &PedigreeParser,
    graph: &GenealogicalGraph,
    seeds: Vec<VertexId>,
    save: Option<&Path>,
) -> Result<Report> {
    let levels = graph.ascending_by_levels(&seeds)?;
    if let Some(path) = save {
        parser.write_graph(&graph.ascending_subgraph(&seeds)?, path)?;
        info!("Ascending genealogy written to: {:?}", path);
    }

    Ok(Report::Ascending(AscendingReport {
        seeds,
        total_vertices: levels.iter().map(Vec::len).sum(),
        levels: levels
            .into_iter()
            .enumerate()
            .map(|(level, vertices)| LevelSummary { level, vertices })
            .collect(),
    }))
}

fn clade(mut tree: CoalescentTree, metric: CladeMetric, remove_unary: bool) -> Result<Report> {
    let unary_removed = if remove_unary {
        tree.remove_unary_nodes()?
    } else {
        0
    };

    let (criterion, vertex) = match metric {
        CladeMetric::Size => (CladeCriterion::Size, tree.largest_clade_by_size()?),
        CladeMetric::Probands => (CladeCriterion::Probands, tree.largest_clade_by_probands()?),
    };

    let stats = tree.clade_statistics()?;
    let clade_stats = vertex.and_then(|vertex| stats.get(&vertex).copied()).unwrap_or_default();
    let probands = match vertex {
        Some(vertex) => tree.clade_probands(vertex)?,
        None => Vec::new(),
    };

    Ok(Report::Clade(CladeReport {
        criterion,
        root: tree.root().ok(),
        vertex,
        clade_size: clade_stats.size,
        proband_count: clade_stats.probands,
        probands,
        unary_removed,
    }))
}

/// Initialize configuration file
fn init_config(config_file: &Path, force: bool) -> Result<()> {
    info!("Initializing configuration file: {:?}", config_file);

    if config_file.exists() && !force {
        warn!("Configuration file already exists: {:?}", config_file);
        println!("Configuration file already exists. Use --force to overwrite it.");
        return Ok(());
    }

    let default_config = r#"# lineagekit configuration
# Every value can be overridden with LINEAGEKIT__<SECTION>__<KEY>,
# e.g. LINEAGEKIT__KINSHIP__MODE=full-retention

# Genealogy input
graph:
  max_parents: 2
  parser:
    # Column separator; null splits on any whitespace
    separator: null
    missing_parent_notation: ["-1", "."]
    skip_first_line: false
    # Treat the first parent column as the father and the second as the mother
    infer_sex_from_columns: false

# Kinship computation
kinship:
  # full-retention keeps every row; incremental-eviction bounds memory
  mode: incremental-eviction

# Parentage-error simulation
errors:
  rate: 0.01
  seed: null

# Report output (json, text)
output:
  format: text
"#;

    std::fs::write(config_file, default_config)
        .with_context(|| format!("Failed to write configuration file: {:?}", config_file))?;

    println!("Configuration file created: {:?}", config_file);
    println!("Edit this file to customize lineagekit.");

    Ok(())
}

/// Render the report and write it to a file or stdout
fn output_report(report: &Report, format: &str, output_file: Option<&Path>) -> Result<()> {
    let content = ReportGenerator::new().generate(report, format)?;

    if let Some(file_path) = output_file {
        std::fs::write(file_path, &content)
            .with_context(|| format!("Failed to write output to: {:?}", file_path))?;
        info!("Report written to: {:?}", file_path);
    } else {
        println!("{}", content);
    }

    Ok(())
}
