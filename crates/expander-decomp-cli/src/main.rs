use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;

use expander_decomp::{
    configure_randomness, cut_edges, read_chaco, read_edge_list, CutMatchingConfig,
    ExpanderDecomposition, UndirectedGraph,
};

#[derive(Parser)]
#[command(
    name = "expander-decomp",
    version,
    about = "Expander decomposition of undirected graphs via cut-matching games"
)]
struct Cli {
    /// Input graph file; reads standard input when omitted
    file: Option<PathBuf>,

    /// Conductance parameter phi in (0, 1]
    #[arg(long, default_value_t = 0.01)]
    phi: f64,

    /// Read the input in Chaco adjacency format instead of an edge list
    #[arg(long)]
    chaco: bool,

    /// RNG seed; 0 draws a nondeterministic seed from the OS
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Constant part of the cut-matching round budget
    #[arg(long, default_value_t = 22)]
    t_const: usize,

    /// Multiplier on log10(m)^2 in the round budget
    #[arg(long, default_value_t = 5.0)]
    t_factor: f64,

    /// Balance target as a fraction of the subdivision graph's volume
    #[arg(long, default_value_t = 0.45)]
    min_balance: f64,

    /// Resample the projection vector every round
    #[arg(long)]
    resample_unit_vector: bool,

    /// Extra projections after each resample
    #[arg(long, default_value_t = 0)]
    random_walk_steps: usize,

    /// Potential samples per round (0 disables the diagnostic)
    #[arg(long, default_value_t = 0)]
    sample_potential: usize,

    /// Emit the partition as JSON
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "expander_decomp=debug",
        _ => "expander_decomp=trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let graph = read_graph(cli.file.as_deref(), cli.chaco)?;

    let config = CutMatchingConfig {
        t_const: cli.t_const,
        t_factor: cli.t_factor,
        min_balance: cli.min_balance,
        resample_unit_vector: cli.resample_unit_vector,
        random_walk_steps: cli.random_walk_steps,
        sample_potential: cli.sample_potential,
    };

    let decomposition =
        ExpanderDecomposition::new(&graph, cli.phi, config, configure_randomness(cli.seed))?;
    let clusters = decomposition.compute();
    let crossing = cut_edges(&graph, &clusters);

    if cli.json {
        let report = serde_json::json!({
            "vertices": graph.vertex_count(),
            "edges": graph.edge_count(),
            "phi": cli.phi,
            "clusters": clusters.len(),
            "cut_edges": crossing,
            "partition": clusters,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} vertices, {} edges, phi = {}",
            graph.vertex_count(),
            graph.edge_count(),
            cli.phi
        );
        println!("{} clusters, {} cut edges", clusters.len(), crossing);
        for (i, cluster) in clusters.iter().enumerate() {
            let members: Vec<String> = cluster.iter().map(|u| u.to_string()).collect();
            println!("cluster {} ({}): {}", i, cluster.len(), members.join(" "));
        }
    }
    Ok(())
}

fn read_graph(path: Option<&std::path::Path>, chaco: bool) -> Result<UndirectedGraph> {
    let reader: Box<dyn Read> = match path {
        Some(p) => Box::new(File::open(p).with_context(|| format!("opening {}", p.display()))?),
        None => Box::new(io::stdin()),
    };
    let buffered = BufReader::new(reader);
    let graph = if chaco {
        read_chaco(buffered)?
    } else {
        read_edge_list(buffered)?
    };
    Ok(graph)
}
