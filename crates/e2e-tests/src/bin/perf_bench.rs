use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use e2e_tests::{random_library, random_vector, reference_top_k};
use stacks_knn::{create_index, KnnIndex};
use stacks_types::{Chunk, IndexerKind, Library};

const DEFAULT_ITERATIONS: usize = 3;
const QUERIES_PER_ITERATION: usize = 50;

#[derive(Parser, Debug)]
#[command(name = "perf_bench", about = "stacks k-NN strategy benchmark harness")]
struct Args {
    #[arg(long, value_enum, default_value = "small")]
    tier: DatasetTier,
    #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
    iterations: usize,
    #[arg(long, default_value_t = 16)]
    dim: usize,
    #[arg(long, default_value_t = 10)]
    k: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Write latest.json and latest.txt here
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum DatasetTier {
    Small,
    Medium,
    Large,
}

impl DatasetTier {
    /// (documents, chunks per document)
    fn shape(&self) -> (usize, usize) {
        match self {
            DatasetTier::Small => (10, 100),
            DatasetTier::Medium => (50, 200),
            DatasetTier::Large => (100, 500),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            DatasetTier::Small => "small",
            DatasetTier::Medium => "medium",
            DatasetTier::Large => "large",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StepMetrics {
    p50_ms: f64,
    p90_ms: f64,
    p99_ms: f64,
    samples: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct BenchmarkOutput {
    tier: DatasetTier,
    items: usize,
    dim: usize,
    k: usize,
    iterations: usize,
    generated_at: String,
    steps: BTreeMap<String, StepMetrics>,
}

#[derive(Default)]
struct SampleCollector {
    durations: HashMap<String, Vec<f64>>,
}

impl SampleCollector {
    fn record(&mut self, step: String, started: Instant) {
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.durations.entry(step).or_default().push(duration_ms);
    }
}

fn main() -> Result<(), String> {
    let args = Args::parse();
    if args.k == 0 || args.dim == 0 {
        return Err("--k and --dim must be positive".to_string());
    }

    let (docs, per_doc) = args.tier.shape();
    let library = random_library("bench", docs, per_doc, args.dim, args.seed);
    let items: Vec<Chunk> = library.chunks().cloned().collect();

    let mut collector = SampleCollector::default();
    for iteration in 0..args.iterations {
        let mut rng = StdRng::seed_from_u64(args.seed.wrapping_add(iteration as u64 + 1));
        let queries: Vec<Vec<f32>> = (0..QUERIES_PER_ITERATION)
            .map(|_| random_vector(&mut rng, args.dim))
            .collect();

        for kind in [IndexerKind::BruteForce, IndexerKind::VpTree] {
            run_strategy(kind, &library, &items, &queries, &args, &mut collector)?;
        }
    }

    let output = BenchmarkOutput {
        tier: args.tier,
        items: items.len(),
        dim: args.dim,
        k: args.k,
        iterations: args.iterations,
        generated_at: Utc::now().to_rfc3339(),
        steps: build_metrics(&collector),
    };

    let json = serde_json::to_string_pretty(&output).map_err(|e| e.to_string())?;
    let table = render_table(&output);
    if let Some(out_dir) = &args.out_dir {
        fs::create_dir_all(out_dir).map_err(|e| format!("Failed to create out dir: {e}"))?;
        write_outputs(out_dir, &json, &table)?;
    }

    println!("{}", table);
    println!("\n{}", json);
    Ok(())
}

fn run_strategy(
    kind: IndexerKind,
    library: &Library,
    items: &[Chunk],
    queries: &[Vec<f32>],
    args: &Args,
    collector: &mut SampleCollector,
) -> Result<(), String> {
    let mut index = create_index::<Chunk>(kind, Some(args.seed));

    let started = Instant::now();
    index.build(items.to_vec()).map_err(|e| e.to_string())?;
    collector.record(format!("{}/build", kind), started);

    for query in queries {
        let started = Instant::now();
        let hits = index.query(query, args.k).map_err(|e| e.to_string())?;
        collector.record(format!("{}/query", kind), started);

        // The tree ranks by Euclidean distance and must agree with a full sort.
        if kind == IndexerKind::VpTree {
            let got: Vec<String> = hits.iter().map(|n| n.item.id.clone()).collect();
            if got != reference_top_k(library, query, args.k) {
                return Err(format!("vp_tree result diverged from reference for {query:?}"));
            }
        }
    }
    Ok(())
}

fn build_metrics(collector: &SampleCollector) -> BTreeMap<String, StepMetrics> {
    let mut steps = BTreeMap::new();
    for (step, durations) in &collector.durations {
        let mut sorted = durations.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        steps.insert(
            step.clone(),
            StepMetrics {
                p50_ms: percentile(&sorted, 50.0),
                p90_ms: percentile(&sorted, 90.0),
                p99_ms: percentile(&sorted, 99.0),
                samples: durations.len(),
            },
        );
    }
    steps
}

fn percentile(values: &[f64], percentile: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let rank = (percentile / 100.0) * (values.len() as f64 - 1.0);
    let low = rank.floor() as usize;
    let high = rank.ceil() as usize;
    if low == high {
        values[low]
    } else {
        let weight = rank - low as f64;
        values[low] + (values[high] - values[low]) * weight
    }
}

fn render_table(output: &BenchmarkOutput) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "Benchmark Results (tier={}, items={}, dim={}, k={}, iterations={})",
        output.tier.label(),
        output.items,
        output.dim,
        output.k,
        output.iterations
    ));
    lines.push("step\tp50_ms\tp90_ms\tp99_ms\tsamples".to_string());

    for (step, metrics) in &output.steps {
        lines.push(format!(
            "{}\t{:.3}\t{:.3}\t{:.3}\t{}",
            step, metrics.p50_ms, metrics.p90_ms, metrics.p99_ms, metrics.samples
        ));
    }
    lines.join("\n")
}

fn write_outputs(out_dir: &Path, json: &str, table: &str) -> Result<(), String> {
    fs::write(out_dir.join("latest.json"), json).map_err(|e| e.to_string())?;
    fs::write(out_dir.join("latest.txt"), table).map_err(|e| e.to_string())?;
    Ok(())
}
