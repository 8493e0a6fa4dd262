use std::fs;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result, anyhow};
use biosim_core::BioSimConfig;
use biosim_world::{
    GenerationSummary, GenomeSample, RunControl, RunSummary, Simulation, SimulationObserver,
};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "biosim",
    version,
    about = "Run a headless BioSim evolution experiment"
)]
struct Cli {
    /// JSON configuration file; fields it omits keep their defaults.
    #[arg(short, long, env = "BIOSIM_CONFIG")]
    config: Option<PathBuf>,

    /// Number of generations to run.
    #[arg(short, long)]
    generations: Option<u32>,

    /// RNG seed; a random seed is drawn and logged when omitted.
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    population: Option<usize>,

    /// Steps per generation.
    #[arg(long)]
    steps: Option<u32>,

    /// Write the run summary and every generation summary to this JSON file.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Print this many genomes from each analysed generation.
    #[arg(long)]
    sample_genomes: Option<usize>,

    /// Analyse every Nth generation when printing sample genomes.
    #[arg(long)]
    analysis_stride: Option<u32>,
}

/// Logs each finished generation and keeps a copy for the report.
#[derive(Default)]
struct GenerationLog {
    summaries: Arc<Mutex<Vec<GenerationSummary>>>,
}

impl SimulationObserver for GenerationLog {
    fn on_generation(&mut self, summary: &GenerationSummary) {
        if summary.reseeded {
            warn!(generation = summary.generation, "population went extinct");
        }
        info!(
            generation = summary.generation,
            survivors = summary.survivors,
            population = summary.population,
            avg_genome_len = summary.average_genome_length,
            "generation summary"
        );
        if let Ok(mut summaries) = self.summaries.lock() {
            summaries.push(summary.clone());
        }
    }

    fn on_sample_genomes(&mut self, generation: u32, samples: &[GenomeSample]) {
        for sample in samples {
            println!("{}", format_sample(generation, sample));
        }
    }
}

fn format_sample(generation: u32, sample: &GenomeSample) -> String {
    format!(
        "generation {} agent {} ({} genes, {} connections)\nactions: {}\n{}",
        generation,
        sample.index,
        sample.genome_length,
        sample.connections,
        sample.actions.join(" "),
        sample.genome_hex
    )
}

#[derive(Serialize)]
struct Report<'a> {
    config: &'a BioSimConfig,
    run: &'a RunSummary,
    generations: &'a [GenerationSummary],
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let log = GenerationLog::default();
    let summaries = Arc::clone(&log.summaries);
    let mut sim =
        Simulation::with_observer(config, Box::new(log)).context("failed to start simulation")?;
    info!(seed = sim.seed(), "starting BioSim run");

    let control = RunControl::new();
    stop_when(control.clone(), tokio::signal::ctrl_c())?;
    let run = sim.run(&control).context("simulation aborted")?;
    info!(
        generations = run.generations_completed,
        reseeds = run.reseeds,
        stopped_early = run.stopped_early,
        "run finished"
    );

    if let Some(path) = &cli.report {
        let summaries = summaries
            .lock()
            .map_err(|_| anyhow!("generation history lock poisoned"))?;
        let report = Report {
            config: sim.config(),
            run: &run,
            generations: &summaries,
        };
        let json = serde_json::to_string_pretty(&report).context("failed to encode report")?;
        fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "report written");
    }
    Ok(())
}

/// Request a stop once `signal` resolves; the run halts before its next step.
fn stop_when<F>(control: RunControl, signal: F) -> Result<JoinHandle<()>>
where
    F: Future<Output = io::Result<()>> + Send + 'static,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build signal runtime")?;
    thread::Builder::new()
        .name("biosim-signal".into())
        .spawn(move || {
            runtime.block_on(async move {
                match signal.await {
                    Ok(()) => {
                        info!("interrupt received, stopping after the current step");
                        control.request_stop();
                    }
                    Err(err) => warn!(error = %err, "interrupt handler unavailable"),
                }
            });
        })
        .context("failed to spawn signal thread")
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn load_config(cli: &Cli) -> Result<BioSimConfig> {
    let config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        }
        None => BioSimConfig::default(),
    };
    let config = apply_overrides(config, cli);
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn apply_overrides(mut config: BioSimConfig, cli: &Cli) -> BioSimConfig {
    if let Some(generations) = cli.generations {
        config.max_generations = generations;
    }
    if let Some(seed) = cli.seed {
        config.rng_seed = Some(seed);
    }
    if let Some(population) = cli.population {
        config.population = population;
    }
    if let Some(steps) = cli.steps {
        config.steps_per_generation = steps;
    }
    if let Some(count) = cli.sample_genomes {
        config.display_sample_genomes = count;
    }
    if let Some(stride) = cli.analysis_stride {
        config.genome_analysis_stride = stride;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_file_values() {
        let cli = Cli::try_parse_from([
            "biosim",
            "--generations",
            "3",
            "--seed",
            "7",
            "--population",
            "12",
            "--steps",
            "40",
            "--sample-genomes",
            "2",
            "--analysis-stride",
            "5",
        ])
        .expect("args");
        let config = apply_overrides(BioSimConfig::default(), &cli);
        assert_eq!(config.max_generations, 3);
        assert_eq!(config.rng_seed, Some(7));
        assert_eq!(config.population, 12);
        assert_eq!(config.steps_per_generation, 40);
        assert_eq!(config.display_sample_genomes, 2);
        assert_eq!(config.genome_analysis_stride, 5);
        assert_eq!(config.size_x, BioSimConfig::default().size_x);
    }

    #[test]
    fn absent_flags_keep_config() {
        let cli = Cli::try_parse_from(["biosim"]).expect("args");
        let base = BioSimConfig {
            population: 33,
            ..BioSimConfig::default()
        };
        assert_eq!(apply_overrides(base.clone(), &cli), base);
        assert_eq!(cli.sample_genomes, None);
    }

    #[test]
    fn resolved_signal_requests_stop() {
        let control = RunControl::new();
        let handle = stop_when(control.clone(), async { Ok::<(), io::Error>(()) }).expect("spawn");
        handle.join().expect("join");
        assert!(control.should_stop());
    }

    #[test]
    fn failed_signal_leaves_run_going() {
        let control = RunControl::new();
        let failed = async { Err::<(), _>(io::Error::other("no handler")) };
        let handle = stop_when(control.clone(), failed).expect("spawn");
        handle.join().expect("join");
        assert!(!control.should_stop());
    }

    #[test]
    fn sample_lists_actions_and_genes() {
        let sample = GenomeSample {
            index: 3,
            genome_length: 2,
            genome_hex: "0100011234 0002000af0".to_string(),
            connections: 2,
            actions: vec!["MOVE_EAST", "SET_RESPONSIVENESS"],
        };
        let text = format_sample(4, &sample);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "generation 4 agent 3 (2 genes, 2 connections)");
        assert_eq!(lines[1], "actions: MOVE_EAST SET_RESPONSIVENESS");
        assert_eq!(lines[2], "0100011234 0002000af0");
    }

    #[test]
    fn report_serializes_generations() {
        let config = BioSimConfig::default();
        let run = RunSummary {
            seed: 1,
            generations_completed: 1,
            reseeds: 0,
            stopped_early: false,
            last_generation: None,
        };
        let generations = [GenerationSummary {
            generation: 0,
            population: 10,
            survivors: 4,
            deaths: 0,
            reseeded: false,
            average_genome_length: 16.0,
            average_score: 0.5,
        }];
        let report = Report {
            config: &config,
            run: &run,
            generations: &generations,
        };
        let value = serde_json::to_value(&report).expect("json");
        assert_eq!(value["generations"][0]["survivors"], 4);
        assert_eq!(value["config"]["size_x"], 128);
    }
}
