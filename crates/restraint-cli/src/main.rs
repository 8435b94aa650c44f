use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use rand_chacha::ChaCha12Rng;
use restraint_core::{
    rng, Multicell, MulticellConfig, Population, RunResults, SampleCache,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

mod sweep;
use sweep::{Combo, Sweep};

/// Evolution of cellular restraint in multicellular organisms.
///
/// With `--gen_count 0` (the default) the tool samples multicell completion
/// times over every setting combination; with a positive generation count it
/// evolves whole populations of multicells instead. Swept options take
/// comma-separated value lists.
#[derive(Parser, Debug)]
#[command(name = "spatial-restraint")]
struct Cli {
    /// Number of times to replicate each run.
    #[arg(short = 'd', long = "data_count", value_delimiter = ',', default_value = "100")]
    data_count: Vec<usize>,
    /// How many 1s in the starting cell?
    #[arg(short = 'a', long = "ancestor_1s", value_delimiter = ',', default_value = "50")]
    ancestor_1s: Vec<i32>,
    /// Per-cell cost for unrestrained cells once the multicell is full.
    #[arg(short = 'u', long = "unrestrained_cost", value_delimiter = ',', default_value = "0.0")]
    unrestrained_cost: Vec<f64>,
    /// Probability of mutation in offspring.
    #[arg(short = 'm', long = "mut_prob", value_delimiter = ',', default_value = "0.0")]
    mut_prob: Vec<f64>,
    /// Cell replication takes 100.0 plus a uniform draw from this range.
    #[arg(short = 't', long = "time_range", value_delimiter = ',', default_value = "50")]
    time_range: Vec<f64>,
    /// Neighborhood size for replication (0 means well mixed).
    #[arg(short = 'n', long = "neighbors", value_delimiter = ',', default_value = "8")]
    neighbors: Vec<usize>,
    /// Num ones in the genome needed for restraint.
    #[arg(short = 'r', long = "restrain", value_delimiter = ',', default_value = "50")]
    restrain: Vec<i32>,
    /// Number of bits in the genome.
    #[arg(short = 'b', long = "bit_size", value_delimiter = ',', default_value = "100")]
    bit_size: Vec<usize>,
    /// Cells on a side of the (square) multicell; must be a power of two.
    #[arg(short = 'c', long = "cells_side", value_delimiter = ',', default_value = "32")]
    cells_side: Vec<usize>,
    /// Probability an infinite-genome mutation decreases the one-count.
    #[arg(short = 'k', long = "inf_mut_decrease_prob", value_delimiter = ',', default_value = "0.5")]
    inf_mut_decrease_prob: Vec<f64>,

    /// Make restrained cells check only one target for space.
    #[arg(short = 'o', long = "one_check")]
    one_check: bool,
    /// Treat the genome as infinite.
    #[arg(short = 'I', long = "infinite")]
    infinite: bool,
    /// Generations to evolve (0 = analyze multicells only).
    #[arg(short = 'g', long = "gen_count", default_value_t = 0)]
    gen_count: usize,
    /// Organisms in the population.
    #[arg(short = 'p', long = "pop_size", default_value_t = 200)]
    pop_size: usize,
    /// Multicells sampled per genotype for the duration distribution.
    #[arg(short = 's', long = "sample_size", default_value_t = 200)]
    sample_size: usize,
    /// Directory of <num_ones>.dat sample files to preload.
    #[arg(short = 'L', long = "load_samples")]
    load_samples: Option<PathBuf>,
    /// Minimum one-count to preload with --load_samples.
    #[arg(short = 'y', long = "load_samples_min", default_value_t = 0)]
    load_samples_min: i32,
    /// Maximum one-count to preload with --load_samples.
    #[arg(short = 'z', long = "load_samples_max", default_value_t = 100)]
    load_samples_max: i32,
    /// Fail instead of simulating when a draw escapes the preloaded samples.
    #[arg(short = 'e', long = "enforce_data_bounds")]
    enforce_data_bounds: bool,
    /// Output filename for evolution data.
    #[arg(short = 'E', long = "evolution_filename", default_value = "evolution.dat")]
    evolution_filename: PathBuf,
    /// Output filename for multicell data.
    #[arg(short = 'M', long = "multicell_filename", default_value = "multicell.dat")]
    multicell_filename: PathBuf,
    /// Output filename for the configuration echo.
    #[arg(short = 'C', long = "config_filename", default_value = "config.dat")]
    config_filename: PathBuf,
    /// Random seed (negative to seed from entropy).
    #[arg(short = 'w', long = "seed", default_value_t = -1, allow_hyphen_values = true)]
    seed: i64,
    /// Use a distinct sample cache for each evolution run.
    #[arg(short = 'i', long = "independent_caches")]
    independent_caches: bool,
    /// Print data for each replicate.
    #[arg(short = 'P', long = "print_reps")]
    print_reps: bool,
    /// Show each step of replicates (multicell or population).
    #[arg(short = 'T', long = "trace")]
    trace: bool,
    /// Print extra information during the run.
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

impl Cli {
    fn sweep(&self) -> Sweep {
        Sweep {
            data_count: self.data_count.clone(),
            ancestor_1s: self.ancestor_1s.clone(),
            unrestrained_cost: self.unrestrained_cost.clone(),
            mut_prob: self.mut_prob.clone(),
            time_range: self.time_range.clone(),
            neighbors: self.neighbors.clone(),
            restrain: self.restrain.clone(),
            bit_size: self.bit_size.clone(),
            cells_side: self.cells_side.clone(),
            inf_mut_decrease_prob: self.inf_mut_decrease_prob.clone(),
        }
    }

    fn multicell_config(&self, combo: &Combo) -> MulticellConfig {
        MulticellConfig {
            cells_side: combo.cells_side,
            time_range: combo.time_range,
            neighbors: combo.neighbors,
            restrain: combo.restrain,
            start_ones: combo.ancestor_1s,
            genome_size: combo.bit_size,
            is_infinite: self.infinite,
            inf_mut_decrease_prob: combo.inf_mut_decrease_prob,
            mut_prob: combo.mut_prob,
            unrestrained_cost: combo.unrestrained_cost,
            one_check: self.one_check,
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 1,
                _ => 2,
            };
            let _ = err.print();
            return ExitCode::from(code);
        }
    };
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ERROR: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let sweep = cli.sweep();
    let seed = rng::resolve_seed(cli.seed);
    let mut rng = rng::create_rng(seed);
    if cli.verbose {
        println!("Using seed {seed}");
    }

    write_config_echo(&cli, &sweep)?;

    if cli.gen_count > 0 {
        run_evolution(&cli, &sweep, &mut rng)
    } else {
        run_multicells(&cli, &sweep, &mut rng)
    }
}

/// Echo the effective combo settings so a run's output stays interpretable.
fn write_config_echo(cli: &Cli, sweep: &Sweep) -> Result<()> {
    let file = File::create(&cli.config_filename).with_context(|| {
        format!("failed to create {}", cli.config_filename.display())
    })?;
    let mut out = BufWriter::new(file);
    writeln!(out, "#{}", Sweep::HEADERS)?;
    if let Some(first) = sweep.combos().next() {
        writeln!(out, "{}", first.row())?;
    }
    Ok(())
}

/// Grow one multicell from a centre cell to saturation.
fn sample_multicell(
    multicell: &mut Multicell,
    rng: &mut ChaCha12Rng,
    trace: bool,
) -> Result<RunResults> {
    multicell.setup()?;
    let middle = multicell.middle_pos();
    multicell.inject_ancestor(rng, middle);
    if !trace {
        return Ok(multicell.run(rng));
    }

    let mut last_count = multicell.num_cells();
    while !multicell.is_saturated() {
        multicell.do_step(rng);
        if multicell.num_cells() != last_count {
            last_count = multicell.num_cells();
            println!("\nTime: {}  Cells: {}", multicell.time(), last_count);
            print!("{}", multicell.render());
        }
    }
    Ok(multicell.collect_results())
}

/// Multicell analysis mode: aggregate replicate runs per combo into CSV rows.
fn run_multicells(cli: &Cli, sweep: &Sweep, rng: &mut ChaCha12Rng) -> Result<()> {
    let file = File::create(&cli.multicell_filename).with_context(|| {
        format!("failed to create {}", cli.multicell_filename.display())
    })?;
    let mut out = BufWriter::new(file);

    write!(out, "#{}", Sweep::HEADERS)?;
    if cli.print_reps {
        let runs = sweep.data_count.first().copied().unwrap_or(0);
        for i in 0..runs {
            write!(out, ", run{i}")?;
        }
    }
    writeln!(out, ", ave_time, frac_restrain")?;

    let total = sweep.combo_count();
    for (combo_id, combo) in sweep.combos().enumerate() {
        println!("START Treatment #{combo_id} / {total}");
        println!("  {}", combo.row());

        let mut multicell = Multicell::new(cli.multicell_config(&combo))?;
        write!(out, "{}", combo.row())?;

        let mut totals = RunResults::default();
        for run_id in 0..combo.data_count {
            if cli.verbose {
                println!(" ... run {run_id}");
            }
            let results = sample_multicell(&mut multicell, rng, cli.trace)?;
            if cli.print_reps {
                write!(out, ", {}", results.repro_time())?;
            }
            totals += &results;
        }
        totals /= combo.data_count as f64;

        writeln!(
            out,
            ", {}, {}",
            totals.repro_time(),
            totals.count_restrained(combo.restrain) / multicell.size() as f64
        )?;
    }
    Ok(())
}

/// Evolution mode: run whole-population selection per combo and report the
/// final one-count histogram of every run.
fn run_evolution(cli: &Cli, sweep: &Sweep, rng: &mut ChaCha12Rng) -> Result<()> {
    let file = File::create(&cli.evolution_filename).with_context(|| {
        format!("failed to create {}", cli.evolution_filename.display())
    })?;
    let mut out = BufWriter::new(file);
    writeln!(out, "#run_id,num_ones,count")?;

    let total = sweep.combo_count();
    for (combo_id, combo) in sweep.combos().enumerate() {
        let mut multicell = Multicell::new(cli.multicell_config(&combo))?;

        let mut cache = SampleCache::new(cli.sample_size, cli.enforce_data_bounds);
        if let Some(dir) = &cli.load_samples {
            println!(
                "Loading samples for {}..{} ones from {}",
                cli.load_samples_min,
                cli.load_samples_max,
                dir.display()
            );
            cache.load_dir(dir, cli.load_samples_min, cli.load_samples_max)?;
        }
        let mut population = Population::new(cli.pop_size, combo.ancestor_1s, cache);

        for run_id in 0..combo.data_count {
            println!("START Treatment #{combo_id} / {total} : Run {run_id}");
            population.reset(cli.pop_size, combo.ancestor_1s, cli.independent_caches);

            if cli.trace {
                let path = format!("t{combo_id}r{run_id}.dat");
                let trace_file =
                    File::create(&path).with_context(|| format!("failed to create {path}"))?;
                let mut trace_out = BufWriter::new(trace_file);
                population.run(
                    rng,
                    &mut multicell,
                    cli.gen_count as f64,
                    Some(&mut trace_out as &mut dyn Write),
                    cli.verbose,
                )?;
            } else {
                population.run(rng, &mut multicell, cli.gen_count as f64, None, cli.verbose)?;
            }

            for (num_ones, count) in population.ones_histogram() {
                writeln!(out, "{run_id},{num_ones},{count}")?;
            }
        }
    }
    Ok(())
}
