use crate::cache::SampleCache;
use crate::config::ConfigError;
use crate::multicell::Multicell;
use crate::queue::TimeQueue;
use rand::Rng;
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};

/// One evolving multicell organism, summarized by its genome one-count.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Organism {
    pub num_ones: i32,
    /// Real-valued lineage depth; +1 per birth.
    pub gen: f64,
    /// Absolute time of the next scheduled birth; doubles as the
    /// stale-event marker for queue entries.
    pub repro_time: f64,
}

impl Organism {
    fn ancestor(num_ones: i32) -> Self {
        Self {
            num_ones,
            gen: 0.0,
            repro_time: 0.0,
        }
    }
}

#[derive(Debug)]
pub enum EvolveError {
    Config(ConfigError),
    /// A draw needed a sample that was never generated, while on-the-fly
    /// generation is forbidden.
    MissingSample { num_ones: i32 },
    Io(io::Error),
}

impl fmt::Display for EvolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvolveError::Config(e) => write!(f, "{e}"),
            EvolveError::MissingSample { num_ones } => write!(
                f,
                "no pre-generated sample for {num_ones} ones and generation is disabled"
            ),
            EvolveError::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EvolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EvolveError::Config(e) => Some(e),
            EvolveError::Io(e) => Some(e),
            EvolveError::MissingSample { .. } => None,
        }
    }
}

impl From<ConfigError> for EvolveError {
    fn from(err: ConfigError) -> Self {
        EvolveError::Config(err)
    }
}

impl From<io::Error> for EvolveError {
    fn from(err: io::Error) -> Self {
        EvolveError::Io(err)
    }
}

/// Fixed-size population of organisms driven by a shared birth queue.
///
/// Birth durations come from the sample cache; misses borrow the multicell
/// kernel to produce a fresh observation. The running `ave_gen` is kept
/// incrementally so the termination check is O(1) per birth.
pub struct Population {
    orgs: Vec<Organism>,
    queue: TimeQueue,
    ave_gen: f64,
    cache: SampleCache,
}

impl Population {
    pub fn new(pop_size: usize, ancestor_ones: i32, cache: SampleCache) -> Self {
        Self {
            orgs: vec![Organism::ancestor(ancestor_ones); pop_size],
            queue: TimeQueue::new(0.0),
            ave_gen: 0.0,
            cache,
        }
    }

    pub fn orgs(&self) -> &[Organism] {
        &self.orgs
    }

    pub fn ave_gen(&self) -> f64 {
        self.ave_gen
    }

    pub fn cache(&self) -> &SampleCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut SampleCache {
        &mut self.cache
    }

    /// Restore the starting population, optionally discarding cached samples.
    pub fn reset(&mut self, pop_size: usize, ancestor_ones: i32, reset_cache: bool) {
        self.orgs.clear();
        self.orgs.resize(pop_size, Organism::ancestor(ancestor_ones));
        self.queue.reset();
        self.ave_gen = 0.0;
        if reset_cache {
            self.cache.clear();
        }
    }

    /// How long a multicell with this one-count takes to replicate.
    ///
    /// Cache hits return a stored observation; misses grow a fresh multicell
    /// from a single centre cell and remember the outcome.
    pub fn repro_duration<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        multicell: &mut Multicell,
        num_ones: i32,
    ) -> Result<f64, EvolveError> {
        if let Some(duration) = self.cache.draw(rng, num_ones) {
            return Ok(duration);
        }
        if self.cache.enforce_bounds() {
            return Err(EvolveError::MissingSample { num_ones });
        }
        multicell.cfg.start_ones = num_ones;
        multicell.setup()?;
        let middle = multicell.middle_pos();
        multicell.inject_ancestor(rng, middle);
        let duration = multicell.run(rng).repro_time();
        self.cache.record(num_ones, duration);
        Ok(duration)
    }

    /// Absolute time at which an organism born now would next reproduce.
    fn birth_time<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        multicell: &mut Multicell,
        num_ones: i32,
    ) -> Result<f64, EvolveError> {
        Ok(self.repro_duration(rng, multicell, num_ones)? + self.queue.time())
    }

    /// Process one scheduled birth event.
    ///
    /// The offspring slot is drawn uniformly over the whole population; when
    /// it lands on the parent itself, the parent is simply rescheduled.
    pub fn next_birth<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        multicell: &mut Multicell,
    ) -> Result<(), EvolveError> {
        let event = self
            .queue
            .next()
            .expect("no births scheduled; seed the population before stepping");
        let parent_id = event.id;
        if self.orgs[parent_id].repro_time != event.time {
            return Ok(()); // stale entry
        }

        let pop_size = self.orgs.len();
        let offspring_id = rng.random_range(0..pop_size);

        self.ave_gen -= self.orgs[offspring_id].gen / pop_size as f64;
        if parent_id != offspring_id {
            self.orgs[offspring_id] = self.orgs[parent_id];
            let parent_ones = self.orgs[parent_id].num_ones;
            let parent_time = self.birth_time(rng, multicell, parent_ones)?;
            self.orgs[parent_id].repro_time = parent_time;
            self.queue.insert(parent_id, parent_time);
        }
        self.orgs[offspring_id].gen += 1.0;
        self.ave_gen += self.orgs[offspring_id].gen / pop_size as f64;

        if rng.random_bool(multicell.cfg.mut_prob) {
            let mutated = multicell
                .cfg
                .genome_model()
                .mutate(rng, self.orgs[offspring_id].num_ones);
            self.orgs[offspring_id].num_ones = mutated;
        }

        let offspring_ones = self.orgs[offspring_id].num_ones;
        let offspring_time = self.birth_time(rng, multicell, offspring_ones)?;
        self.orgs[offspring_id].repro_time = offspring_time;
        self.queue.insert(offspring_id, offspring_time);
        Ok(())
    }

    /// Seed every organism's first birth, then evolve until the mean
    /// generation reaches `max_gen`.
    ///
    /// When `trace` is given, a stats row is written each time the mean
    /// generation crosses an integer; `verbose` mirrors those rows to stdout.
    pub fn run<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        multicell: &mut Multicell,
        max_gen: f64,
        mut trace: Option<&mut dyn Write>,
        verbose: bool,
    ) -> Result<(), EvolveError> {
        for i in 0..self.orgs.len() {
            let time = self.birth_time(rng, multicell, self.orgs[i].num_ones)?;
            self.queue.insert(i, time);
            self.orgs[i].repro_time = time;
        }

        if trace.is_none() && !verbose {
            while self.ave_gen < max_gen {
                self.next_birth(rng, multicell)?;
            }
            return Ok(());
        }

        const HEADER: &str = "#generation, ave_ones, ave_repro_time, min_ones, max_ones, var_ones";
        if let Some(w) = trace.as_deref_mut() {
            writeln!(w, "{HEADER}")?;
        }
        if verbose {
            println!("{HEADER}");
        }
        let mut next_gen = -1.0;
        while self.ave_gen < max_gen {
            if self.ave_gen > next_gen {
                next_gen += 1.0;
                let ave_repro = self.calc_ave_repro_duration(rng, multicell)?;
                let row = format!(
                    "{}, {}, {}, {}, {}, {}",
                    next_gen as i64,
                    self.calc_ave_ones(),
                    ave_repro,
                    self.calc_min_ones(),
                    self.calc_max_ones(),
                    self.calc_var_ones(),
                );
                if let Some(w) = trace.as_deref_mut() {
                    writeln!(w, "{row}")?;
                }
                if verbose {
                    println!("{row}");
                }
            }
            self.next_birth(rng, multicell)?;
        }
        Ok(())
    }

    pub fn calc_ave_ones(&self) -> f64 {
        let total: f64 = self.orgs.iter().map(|o| o.num_ones as f64).sum();
        total / self.orgs.len() as f64
    }

    pub fn calc_ave_gen(&self) -> f64 {
        let total: f64 = self.orgs.iter().map(|o| o.gen).sum();
        total / self.orgs.len() as f64
    }

    pub fn calc_min_ones(&self) -> i32 {
        self.orgs.iter().map(|o| o.num_ones).min().unwrap_or(0)
    }

    pub fn calc_max_ones(&self) -> i32 {
        self.orgs.iter().map(|o| o.num_ones).max().unwrap_or(0)
    }

    /// Sample variance of the one-counts (n-1 denominator).
    pub fn calc_var_ones(&self) -> f64 {
        if self.orgs.len() < 2 {
            return 0.0;
        }
        let mean = self.calc_ave_ones();
        let sum: f64 = self
            .orgs
            .iter()
            .map(|o| (o.num_ones as f64 - mean).powi(2))
            .sum();
        sum / (self.orgs.len() - 1) as f64
    }

    /// Mean cache-backed replication duration over the live population.
    pub fn calc_ave_repro_duration<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        multicell: &mut Multicell,
    ) -> Result<f64, EvolveError> {
        let mut total = 0.0;
        for i in 0..self.orgs.len() {
            let num_ones = self.orgs[i].num_ones;
            total += self.repro_duration(rng, multicell, num_ones)?;
        }
        Ok(total / self.orgs.len() as f64)
    }

    /// Tally of organisms per one-count.
    pub fn ones_histogram(&self) -> BTreeMap<i32, usize> {
        let mut histogram = BTreeMap::new();
        for org in &self.orgs {
            *histogram.entry(org.num_ones).or_insert(0) += 1;
        }
        histogram
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MulticellConfig;
    use crate::rng::create_rng;

    fn small_multicell() -> Multicell {
        Multicell::new(MulticellConfig {
            cells_side: 2,
            time_range: 10.0,
            neighbors: 4,
            restrain: 0,
            start_ones: 5,
            genome_size: 10,
            mut_prob: 0.0,
            ..MulticellConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn preloaded_single_slot_sample_is_returned_without_simulation() {
        let mut cache = SampleCache::new(1, false);
        cache.record(5, 250.0);
        let mut pop = Population::new(2, 5, cache);
        let mut multicell = small_multicell();
        let mut rng = create_rng(40);
        let duration = pop.repro_duration(&mut rng, &mut multicell, 5).unwrap();
        assert_eq!(duration, 250.0);
        assert_eq!(multicell.num_cells(), 0, "kernel must stay untouched on a hit");
    }

    #[test]
    fn cache_miss_runs_the_kernel_and_records_the_observation() {
        let mut pop = Population::new(2, 5, SampleCache::new(100, false));
        let mut multicell = small_multicell();
        let mut rng = create_rng(41);
        assert_eq!(pop.cache().len_for(5), 0);
        let duration = pop.repro_duration(&mut rng, &mut multicell, 5).unwrap();
        assert!(duration > 0.0);
        assert_eq!(pop.cache().len_for(5), 1);
        assert!(multicell.is_saturated());
    }

    #[test]
    fn enforced_bounds_turn_misses_into_errors() {
        let mut pop = Population::new(2, 5, SampleCache::new(100, true));
        let mut multicell = small_multicell();
        let mut rng = create_rng(42);
        assert!(matches!(
            pop.repro_duration(&mut rng, &mut multicell, 5),
            Err(EvolveError::MissingSample { num_ones: 5 })
        ));
    }

    #[test]
    fn ave_gen_matches_true_mean_after_births() {
        let mut pop = Population::new(4, 5, SampleCache::new(2, false));
        let mut multicell = small_multicell();
        let mut rng = create_rng(43);
        pop.run(&mut rng, &mut multicell, 3.0, None, false).unwrap();
        assert!(pop.ave_gen() >= 3.0);
        assert!(
            (pop.ave_gen() - pop.calc_ave_gen()).abs() < 1e-9,
            "incremental mean {} drifted from true mean {}",
            pop.ave_gen(),
            pop.calc_ave_gen()
        );
    }

    #[test]
    fn single_organism_population_self_replaces() {
        let mut pop = Population::new(1, 5, SampleCache::new(2, false));
        let mut multicell = small_multicell();
        let mut rng = create_rng(44);
        pop.run(&mut rng, &mut multicell, 3.0, None, false).unwrap();
        // With one slot every offspring lands on the parent, so its
        // generation just keeps climbing.
        assert!(pop.orgs()[0].gen >= 3.0);
        assert_eq!(pop.orgs()[0].num_ones, 5);
    }

    #[test]
    fn mutation_moves_one_counts_during_evolution() {
        let mut pop = Population::new(4, 5, SampleCache::new(2, false));
        let mut multicell = small_multicell();
        multicell.cfg.mut_prob = 1.0;
        let mut rng = create_rng(45);
        pop.run(&mut rng, &mut multicell, 4.0, None, false).unwrap();
        assert!(
            pop.orgs().iter().any(|o| o.num_ones != 5),
            "every-birth mutation must move some organism"
        );
        assert!(pop.orgs().iter().all(|o| (0..=10).contains(&o.num_ones)));
    }

    #[test]
    fn reset_restores_ancestors_and_optionally_keeps_the_cache() {
        let mut pop = Population::new(3, 5, SampleCache::new(4, false));
        let mut multicell = small_multicell();
        let mut rng = create_rng(46);
        pop.run(&mut rng, &mut multicell, 2.0, None, false).unwrap();
        assert!(pop.cache().len_for(5) > 0);

        pop.reset(3, 7, false);
        assert!(pop.orgs().iter().all(|o| o.num_ones == 7 && o.gen == 0.0));
        assert_eq!(pop.ave_gen(), 0.0);
        assert!(pop.cache().len_for(5) > 0, "shared cache must survive reset");

        pop.reset(3, 7, true);
        assert_eq!(pop.cache().len_for(5), 0);
    }

    #[test]
    fn trace_rows_are_emitted_per_generation() {
        let mut pop = Population::new(3, 5, SampleCache::new(2, false));
        let mut multicell = small_multicell();
        let mut rng = create_rng(47);
        let mut trace = Vec::new();
        pop.run(
            &mut rng,
            &mut multicell,
            2.0,
            Some(&mut trace as &mut dyn Write),
            false,
        )
        .unwrap();
        let text = String::from_utf8(trace).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("#generation, ave_ones, ave_repro_time, min_ones, max_ones, var_ones")
        );
        let rows: Vec<&str> = lines.collect();
        assert!(rows.len() >= 2, "expected rows for generations 0 and 1");
        assert!(rows[0].starts_with("0, "));
        assert!(rows[1].starts_with("1, "));
    }

    #[test]
    fn ones_histogram_counts_every_organism() {
        let mut pop = Population::new(5, 3, SampleCache::new(2, false));
        pop.reset(5, 3, true);
        let histogram = pop.ones_histogram();
        assert_eq!(histogram.get(&3), Some(&5));
        assert_eq!(histogram.values().sum::<usize>(), 5);
    }
}
