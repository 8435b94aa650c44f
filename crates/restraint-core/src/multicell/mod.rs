use crate::config::{ConfigError, MulticellConfig};
use crate::grid::GridTopology;
use crate::queue::TimeQueue;
use crate::results::RunResults;
use rand::Rng;


/// Base delay before any cell replicates.
pub const REPRO_DELAY: f64 = 100.0;

/// Cell-queue clock base; keeps every schedule above the empty sentinel.
const QUEUE_BASE_TIME: f64 = 100.0;

/// One lattice site.
///
/// `repro_time == 0.0` marks an empty site; a live cell's value matches its
/// newest entry in the owning multicell's queue.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Cell {
    pub id: usize,
    pub repro_time: f64,
    pub num_ones: i32,
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        self.repro_time == 0.0
    }
}

/// What one popped division event amounted to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// The entry no longer matched its cell's schedule; discarded.
    Stale,
    /// A previous search already proved this cell boxed in; discarded.
    Boxed,
    /// Restrained parent found no room; only the parent was rescheduled.
    NoRoom,
    /// A cell was placed (or overwritten) at `id`.
    Birth { id: usize },
}

/// A square colony of cells driven by a time-ordered reproduction queue.
///
/// Cells and queue entries refer to each other only by flat grid id; the
/// multicell owns both sides. Queue entries outlive the schedule they were
/// made under, so consumers must treat a mismatched pop as stale.
pub struct Multicell {
    pub cfg: MulticellConfig,
    topology: GridTopology,
    cells: Vec<Cell>,
    /// Per-site memo that the last empty-neighbor search came up dry.
    /// Cleared only when a birth lands on that same site.
    is_full: Vec<bool>,
    num_cells: usize,
    queue: TimeQueue,
    empty_scratch: Vec<usize>,
}

impl Multicell {
    pub fn new(cfg: MulticellConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let topology = GridTopology::new(cfg.cells_side);
        let mut multicell = Self {
            cfg,
            topology,
            cells: Vec::new(),
            is_full: Vec::new(),
            num_cells: 0,
            queue: TimeQueue::new(QUEUE_BASE_TIME),
            empty_scratch: Vec::with_capacity(8),
        };
        multicell.setup()?;
        Ok(multicell)
    }

    /// Reset to an empty grid under the current settings.
    ///
    /// Revalidates `cfg` so sweep drivers may change settings between runs.
    pub fn setup(&mut self) -> Result<(), ConfigError> {
        self.cfg.validate()?;
        self.topology = GridTopology::new(self.cfg.cells_side);
        let size = self.topology.size();
        self.cells.clear();
        self.cells.extend((0..size).map(|id| Cell {
            id,
            repro_time: 0.0,
            num_ones: 0,
        }));
        self.is_full.clear();
        self.is_full.resize(size, false);
        self.queue.reset();
        self.num_cells = 0;
        Ok(())
    }

    pub fn size(&self) -> usize {
        self.topology.size()
    }

    pub fn num_cells(&self) -> usize {
        self.num_cells
    }

    /// The kernel clock (time of the most recently processed event).
    pub fn time(&self) -> f64 {
        self.queue.time()
    }

    /// Snapshot of every site for renderers and tests.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn topology(&self) -> GridTopology {
        self.topology
    }

    pub fn middle_pos(&self) -> usize {
        self.topology.middle()
    }

    pub fn is_saturated(&self) -> bool {
        self.num_cells == self.size()
    }

    /// Schedule the cell at `id` for its next division.
    fn setup_cell<R: Rng + ?Sized>(&mut self, rng: &mut R, id: usize) {
        let jitter = if self.cfg.time_range > 0.0 {
            rng.random_range(0.0..self.cfg.time_range)
        } else {
            0.0
        };
        let time = self.queue.time() + REPRO_DELAY + jitter;
        self.cells[id].repro_time = time;
        self.queue.insert(id, time);
    }

    /// Place a cell with an explicit one-count, scheduling its first division.
    pub fn inject_cell<R: Rng + ?Sized>(&mut self, rng: &mut R, pos: usize, num_ones: i32) {
        if self.cells[pos].is_empty() {
            self.num_cells += 1;
        }
        self.cells[pos].num_ones = num_ones;
        self.setup_cell(rng, pos);
    }

    /// Place a cell carrying the configured starting one-count.
    pub fn inject_ancestor<R: Rng + ?Sized>(&mut self, rng: &mut R, pos: usize) {
        self.inject_cell(rng, pos, self.cfg.start_ones);
    }

    /// Give birth at `child_id`, copying (and possibly mutating) the parent's
    /// one-count. The newborn site is no longer a proven dead end.
    fn do_birth<R: Rng + ?Sized>(&mut self, rng: &mut R, child_id: usize, parent_ones: i32) {
        if self.cells[child_id].is_empty() {
            self.num_cells += 1;
        }
        let mut ones = parent_ones;
        if rng.random_bool(self.cfg.mut_prob) {
            ones = self.cfg.genome_model().mutate(rng, ones);
        }
        self.cells[child_id].num_ones = ones;
        self.setup_cell(rng, child_id);
        self.is_full[child_id] = false;
    }

    /// Uniformly pick an empty site this cell may claim, or record that none
    /// exist.
    ///
    /// Well-mixed mode assumes the grid still has an empty site; callers only
    /// reach this path before saturation.
    fn empty_neighbor<R: Rng + ?Sized>(&mut self, rng: &mut R, pos: usize) -> Option<usize> {
        if self.is_full[pos] {
            return None;
        }
        if GridTopology::is_well_mixed(self.cfg.neighbors) {
            loop {
                let id = rng.random_range(0..self.size());
                if self.cells[id].is_empty() {
                    return Some(id);
                }
            }
        }
        self.empty_scratch.clear();
        for dir in 0..self.cfg.neighbors {
            if let Some(next) = self.topology.step(pos, dir) {
                if self.cells[next].is_empty() {
                    self.empty_scratch.push(next);
                }
            }
        }
        if self.empty_scratch.is_empty() {
            self.is_full[pos] = true;
            return None;
        }
        Some(self.empty_scratch[rng.random_range(0..self.empty_scratch.len())])
    }

    /// Pop and process the next scheduled division.
    ///
    /// The caller must have injected at least one cell first.
    pub fn do_step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> StepOutcome {
        let event = self
            .queue
            .next()
            .expect("no division scheduled; inject a cell before stepping");
        let parent = self.cells[event.id];
        if parent.repro_time != event.time {
            return StepOutcome::Stale;
        }
        if self.is_full[event.id] {
            return StepOutcome::Boxed;
        }

        let target = self
            .topology
            .random_neighbor(rng, event.id, self.cfg.neighbors);

        let outcome = if self.cells[target].is_empty() || self.cfg.is_unrestrained(parent.num_ones)
        {
            self.do_birth(rng, target, parent.num_ones);
            StepOutcome::Birth { id: target }
        } else if !self.cfg.one_check {
            // Restrained and the target is taken: look for space nearby.
            match self.empty_neighbor(rng, event.id) {
                Some(open) => {
                    self.do_birth(rng, open, parent.num_ones);
                    StepOutcome::Birth { id: open }
                }
                None => StepOutcome::NoRoom,
            }
        } else {
            StepOutcome::NoRoom
        };

        self.setup_cell(rng, event.id);
        outcome
    }

    /// Drive divisions until every site is occupied, then tally the results.
    pub fn run<R: Rng + ?Sized>(&mut self, rng: &mut R) -> RunResults {
        while !self.is_saturated() {
            self.do_step(rng);
        }
        self.collect_results()
    }

    /// Summarize the finished grid.
    pub fn collect_results(&self) -> RunResults {
        let mut results = RunResults {
            run_time: self.queue.time(),
            ..RunResults::default()
        };
        let mut unrestrained = 0usize;
        for cell in &self.cells {
            if self.cfg.is_unrestrained(cell.num_ones) {
                unrestrained += 1;
            }
            *results.cell_counts.entry(cell.num_ones).or_insert(0.0) += 1.0;
        }
        results.extra_cost = unrestrained as f64 * self.cfg.unrestrained_cost;
        results
    }

    /// One-count of a site as a single character.
    fn glyph(count: i32) -> char {
        match count {
            0..=9 => (b'0' + count as u8) as char,
            10..=35 => (b'a' + (count - 10) as u8) as char,
            36..=61 => (b'A' + (count - 36) as u8) as char,
            _ => '+',
        }
    }

    /// Render the grid as rows of one-count glyphs, empties as `-`.
    pub fn render(&self) -> String {
        let side = self.topology.side();
        let mut out = String::with_capacity(self.size() * 2 + side);
        for y in 0..side {
            for x in 0..side {
                let cell = &self.cells[self.topology.to_pos(x, y)];
                out.push(' ');
                out.push(if cell.is_empty() {
                    '-'
                } else {
                    Self::glyph(cell.num_ones)
                });
            }
            out.push('\n');
        }
        out
    }
}
