use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::{AddAssign, DivAssign};

/// Outcome of running one multicell to saturation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResults {
    /// Queue clock at the moment the grid filled.
    pub run_time: f64,
    /// Summed penalty from unrestrained cells.
    pub extra_cost: f64,
    /// Live-cell tally per one-count.
    pub cell_counts: BTreeMap<i32, f64>,
}

impl RunResults {
    /// Full replication time: the run itself plus the unrestrained penalty.
    pub fn repro_time(&self) -> f64 {
        self.run_time + self.extra_cost
    }

    /// Total number of cells represented.
    pub fn count_cells(&self) -> f64 {
        self.cell_counts.values().sum()
    }

    /// Cells whose one-count meets the restraint threshold.
    pub fn count_restrained(&self, threshold: i32) -> f64 {
        self.cell_counts
            .iter()
            .filter(|(&ones, _)| ones >= threshold)
            .map(|(_, &count)| count)
            .sum()
    }

    /// Cells below the restraint threshold.
    pub fn count_unrestrained(&self, threshold: i32) -> f64 {
        self.cell_counts
            .iter()
            .filter(|(&ones, _)| ones < threshold)
            .map(|(_, &count)| count)
            .sum()
    }
}

impl AddAssign<&RunResults> for RunResults {
    fn add_assign(&mut self, rhs: &RunResults) {
        self.run_time += rhs.run_time;
        self.extra_cost += rhs.extra_cost;
        for (&ones, &count) in &rhs.cell_counts {
            *self.cell_counts.entry(ones).or_insert(0.0) += count;
        }
    }
}

impl DivAssign<f64> for RunResults {
    fn div_assign(&mut self, denom: f64) {
        debug_assert!(denom != 0.0);
        self.run_time /= denom;
        self.extra_cost /= denom;
        for count in self.cell_counts.values_mut() {
            *count /= denom;
        }
    }
}
