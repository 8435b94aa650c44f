use crate::genome::GenomeModel;
use serde::{Deserialize, Serialize};

/// Settings for a single multicell run.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MulticellConfig {
    /// Cells on a side of the (square) multicell; must be a power of two.
    pub cells_side: usize,
    /// Replication takes 100.0 plus a uniform draw from [0, time_range).
    pub time_range: f64,
    /// Neighborhood size for replication (0 or above 8 means well mixed).
    pub neighbors: usize,
    /// One-count at or above which a cell behaves restrained.
    pub restrain: i32,
    /// One-count carried by injected ancestor cells.
    pub start_ones: i32,
    /// Number of bits in a finite genome.
    pub genome_size: usize,
    /// Treat the genome as unbounded instead of `genome_size` bits.
    pub is_infinite: bool,
    /// Probability an infinite-genome mutation decreases the one-count.
    pub inf_mut_decrease_prob: f64,
    /// Probability of an offspring being mutated.
    pub mut_prob: f64,
    /// Extra reproduction cost per unrestrained cell once the grid is full.
    pub unrestrained_cost: f64,
    /// Restrained cells probe a single target instead of searching for space.
    pub one_check: bool,
}

impl Default for MulticellConfig {
    fn default() -> Self {
        Self {
            cells_side: 32,
            time_range: 50.0,
            neighbors: 8,
            restrain: 50,
            start_ones: 50,
            genome_size: 100,
            is_infinite: false,
            inf_mut_decrease_prob: 0.5,
            mut_prob: 0.0,
            unrestrained_cost: 0.0,
            one_check: false,
        }
    }
}

macro_rules! define_config_error {
    (
        $(
            $variant:ident $( { $($field:ident : $type:ty),* } )? => $fmt:literal $(, $arg:expr)*
        );* $(;)?
    ) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum ConfigError {
            $(
                $variant $( { $($field : $type),* } )?,
            )*
        }

        impl std::fmt::Display for ConfigError {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        Self::$variant $( { $($field),* } )? => write!(f, $fmt $(, $arg)*),
                    )*
                }
            }
        }
    };
}

define_config_error! {
    SideNotPowerOfTwo { side: usize } => "cells_side ({}) must be a power of two", side;
    InvalidTimeRange => "time_range must be finite and non-negative";
    StartOnesOutOfRange { start_ones: i32, genome_size: usize } =>
        "start_ones ({}) must lie within a {}-bit genome", start_ones, genome_size;
    InvalidMutProb => "mut_prob must be finite and within [0,1]";
    InvalidDecreaseProb => "inf_mut_decrease_prob must be finite and within [0,1]";
    InvalidUnrestrainedCost => "unrestrained_cost must be finite and non-negative";
}

impl std::error::Error for ConfigError {}

impl MulticellConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.cells_side.is_power_of_two() {
            return Err(ConfigError::SideNotPowerOfTwo {
                side: self.cells_side,
            });
        }
        if !self.time_range.is_finite() || self.time_range < 0.0 {
            return Err(ConfigError::InvalidTimeRange);
        }
        if !self.mut_prob.is_finite() || !(0.0..=1.0).contains(&self.mut_prob) {
            return Err(ConfigError::InvalidMutProb);
        }
        if !self.inf_mut_decrease_prob.is_finite()
            || !(0.0..=1.0).contains(&self.inf_mut_decrease_prob)
        {
            return Err(ConfigError::InvalidDecreaseProb);
        }
        if !self.unrestrained_cost.is_finite() || self.unrestrained_cost < 0.0 {
            return Err(ConfigError::InvalidUnrestrainedCost);
        }
        if !self.is_infinite
            && (self.start_ones < 0 || self.start_ones > self.genome_size as i32)
        {
            return Err(ConfigError::StartOnesOutOfRange {
                start_ones: self.start_ones,
                genome_size: self.genome_size,
            });
        }
        Ok(())
    }

    /// Mutation model implied by the genome settings.
    pub fn genome_model(&self) -> GenomeModel {
        if self.is_infinite {
            GenomeModel::Infinite {
                decrease_prob: self.inf_mut_decrease_prob,
            }
        } else {
            GenomeModel::Finite {
                bits: self.genome_size,
            }
        }
    }

    /// Whether a cell with this one-count ignores occupancy when replicating.
    pub fn is_unrestrained(&self, num_ones: i32) -> bool {
        num_ones < self.restrain
    }
}
