use rand::Rng;

/// Mutation model for a genome summarized by its one-count.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GenomeModel {
    /// Fixed-length bit genome: a mutation flips one uniformly chosen bit,
    /// so the chance of losing a one is `num_ones / bits`.
    Finite { bits: usize },
    /// Unbounded genome: the direction of a mutation is a fixed coin.
    Infinite { decrease_prob: f64 },
}

impl GenomeModel {
    /// Probability that a single mutation lowers the one-count.
    pub fn decrease_prob(&self, num_ones: i32) -> f64 {
        match *self {
            GenomeModel::Finite { bits } => {
                if bits == 0 {
                    return 0.0;
                }
                (num_ones.max(0) as f64 / bits as f64).min(1.0)
            }
            GenomeModel::Infinite { decrease_prob } => decrease_prob,
        }
    }

    /// Clamp a one-count to the representable range.
    pub fn clamp(&self, num_ones: i32) -> i32 {
        match *self {
            GenomeModel::Finite { bits } => num_ones.clamp(0, bits as i32),
            GenomeModel::Infinite { .. } => num_ones.max(0),
        }
    }

    /// Apply one plus-or-minus-one mutation to `num_ones`.
    pub fn mutate<R: Rng + ?Sized>(&self, rng: &mut R, num_ones: i32) -> i32 {
        let next = if rng.random_bool(self.decrease_prob(num_ones)) {
            num_ones - 1
        } else {
            num_ones + 1
        };
        self.clamp(next)
    }
}
