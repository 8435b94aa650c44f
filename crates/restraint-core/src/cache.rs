use rand::Rng;
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Reservoir of observed multicell completion times, keyed by one-count.
///
/// Each entry holds at most `num_samples` observations. Draws index
/// uniformly over the full capacity, so a short entry misses with
/// probability proportional to how unfilled it is; the caller decides what
/// a miss means (usually: run a fresh simulation and record it).
#[derive(Clone, Debug)]
pub struct SampleCache {
    samples: HashMap<i32, Vec<f64>>,
    num_samples: usize,
    enforce_bounds: bool,
    loaded_range: Option<(i32, i32)>,
}

#[derive(Debug)]
pub enum SampleLoadError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        line: usize,
    },
    TooManySamples {
        path: PathBuf,
        found: usize,
        limit: usize,
    },
}

impl fmt::Display for SampleLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleLoadError::Io { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            SampleLoadError::Parse { path, line } => {
                write!(f, "{} line {line} is not a number", path.display())
            }
            SampleLoadError::TooManySamples { path, found, limit } => write!(
                f,
                "{} holds {found} samples but only {limit} were requested",
                path.display()
            ),
        }
    }
}

impl std::error::Error for SampleLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SampleLoadError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl SampleCache {
    pub fn new(num_samples: usize, enforce_bounds: bool) -> Self {
        Self {
            samples: HashMap::new(),
            num_samples,
            enforce_bounds,
            loaded_range: None,
        }
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Whether a miss must be treated as fatal instead of simulated away.
    pub fn enforce_bounds(&self) -> bool {
        self.enforce_bounds
    }

    /// Closed one-count interval covered by the last disk preload, if any.
    pub fn loaded_range(&self) -> Option<(i32, i32)> {
        self.loaded_range
    }

    /// Observations currently stored for `num_ones`.
    pub fn len_for(&self, num_ones: i32) -> usize {
        self.samples.get(&num_ones).map_or(0, Vec::len)
    }

    /// Draw an observation for `num_ones`, or `None` when the chosen slot is
    /// not filled yet.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R, num_ones: i32) -> Option<f64> {
        if self.num_samples == 0 {
            return None;
        }
        let slot = rng.random_range(0..self.num_samples);
        self.samples
            .get(&num_ones)
            .and_then(|obs| obs.get(slot))
            .copied()
    }

    /// Append a fresh observation, up to the configured capacity.
    pub fn record(&mut self, num_ones: i32, duration: f64) {
        let obs = self.samples.entry(num_ones).or_default();
        if obs.len() < self.num_samples {
            obs.push(duration);
        }
    }

    /// Drop every observation and any loaded-range bookkeeping.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.loaded_range = None;
    }

    /// Preload observations from `<num_ones>.dat` files under `dir`, one
    /// real number per line, for every one-count in `[min_ones, max_ones]`.
    ///
    /// Missing files are skipped with a warning; a file holding more lines
    /// than `num_samples` is an error.
    pub fn load_dir(
        &mut self,
        dir: &Path,
        min_ones: i32,
        max_ones: i32,
    ) -> Result<(), SampleLoadError> {
        for num_ones in min_ones..=max_ones {
            let path = dir.join(format!("{num_ones}.dat"));
            let file = match File::open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    eprintln!("WARNING: sample file {} not found; skipping", path.display());
                    continue;
                }
                Err(source) => return Err(SampleLoadError::Io { path, source }),
            };
            let mut observations = Vec::new();
            for (idx, line) in BufReader::new(file).lines().enumerate() {
                let line = line.map_err(|source| SampleLoadError::Io {
                    path: path.clone(),
                    source,
                })?;
                let text = line.trim();
                if text.is_empty() {
                    continue;
                }
                let value: f64 = text.parse().map_err(|_| SampleLoadError::Parse {
                    path: path.clone(),
                    line: idx + 1,
                })?;
                observations.push(value);
            }
            if observations.len() > self.num_samples {
                return Err(SampleLoadError::TooManySamples {
                    path,
                    found: observations.len(),
                    limit: self.num_samples,
                });
            }
            self.samples.insert(num_ones, observations);
        }
        self.loaded_range = Some((min_ones, max_ones));
        Ok(())
    }
}
