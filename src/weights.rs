//! Random weight sampling for training logs.
//!
//! Watches a handful of randomly chosen entries per named weight tensor and
//! appends their values to a TSV file each time it is called, giving a cheap
//! longitudinal view of how individual weights move during training. The
//! sampled indices are fixed the first time a tensor name is seen, so each
//! line series tracks the same weight across iterations.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use rand::Rng;

/// Default number of entries watched per tensor.
const DEFAULT_SAMPLES_PER_TENSOR: usize = 10;

/// Samples and logs a fixed random subset of weights per named tensor.
///
/// Output format, one row per sampled weight per call:
/// `iteration \t name \t sample_index \t value`.
#[derive(Debug)]
pub struct WeightSampler {
    weights_file: PathBuf,
    /// Flat indices watched per tensor name, chosen once on first sight.
    sampled_indices: HashMap<String, Vec<usize>>,
    samples_per_tensor: usize,
}

impl WeightSampler {
    /// Create a sampler writing to `weights.txt` under `directory`.
    ///
    /// The directory is created if missing and any existing weights file is
    /// truncated.
    pub fn new(directory: impl AsRef<Path>) -> io::Result<Self> {
        let directory = directory.as_ref();
        fs::create_dir_all(directory)?;
        let weights_file = directory.join("weights.txt");
        File::create(&weights_file)?;
        Ok(Self {
            weights_file,
            sampled_indices: HashMap::new(),
            samples_per_tensor: DEFAULT_SAMPLES_PER_TENSOR,
        })
    }

    /// Set how many entries to watch per tensor (builder pattern).
    pub fn with_samples_per_tensor(mut self, samples: usize) -> Self {
        self.samples_per_tensor = samples;
        self
    }

    /// Path of the TSV file being appended to.
    pub fn weights_file(&self) -> &Path {
        &self.weights_file
    }

    /// Append one row per watched weight for every named tensor.
    ///
    /// Tensors are flat value slices; empty tensors are skipped. Tensors
    /// shorter than the configured sample count are watched in full.
    pub fn log_weights<'a, I>(&mut self, iteration: u64, tensors: I) -> io::Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a [f64])>,
    {
        let file = OpenOptions::new().append(true).open(&self.weights_file)?;
        let mut writer = BufWriter::new(file);

        for (name, values) in tensors {
            if values.is_empty() {
                continue;
            }

            if !self.sampled_indices.contains_key(name) {
                let indices = sample_indices(values.len(), self.samples_per_tensor);
                self.sampled_indices.insert(name.to_string(), indices);
            }
            let indices = &self.sampled_indices[name];

            for (i, &index) in indices.iter().enumerate() {
                // Tensor shrank since the indices were drawn; skip out-of-range.
                let Some(value) = values.get(index) else {
                    continue;
                };
                writeln!(writer, "{}\t{}\t{}\t{}", iteration, name, i, value)?;
            }
        }

        writer.flush()
    }
}

/// Draw up to `count` distinct flat indices in `0..len`.
fn sample_indices(len: usize, count: usize) -> Vec<usize> {
    if len <= count {
        return (0..len).collect();
    }
    let mut rng = rand::thread_rng();
    let mut seen = HashSet::new();
    let mut indices = Vec::with_capacity(count);
    while indices.len() < count {
        let index = rng.gen_range(0..len);
        if seen.insert(index) {
            indices.push(index);
        }
    }
    indices
}
