//! Trajectory data types.

use crate::allele::Allele;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// First entry of a trajectory file.
///
/// Holds what is needed to reproduce and label the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Seed of the random stream.
    pub seed: u64,

    /// Name of the climate generator.
    pub climate: String,

    /// Human readable climate description.
    pub climate_description: String,

    /// Human readable generation timing description.
    pub generation_description: String,

    /// Alleles the population was seeded from.
    pub alleles: Vec<Allele>,
}

/// Snapshot of the simulation after an advance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Current simulation week.
    pub week: u32,

    /// Current generation (starts at 1).
    pub generation: u32,

    /// Snow coverage of the current week.
    pub snow_coverage: f64,

    /// Temperature of the current week.
    pub temperature: f64,

    /// Number of living hares.
    pub n_alive: usize,

    /// Relative frequency of each coat allele, keyed by allele id.
    pub allele_freq: BTreeMap<u32, f64>,
}
