use crate::allele::{Allele, AlleleKind, Rgb};
use crate::climate::ClimateKind;
use crate::generation::GenerationKind;
use crate::hare::WEEKS_PER_YEAR;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Debug,
    fs,
    ops::RangeBounds,
    path::Path,
};

/// Population and environment parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Maximum number of hares.
    pub carrying_capacity: usize,
    /// Weekly survival probability of a camouflaged hare.
    pub base_survival_rate: f64,
    /// Survival probability lost by a mismatched hare.
    pub mismatch_penalty: f64,
    /// Whether mismatched hares are penalized at all.
    pub selection: bool,
    /// Snow-coverage generator.
    pub climate: ClimateKind,
    /// Cohort timing policy.
    pub generation: GenerationKind,
}

/// Initial condition parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct InitConfig {
    /// Week the simulation starts at.
    pub start_week: u32,
    /// Name of the allele catalog the population is seeded from.
    pub allele_set: String,
    /// Seed of the random stream (drawn at random if absent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Unit the simulation is advanced by between two records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvanceUnit {
    Weeks,
    Generations,
    Years,
}

/// Output parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Unit of one advance.
    pub advance_unit: AdvanceUnit,
    /// Number of units per advance.
    pub advance_amount: u32,
    /// Number of advances (and records) per run.
    pub n_advances: usize,
    /// Stop the run as soon as the population is extinct.
    #[serde(default = "default_stop_on_extinction")]
    pub stop_on_extinction: bool,
}

fn default_stop_on_extinction() -> bool {
    true
}

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    pub model: ModelConfig,
    pub init: InitConfig,
    pub output: OutputConfig,
    /// Additional allele catalogs, overriding built-in ones of the same name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub allele_sets: BTreeMap<String, Vec<Allele>>,
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        let config = Self::from_toml(&contents)?;
        Ok(config)
    }

    /// Parse and validate a [`Config`] from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    /// Write the configuration as TOML.
    pub fn to_file<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let contents = toml::to_string_pretty(self).context("failed to serialize config")?;
        fs::write(file, contents).with_context(|| format!("failed to write {file:?}"))?;
        Ok(())
    }

    /// Alleles of the configured catalog.
    pub fn alleles(&self) -> Result<Vec<Allele>> {
        let name = &self.init.allele_set;
        if let Some(alleles) = self.allele_sets.get(name) {
            return Ok(alleles.clone());
        }
        builtin_allele_set(name).with_context(|| format!("unknown allele set {name:?}"))
    }

    fn validate(&self) -> Result<()> {
        let model = &self.model;
        check_num(model.carrying_capacity, 1..100_000).context("invalid carrying capacity")?;
        check_num(model.base_survival_rate, 0.0..=1.0).context("invalid base survival rate")?;
        check_num(model.mismatch_penalty, 0.0..=1.0).context("invalid mismatch penalty")?;

        check_num(self.init.start_week, 0..WEEKS_PER_YEAR * 10_000)
            .context("invalid start week")?;
        let alleles = self.alleles().context("invalid allele set")?;
        check_alleles(&alleles).context("invalid allele set")?;

        let output = &self.output;
        check_num(output.advance_amount, 1..10_000).context("invalid advance amount")?;
        check_num(output.n_advances, 1..1_000_000).context("invalid number of advances")?;

        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

fn check_alleles(alleles: &[Allele]) -> Result<()> {
    if alleles.is_empty() {
        bail!("allele set must not be empty");
    }
    let mut ids = BTreeSet::new();
    for allele in alleles {
        let context = || format!("invalid allele {:?}", allele.name);
        if !ids.insert(allele.id) {
            bail!("allele id {} is not unique", allele.id);
        }
        let year = 0.0..f64::from(WEEKS_PER_YEAR);
        check_num(allele.brown_week, year.clone()).with_context(context)?;
        check_num(allele.white_week, year).with_context(context)?;
        check_num(allele.brown_rate, 0.0..=1.0).with_context(context)?;
        check_num(allele.white_rate, 0.0..=1.0).with_context(context)?;
    }
    Ok(())
}

/// Built-in allele catalogs by name.
pub fn builtin_allele_set(name: &str) -> Option<Vec<Allele>> {
    match name {
        "basic" => Some(
            [
                (1, 15.0, Rgb { r: 0x1f, g: 0x77, b: 0xb4 }),
                (2, 24.0, Rgb { r: 0xff, g: 0x7f, b: 0x0e }),
                (3, 26.0, Rgb { r: 0x2c, g: 0xa0, b: 0x2c }),
                (4, 35.0, Rgb { r: 0xd6, g: 0x27, b: 0x28 }),
            ]
            .into_iter()
            .map(|(id, brown_week, color)| Allele {
                id,
                name: format!("Allele Br{brown_week}.Wh36"),
                kind: AlleleKind::Coat,
                brown_week,
                brown_rate: 1.0,
                white_week: 36.0,
                white_rate: 1.0,
                color,
            })
            .collect(),
        ),
        _ => None,
    }
}

/// Preset configuration.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: &'static str,
    pub description: &'static str,
    pub config: Config,
}

/// Preset configurations contrasting selection, population size and climate.
pub fn scenarios() -> Vec<Scenario> {
    let preset = |selection, carrying_capacity, climate| Config {
        model: ModelConfig {
            carrying_capacity,
            base_survival_rate: 0.96,
            mismatch_penalty: 0.07,
            selection,
            climate,
            generation: GenerationKind::Every18Weeks,
        },
        init: InitConfig {
            start_week: 0,
            allele_set: "basic".to_string(),
            seed: None,
        },
        output: OutputConfig {
            advance_unit: AdvanceUnit::Weeks,
            advance_amount: 1,
            n_advances: WEEKS_PER_YEAR as usize * 20,
            stop_on_extinction: true,
        },
        allele_sets: BTreeMap::new(),
    };

    use ClimateKind::*;
    [
        ("Scenario 1", "No selection, large population, and a stable climate.", false, 500, Stable),
        ("Scenario 2", "No selection, small population, and a stable climate.", false, 20, Stable),
        ("Scenario 3", "Selection, large population, and a stable climate.", true, 500, Stable),
        ("Scenario 4", "Selection, small population, and a stable climate.", true, 20, Stable),
        ("Scenario 5", "Selection, large population, and a variable climate.", true, 500, Warming),
        ("Scenario 6", "Selection, small population, and a variable climate.", true, 20, Warming),
        (
            "Scenario 7",
            "Selection, large population, and a gradual stable climate.",
            true,
            500,
            RealisticStable,
        ),
        (
            "Scenario 8",
            "Selection, large population, and a gradual warming climate.",
            true,
            500,
            RealisticWarming,
        ),
    ]
    .into_iter()
    .map(|(name, description, selection, carrying_capacity, climate)| Scenario {
        name,
        description,
        config: preset(selection, carrying_capacity, climate),
    })
    .collect()
}
