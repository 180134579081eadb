use crate::config::{AdvanceUnit, Config};
use crate::generation::GenerationGenerator;
use crate::hare::WEEKS_PER_YEAR;
use crate::rng::{SimRng, create_rng};
use crate::simulation::{Simulation, SimulationConfig};
use crate::types::{Header, Record};
use anyhow::{Context, Result};
use rand::{Rng, SeedableRng};
use rmp_serde::encode;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/// Simulation engine.
///
/// Builds the simulation and its generators from a validated [`Config`] on a
/// single seeded random stream, drives it in weeks, generations or years, and
/// writes the resulting trajectory.
pub struct Engine {
    cfg: Config,
    seed: u64,
    sim: Simulation,
}

impl Engine {
    /// Create a new `Engine`, drawing a seed from the OS if none is configured.
    pub fn new(cfg: Config) -> Result<Self> {
        let seed = match cfg.init.seed {
            Some(seed) => seed,
            None => SimRng::try_from_os_rng()?.random(),
        };
        Self::with_seed(cfg, seed)
    }

    /// Create a new `Engine` on the stream of the given seed.
    pub fn with_seed(cfg: Config, seed: u64) -> Result<Self> {
        let mut rng = create_rng(seed);
        let start_week = cfg.init.start_week;

        // Generators draw from the stream before the population does.
        let climate_generator = cfg
            .model
            .climate
            .build(start_week, 0.0, &mut rng)
            .context("failed to build climate generator")?;
        let generation_generator = cfg.model.generation.build(start_week);

        let sim_cfg = SimulationConfig {
            start_week,
            available_alleles: cfg.alleles()?,
            carrying_capacity: cfg.model.carrying_capacity,
            base_survival_rate: cfg.model.base_survival_rate,
            mismatch_penalty: cfg.model.mismatch_penalty,
            selection: cfg.model.selection,
            climate_generator,
            generation_generator,
        };
        let sim = Simulation::new(sim_cfg, rng);

        Ok(Self { cfg, seed, sim })
    }

    pub fn cfg(&self) -> &Config {
        &self.cfg
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Advance by `amount` units.
    ///
    /// With `stop_on_extinction` set the advance ends as soon as the
    /// population is extinct; otherwise the climate keeps running over the
    /// empty population. Returns the number of weeks actually simulated.
    pub fn advance(&mut self, unit: AdvanceUnit, amount: u32) -> u32 {
        let start_week = self.sim.week();
        match unit {
            AdvanceUnit::Weeks => self.advance_weeks(amount),
            AdvanceUnit::Years => self.advance_weeks(amount * WEEKS_PER_YEAR),
            AdvanceUnit::Generations => {
                let mut remaining = amount;
                while remaining > 0 && !self.should_stop() {
                    self.sim.advance_week();
                    if self.sim.generation_timing().should_generate() {
                        remaining -= 1;
                    }
                }
            }
        }
        self.sim.week() - start_week
    }

    fn advance_weeks(&mut self, n_weeks: u32) {
        for _ in 0..n_weeks {
            if self.should_stop() {
                break;
            }
            self.sim.advance_week();
        }
    }

    fn should_stop(&self) -> bool {
        self.cfg.output.stop_on_extinction && self.sim.is_extinct()
    }

    pub fn header(&self) -> Header {
        Header {
            seed: self.seed,
            climate: self.sim.climate().name().to_string(),
            climate_description: self.cfg.model.climate.friendly_name().to_string(),
            generation_description: self.cfg.model.generation.friendly_name().to_string(),
            alleles: self.sim.available_alleles().cloned().collect(),
        }
    }

    pub fn record(&self) -> Record {
        Record {
            week: self.sim.week(),
            generation: self.sim.generation(),
            snow_coverage: self.sim.snow_coverage(),
            temperature: self.sim.temperature(),
            n_alive: self.sim.n_alive(),
            allele_freq: self.sim.coat_allele_frequency(),
        }
    }

    /// Perform the simulation and save the resulting trajectory to a binary file.
    ///
    /// The file holds a [`Header`] followed by one [`Record`] for the initial
    /// state and one per advance.
    pub fn perform_simulation<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        encode::write(&mut writer, &self.header()).context("failed to serialize header")?;
        encode::write(&mut writer, &self.record()).context("failed to serialize record")?;

        let output = self.cfg.output.clone();
        let advances_per_log = (output.n_advances / 10).max(1);
        for i_advance in 0..output.n_advances {
            self.advance(output.advance_unit, output.advance_amount);

            encode::write(&mut writer, &self.record()).context("failed to serialize record")?;

            if output.stop_on_extinction && self.sim.is_extinct() {
                log::info!("population extinct in week {}", self.sim.week());
                break;
            }

            if (i_advance + 1) % advances_per_log == 0 {
                let progress = 100.0 * (i_advance + 1) as f64 / output.n_advances as f64;
                log::info!("completed {progress:06.2}%");
            }
        }

        writer.flush().context("failed to flush writer stream")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::climate::ClimateKind;
    use crate::config::scenarios;
    use crate::generation::GenerationKind;

    fn small_config() -> Config {
        let mut cfg = scenarios()[3].config.clone();
        cfg.model.carrying_capacity = 30;
        cfg
    }

    #[test]
    fn advancing_years_moves_52_weeks() {
        let mut cfg = small_config();
        cfg.model.base_survival_rate = 1.0;
        cfg.model.mismatch_penalty = 0.0;
        let mut engine = Engine::with_seed(cfg, 1).unwrap();
        assert_eq!(engine.advance(AdvanceUnit::Years, 2), 104);
        assert_eq!(engine.simulation().week(), 104);
    }

    #[test]
    fn advancing_generations_counts_breeding_events() {
        let mut cfg = small_config();
        cfg.model.base_survival_rate = 1.0;
        cfg.model.mismatch_penalty = 0.0;
        let mut engine = Engine::with_seed(cfg, 2).unwrap();
        assert_eq!(engine.advance(AdvanceUnit::Generations, 1), 18);
        assert_eq!(engine.advance(AdvanceUnit::Generations, 2), 36);
        assert_eq!(engine.simulation().generation(), 4);
    }

    #[test]
    fn advancing_stops_on_extinction() {
        let mut cfg = small_config();
        cfg.model.base_survival_rate = 0.0;
        let mut engine = Engine::with_seed(cfg, 3).unwrap();
        assert_eq!(engine.advance(AdvanceUnit::Generations, 5), 1);
        assert_eq!(engine.advance(AdvanceUnit::Weeks, 10), 0);
        assert!(engine.simulation().is_extinct());
    }

    #[test]
    fn header_describes_model() {
        let engine = Engine::with_seed(small_config(), 5).unwrap();
        let header = engine.header();
        assert_eq!(header.seed, 5);
        assert_eq!(header.climate, "stable");
        assert_eq!(header.climate_description, ClimateKind::Stable.friendly_name());
        assert_eq!(
            header.generation_description,
            GenerationKind::Every18Weeks.friendly_name()
        );
        assert_eq!(engine.cfg().model.climate, ClimateKind::Stable);
    }

    #[test]
    fn advancing_continues_past_extinction_when_asked() {
        let mut cfg = small_config();
        cfg.model.base_survival_rate = 0.0;
        cfg.output.stop_on_extinction = false;
        let mut engine = Engine::with_seed(cfg, 3).unwrap();
        assert_eq!(engine.advance(AdvanceUnit::Weeks, 11), 11);
        assert!(engine.simulation().is_extinct());
        assert_eq!(engine.advance(AdvanceUnit::Generations, 2), 25);
        assert_eq!(engine.simulation().week(), 36);
        assert_eq!(engine.simulation().generation(), 1);
        assert_eq!(engine.advance(AdvanceUnit::Years, 1), 52);
    }

    #[test]
    fn same_seed_same_records() {
        let mut a = Engine::with_seed(small_config(), 42).unwrap();
        let mut b = Engine::with_seed(small_config(), 42).unwrap();
        assert_eq!(a.header(), b.header());
        for _ in 0..200 {
            a.advance(AdvanceUnit::Weeks, 1);
            b.advance(AdvanceUnit::Weeks, 1);
            assert_eq!(a.record(), b.record());
        }
    }
}
