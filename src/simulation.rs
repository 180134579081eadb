//! Population lifecycle: seeding, weekly tick and aggregate statistics.

use crate::allele::Allele;
use crate::climate::ClimateGenerator;
use crate::generation::GenerationGenerator;
use crate::hare::Hare;
use crate::rng::{self, SimRng};
use std::{collections::BTreeMap, rc::Rc};

/// Inputs of a [`Simulation`].
///
/// Values are expected to be validated by the caller. The generators must
/// start at `start_week` and must have been built from the same random
/// stream that is handed to [`Simulation::new`].
pub struct SimulationConfig {
    pub start_week: u32,
    pub available_alleles: Vec<Allele>,
    pub carrying_capacity: usize,
    pub base_survival_rate: f64,
    pub mismatch_penalty: f64,
    /// Without selection the mismatch penalty is ignored.
    pub selection: bool,
    pub climate_generator: Box<dyn ClimateGenerator>,
    pub generation_generator: Box<dyn GenerationGenerator>,
}

/// Hare population living under a generated climate.
pub struct Simulation {
    week: u32,
    generation: u32,
    carrying_capacity: usize,
    base_survival_rate: f64,
    mismatch_penalty: f64,
    snow_coverage: f64,
    available_alleles: Vec<Rc<Allele>>,
    hares: BTreeMap<usize, Hare>,
    climate: Box<dyn ClimateGenerator>,
    generation_timing: Box<dyn GenerationGenerator>,
    rng: SimRng,
}

impl Simulation {
    pub fn new(cfg: SimulationConfig, rng: SimRng) -> Self {
        let available_alleles: Vec<Rc<Allele>> =
            cfg.available_alleles.into_iter().map(Rc::new).collect();

        let hares = Self::initial_population(
            &available_alleles,
            cfg.carrying_capacity,
            cfg.start_week,
        )
        .into_iter()
        .map(|hare| (hare.id(), hare))
        .collect();

        let mismatch_penalty = if cfg.selection {
            cfg.mismatch_penalty
        } else {
            0.0
        };

        Self {
            week: cfg.start_week,
            generation: 1,
            carrying_capacity: cfg.carrying_capacity,
            base_survival_rate: cfg.base_survival_rate,
            mismatch_penalty,
            snow_coverage: cfg.climate_generator.snow_coverage(),
            available_alleles,
            hares,
            climate: cfg.climate_generator,
            generation_timing: cfg.generation_generator,
            rng,
        }
    }

    /// Build `carrying_capacity` hares, handing out allele pairs round robin
    /// so every allele starts out as evenly represented as possible.
    pub fn initial_population(
        available_alleles: &[Rc<Allele>],
        carrying_capacity: usize,
        week: u32,
    ) -> Vec<Hare> {
        let n_alleles = available_alleles.len();
        (0..carrying_capacity)
            .map(|id| {
                let alleles = if n_alleles == 0 {
                    Vec::new()
                } else {
                    vec![
                        Rc::clone(&available_alleles[id % n_alleles]),
                        Rc::clone(&available_alleles[(id + 1) % n_alleles]),
                    ]
                };
                Hare::born_at(id, week, alleles)
            })
            .collect()
    }

    /// Advance the simulation by one week.
    pub fn advance_week(&mut self) {
        self.week += 1;
        self.climate.advance_week(&mut self.rng);
        self.generation_timing.advance_week();
        self.snow_coverage = self.climate.snow_coverage();

        if self.hares.is_empty() {
            return;
        }

        if self.generation_timing.should_generate() {
            self.do_procreation();
        }

        let (base_survival_rate, mismatch_penalty) =
            (self.base_survival_rate, self.mismatch_penalty);
        for hare in self.hares.values_mut() {
            hare.do_survival_pass(
                base_survival_rate,
                mismatch_penalty,
                self.snow_coverage,
                self.week,
                &mut self.rng,
            );
        }
        self.hares.retain(|_, hare| hare.is_alive());

        if self.hares.is_empty() {
            log::debug!("population went extinct in week {}", self.week);
        }
    }

    /// Refill the population up to carrying capacity from the pooled alleles
    /// of the living hares.
    fn do_procreation(&mut self) {
        self.hares.retain(|_, hare| hare.is_alive());
        if self.hares.is_empty() {
            return;
        }

        let allele_pool: Vec<Rc<Allele>> = self
            .hares
            .values()
            .flat_map(|hare| hare.alleles().iter().cloned())
            .collect();

        let free_ids: Vec<usize> = (0..self.carrying_capacity)
            .filter(|id| !self.hares.contains_key(id))
            .collect();
        let n_born = free_ids.len();

        for id in free_ids {
            let alleles = if allele_pool.is_empty() {
                Vec::new()
            } else {
                (0..2)
                    .map(|_| {
                        let i_allele = rng::index(&mut self.rng, allele_pool.len());
                        Rc::clone(&allele_pool[i_allele])
                    })
                    .collect()
            };
            self.hares.insert(id, Hare::born_at(id, self.week, alleles));
        }

        self.generation += 1;
        log::debug!(
            "generation {} bred {n_born} hares in week {}",
            self.generation,
            self.week
        );
    }

    pub fn week(&self) -> u32 {
        self.week
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn snow_coverage(&self) -> f64 {
        self.snow_coverage
    }

    pub fn temperature(&self) -> f64 {
        self.climate.temperature()
    }

    pub fn carrying_capacity(&self) -> usize {
        self.carrying_capacity
    }

    pub fn mismatch_penalty(&self) -> f64 {
        self.mismatch_penalty
    }

    pub fn climate(&self) -> &dyn ClimateGenerator {
        self.climate.as_ref()
    }

    pub fn generation_timing(&self) -> &dyn GenerationGenerator {
        self.generation_timing.as_ref()
    }

    pub fn available_alleles(&self) -> impl Iterator<Item = &Allele> {
        self.available_alleles.iter().map(Rc::as_ref)
    }

    pub fn possible_coat_alleles(&self) -> Vec<&Allele> {
        self.available_alleles().filter(|a| a.is_coat()).collect()
    }

    /// Living hares in id order.
    pub fn alive_hares(&self) -> Vec<&Hare> {
        self.hares.values().filter(|hare| hare.is_alive()).collect()
    }

    pub fn n_alive(&self) -> usize {
        self.hares.values().filter(|hare| hare.is_alive()).count()
    }

    pub fn is_extinct(&self) -> bool {
        self.n_alive() == 0
    }

    pub fn hare(&self, id: usize) -> Option<&Hare> {
        self.hares.get(&id)
    }

    /// Relative frequency of every possible coat allele among the living
    /// hares, keyed by allele id. All zero when nobody is alive.
    pub fn coat_allele_frequency(&self) -> BTreeMap<u32, f64> {
        let mut freq: BTreeMap<u32, f64> = self
            .possible_coat_alleles()
            .into_iter()
            .map(|allele| (allele.id, 0.0))
            .collect();

        let mut n_coat = 0_usize;
        for allele in self.alive_hares().into_iter().flat_map(Hare::coat_alleles) {
            *freq.entry(allele.id).or_insert(0.0) += 1.0;
            n_coat += 1;
        }

        if n_coat > 0 {
            freq.values_mut().for_each(|count| *count /= n_coat as f64);
        }
        freq
    }
}
