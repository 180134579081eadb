//! Weekly snow-coverage generators.
//!
//! Every generator is advanced exactly once per simulated week and is
//! queried for the snow coverage of its current week. Randomness is only
//! drawn at construction and at the start of each simulated year.

use crate::hare::WEEKS_PER_YEAR;
use crate::rng::{self, SimRng};
use anyhow::Result;
use rand_distr::{Bernoulli, Distribution, Uniform};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Weekly snow-coverage source.
pub trait ClimateGenerator {
    /// Short name of the variant.
    fn name(&self) -> &'static str;

    /// Current simulated week.
    fn week(&self) -> u32;

    /// Current temperature in degrees Celsius.
    fn temperature(&self) -> f64;

    /// Fraction of ground covered in snow, in `[0, 1]`.
    fn snow_coverage(&self) -> f64;

    /// Move to the next week.
    fn advance_week(&mut self, rng: &mut SimRng);
}

/// Available climate generators, selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClimateKind {
    Stable,
    Warming,
    RealisticStable,
    RealisticWarming,
}

impl ClimateKind {
    /// Human readable description.
    pub fn friendly_name(&self) -> &'static str {
        match self {
            Self::Stable => "Stable climate (integral snow cover)",
            Self::Warming => "Warming climate (integral snow cover)",
            Self::RealisticStable => "Stable climate (gradual snow cover)",
            Self::RealisticWarming => "Warming climate (gradual snow cover)",
        }
    }

    /// Build the generator starting at `week`.
    pub fn build(
        &self,
        week: u32,
        temperature: f64,
        rng: &mut SimRng,
    ) -> Result<Box<dyn ClimateGenerator>> {
        let climate: Box<dyn ClimateGenerator> = match self {
            Self::Stable => Box::new(StableClimate::new(week, temperature, rng)),
            Self::Warming => Box::new(WarmingClimate::new(week, temperature, rng)?),
            Self::RealisticStable => {
                Box::new(RealisticClimate::new_stable(week, temperature, rng)?)
            }
            Self::RealisticWarming => {
                Box::new(RealisticClimate::new_warming(week, temperature, rng)?)
            }
        };
        Ok(climate)
    }
}

/// First week of the snow season in the integral variants.
const SNOW_WEEK: u32 = 36;

const WARM_TEMPERATURE: f64 = 10.0;
const COLD_TEMPERATURE: f64 = 0.0;

fn integral_temperature(year_week: u32, snowless_week: u32) -> f64 {
    if year_week < snowless_week || year_week >= SNOW_WEEK {
        COLD_TEMPERATURE
    } else {
        WARM_TEMPERATURE
    }
}

fn integral_snow_coverage(temperature: f64) -> f64 {
    if temperature < 1.0 { 1.0 } else { 0.0 }
}

/// Binary snow cover with a melt week jittering around a fixed base.
#[derive(Debug, Clone)]
pub struct StableClimate {
    week: u32,
    temperature: f64,
    base_snowless_week: u32,
    snowless_week: u32,
}

impl StableClimate {
    pub fn new(week: u32, temperature: f64, rng: &mut SimRng) -> Self {
        // Base melt week in 21..=28.
        let base_snowless_week = 21 + rng::index(rng, 8) as u32;
        let mut climate = Self {
            week,
            temperature,
            base_snowless_week,
            snowless_week: base_snowless_week,
        };
        climate.update_temperature(rng);
        climate
    }

    pub fn snowless_week(&self) -> u32 {
        self.snowless_week
    }

    fn update_temperature(&mut self, rng: &mut SimRng) {
        let year_week = self.week % WEEKS_PER_YEAR;
        if year_week == 0 {
            let delta = rng::index(rng, 3) as u32;
            self.snowless_week = self.base_snowless_week + delta - 1;
        }
        self.temperature = integral_temperature(year_week, self.snowless_week);
    }
}

impl ClimateGenerator for StableClimate {
    fn name(&self) -> &'static str {
        "stable"
    }

    fn week(&self) -> u32 {
        self.week
    }

    fn temperature(&self) -> f64 {
        self.temperature
    }

    fn snow_coverage(&self) -> f64 {
        integral_snow_coverage(self.temperature)
    }

    fn advance_week(&mut self, rng: &mut SimRng) {
        self.week += 1;
        self.update_temperature(rng);
    }
}

/// Binary snow cover whose melt week drifts earlier over the years.
#[derive(Debug, Clone)]
pub struct WarmingClimate {
    week: u32,
    temperature: f64,
    snowless_week: u32,
    drift_rare: Bernoulli,
    drift_slow: Bernoulli,
    drift_fast: Bernoulli,
    drift_later: Bernoulli,
}

impl WarmingClimate {
    pub fn new(week: u32, temperature: f64, rng: &mut SimRng) -> Result<Self> {
        let snowless_week = 28 + rng::index(rng, 2) as u32;
        let mut climate = Self {
            week,
            temperature,
            snowless_week,
            drift_rare: Bernoulli::new(0.05)?,
            drift_slow: Bernoulli::new(0.25)?,
            drift_fast: Bernoulli::new(0.5)?,
            drift_later: Bernoulli::new(0.2)?,
        };
        climate.update_temperature(rng);
        Ok(climate)
    }

    pub fn snowless_week(&self) -> u32 {
        self.snowless_week
    }

    fn update_temperature(&mut self, rng: &mut SimRng) {
        let year_week = self.week % WEEKS_PER_YEAR;
        if year_week == 0 {
            // Drift slows down as the melt approaches the start of the year.
            let drift = if self.snowless_week < 10 {
                &self.drift_rare
            } else if self.snowless_week < 15 {
                &self.drift_slow
            } else {
                &self.drift_fast
            };
            if drift.sample(rng) {
                if self.drift_later.sample(rng) {
                    self.snowless_week = (self.snowless_week + 1).min(WEEKS_PER_YEAR - 1);
                } else {
                    self.snowless_week = self.snowless_week.saturating_sub(1);
                }
            }
        }
        self.temperature = integral_temperature(year_week, self.snowless_week);
    }
}

impl ClimateGenerator for WarmingClimate {
    fn name(&self) -> &'static str {
        "warming"
    }

    fn week(&self) -> u32 {
        self.week
    }

    fn temperature(&self) -> f64 {
        self.temperature
    }

    fn snow_coverage(&self) -> f64 {
        integral_snow_coverage(self.temperature)
    }

    fn advance_week(&mut self, rng: &mut SimRng) {
        self.week += 1;
        self.update_temperature(rng);
    }
}

const MEAN_TEMPERATURE: f64 = -9.0;
const TEMPERATURE_AMPLITUDE: f64 = 12.0;
const TEMPERATURE_ASYMMETRY: f64 = 1.5;
const BASE_PHASE: f64 = 4.0;
const MELT_SCALE: f64 = 0.75;

const PHASE_DRIFT: f64 = 0.5;
/// Earliest the base phase may drift, in weeks before `BASE_PHASE`.
const MAX_PHASE_DRIFT: f64 = 4.0;
const WARMING_PER_DRIFT: f64 = 0.25;

/// Continuous temperature cycle with logistic snow cover.
///
/// The coldest week of the year sits at `phase`, which is redrawn around
/// `base_phase` every year. With warming enabled the mean temperature rises on
/// drift years and the base phase moves earlier, at most `MAX_PHASE_DRIFT`
/// weeks, so the cold season never rotates into summer.
#[derive(Debug, Clone)]
pub struct RealisticClimate {
    week: u32,
    temperature: f64,
    mean_temperature: f64,
    base_phase: f64,
    phase: f64,
    jitter: Uniform<f64>,
    warming: Option<Bernoulli>,
}

impl RealisticClimate {
    pub fn new_stable(week: u32, temperature: f64, rng: &mut SimRng) -> Result<Self> {
        Self::new(week, temperature, None, rng)
    }

    pub fn new_warming(week: u32, temperature: f64, rng: &mut SimRng) -> Result<Self> {
        Self::new(week, temperature, Some(Bernoulli::new(0.5)?), rng)
    }

    fn new(
        week: u32,
        temperature: f64,
        warming: Option<Bernoulli>,
        rng: &mut SimRng,
    ) -> Result<Self> {
        let jitter = Uniform::new_inclusive(-1.0, 1.0)?;
        let phase = BASE_PHASE + jitter.sample(rng);
        let mut climate = Self {
            week,
            temperature,
            mean_temperature: MEAN_TEMPERATURE,
            base_phase: BASE_PHASE,
            phase,
            jitter,
            warming,
        };
        climate.update_temperature(rng);
        Ok(climate)
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn mean_temperature(&self) -> f64 {
        self.mean_temperature
    }

    fn cycle_temperature(&self, year_week: u32) -> f64 {
        let angle = 2.0 * PI * (f64::from(year_week) - self.phase) / f64::from(WEEKS_PER_YEAR);
        self.mean_temperature - TEMPERATURE_AMPLITUDE * angle.cos()
            + TEMPERATURE_ASYMMETRY * (2.0 * angle).sin()
    }

    fn update_temperature(&mut self, rng: &mut SimRng) {
        let year_week = self.week % WEEKS_PER_YEAR;
        if year_week == 0 {
            if let Some(warming) = &self.warming {
                if warming.sample(rng) {
                    self.base_phase =
                        (self.base_phase - PHASE_DRIFT).max(BASE_PHASE - MAX_PHASE_DRIFT);
                    self.mean_temperature += WARMING_PER_DRIFT;
                }
            }
            self.phase = self.base_phase + self.jitter.sample(rng);
        }
        self.temperature = self.cycle_temperature(year_week);
    }
}

impl ClimateGenerator for RealisticClimate {
    fn name(&self) -> &'static str {
        if self.warming.is_some() {
            "realistic-warming"
        } else {
            "realistic-stable"
        }
    }

    fn week(&self) -> u32 {
        self.week
    }

    fn temperature(&self) -> f64 {
        self.temperature
    }

    fn snow_coverage(&self) -> f64 {
        1.0 / (1.0 + (self.temperature / MELT_SCALE).exp())
    }

    fn advance_week(&mut self, rng: &mut SimRng) {
        self.week += 1;
        self.update_temperature(rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::create_rng;

    const KINDS: [ClimateKind; 4] = [
        ClimateKind::Stable,
        ClimateKind::Warming,
        ClimateKind::RealisticStable,
        ClimateKind::RealisticWarming,
    ];

    #[test]
    fn stable_coverage_is_binary() {
        let mut rng = create_rng(21);
        let mut climate = StableClimate::new(0, 0.0, &mut rng);
        for _ in 0..52 * 20 {
            let snow = climate.snow_coverage();
            assert!(snow == 0.0 || snow == 1.0);
            climate.advance_week(&mut rng);
        }
    }

    #[test]
    fn stable_melt_week_stays_in_band() {
        let mut rng = create_rng(4);
        let mut climate = StableClimate::new(0, 0.0, &mut rng);
        for _ in 0..52 * 50 {
            assert!((20..=29).contains(&climate.snowless_week()));
            climate.advance_week(&mut rng);
        }
    }

    #[test]
    fn stable_snow_follows_melt_and_snow_weeks() {
        let mut rng = create_rng(9);
        let mut climate = StableClimate::new(0, 0.0, &mut rng);
        for week in 0..52 {
            let melt = climate.snowless_week();
            let expected = if week < melt || week >= SNOW_WEEK { 1.0 } else { 0.0 };
            assert_eq!(climate.snow_coverage(), expected, "week {week}");
            climate.advance_week(&mut rng);
        }
    }

    #[test]
    fn warming_lengthens_snowless_season() {
        let mut rng = create_rng(17);
        let mut climate = WarmingClimate::new(0, 0.0, &mut rng).unwrap();
        let initial = climate.snowless_week();
        for _ in 0..52 * 60 {
            climate.advance_week(&mut rng);
        }
        assert!(climate.snowless_week() < initial);
        let snow = climate.snow_coverage();
        assert!(snow == 0.0 || snow == 1.0);
    }

    #[test]
    fn realistic_coverage_is_gradual() {
        let mut rng = create_rng(2);
        let mut climate = RealisticClimate::new_stable(0, 0.0, &mut rng).unwrap();
        let mut fractional = false;
        let mut winter_max: f64 = 0.0;
        let mut summer_min: f64 = 1.0;
        for _ in 0..52 * 3 {
            let snow = climate.snow_coverage();
            assert!((0.0..=1.0).contains(&snow));
            fractional |= snow > 0.05 && snow < 0.95;
            match climate.week() % 52 {
                0..=8 => winter_max = winter_max.max(snow),
                28..=32 => summer_min = summer_min.min(snow),
                _ => {}
            }
            climate.advance_week(&mut rng);
        }
        assert!(fractional);
        assert!(winter_max > 0.99);
        assert!(summer_min < 0.05);
    }

    #[test]
    fn realistic_warming_warms() {
        let mut rng = create_rng(8);
        let mut climate = RealisticClimate::new_warming(0, 0.0, &mut rng).unwrap();
        for _ in 0..52 * 40 {
            climate.advance_week(&mut rng);
        }
        assert!(climate.mean_temperature() > MEAN_TEMPERATURE);
        assert!(climate.phase() < BASE_PHASE + 1.0);
    }

    #[test]
    fn realistic_warming_keeps_summer_snow_free() {
        let mut rng = create_rng(8);
        let mut climate = RealisticClimate::new_warming(0, 0.0, &mut rng).unwrap();
        let mut snowy_weeks = Vec::new();
        for year in 0..120 {
            let mut n_snowy = 0;
            for year_week in 0..52 {
                let snow = climate.snow_coverage();
                if snow >= 0.5 {
                    n_snowy += 1;
                }
                if year_week == 30 {
                    assert!(snow < 0.1, "year {year}: coverage {snow}");
                }
                climate.advance_week(&mut rng);
            }
            snowy_weeks.push(n_snowy);
            assert!(climate.phase() >= BASE_PHASE - MAX_PHASE_DRIFT - 1.0);
        }
        let early_max = snowy_weeks[..5].iter().copied().max().unwrap();
        assert!(snowy_weeks.iter().all(|&n| n <= early_max + 1), "{snowy_weeks:?}");
        let early: u32 = snowy_weeks[..10].iter().sum();
        let late: u32 = snowy_weeks[110..].iter().sum();
        assert!(late < early, "{snowy_weeks:?}");
    }

    #[test]
    fn generators_keep_week_and_are_deterministic() {
        for kind in KINDS {
            let mut rng_a = create_rng(99);
            let mut rng_b = create_rng(99);
            let mut a = kind.build(5, 0.0, &mut rng_a).unwrap();
            let mut b = kind.build(5, 0.0, &mut rng_b).unwrap();
            assert_eq!(a.name(), b.name());
            for week in 5..5 + 52 * 5 {
                assert_eq!(a.week(), week);
                assert_eq!(a.snow_coverage().to_bits(), b.snow_coverage().to_bits());
                a.advance_week(&mut rng_a);
                b.advance_week(&mut rng_b);
            }
        }
    }

    #[test]
    fn kinds_parse_from_kebab_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            climate: ClimateKind,
        }
        let w: Wrapper = toml::from_str("climate = \"realistic-warming\"").unwrap();
        assert_eq!(w.climate, ClimateKind::RealisticWarming);
        assert!(!w.climate.friendly_name().is_empty());
    }
}
