//! Cohort timing: decides in which weeks the population is refilled.

use serde::{Deserialize, Serialize};

/// Weekly predicate telling the simulation when to breed a new cohort.
pub trait GenerationGenerator {
    fn name(&self) -> &'static str;

    fn week(&self) -> u32;

    fn advance_week(&mut self);

    fn should_generate(&self) -> bool;
}

/// Available cohort timing policies, selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationKind {
    Every18Weeks,
}

impl GenerationKind {
    pub fn friendly_name(&self) -> &'static str {
        match self {
            Self::Every18Weeks => "Every 18 weeks",
        }
    }

    pub fn build(&self, week: u32) -> Box<dyn GenerationGenerator> {
        match self {
            Self::Every18Weeks => Box::new(PeriodicGeneration::new(week, 18)),
        }
    }
}

/// Breeds whenever the week is a multiple of `period`.
#[derive(Debug, Clone)]
pub struct PeriodicGeneration {
    week: u32,
    period: u32,
}

impl PeriodicGeneration {
    /// `period` must be non-zero.
    pub fn new(week: u32, period: u32) -> Self {
        Self { week, period }
    }
}

impl GenerationGenerator for PeriodicGeneration {
    fn name(&self) -> &'static str {
        "periodic"
    }

    fn week(&self) -> u32 {
        self.week
    }

    fn advance_week(&mut self) {
        self.week += 1;
    }

    fn should_generate(&self) -> bool {
        self.week % self.period == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_18_weeks() {
        let mut generation = GenerationKind::Every18Weeks.build(0);
        let mut weeks = Vec::new();
        for _ in 0..60 {
            if generation.should_generate() {
                weeks.push(generation.week());
            }
            generation.advance_week();
        }
        assert_eq!(weeks, vec![0, 18, 36, 54]);
    }

    #[test]
    fn starts_from_given_week() {
        let mut generation = PeriodicGeneration::new(17, 18);
        assert!(!generation.should_generate());
        generation.advance_week();
        assert_eq!(generation.week(), 18);
        assert!(generation.should_generate());
    }
}
