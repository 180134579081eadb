//! Individual hares: genotype, coat phenotype and survival.

use crate::allele::{Allele, Rgb};
use crate::rng::{self, SimRng};
use std::rc::Rc;

/// Minimum whiteness/snow contrast at which a hare stands out.
pub const MISMATCH_CONTRAST: f64 = 0.6;

/// Weeks per simulated year.
pub const WEEKS_PER_YEAR: u32 = 52;

/// Coat transition timing averaged over a hare's coat alleles.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct TransitionPhenotype {
    pub brown_start: u32,
    pub brown_rate: f64,
    pub white_start: u32,
    pub white_rate: f64,
}

impl TransitionPhenotype {
    fn is_browning(&self, year_week: u32) -> bool {
        year_week >= self.brown_start && year_week < self.white_start
    }
}

/// A single hare.
///
/// `id` is a slot in `[0, carrying_capacity)` and stays fixed for the hare's
/// lifetime. Alleles are shared with the simulation's catalog.
#[derive(Debug, Clone)]
pub struct Hare {
    id: usize,
    alive: bool,
    whiteness: f64,
    alleles: Vec<Rc<Allele>>,
}

impl Hare {
    pub fn new(id: usize, whiteness: f64, alleles: Vec<Rc<Allele>>) -> Self {
        Self {
            id,
            alive: true,
            whiteness,
            alleles,
        }
    }

    /// Create a hare whose whiteness is already consistent with `week`.
    pub fn born_at(id: usize, week: u32, alleles: Vec<Rc<Allele>>) -> Self {
        let mut hare = Self::new(id, 0.0, alleles);
        hare.whiteness = hare.projected_whiteness(week);
        hare
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn whiteness(&self) -> f64 {
        self.whiteness
    }

    pub fn alleles(&self) -> &[Rc<Allele>] {
        &self.alleles
    }

    pub fn coat_alleles(&self) -> impl Iterator<Item = &Allele> {
        self.alleles.iter().map(Rc::as_ref).filter(|a| a.is_coat())
    }

    pub fn is_mismatched(&self, snow_coverage: f64) -> bool {
        (self.whiteness - snow_coverage).abs() >= MISMATCH_CONTRAST
    }

    /// Mid-parent transition timing. A hare without coat alleles never changes.
    pub fn transition_phenotype(&self) -> TransitionPhenotype {
        let n_coat = self.coat_alleles().count();
        if n_coat == 0 {
            return TransitionPhenotype::default();
        }
        let average = |field: fn(&Allele) -> f64| {
            self.coat_alleles().map(field).sum::<f64>() / n_coat as f64
        };
        // Weeks are whole: a transition inside a week starts at its beginning.
        TransitionPhenotype {
            brown_start: average(|a| a.brown_week).floor() as u32,
            brown_rate: average(|a| a.brown_rate),
            white_start: average(|a| a.white_week).floor() as u32,
            white_rate: average(|a| a.white_rate),
        }
    }

    /// Whiteness this hare would have at `week`, starting from its current one.
    pub fn projected_whiteness(&self, week: u32) -> f64 {
        let phe = self.transition_phenotype();
        let year_week = week % WEEKS_PER_YEAR;
        if phe.is_browning(year_week) {
            let weeks_left = f64::from(phe.white_start - year_week);
            (self.whiteness - phe.brown_rate * weeks_left).max(0.0)
        } else {
            let weeks_white =
                f64::from(year_week + WEEKS_PER_YEAR) - f64::from(phe.white_start);
            (self.whiteness + phe.white_rate * weeks_white).min(1.0)
        }
    }

    /// Molt one week and roll for survival. Returns whether the hare lives.
    pub fn do_survival_pass(
        &mut self,
        base_survival_rate: f64,
        mismatch_penalty: f64,
        snow_coverage: f64,
        week: u32,
        rng: &mut SimRng,
    ) -> bool {
        if !self.alive {
            return false;
        }

        let phe = self.transition_phenotype();
        if phe.is_browning(week % WEEKS_PER_YEAR) {
            self.whiteness = (self.whiteness - phe.brown_rate).max(0.0);
        } else {
            self.whiteness = (self.whiteness + phe.white_rate).min(1.0);
        }

        let survival_rate = if self.is_mismatched(snow_coverage) {
            base_survival_rate - mismatch_penalty
        } else {
            base_survival_rate
        };

        self.alive = rng::unit(rng) <= survival_rate;
        self.alive
    }

    /// Channel-wise mean of the coat allele colors, black without coat alleles.
    pub fn genotype_color(&self) -> Rgb {
        let colors: Vec<Rgb> = self.coat_alleles().map(|a| a.color).collect();
        if colors.is_empty() {
            return Rgb::BLACK;
        }
        let n = colors.len() as u32;
        let mean = |channel: fn(&Rgb) -> u8| {
            (colors.iter().map(|c| u32::from(channel(c))).sum::<u32>() / n) as u8
        };
        Rgb {
            r: mean(|c| c.r),
            g: mean(|c| c.g),
            b: mean(|c| c.b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allele::AlleleKind;
    use crate::rng::create_rng;

    fn allele(id: u32, brown_week: f64, rate: f64, color: &str) -> Rc<Allele> {
        Rc::new(Allele {
            id,
            name: format!("Allele {id}"),
            kind: AlleleKind::Coat,
            brown_week,
            brown_rate: rate,
            white_week: 36.0,
            white_rate: rate,
            color: Rgb::from_hex(color).unwrap(),
        })
    }

    #[test]
    fn mismatch_threshold_is_inclusive() {
        let hare = Hare::new(0, 0.0, vec![]);
        assert!(hare.is_mismatched(0.6));
        assert!(!hare.is_mismatched(0.59));
        let hare = Hare::new(0, 1.0, vec![]);
        assert!(hare.is_mismatched(0.0));
        assert!(!hare.is_mismatched(0.5));
    }

    #[test]
    fn phenotype_is_mid_parent() {
        let hare = Hare::new(
            0,
            0.0,
            vec![allele(1, 15.0, 1.0, "#000000"), allele(2, 24.0, 0.5, "#000000")],
        );
        let phe = hare.transition_phenotype();
        assert_eq!(phe.brown_start, 19);
        assert_eq!(phe.white_start, 36);
        assert!((phe.brown_rate - 0.75).abs() < 1e-12);
        assert!((phe.white_rate - 0.75).abs() < 1e-12);
    }

    #[test]
    fn projection_does_not_mutate() {
        let hare = Hare::new(0, 0.0, vec![allele(1, 15.0, 1.0, "#000000"); 2]);
        assert_eq!(hare.projected_whiteness(0), 1.0);
        assert_eq!(hare.projected_whiteness(20), 0.0);
        assert_eq!(hare.projected_whiteness(52 + 40), 1.0);
        assert_eq!(hare.whiteness(), 0.0);
    }

    #[test]
    fn newborn_matches_season() {
        let alleles = vec![allele(1, 15.0, 1.0, "#000000"); 2];
        assert_eq!(Hare::born_at(3, 10, alleles.clone()).whiteness(), 1.0);
        assert_eq!(Hare::born_at(3, 20, alleles).whiteness(), 0.0);
    }

    #[test]
    fn survival_pass_molts_toward_season() {
        let mut rng = create_rng(1);
        let mut hare = Hare::new(0, 1.0, vec![allele(1, 15.0, 0.25, "#000000"); 2]);
        hare.do_survival_pass(1.0, 0.0, 1.0, 16, &mut rng);
        assert!((hare.whiteness() - 0.75).abs() < 1e-12);
        hare.do_survival_pass(1.0, 0.0, 1.0, 40, &mut rng);
        assert!((hare.whiteness() - 1.0).abs() < 1e-12);
        hare.do_survival_pass(1.0, 0.0, 1.0, 40, &mut rng);
        assert_eq!(hare.whiteness(), 1.0);
    }

    #[test]
    fn certain_survival_and_certain_death() {
        let mut rng = create_rng(5);
        for _ in 0..1_000 {
            let mut hare = Hare::new(0, 0.0, vec![]);
            assert!(hare.do_survival_pass(1.0, 0.0, 1.0, 0, &mut rng));
            let mut hare = Hare::new(0, 0.0, vec![]);
            assert!(!hare.do_survival_pass(0.0, 0.0, 0.0, 0, &mut rng));
            let mut hare = Hare::new(0, 0.0, vec![]);
            assert!(!hare.do_survival_pass(0.5, 0.5, 1.0, 0, &mut rng));
        }
    }

    #[test]
    fn dead_hare_stays_dead() {
        let mut rng = create_rng(5);
        let mut hare = Hare::new(0, 0.0, vec![]);
        assert!(!hare.do_survival_pass(0.0, 0.0, 0.0, 0, &mut rng));
        assert!(!hare.do_survival_pass(1.0, 0.0, 0.0, 0, &mut rng));
        assert!(!hare.is_alive());
    }

    #[test]
    fn genotype_color_is_channel_mean() {
        let hare = Hare::new(
            0,
            0.0,
            vec![allele(1, 15.0, 1.0, "#ff0000"), allele(2, 15.0, 1.0, "#0000ff")],
        );
        assert_eq!(hare.genotype_color().to_string(), "#7f007f");
        assert_eq!(Hare::new(0, 0.0, vec![]).genotype_color(), Rgb::BLACK);
    }
}
