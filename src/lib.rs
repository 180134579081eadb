//! Simulation of seasonal coat-color alleles in a hare population.
//!
//! The core is [`simulation::Simulation`]: a fixed-capacity population of
//! [`hare::Hare`]s whose survival depends on how well their coat matches the
//! snow cover produced by a [`climate::ClimateGenerator`]. New cohorts are
//! bred from the pooled alleles of the survivors whenever a
//! [`generation::GenerationGenerator`] says so.
//!
//! The remaining modules load configurations, drive runs and analyze the
//! recorded trajectories.

pub mod allele;
pub mod analysis;
pub mod climate;
pub mod config;
pub mod engine;
pub mod generation;
pub mod hare;
pub mod manager;
pub mod rng;
pub mod simulation;
pub mod stats;
pub mod types;
