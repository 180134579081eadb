use crate::analysis::Analyzer;
use crate::config::{Config, scenarios};
use crate::engine::Engine;
use anyhow::{Context, Result};
use glob::glob;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Simulation directory: a `config.toml` plus one `run-NNNN` directory per run.
pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg = Config::from_file(config_file(&sim_dir)).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    /// Write the configuration of a preset scenario into `sim_dir`.
    pub fn write_preset<P: AsRef<Path>>(sim_dir: P, index: usize) -> Result<()> {
        let sim_dir = sim_dir.as_ref();
        let scenario = scenarios()
            .into_iter()
            .nth(index)
            .with_context(|| format!("no scenario with index {index}"))?;

        fs::create_dir_all(sim_dir).with_context(|| format!("failed to create {sim_dir:?}"))?;
        let file = config_file(sim_dir);
        scenario.config.to_file(&file)?;
        log::info!("wrote {:?} ({}) to {file:?}", scenario.name, scenario.description);

        Ok(())
    }

    /// Log every preset scenario with its index.
    pub fn list_presets() {
        for (index, scenario) in scenarios().iter().enumerate() {
            log::info!(
                "{index}: {} - {} [{}]",
                scenario.name,
                scenario.description,
                scenario.config.model.climate.friendly_name()
            );
        }
    }

    pub fn create_run(&self) -> Result<()> {
        let run_idx = self.count_run_dirs().context("failed to count run dirs")?;

        let run_dir = self.run_dir(run_idx);
        fs::create_dir_all(&run_dir).with_context(|| format!("failed to create {run_dir:?}"))?;
        log::info!("created {run_dir:?}");

        let mut engine = Engine::new(self.cfg.clone()).context("failed to construct engine")?;
        let model = &engine.cfg().model;
        log::info!(
            "seed {}, {}, generations {}",
            engine.seed(),
            model.climate.friendly_name(),
            model.generation.friendly_name().to_lowercase()
        );

        engine
            .perform_simulation(self.trajectory_file(run_idx))
            .context("failed to perform simulation")?;

        Ok(())
    }

    pub fn analyze_sim(&self) -> Result<()> {
        let n_runs = self.count_run_dirs().context("failed to count run dirs")?;
        for run_idx in 0..n_runs {
            let mut analyzer = Analyzer::new();

            let trajectory_file = self.trajectory_file(run_idx);
            analyzer
                .add_file(&trajectory_file)
                .with_context(|| format!("failed to analyze {trajectory_file:?}"))?;

            let report = analyzer.report();
            log::info!(
                "run {run_idx}: final allele frequencies {:?}, extinction week {:?}",
                report.final_allele_freq,
                report.extinction_week
            );

            analyzer
                .save_results(self.results_file(run_idx))
                .context("failed to save results")?;
        }

        Ok(())
    }

    pub fn clean_sim(&self) -> Result<()> {
        for run_dir in self.run_dirs()? {
            fs::remove_dir_all(&run_dir)
                .with_context(|| format!("failed to remove {run_dir:?}"))?;
            log::info!("removed {run_dir:?}");
        }
        Ok(())
    }

    fn run_dirs(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.sim_dir.join("run-*");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let run_dirs = glob(pattern)
            .context("failed to glob run dirs")?
            .filter_map(Result::ok)
            .filter(|p| p.is_dir())
            .collect();
        Ok(run_dirs)
    }

    fn count_run_dirs(&self) -> Result<usize> {
        Ok(self.run_dirs()?.len())
    }

    fn run_dir(&self, run_idx: usize) -> PathBuf {
        self.sim_dir.join(format!("run-{run_idx:04}"))
    }

    fn trajectory_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("trajectory.msgpack")
    }

    fn results_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("results.msgpack")
    }
}

fn config_file(sim_dir: &Path) -> PathBuf {
    sim_dir.join("config.toml")
}
