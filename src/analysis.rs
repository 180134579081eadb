use crate::hare::WEEKS_PER_YEAR;
use crate::stats::{Accumulator, AccumulatorReport, TimeSeries, TimeSeriesReport};
use crate::types::{Header, Record};
use anyhow::{Context, Result};
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

/// Snow coverage below which a week counts as snowless.
const SNOWLESS_THRESHOLD: f64 = 0.5;

/// Summary of one run.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub seed: u64,
    pub climate: String,
    pub n_records: usize,
    pub snow_coverage: Option<AccumulatorReport>,
    pub n_alive: Option<TimeSeriesReport>,
    pub mean_allele_freq: BTreeMap<u32, AccumulatorReport>,
    pub final_allele_freq: BTreeMap<u32, f64>,
    /// First snowless week of each simulated year, if one was recorded.
    pub first_snowless_weeks: BTreeMap<u32, u32>,
    pub extinction_week: Option<u32>,
}

pub trait Obs {
    fn update(&mut self, record: &Record);
    fn report(&self, report: &mut Report);
}

#[derive(Default)]
pub struct SnowCoverage {
    acc: Accumulator,
}

impl Obs for SnowCoverage {
    fn update(&mut self, record: &Record) {
        self.acc.add(record.snow_coverage);
    }

    fn report(&self, report: &mut Report) {
        report.snow_coverage = Some(self.acc.report());
    }
}

#[derive(Default)]
pub struct PopulationSize {
    time_series: TimeSeries,
}

impl Obs for PopulationSize {
    fn update(&mut self, record: &Record) {
        self.time_series.push(record.n_alive as f64);
    }

    fn report(&self, report: &mut Report) {
        report.n_alive = Some(self.time_series.report());
    }
}

#[derive(Default)]
pub struct AlleleFreq {
    acc_map: BTreeMap<u32, Accumulator>,
    last: BTreeMap<u32, f64>,
}

impl Obs for AlleleFreq {
    fn update(&mut self, record: &Record) {
        // Frequencies of an extinct population carry no information.
        if record.n_alive == 0 {
            return;
        }
        for (&id, &freq) in &record.allele_freq {
            self.acc_map.entry(id).or_default().add(freq);
        }
        self.last = record.allele_freq.clone();
    }

    fn report(&self, report: &mut Report) {
        report.mean_allele_freq = self
            .acc_map
            .iter()
            .map(|(&id, acc)| (id, acc.report()))
            .collect();
        report.final_allele_freq = self.last.clone();
    }
}

#[derive(Default)]
pub struct FirstSnowlessWeek {
    weeks: BTreeMap<u32, u32>,
}

impl Obs for FirstSnowlessWeek {
    fn update(&mut self, record: &Record) {
        if record.snow_coverage < SNOWLESS_THRESHOLD {
            let year = record.week / WEEKS_PER_YEAR;
            self.weeks
                .entry(year)
                .or_insert(record.week % WEEKS_PER_YEAR);
        }
    }

    fn report(&self, report: &mut Report) {
        report.first_snowless_weeks = self.weeks.clone();
    }
}

#[derive(Default)]
pub struct Extinction {
    week: Option<u32>,
}

impl Obs for Extinction {
    fn update(&mut self, record: &Record) {
        if record.n_alive == 0 && self.week.is_none() {
            self.week = Some(record.week);
        }
    }

    fn report(&self, report: &mut Report) {
        report.extinction_week = self.week;
    }
}

/// Runs every observable over the records of a trajectory.
pub struct Analyzer {
    header: Option<Header>,
    n_records: usize,
    obs_ptr_vec: Vec<Box<dyn Obs>>,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    pub fn new() -> Self {
        let obs_ptr_vec: Vec<Box<dyn Obs>> = vec![
            Box::new(SnowCoverage::default()),
            Box::new(PopulationSize::default()),
            Box::new(AlleleFreq::default()),
            Box::new(FirstSnowlessWeek::default()),
            Box::new(Extinction::default()),
        ];
        Self {
            header: None,
            n_records: 0,
            obs_ptr_vec,
        }
    }

    pub fn add_record(&mut self, record: &Record) {
        self.n_records += 1;
        for obs in &mut self.obs_ptr_vec {
            obs.update(record);
        }
    }

    /// Read a trajectory file written by the engine.
    pub fn add_file<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);

        let header: Header = decode::from_read(&mut reader).context("failed to read header")?;
        self.header = Some(header);

        while !reader
            .fill_buf()
            .context("failed to read trajectory")?
            .is_empty()
        {
            let record: Record =
                decode::from_read(&mut reader).context("failed to read record")?;
            self.add_record(&record);
        }
        Ok(())
    }

    pub fn report(&self) -> Report {
        let mut report = Report {
            n_records: self.n_records,
            ..Default::default()
        };
        if let Some(header) = &self.header {
            report.seed = header.seed;
            report.climate = header.climate.clone();
        }
        for obs in &self.obs_ptr_vec {
            obs.report(&mut report);
        }
        report
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        encode::write(&mut writer, &self.report()).context("failed to serialize report")?;

        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }
}
