//! End-to-end optical-property recovery pipeline.
//!
//! Ties the stages together: demodulate the sample and reference fringe
//! sequences, smooth the four reflectance maps, calibrate against the
//! known reference standard through the diffusion model, invert per pixel
//! with the lookup table and summarize the recovered maps. One
//! [`Processor`] owns its table and interpolator, so repeated frames pay
//! the triangulation cost once.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::demodulate::{demodulate, DemodulateError};
use crate::forward::{DiffusionModel, ForwardError, FrequencyPair};
use crate::interp::InterpMethod;
use crate::invert::{InvertError, Inverter, PropertyMap};
use crate::smooth::gaussian_smooth;
use crate::stats::{summarize, StatsError};
use crate::table::{GridRange, LookupTable};

// ── Error type ─────────────────────────────────────────────────────────────

/// Errors from a pipeline run.
#[derive(Debug)]
pub enum ProcessError {
    Demodulate(DemodulateError),
    Forward(ForwardError),
    Invert(InvertError),
    Stats(StatsError),
    /// Sample and reference sequences demodulate to different shapes.
    SequenceMismatch {
        sample: (usize, usize),
        reference: (usize, usize),
    },
    /// A prebuilt table was generated under a different configuration.
    TableMismatch,
}

impl std::fmt::Display for ProcessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Demodulate(e) => write!(f, "demodulation failed: {}", e),
            Self::Forward(e) => write!(f, "forward model failed: {}", e),
            Self::Invert(e) => write!(f, "inversion failed: {}", e),
            Self::Stats(e) => write!(f, "aggregation failed: {}", e),
            Self::SequenceMismatch { sample, reference } => write!(
                f,
                "sample maps are {}x{} but reference maps are {}x{}",
                sample.0, sample.1, reference.0, reference.1
            ),
            Self::TableMismatch => {
                write!(f, "lookup table was built for a different configuration")
            }
        }
    }
}

impl std::error::Error for ProcessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Demodulate(e) => Some(e),
            Self::Forward(e) => Some(e),
            Self::Invert(e) => Some(e),
            Self::Stats(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DemodulateError> for ProcessError {
    fn from(e: DemodulateError) -> Self {
        Self::Demodulate(e)
    }
}

impl From<ForwardError> for ProcessError {
    fn from(e: ForwardError) -> Self {
        Self::Forward(e)
    }
}

impl From<InvertError> for ProcessError {
    fn from(e: InvertError) -> Self {
        Self::Invert(e)
    }
}

impl From<StatsError> for ProcessError {
    fn from(e: StatsError) -> Self {
        Self::Stats(e)
    }
}

// ── Configuration ──────────────────────────────────────────────────────────

/// A homogeneous medium's optical properties.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpticalProperties {
    /// Absorption coefficient.
    pub mu_a: f64,
    /// Reduced scattering coefficient.
    pub mu_sp: f64,
}

/// Full pipeline configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// Refractive index of the measured medium, used for calibration.
    pub refr_index: f64,
    /// Known optical properties of the reference standard.
    pub reference: OpticalProperties,
    /// Refractive index the lookup grid is generated at.
    pub table_refr_index: f64,
    /// Absorption sampling of the lookup grid.
    pub mu_a_range: GridRange,
    /// Reduced-scattering sampling of the lookup grid.
    pub mu_sp_range: GridRange,
    /// Spatial-frequency pair of the acquisition.
    pub freq: FrequencyPair,
    /// Width of the pre-inversion Gaussian smoother; `<= 0` disables it.
    pub gaussian_sigma: f64,
    /// Interpolation method of the per-pixel inversion.
    pub interp_method: InterpMethod,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            refr_index: 1.43,
            reference: OpticalProperties {
                mu_a: 0.01,
                mu_sp: 1.0,
            },
            table_refr_index: 1.43,
            mu_a_range: GridRange::new(0.0, 0.5, 0.001),
            mu_sp_range: GridRange::new(0.1, 5.0, 0.01),
            freq: FrequencyPair::new(0.0, 0.2),
            gaussian_sigma: 3.0,
            interp_method: InterpMethod::Cubic,
        }
    }
}

// ── Output ─────────────────────────────────────────────────────────────────

/// Aggregate statistics of one processed frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub absorption: f64,
    pub absorption_std_dev: f64,
    pub scattering: f64,
    pub scattering_std_dev: f64,
}

/// Per-pixel maps plus their summary.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub summary: ResultSummary,
    pub maps: PropertyMap,
}

// ── Processor ──────────────────────────────────────────────────────────────

/// The assembled pipeline: configuration, lookup table and its inverter.
pub struct Processor {
    config: ProcessConfig,
    table: LookupTable,
    inverter: Inverter,
}

impl Processor {
    /// Build the lookup table and its interpolator for `config`.
    pub fn new(config: ProcessConfig) -> Result<Self, ProcessError> {
        let table = LookupTable::build(
            config.mu_a_range,
            config.mu_sp_range,
            config.table_refr_index,
            config.freq,
        )?;
        Self::with_table(config, table)
    }

    /// Reuse a prebuilt (e.g. cached) table, after checking it was
    /// generated under this configuration.
    pub fn with_table(config: ProcessConfig, table: LookupTable) -> Result<Self, ProcessError> {
        let expected = DiffusionModel::new(config.table_refr_index, config.freq);
        if *table.model() != expected {
            return Err(ProcessError::TableMismatch);
        }
        let inverter = Inverter::new(&table)?;
        Ok(Self {
            config,
            table,
            inverter,
        })
    }

    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }

    pub fn table(&self) -> &LookupTable {
        &self.table
    }

    /// Run the full pipeline on one sample/reference sequence pair.
    pub fn process(
        &self,
        sample: &[DMatrix<f64>],
        reference: &[DMatrix<f64>],
    ) -> Result<ProcessOutput, ProcessError> {
        let s = demodulate(sample)?;
        let r = demodulate(reference)?;
        if s.ac.shape() != r.ac.shape() {
            return Err(ProcessError::SequenceMismatch {
                sample: s.ac.shape(),
                reference: r.ac.shape(),
            });
        }

        let sigma = self.config.gaussian_sigma;
        let s_ac = gaussian_smooth(&s.ac, sigma);
        let s_dc = gaussian_smooth(&s.dc, sigma);
        let r_ac = gaussian_smooth(&r.ac, sigma);
        let r_dc = gaussian_smooth(&r.dc, sigma);

        // Calibration: the reference standard's measured maps carry the
        // system response; ratioing against them and scaling by the model
        // prediction for the known standard yields absolute reflectance.
        let model = DiffusionModel::new(self.config.refr_index, self.config.freq);
        let predicted = model.reflectance(self.config.reference.mu_a, self.config.reference.mu_sp)?;
        let meas_ac = s_ac.zip_map(&r_ac, |s, r| s / r * predicted.ac);
        let meas_dc = s_dc.zip_map(&r_dc, |s, r| s / r * predicted.dc);

        let maps = self
            .inverter
            .invert(&meas_ac, &meas_dc, self.config.interp_method)?;
        let absorption = summarize(&maps.mu_a)?;
        let scattering = summarize(&maps.mu_sp)?;

        Ok(ProcessOutput {
            summary: ResultSummary {
                absorption: absorption.mean,
                absorption_std_dev: absorption.std_dev,
                scattering: scattering.mean,
                scattering_std_dev: scattering.std_dev,
            },
            maps,
        })
    }
}
