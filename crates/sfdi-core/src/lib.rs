//! Spatial frequency domain imaging: optical-property recovery from
//! phase-stepped fringe image sequences.
//!
//! The pipeline runs in stages:
//!
//! 1. [`capture`] — display patterns and pull frames through hardware seams.
//! 2. [`demodulate`] — N-step phase-shifting demodulation into AC/DC maps.
//! 3. [`smooth`] — Gaussian pre-filtering of the reflectance maps.
//! 4. [`forward`] / [`table`] — diffusion-approximation model and its dense
//!    sampling over a (mu_a, mu_sp) grid.
//! 5. [`invert`] — per-pixel scattered-data interpolation back to optical
//!    properties, NaN outside the table's reflectance domain.
//! 6. [`stats`] — NaN-aware aggregation of the recovered maps.
//!
//! [`processor`] assembles the stages behind one configuration struct;
//! [`fringes`] generates the projector patterns; [`interp`] holds the
//! triangulation-based interpolation the inverter runs on.

pub mod capture;
pub mod demodulate;
pub mod forward;
pub mod fringes;
pub mod interp;
pub mod invert;
pub mod processor;
pub mod smooth;
pub mod stats;
pub mod table;

#[cfg(test)]
pub(crate) mod test_utils;

pub use demodulate::{demodulate, Demodulated};
pub use forward::{DiffusionModel, FrequencyPair, ReflectancePair};
pub use interp::InterpMethod;
pub use invert::{Inverter, PropertyMap};
pub use processor::{
    OpticalProperties, ProcessConfig, ProcessError, ProcessOutput, Processor, ResultSummary,
};
pub use smooth::gaussian_smooth;
pub use stats::{summarize, Summary};
pub use table::{GridRange, LookupTable};
