//! sfdi CLI — command-line interface for optical-property recovery.

use clap::{Args, Parser, Subcommand, ValueEnum};
use nalgebra::DMatrix;
use std::path::{Path, PathBuf};

use sfdi_core::fringes;
use sfdi_core::processor::{OpticalProperties, ProcessConfig, Processor};
use sfdi_core::table::{GridRange, LookupTable};
use sfdi_core::{DiffusionModel, FrequencyPair, InterpMethod};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "sfdi")]
#[command(
    about = "Recover absorption and reduced scattering maps from spatial frequency domain imaging sequences"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Demodulate, calibrate and invert a sample/reference image pair.
    Process(CliProcessArgs),

    /// Render phase-stepped fringe patterns to PNG files.
    Fringes(CliFringesArgs),

    /// Build a forward-model lookup table and write it as JSON.
    Table(CliTableArgs),

    /// Print the model reflectance of one medium.
    Model {
        /// Absorption coefficient.
        #[arg(long)]
        mu_a: f64,

        /// Reduced scattering coefficient.
        #[arg(long)]
        mu_sp: f64,

        /// Refractive index of the medium.
        #[arg(long, default_value = "1.43")]
        refr_index: f64,

        #[command(flatten)]
        freq: CliFreqArgs,
    },
}

#[derive(Debug, Clone, Args)]
struct CliProcessArgs {
    /// Sample fringe images in phase order (at least 3).
    #[arg(long, num_args = 3.., required = true)]
    sample: Vec<PathBuf>,

    /// Reference-standard fringe images in phase order (at least 3).
    #[arg(long, num_args = 3.., required = true)]
    reference: Vec<PathBuf>,

    /// Path to write the summary JSON. Defaults to a timestamped name;
    /// with --runs > 1 the run index is appended either way.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Repeat the measurement this many times, one output file per run.
    #[arg(long, default_value = "1")]
    runs: usize,

    /// Refractive index of the measured medium.
    #[arg(long, default_value = "1.43")]
    refr_index: f64,

    /// Refractive index the lookup grid is generated at (tissue default),
    /// independent of --refr-index.
    #[arg(long, default_value = "1.43")]
    table_refr_index: f64,

    /// Known absorption of the reference standard.
    #[arg(long, default_value = "0.01")]
    ref_mu_a: f64,

    /// Known reduced scattering of the reference standard.
    #[arg(long, default_value = "1.0")]
    ref_mu_sp: f64,

    /// Gaussian smoothing width in pixels; 0 disables smoothing.
    #[arg(long, default_value = "3.0")]
    sigma: f64,

    /// Interpolation method of the per-pixel inversion.
    #[arg(long, value_enum, default_value_t = InterpMethodArg::Cubic)]
    method: InterpMethodArg,

    /// Reuse a lookup table previously written by `sfdi table`.
    #[arg(long)]
    table: Option<PathBuf>,

    #[command(flatten)]
    freq: CliFreqArgs,

    #[command(flatten)]
    grid: CliGridArgs,
}

#[derive(Debug, Clone, Args)]
struct CliFringesArgs {
    /// Directory to write the pattern PNGs into.
    #[arg(long)]
    out_dir: PathBuf,

    /// Spatial frequency in cycles per pixel.
    #[arg(long, default_value = "0.05")]
    freq: f64,

    /// Number of phase steps.
    #[arg(long, default_value = "3")]
    phases: usize,

    /// Modulation orientation in radians (0 modulates along x).
    #[arg(long, default_value = "0.0")]
    orientation: f64,

    /// Pattern width in pixels.
    #[arg(long, default_value = "1920")]
    width: usize,

    /// Pattern height in pixels.
    #[arg(long, default_value = "1080")]
    height: usize,

    /// Threshold the sinusoid into a two-level pattern.
    #[arg(long)]
    binary: bool,
}

#[derive(Debug, Clone, Args)]
struct CliTableArgs {
    /// Path to write the table (JSON).
    #[arg(long)]
    out: PathBuf,

    /// Refractive index the grid is generated at.
    #[arg(long, default_value = "1.43")]
    refr_index: f64,

    #[command(flatten)]
    freq: CliFreqArgs,

    #[command(flatten)]
    grid: CliGridArgs,
}

#[derive(Debug, Clone, Copy, Args)]
struct CliFreqArgs {
    /// Baseline spatial frequency (1/mm).
    #[arg(long, default_value = "0.0")]
    freq_dc: f64,

    /// Modulated spatial frequency (1/mm).
    #[arg(long, default_value = "0.2")]
    freq_ac: f64,
}

impl CliFreqArgs {
    fn to_core(self) -> FrequencyPair {
        FrequencyPair::new(self.freq_dc, self.freq_ac)
    }
}

#[derive(Debug, Clone, Copy, Args)]
struct CliGridArgs {
    /// Absorption grid start (1/mm).
    #[arg(long, default_value = "0.0")]
    mu_a_start: f64,

    /// Absorption grid stop, exclusive (1/mm).
    #[arg(long, default_value = "0.5")]
    mu_a_stop: f64,

    /// Absorption grid step (1/mm).
    #[arg(long, default_value = "0.001")]
    mu_a_step: f64,

    /// Scattering grid start (1/mm).
    #[arg(long, default_value = "0.1")]
    mu_sp_start: f64,

    /// Scattering grid stop, exclusive (1/mm).
    #[arg(long, default_value = "5.0")]
    mu_sp_stop: f64,

    /// Scattering grid step (1/mm).
    #[arg(long, default_value = "0.01")]
    mu_sp_step: f64,
}

impl CliGridArgs {
    fn mu_a_range(self) -> GridRange {
        GridRange::new(self.mu_a_start, self.mu_a_stop, self.mu_a_step)
    }

    fn mu_sp_range(self) -> GridRange {
        GridRange::new(self.mu_sp_start, self.mu_sp_stop, self.mu_sp_step)
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum InterpMethodArg {
    Cubic,
    Linear,
    Nearest,
}

impl InterpMethodArg {
    fn to_core(self) -> InterpMethod {
        match self {
            Self::Cubic => InterpMethod::Cubic,
            Self::Linear => InterpMethod::Linear,
            Self::Nearest => InterpMethod::Nearest,
        }
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Process(args) => run_process(&args),
        Commands::Fringes(args) => run_fringes(&args),
        Commands::Table(args) => run_table(&args),
        Commands::Model {
            mu_a,
            mu_sp,
            refr_index,
            freq,
        } => run_model(mu_a, mu_sp, refr_index, freq.to_core()),
    }
}

// ── shared helpers ─────────────────────────────────────────────────────

/// Load a grayscale image as a row-major intensity matrix.
fn load_gray(path: &Path) -> CliResult<DMatrix<f64>> {
    let img = image::open(path)
        .map_err(|e| -> CliError { format!("failed to open image {}: {}", path.display(), e).into() })?
        .to_luma8();
    let (w, h) = img.dimensions();
    Ok(DMatrix::from_fn(h as usize, w as usize, |r, c| {
        img.get_pixel(c as u32, r as u32)[0] as f64
    }))
}

fn load_sequence(paths: &[PathBuf]) -> CliResult<Vec<DMatrix<f64>>> {
    paths.iter().map(|p| load_gray(p)).collect()
}

/// Serialize with 4-space indentation.
fn to_json_pretty<T: serde::Serialize>(value: &T) -> CliResult<String> {
    let mut buf = Vec::new();
    let fmt = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, fmt);
    value.serialize(&mut ser)?;
    Ok(String::from_utf8(buf)?)
}

// ── process ────────────────────────────────────────────────────────────

fn run_process(args: &CliProcessArgs) -> CliResult<()> {
    let config = ProcessConfig {
        refr_index: args.refr_index,
        reference: OpticalProperties {
            mu_a: args.ref_mu_a,
            mu_sp: args.ref_mu_sp,
        },
        table_refr_index: args.table_refr_index,
        mu_a_range: args.grid.mu_a_range(),
        mu_sp_range: args.grid.mu_sp_range(),
        freq: args.freq.to_core(),
        gaussian_sigma: args.sigma,
        interp_method: args.method.to_core(),
    };

    tracing::info!("Loading {} sample images", args.sample.len());
    let sample = load_sequence(&args.sample)?;
    tracing::info!("Loading {} reference images", args.reference.len());
    let reference = load_sequence(&args.reference)?;

    let processor = match &args.table {
        Some(path) => {
            tracing::info!("Loading lookup table from {}", path.display());
            let table: LookupTable = serde_json::from_str(&std::fs::read_to_string(path)?)?;
            Processor::with_table(config, table)?
        }
        None => {
            tracing::info!(
                "Building lookup table ({} x {} grid)",
                config.mu_a_range.len(),
                config.mu_sp_range.len()
            );
            Processor::new(config)?
        }
    };

    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    for run in 0..args.runs.max(1) {
        let out = processor.process(&sample, &reference)?;
        tracing::info!(
            "Run {}: mu_a = {:.4} +/- {:.4}, mu_sp = {:.4} +/- {:.4} ({} valid pixels of {})",
            run,
            out.summary.absorption,
            out.summary.absorption_std_dev,
            out.summary.scattering,
            out.summary.scattering_std_dev,
            out.maps.mu_a.iter().filter(|v| !v.is_nan()).count(),
            out.maps.mu_a.len(),
        );

        let path = match &args.out {
            Some(p) if args.runs <= 1 => p.clone(),
            Some(p) => with_run_index(p, run),
            None => PathBuf::from(format!("sfdi_{}_run{}.json", stamp, run)),
        };
        std::fs::write(&path, to_json_pretty(&out.summary)?)?;
        tracing::info!("Summary written to {}", path.display());
    }

    Ok(())
}

/// `results.json` + run 2 -> `results_run2.json`.
fn with_run_index(path: &Path, run: usize) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("sfdi");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("json");
    path.with_file_name(format!("{}_run{}.{}", stem, run, ext))
}

// ── fringes ────────────────────────────────────────────────────────────

fn run_fringes(args: &CliFringesArgs) -> CliResult<()> {
    let patterns = if args.binary {
        fringes::binary_patterns(
            args.freq,
            args.phases,
            args.orientation,
            args.width,
            args.height,
        )
    } else {
        fringes::sinusoidal_patterns(
            args.freq,
            args.phases,
            args.orientation,
            args.width,
            args.height,
        )
    };

    std::fs::create_dir_all(&args.out_dir)?;
    for (i, p) in patterns.iter().enumerate() {
        let img = image::GrayImage::from_fn(args.width as u32, args.height as u32, |x, y| {
            let v = p[(y as usize, x as usize)];
            image::Luma([(v * 255.0).round().clamp(0.0, 255.0) as u8])
        });
        let path = args.out_dir.join(format!("fringe_{:02}.png", i));
        img.save(&path)
            .map_err(|e| -> CliError { format!("failed to write {}: {}", path.display(), e).into() })?;
        tracing::info!("Pattern written to {}", path.display());
    }

    Ok(())
}

// ── table ──────────────────────────────────────────────────────────────

fn run_table(args: &CliTableArgs) -> CliResult<()> {
    let mu_a = args.grid.mu_a_range();
    let mu_sp = args.grid.mu_sp_range();
    tracing::info!(
        "Building lookup table: {} x {} = {} points",
        mu_a.len(),
        mu_sp.len(),
        mu_a.len() * mu_sp.len()
    );

    let table = LookupTable::build(mu_a, mu_sp, args.refr_index, args.freq.to_core())?;

    let (mut ac_min, mut ac_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut dc_min, mut dc_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for p in table.points() {
        ac_min = ac_min.min(p.r_ac);
        ac_max = ac_max.max(p.r_ac);
        dc_min = dc_min.min(p.r_dc);
        dc_max = dc_max.max(p.r_dc);
    }
    tracing::info!("R_AC range: [{:.4}, {:.4}]", ac_min, ac_max);
    tracing::info!("R_DC range: [{:.4}, {:.4}]", dc_min, dc_max);

    std::fs::write(&args.out, to_json_pretty(&table)?)?;
    tracing::info!("Table written to {}", args.out.display());

    Ok(())
}

// ── model ──────────────────────────────────────────────────────────────

fn run_model(mu_a: f64, mu_sp: f64, refr_index: f64, freq: FrequencyPair) -> CliResult<()> {
    let model = DiffusionModel::new(refr_index, freq);
    let r = model.reflectance(mu_a, mu_sp)?;

    println!("Diffusion model reflectance");
    println!("  mu_a:        {}", mu_a);
    println!("  mu_sp:       {}", mu_sp);
    println!("  refr index:  {}", refr_index);
    println!("  frequencies: dc={} ac={}", freq.dc, freq.ac);
    println!("  R_eff:       {:.6}", model.effective_reflection());
    println!("  R_DC:        {:.6}", r.dc);
    println!("  R_AC:        {:.6}", r.ac);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_index_independent_of_medium_index() {
        // The lookup grid defaults to the tissue index even when the
        // measured medium's index is overridden.
        let cli = Cli::try_parse_from([
            "sfdi", "process", "--sample", "a.png", "b.png", "c.png", "--reference", "d.png",
            "e.png", "f.png", "--refr-index", "1.37",
        ])
        .expect("parseable");
        let Commands::Process(args) = cli.command else {
            panic!("expected process subcommand");
        };
        assert_eq!(args.refr_index, 1.37);
        assert_eq!(args.table_refr_index, 1.43);

        let cli = Cli::try_parse_from([
            "sfdi", "process", "--sample", "a.png", "b.png", "c.png", "--reference", "d.png",
            "e.png", "f.png", "--table-refr-index", "1.4",
        ])
        .expect("parseable");
        let Commands::Process(args) = cli.command else {
            panic!("expected process subcommand");
        };
        assert_eq!(args.table_refr_index, 1.4);
    }
}
