//! Command-line front end.

use std::{path::PathBuf, time::Instant};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, ValueEnum};
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    ArtifactKind, ArtifactLayout, PredictError, PredictionResult, Predictor, WeatherReading,
    model::DEFAULT_ARTIFACTS_DIR,
};

/// Documented input ranges. Readings outside them are scored anyway.
const DOCUMENTED_RANGES: [(&str, f64, f64); 10] = [
    ("pressure", 995.0, 1040.0),
    ("maxtemp", 5.0, 40.0),
    ("temparature", 4.0, 35.0),
    ("mintemp", 2.0, 32.0),
    ("dewpoint", -2.0, 28.0),
    ("humidity", 30.0, 100.0),
    ("cloud", 0.0, 100.0),
    ("sunshine", 0.0, 13.0),
    ("winddirection", 0.0, 360.0),
    ("windspeed", 0.0, 70.0),
];

/// Batches larger than this get a progress bar.
const PROGRESS_THRESHOLD: usize = 10;

#[derive(Parser, Debug)]
#[command(name = "will-it-rain", version)]
#[command(about = "Predict rainfall from today's weather readings", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub artifacts: ArtifactArgs,

    #[command(flatten)]
    pub measurements: ReadingArgs,

    /// Read the reading from a JSON object instead of the flags
    #[arg(long = "reading", value_name = "PATH", conflicts_with = "batch_json")]
    pub reading_json: Option<PathBuf>,

    /// Batch process readings from a JSON array
    #[arg(long, value_name = "PATH")]
    pub batch_json: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "human")]
    pub format: OutputFormat,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Verbose mode (input summary, model metadata, debug logs). `RUST_LOG` overrides the log level
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,
}

/// Where the artifact bundle lives.
#[derive(Args, Debug, Clone)]
pub struct ArtifactArgs {
    /// Directory holding the artifact bundle
    #[arg(long, env = "MODEL_ARTIFACTS_DIR", default_value = DEFAULT_ARTIFACTS_DIR, value_name = "DIR")]
    pub model_dir: PathBuf,

    /// Artifact version; reads from `<model-dir>/<version>/`
    #[arg(long, env = "MODEL_VERSION", value_name = "VERSION")]
    pub model_version: Option<String>,

    /// Classifier file name (`.json`, `.bin` or `.onnx`)
    #[arg(long, value_name = "FILE")]
    pub classifier_file: Option<String>,

    /// Scaler file name
    #[arg(long, value_name = "FILE")]
    pub scaler_file: Option<String>,

    /// Label decoder file name
    #[arg(long, value_name = "FILE")]
    pub labels_file: Option<String>,

    /// Feature order file name
    #[arg(long, value_name = "FILE")]
    pub features_file: Option<String>,
}

impl ArtifactArgs {
    pub fn layout(&self) -> ArtifactLayout {
        let mut layout = ArtifactLayout::new(&self.model_dir);
        if let Some(version) = &self.model_version {
            layout = layout.with_version(version);
        }
        let overrides = [
            (ArtifactKind::Classifier, &self.classifier_file),
            (ArtifactKind::Scaler, &self.scaler_file),
            (ArtifactKind::LabelDecoder, &self.labels_file),
            (ArtifactKind::FeatureOrder, &self.features_file),
        ];
        for (kind, file_name) in overrides {
            if let Some(file_name) = file_name {
                layout = layout.with_file_name(kind, file_name);
            }
        }
        layout
    }
}

/// One flag per weather measurement, defaulting to a mild, partly cloudy day.
#[derive(Args, Debug, Clone)]
pub struct ReadingArgs {
    /// Atmospheric pressure in hPa (995-1040)
    #[arg(long, default_value_t = 1015.0)]
    pub pressure: f64,

    /// Maximum temperature in °C (5-40)
    #[arg(long, default_value_t = 22.0, allow_negative_numbers = true)]
    pub maxtemp: f64,

    /// Average temperature in °C (4-35)
    #[arg(long, default_value_t = 18.0, allow_negative_numbers = true)]
    pub temparature: f64,

    /// Minimum temperature in °C (2-32)
    #[arg(long, default_value_t = 15.0, allow_negative_numbers = true)]
    pub mintemp: f64,

    /// Dew point in °C (-2-28)
    #[arg(long, default_value_t = 12.0, allow_negative_numbers = true)]
    pub dewpoint: f64,

    /// Relative humidity in % (30-100)
    #[arg(long, default_value_t = 70)]
    pub humidity: u8,

    /// Cloud cover in % (0-100)
    #[arg(long, default_value_t = 50)]
    pub cloud: u8,

    /// Hours of sunshine (0-13)
    #[arg(long, default_value_t = 5.0)]
    pub sunshine: f64,

    /// Wind direction in degrees (0-360)
    #[arg(long, default_value_t = 180)]
    pub winddirection: u16,

    /// Wind speed in km/h (0-70)
    #[arg(long, default_value_t = 20.0)]
    pub windspeed: f64,
}

impl ReadingArgs {
    pub fn to_reading(&self) -> WeatherReading {
        WeatherReading::new()
            .with("pressure", self.pressure)
            .with("maxtemp", self.maxtemp)
            .with("temparature", self.temparature)
            .with("mintemp", self.mintemp)
            .with("dewpoint", self.dewpoint)
            .with("humidity", f64::from(self.humidity))
            .with("cloud", f64::from(self.cloud))
            .with("sunshine", self.sunshine)
            .with("winddirection", f64::from(self.winddirection))
            .with("windspeed", self.windspeed)
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Output just the label (`rain` or `no_rain`)
    Label,
    /// Output the confidence in percent
    Confidence,
    /// Output as JSON
    Json,
    /// Human-readable output with confidence (default)
    Human,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

enum InputSource {
    Single(WeatherReading),
    Batch(Vec<WeatherReading>),
}

impl Cli {
    fn verbosity(&self) -> Verbosity {
        match (self.quiet, self.verbose) {
            (true, _) => Verbosity::Quiet,
            (_, true) => Verbosity::Verbose,
            _ => Verbosity::Normal,
        }
    }
}

pub fn run(cli: &Cli) -> Result<()> {
    let verbosity = cli.verbosity();
    init_tracing(verbosity);

    let layout = cli.artifacts.layout();
    let predictor = Predictor::load(&layout).with_context(|| {
        format!("Failed to load model artifacts from {}", layout.dir().display())
    })?;

    if verbosity == Verbosity::Verbose {
        match predictor.bundle().metadata() {
            Some(metadata) => eprintln!("Model: {metadata}"),
            None => eprintln!("Model: {} (no metadata)", layout.dir().display()),
        }
    }

    match determine_input_source(cli)? {
        InputSource::Single(reading) => {
            let result = process_single(&predictor, &reading, verbosity)?;
            output_result(&result, cli.format)?;
        }
        InputSource::Batch(readings) => {
            let results = process_batch(&predictor, &readings, cli.format, verbosity)?;
            output_batch_results(&results, cli.format)?;
        }
    }

    Ok(())
}

fn init_tracing(verbosity: Verbosity) {
    let default_level = match verbosity {
        Verbosity::Quiet => "error",
        Verbosity::Normal => "warn",
        Verbosity::Verbose => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Already installed when `run` is called more than once in a process.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Priority: batch JSON > reading JSON > flags.
fn determine_input_source(cli: &Cli) -> Result<InputSource> {
    if let Some(path) = &cli.batch_json {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read JSON batch file: {}", path.display()))?;
        let readings: Vec<WeatherReading> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse JSON array of readings in {}", path.display()))?;
        return Ok(InputSource::Batch(readings));
    }

    if let Some(path) = &cli.reading_json {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read reading file: {}", path.display()))?;
        let reading: WeatherReading = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse JSON reading in {}", path.display()))?;
        return Ok(InputSource::Single(reading));
    }

    Ok(InputSource::Single(cli.measurements.to_reading()))
}

/// Measurements outside their documented range, in documented order.
fn out_of_range(reading: &WeatherReading) -> Vec<(&'static str, f64)> {
    DOCUMENTED_RANGES
        .iter()
        .filter_map(|&(name, min, max)| {
            reading
                .get(name)
                .filter(|value| !(min..=max).contains(value))
                .map(|value| (name, value))
        })
        .collect()
}

fn warn_out_of_range(reading: &WeatherReading) {
    for (name, value) in out_of_range(reading) {
        warn!(feature = name, value, "Value is outside the documented range; scoring anyway");
    }
}

fn process_single(
    predictor: &Predictor,
    reading: &WeatherReading,
    verbosity: Verbosity,
) -> Result<PredictionResult> {
    warn_out_of_range(reading);

    if verbosity == Verbosity::Verbose {
        eprintln!("Input:");
        for name in predictor.bundle().feature_order().iter() {
            match reading.get(name) {
                Some(value) => eprintln!("  {name}: {value}"),
                None => eprintln!("  {name}: <missing>"),
            }
        }
    }

    let start = (verbosity == Verbosity::Verbose).then(Instant::now);
    let result = predictor.predict(reading).context("Prediction failed")?;
    if let Some(start_time) = start {
        eprintln!("Inference time: {:?}", start_time.elapsed());
    }

    Ok(result)
}

fn process_batch(
    predictor: &Predictor,
    readings: &[WeatherReading],
    format: OutputFormat,
    verbosity: Verbosity,
) -> Result<Vec<PredictionResult>> {
    readings.iter().for_each(warn_out_of_range);

    let show_progress = verbosity != Verbosity::Quiet
        && readings.len() > PROGRESS_THRESHOLD
        && format != OutputFormat::Json;

    let results: Vec<Result<PredictionResult, PredictError>> = if show_progress {
        let pb = progress_bar_setup(readings.len())?;
        let results = readings
            .par_iter()
            .progress_with(pb.clone())
            .map(|reading| predictor.predict(reading))
            .collect();
        pb.finish_with_message("Scoring complete");
        results
    } else {
        predictor.predict_batch(readings)
    };

    let mut predictions = Vec::with_capacity(results.len());
    let mut failures = 0;
    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(prediction) => predictions.push(prediction),
            Err(err) => {
                error!(index, error = %err, "Reading rejected");
                failures += 1;
            }
        }
    }
    if failures > 0 {
        bail!("{failures} of {} readings could not be scored", readings.len());
    }

    Ok(predictions)
}

fn progress_bar_setup(len: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );
    pb.set_message("Scoring readings");
    Ok(pb)
}

fn output_result(result: &PredictionResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Label => println!("{}", result.label()),
        OutputFormat::Confidence => println!("{:.2}", result.confidence_percent()),
        OutputFormat::Json => println!("{}", serde_json::to_string(result)?),
        OutputFormat::Human => {
            if result.is_rain() {
                println!("RAINFALL EXPECTED");
            } else {
                println!("NO RAINFALL EXPECTED");
            }
            println!("Confidence: {:.2}%", result.confidence_percent());
        }
    }
    Ok(())
}

fn output_batch_results(results: &[PredictionResult], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(results)?),
        _ => {
            for result in results {
                output_result(result, format)?;
            }
        }
    }
    Ok(())
}
