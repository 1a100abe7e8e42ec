use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;

use streammark::streammark::datagen::{generate_events, write_events_csv, DatagenConfig};
use streammark::streammark::sweep::input_stem;
use streammark::{
    ExperimentConfig, PipelineError, PipelineResult, PipelineRunner, SweepConfig, SweepHarness,
    WindowDiscipline,
};

#[derive(Parser)]
#[command(name = "streammark")]
#[command(about = "Evaluate event-time watermark strategies over keyed tumbling windows")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full configuration sweep, skipping completed grid points
    Sweep {
        /// Input CSV file, one `key,timestamp,value` event per line
        #[arg(long)]
        input: PathBuf,

        /// Directory receiving one result file per configuration
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Override the adaptive sensitivity axis
        #[arg(long, value_delimiter = ',')]
        sensitivities: Option<Vec<f64>>,

        /// Override the adaptive sensitivity change rate axis
        #[arg(long, value_delimiter = ',')]
        sensitivity_change_rates: Option<Vec<f64>>,

        /// Override the adaptive out-of-order threshold axis
        #[arg(long, value_delimiter = ',')]
        ooo_thresholds: Option<Vec<f64>>,

        /// Override the window width axis (milliseconds)
        #[arg(long, value_delimiter = ',')]
        window_widths: Option<Vec<i64>>,

        /// Override the periodic advancement interval axis (milliseconds)
        #[arg(long, value_delimiter = ',')]
        periods: Option<Vec<i64>>,

        /// Override the periodic allowed lateness axis (milliseconds)
        #[arg(long, value_delimiter = ',')]
        lateness: Option<Vec<i64>>,

        /// Allowed lateness seed used by every adaptive run (milliseconds)
        #[arg(long)]
        adaptive_lateness: Option<i64>,
    },
    /// Run a single experiment and print its summary
    Run {
        /// Input CSV file, one `key,timestamp,value` event per line
        #[arg(long)]
        input: PathBuf,

        /// Watermark strategy: periodic or adaptive
        #[arg(long, default_value = "periodic")]
        strategy: String,

        /// Window width in milliseconds of event time
        #[arg(long, default_value = "1000")]
        window_width: i64,

        /// Lateness budget in milliseconds
        #[arg(long, default_value = "100")]
        allowed_lateness: i64,

        /// Periodic advancement interval in milliseconds
        #[arg(long, default_value = "10")]
        period: i64,

        /// Adaptive out-of-order threshold
        #[arg(long, default_value = "1")]
        ooo_threshold: f64,

        /// Adaptive sensitivity
        #[arg(long, default_value = "1")]
        sensitivity: f64,

        /// Adaptive sensitivity change rate
        #[arg(long, default_value = "1")]
        sensitivity_change_rate: f64,

        /// Directory receiving the result file
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Use the count-triggered diagnostic discipline with this batch size
        #[arg(long)]
        count_window: Option<u64>,
    },
    /// Generate a synthetic out-of-order input file
    Gen {
        /// Output CSV path
        #[arg(long)]
        output: PathBuf,

        /// Number of events
        #[arg(long, default_value = "100000")]
        events: usize,

        /// Key cardinality
        #[arg(long, default_value = "4")]
        keys: usize,

        /// Timeline advance per event (milliseconds)
        #[arg(long, default_value = "10")]
        interval_ms: i64,

        /// Maximum backward timestamp jitter (milliseconds)
        #[arg(long, default_value = "250")]
        disorder_ms: i64,

        /// RNG seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

#[tokio::main]
async fn main() -> PipelineResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sweep {
            input,
            output_dir,
            sensitivities,
            sensitivity_change_rates,
            ooo_thresholds,
            window_widths,
            periods,
            lateness,
            adaptive_lateness,
        } => {
            let mut config = SweepConfig::new(input, output_dir);
            if let Some(v) = sensitivities {
                config.sensitivities = v;
            }
            if let Some(v) = sensitivity_change_rates {
                config.sensitivity_change_rates = v;
            }
            if let Some(v) = ooo_thresholds {
                config.ooo_thresholds = v;
            }
            if let Some(v) = window_widths {
                config.window_widths_ms = v;
            }
            if let Some(v) = periods {
                config.periods_ms = v;
            }
            if let Some(v) = lateness {
                config.periodic_lateness_ms = v;
            }
            if let Some(v) = adaptive_lateness {
                config.adaptive_lateness_ms = v;
            }

            let report = SweepHarness::new(config).run().await?;
            println!("{}", to_pretty(&report));
        }
        Commands::Run {
            input,
            strategy,
            window_width,
            allowed_lateness,
            period,
            ooo_threshold,
            sensitivity,
            sensitivity_change_rate,
            output_dir,
            count_window,
        } => {
            let config = match strategy.as_str() {
                "periodic" => ExperimentConfig::periodic(window_width, allowed_lateness, period),
                "adaptive" => ExperimentConfig::adaptive(
                    window_width,
                    allowed_lateness,
                    ooo_threshold,
                    sensitivity,
                    sensitivity_change_rate,
                ),
                other => {
                    return Err(PipelineError::Config(format!(
                        "unknown strategy '{}', expected 'periodic' or 'adaptive'",
                        other
                    )))
                }
            };

            tokio::fs::create_dir_all(&output_dir).await.map_err(|e| {
                PipelineError::sink(
                    output_dir.display().to_string(),
                    format!("cannot create output directory: {}", e),
                )
            })?;
            let output_path = output_dir.join(config.output_file_name(input_stem(&input)));

            let mut runner = PipelineRunner::new(config)?;
            if let Some(trigger) = count_window {
                runner = runner.with_discipline(WindowDiscipline::GlobalCount { trigger });
            }

            info!("Writing results to {}", output_path.display());
            let summary = runner.execute_file(&input, &output_path).await?;
            println!("{}", to_pretty(&summary));
        }
        Commands::Gen {
            output,
            events,
            keys,
            interval_ms,
            disorder_ms,
            seed,
        } => {
            let config = DatagenConfig {
                events,
                keys,
                interval_ms,
                disorder_ms,
                seed,
            };
            let generated = generate_events(&config);
            write_events_csv(&output, &generated).await?;
            info!("Wrote {} events to {}", generated.len(), output.display());
        }
    }

    Ok(())
}

fn to_pretty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
}
