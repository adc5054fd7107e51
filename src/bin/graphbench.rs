use std::{path::PathBuf, process, time::Duration};

use chrono::Utc;
use clap::{ArgAction, Parser, ValueEnum};
use tracing::{Level, error, info};

use graphbench::{
    BenchmarkCase, GraphBenchError, MixedLoadBenchCase, PerformanceHistoryRepository,
    RegressionDetector, RunConfig, RunResult, TraversalQueriesCase, VersionFilter, logging,
    run_cases,
};

/// Exit code for I/O and configuration failures; 1 is reserved for regressions.
const EXIT_FATAL: i32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum CaseChoice {
    MixedLoad,
    Traversal,
}

#[derive(Parser, Debug)]
#[command(name = "graphbench")]
#[command(about = "Runs the store benchmarks and checks them against past runs")]
struct Args {
    #[arg(long, env = "GRAPHBENCH_TIME_TO_RUN", default_value_t = 60, help = "Mixed load duration in minutes")]
    time_to_run: u64,

    #[arg(long, env = "GRAPHBENCH_DURATION_SECS", hide = true)]
    duration_secs: Option<f64>,

    #[arg(long, env = "GRAPHBENCH_THRESHOLD", default_value_t = 0.1, help = "Allowed degradation as a fraction")]
    threshold: f64,

    #[arg(long, env = "GRAPHBENCH_TESTED_VERSION", default_value = "N/A")]
    tested_version: String,

    #[arg(long, env = "GRAPHBENCH_BUILD_REF", default_value = "Unknown build url")]
    build_ref: String,

    #[arg(long, env = "GRAPHBENCH_HISTORY_DIR", default_value = "ops-per-second")]
    history_dir: PathBuf,

    #[arg(
        long,
        env = "GRAPHBENCH_GA_ONLY",
        default_value_t = true,
        action = ArgAction::Set,
        help = "Compare only against stable releases"
    )]
    ga_only: bool,

    #[arg(long, env = "GRAPHBENCH_STORE_DIR", help = "Where benchmark stores are created")]
    store_dir: Option<PathBuf>,

    #[arg(long, env = "GRAPHBENCH_EXPORT_HISTORY", help = "Write the whole history as one JSON array")]
    export_history: Option<PathBuf>,

    #[arg(long, env = "GRAPHBENCH_CASES", value_enum, value_delimiter = ',', default_values_t = [CaseChoice::MixedLoad, CaseChoice::Traversal])]
    cases: Vec<CaseChoice>,

    #[arg(long, env = "GRAPHBENCH_WARMUP_ENTITIES")]
    warmup_entities: Option<usize>,

    #[arg(long, env = "GRAPHBENCH_WARMUP_PROPERTIES")]
    warmup_properties: Option<usize>,

    #[arg(long, env = "GRAPHBENCH_TRAVERSAL_ENTITIES")]
    traversal_entities: Option<usize>,

    #[arg(long, env = "GRAPHBENCH_TRAVERSAL_REPETITIONS")]
    traversal_repetitions: Option<usize>,

    #[arg(long, short, help = "Debug logging")]
    verbose: bool,
}

impl Args {
    fn run_config(&self) -> RunConfig {
        let mut config = RunConfig {
            threshold: self.threshold,
            tested_version: self.tested_version.clone(),
            build_ref: self.build_ref.clone(),
            history_dir: self.history_dir.clone(),
            ga_only: self.ga_only,
            store_dir: self.store_dir.clone(),
            export_history: self.export_history.clone(),
            ..RunConfig::default()
        };
        config.mixed_load.total_duration = match self.duration_secs {
            Some(secs) => Duration::from_secs_f64(secs.max(0.0)),
            None => Duration::from_secs(self.time_to_run * 60),
        };
        if let Some(n) = self.warmup_entities {
            config.mixed_load.warmup_entities = n;
        }
        if let Some(n) = self.warmup_properties {
            config.mixed_load.warmup_properties = n;
        }
        if let Some(n) = self.traversal_entities {
            config.traversal.entities = n;
        }
        if let Some(n) = self.traversal_repetitions {
            config.traversal.repetitions = n;
        }
        config
    }
}

fn main() {
    let args = Args::parse();
    logging::init(if args.verbose { Level::DEBUG } else { Level::INFO });

    let config = args.run_config();
    match run(&config, &args.cases) {
        Ok(true) => process::exit(1),
        Ok(false) => {}
        Err(err) => {
            error!(%err, "benchmark run aborted");
            eprintln!("error: {err}");
            process::exit(EXIT_FATAL);
        }
    }
}

/// Returns whether a regression was detected.
fn run(config: &RunConfig, choices: &[CaseChoice]) -> Result<bool, GraphBenchError> {
    config.validate()?;
    let repository = PerformanceHistoryRepository::new(&config.history_dir);
    let history = repository.results()?;
    info!(runs = history.len(), location = %repository.location().display(), "history loaded");

    let mut cases: Vec<Box<dyn BenchmarkCase>> = Vec::new();
    for choice in choices {
        match choice {
            CaseChoice::MixedLoad => cases.push(Box::new(MixedLoadBenchCase::new(
                config.mixed_load.clone(),
                config.store_dir.clone(),
            ))),
            CaseChoice::Traversal => cases.push(Box::new(TraversalQueriesCase::new(
                config.traversal.clone(),
                config.store_dir.clone(),
            ))),
        }
    }

    let mut current = RunResult::new(&config.tested_version, Utc::now(), &config.build_ref);
    run_cases(&mut cases, &mut current)?;

    let saved = repository.save(&current)?;
    info!(path = %saved.display(), "run saved");
    if let Some(export) = &config.export_history {
        repository.export_history(export)?;
        info!(path = %export.display(), "history exported");
    }

    let filter = if config.ga_only {
        VersionFilter::GaOnly
    } else {
        VersionFilter::Any
    };
    let report = RegressionDetector::with_filter(config.threshold, filter)
        .detect_regression(&history, &current);
    if report.regression_detected() {
        print!("{report}");
        return Ok(true);
    }
    info!("{}", report.to_string().trim_end());
    Ok(false)
}
