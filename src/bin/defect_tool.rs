use clap::{Parser, Subcommand};
use defect_scan::capture::{
    CaptureController, CaptureEvent, CaptureOptions, DirectorySource, LatestResult, LogIndicator, VerdictIndicator,
};
use defect_scan::pipeline::inspect_with_views;
use defect_scan::tools::{collect_images, load_image, save_views};
use defect_scan::{InspectError, InspectionConfig, InspectionResult, InspectionSession, SharedConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "defect_tool", version, about = "Region-based defect inspection tools")]
struct Cli {
    /// JSON configuration file (defaults, then DEFECT_* variables, otherwise)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override one tunable, e.g. `--set dark_threshold=60` (repeatable)
    #[arg(long = "set", global = true, value_name = "KEY=VALUE")]
    overrides: Vec<String>,
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Inspect a single image
    Check {
        #[arg(long)]
        image: PathBuf,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
        /// Save annotated views into this directory
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Inspect every image of a directory as one session
    Session {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long)]
        limit: Option<usize>,
        /// Save each image's views into <out>/<index>/
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replay a directory as a camera feed for a while
    Watch {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long, default_value_t = 10)]
        seconds: u64,
        #[arg(long, default_value_t = 10)]
        analyze_every: u64,
    },
    /// Print the effective configuration, or write it to a file
    Config {
        #[arg(long)]
        write: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let outcome = load_config(cli.config.as_deref(), &cli.overrides).and_then(|config| match cli.command {
        Command::Check { image, json, out } => check_cmd(&image, &config, json, out.as_deref()),
        Command::Session { dir, limit, out } => session_cmd(&dir, config, limit, out.as_deref()),
        Command::Watch {
            dir,
            seconds,
            analyze_every,
        } => watch_cmd(&dir, config, seconds, analyze_every),
        Command::Config { write } => config_cmd(&config, write.as_deref()),
    });

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            error!(error = %err, "command failed");
            eprintln!("{}", err.user_message());
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).with_target(false).init();
}

fn load_config(path: Option<&Path>, overrides: &[String]) -> Result<InspectionConfig, InspectError> {
    let mut config = match path {
        Some(path) => InspectionConfig::from_json_file(path)?,
        None => InspectionConfig::from_env(),
    };
    for item in overrides {
        let (key, value) = item.split_once('=').ok_or_else(|| InspectError::InvalidParameter {
            parameter: item.clone(),
            value: String::new(),
        })?;
        config.set_param(key.trim(), value)?;
    }
    Ok(config)
}

fn print_result(result: &InspectionResult) {
    for region in &result.per_region {
        let kinds: Vec<&str> = region.defect_kinds.iter().map(|k| k.label()).collect();
        println!(
            "  {:<6} {:<4} {:>6.2}%  {}",
            region.region_name.as_str(),
            if region.is_ok { "OK" } else { "FAIL" },
            region.defect_percentage,
            kinds.join(", ")
        );
    }
    println!("Overall: {}", if result.overall_is_ok { "OK" } else { "DEFECTIVE" });
}

fn check_cmd(image: &Path, config: &InspectionConfig, json: bool, out: Option<&Path>) -> Result<bool, InspectError> {
    let img = load_image(image)?;
    let inspection = inspect_with_views(&img, config);

    if json {
        println!("{}", serde_json::to_string_pretty(&inspection.result)?);
    } else {
        println!("Image: {} ({}x{})", image.display(), img.width(), img.height());
        print_result(&inspection.result);
    }

    if let Some(dir) = out {
        let written = save_views(&inspection.views, dir)?;
        info!(count = written.len(), dir = %dir.display(), "views written");
    }
    Ok(inspection.result.overall_is_ok)
}

fn session_cmd(
    dir: &Path,
    config: InspectionConfig,
    limit: Option<usize>,
    out: Option<&Path>,
) -> Result<bool, InspectError> {
    let mut images = collect_images(dir);
    if let Some(limit) = limit {
        images.truncate(limit);
    }
    if images.is_empty() {
        return Err(InspectError::device(format!("no images in {}", dir.display())));
    }

    let mut session = InspectionSession::new(SharedConfig::new(config));
    for path in &images {
        let (is_ok, views) = match session.inspect_path(path) {
            Ok(inspection) => (
                inspection.result.overall_is_ok,
                out.map(|_| inspection.views.clone()),
            ),
            Err(err) if err.is_recoverable() => {
                eprintln!("{}", err.user_message());
                continue;
            }
            Err(err) => return Err(err),
        };
        let index = session.state().current_index;
        println!("[{}] {} {}", index, path.display(), if is_ok { "OK" } else { "DEFECTIVE" });
        if let (Some(out), Some(views)) = (out, views) {
            save_views(&views, out.join(index.to_string()))?;
        }
    }

    let state = session.state();
    println!(
        "Session: {} images, all components {}",
        state.current_index,
        if state.all_components_ok { "OK" } else { "NOT OK" }
    );
    Ok(state.all_components_ok)
}

fn watch_cmd(dir: &Path, config: InspectionConfig, seconds: u64, analyze_every: u64) -> Result<bool, InspectError> {
    let options = CaptureOptions {
        analyze_every,
        ..CaptureOptions::default()
    };
    let mut controller = CaptureController::new(SharedConfig::new(config), options);
    let events = controller.start(Box::new(DirectorySource::new(dir)))?;

    let mut latest: LatestResult<InspectionResult> = LatestResult::new();
    let mut indicator = LogIndicator::default();
    let deadline = Instant::now() + Duration::from_secs(seconds);

    while Instant::now() < deadline {
        let Ok(event) = events.recv_timeout(Duration::from_millis(100)) else {
            continue;
        };
        match event {
            CaptureEvent::Analyzed { generation, inspection } => {
                let is_ok = inspection.result.overall_is_ok;
                if latest.offer(generation, inspection.result) {
                    indicator.show(is_ok);
                    println!("frame {}: {}", generation, if is_ok { "OK" } else { "DEFECTIVE" });
                }
            }
            CaptureEvent::SourceError { error, .. } => eprintln!("{}", error.user_message()),
            CaptureEvent::Preview { .. } => {}
        }
    }

    controller.stop();
    indicator.clear();
    Ok(latest.get().is_none_or(|r| r.overall_is_ok))
}

fn config_cmd(config: &InspectionConfig, write: Option<&Path>) -> Result<bool, InspectError> {
    match write {
        Some(path) => {
            config.to_json_file(path)?;
            println!("Wrote {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(config)?),
    }
    Ok(true)
}
