use al1_finder::audit::{Audit, AutoScalingGroupRow, InstanceRow};
use al1_finder::aws::AwsProvider;
use al1_finder::config::Config;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Find EC2 instances and Auto Scaling groups still running Amazon Linux 1
#[derive(Parser, Debug)]
#[command(name = "al1-finder", version, about, long_about = None)]
struct Args {
    /// AWS profile to use
    #[arg(short, long)]
    profile: Option<String>,

    /// Audit a single region instead of discovering all relevant ones
    #[arg(short, long)]
    region: Option<String>,

    /// Output format (defaults to the last used format)
    #[arg(short, long, value_enum)]
    output: Option<OutputFormat>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .expect("Failed to open log file");

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .init();

    tracing::info!("al1-finder started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("al1-finder").join("al1-finder.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".al1-finder").join("al1-finder.log");
    }
    PathBuf::from("al1-finder.log")
}

/// Per-region findings, for JSON output
#[derive(Serialize)]
struct RegionReport {
    region: String,
    instances: Vec<InstanceRow>,
    auto_scaling_groups: Vec<AutoScalingGroupRow>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    let mut config = Config::load();
    if let Some(profile) = &args.profile {
        if let Err(err) = config.set_profile(profile) {
            tracing::error!("Failed to save profile to config: {err:#}");
        }
    }
    if let Some(output) = args.output {
        if let Err(err) = config.set_output(output.as_str()) {
            tracing::error!("Failed to save output format to config: {err:#}");
        }
    }
    let profile = args
        .profile
        .clone()
        .or_else(|| config.effective_profile());
    let output = args.output.unwrap_or_else(|| {
        config
            .effective_output()
            .and_then(|s| OutputFormat::from_str(&s, true).ok())
            .unwrap_or(OutputFormat::Table)
    });

    let provider = AwsProvider::new(profile.as_deref()).await?;
    let audit = Audit::new(Arc::new(provider));

    let regions = match &args.region {
        Some(region) => vec![region.clone()],
        None => match audit.regions().await {
            Ok(regions) => regions,
            Err(err) => {
                tracing::error!("Region discovery failed: {err:#}");
                eprintln!("No data available: {err:#}");
                std::process::exit(1);
            }
        },
    };

    if regions.is_empty() {
        println!("No Amazon Linux 1 usage found in any accessible region.");
        return Ok(());
    }

    let mut reports = Vec::new();
    for region in &regions {
        reports.push(RegionReport {
            region: region.clone(),
            instances: audit.instance_rows(region).await?,
            auto_scaling_groups: audit.group_rows(region).await?,
        });
    }

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Table => {
            for report in &reports {
                print_region(report);
            }
        }
    }

    Ok(())
}

fn print_region(report: &RegionReport) {
    println!("Region: {}", report.region);

    if report.instances.is_empty() {
        println!("  No AL1 instances.");
    } else {
        println!("  Instances:");
        for row in &report.instances {
            println!(
                "    {}  {}  {}  {}  {}  {}",
                row.instance_id,
                row.image_id,
                row.instance_type,
                row.instance_state,
                row.launch_time,
                row.image_description,
            );
        }
    }

    if report.auto_scaling_groups.is_empty() {
        println!("  No AL1 Auto Scaling groups.");
    } else {
        println!("  Auto Scaling groups:");
        for row in &report.auto_scaling_groups {
            let source = match (&row.launch_configuration_name, &row.launch_template_name) {
                (Some(lc), _) => format!("launch-configuration {lc}"),
                (None, Some(lt)) => format!(
                    "launch-template {lt}:{}",
                    row.launch_template_version.as_deref().unwrap_or("?")
                ),
                (None, None) => "-".to_string(),
            };
            println!(
                "    {}  {}  {}  {}",
                row.auto_scaling_group_name, row.image_id, source, row.image_description,
            );
        }
    }

    println!();
}
