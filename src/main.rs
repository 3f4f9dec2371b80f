use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use stamina::config::EngineConfig;
use stamina::logging::init_logging;
use stamina::replay::{ReplaySummary, SessionReplay};
use stamina::{ExerciseType, HrrZoneCalculator, QuestionnaireAnswers, UserProfile, UserRegistry};
use std::path::PathBuf;
use tabled::{settings::Style, Table, Tabled};

/// Stamina - per-user stamina engine CLI
///
/// Replays recorded heart rate and activity telemetry through the engine and
/// reports calories, stamina, lactate, zones and pace predictions.
#[derive(Parser)]
#[command(name = "stamina")]
#[command(version)]
#[command(about = "Stamina engine CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a CSV telemetry session through a fresh user
    Replay {
        /// Session file with a `kind` column (hr | activity)
        file: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,

        /// Seconds between trace rows (overrides the config file)
        #[arg(short, long)]
        trace: Option<i64>,

        /// Questionnaire answers applied before the replay: breath,muscle,rpe
        #[arg(short, long, value_name = "B,M,R")]
        questionnaire: Option<String>,
    },

    /// Print the HRR zone heart rate table
    Zones {
        /// Resting heart rate (overrides the profile)
        #[arg(long)]
        rest: Option<i32>,

        /// Maximum heart rate (overrides the profile)
        #[arg(long)]
        max: Option<i32>,

        /// Exercise type the max heart rate is adjusted to
        #[arg(short, long, value_enum, default_value_t = ExerciseArg::Run)]
        exercise: ExerciseArg,

        /// Print the table as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Print the configuration file path
    Path,
}

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct TraceRow {
    #[tabled(rename = "t (s)")]
    time: i64,
    #[tabled(rename = "Stamina")]
    stamina: String,
    #[tabled(rename = "Anaerobic")]
    anaerobic: String,
    #[tabled(rename = "Lactate")]
    lactate: String,
    #[tabled(rename = "kcal")]
    kcal: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExerciseArg {
    Run,
    Walk,
    Bike,
    Other,
}

impl From<ExerciseArg> for ExerciseType {
    fn from(arg: ExerciseArg) -> Self {
        match arg {
            ExerciseArg::Run => ExerciseType::Run,
            ExerciseArg::Walk => ExerciseType::Walk,
            ExerciseArg::Bike => ExerciseType::Bike,
            ExerciseArg::Other => ExerciseType::Other,
        }
    }
}

#[derive(Tabled)]
struct ZoneRow {
    #[tabled(rename = "Zone")]
    zone: &'static str,
    #[tabled(rename = "HRR")]
    fraction: String,
    #[tabled(rename = "Heart rate")]
    heart_rate: u16,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => EngineConfig::load_or_default(),
    };

    let mut log_config = config.logging.clone();
    log_config.level = log_config.level.raised_by(cli.verbose);
    init_logging(&log_config).context("Failed to initialize logging")?;

    match cli.command {
        Commands::Replay {
            file,
            json,
            trace,
            questionnaire,
        } => run_replay(&config, file, json, trace, questionnaire)?,
        Commands::Zones {
            rest,
            max,
            exercise,
            json,
        } => show_zones(&config, rest, max, exercise.into(), json)?,
        Commands::Config { action } => manage_config(&config, cli.config, action)?,
    }

    Ok(())
}

fn run_replay(
    config: &EngineConfig,
    file: PathBuf,
    json: bool,
    trace: Option<i64>,
    questionnaire: Option<String>,
) -> Result<()> {
    let replay = SessionReplay::from_path(&file)
        .with_context(|| format!("Failed to read session {}", file.display()))?;

    let mut registry = UserRegistry::new();
    let handle = registry.create_with_coefficients(config.profile.clone(), config.coefficients.clone())?;
    let user = registry
        .get_mut(handle)
        .context("Registered user disappeared")?;

    if let Some(answers) = questionnaire {
        let answers = parse_answers(&answers)?;
        user.update_aerobic_anaerobic_by_questionnaire(answers)
            .context("Questionnaire rejected")?;
    }

    let interval = trace.or(config.replay.trace_interval_secs);
    let summary = replay.run_traced(user, interval);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "{}",
        format!("Session replay {} ({})", file.display(), Local::now().format("%Y-%m-%d %H:%M:%S"))
            .green()
            .bold()
    );
    println!("  User: {}", handle.to_string().dimmed());
    print_summary(&summary);
    Ok(())
}

fn parse_answers(raw: &str) -> Result<QuestionnaireAnswers> {
    let values = raw
        .split(',')
        .map(|part| part.trim().parse::<i32>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("Invalid questionnaire answers: {}", raw))?;

    match values.as_slice() {
        [breath, muscle, rpe] => Ok(QuestionnaireAnswers {
            first_time: true,
            breath: *breath,
            muscle: *muscle,
            rpe: *rpe,
        }),
        _ => bail!("Expected three questionnaire answers (breath,muscle,rpe), got {}", raw),
    }
}

fn print_summary(summary: &ReplaySummary) {
    let events = format!(
        "{} events, {} accepted, {} out of order, {} invalid",
        summary.events,
        summary.accepted(),
        summary.rejected_out_of_order,
        summary.rejected_invalid
    );
    if summary.rejected() > 0 {
        println!("  {}", events.yellow());
    } else {
        println!("  {}", events);
    }

    let m = &summary.metrics;
    let rows = vec![
        MetricRow { metric: "Total energy", value: format!("{:.1} kcal", m.session_total_kcal) },
        MetricRow { metric: "Exercise energy", value: format!("{:.1} kcal", m.session_exercise_kcal) },
        MetricRow { metric: "Resting energy", value: format!("{:.1} kcal", m.session_bmr_kcal) },
        MetricRow { metric: "Burn rate", value: format!("{:.2} kcal/min", m.burn_rate_kcal_per_min) },
        MetricRow { metric: "Stamina", value: percent(m.stamina) },
        MetricRow { metric: "Aerobic", value: percent(m.aerobic_fraction) },
        MetricRow { metric: "Anaerobic", value: percent(m.anaerobic_fraction) },
        MetricRow { metric: "Aerobic capacity", value: percent(m.aerobic_capacity) },
        MetricRow { metric: "Total capacity", value: percent(m.aerobic_total_capacity) },
        MetricRow { metric: "Lactate", value: format!("{:.2} mmol/L", m.lactate) },
        MetricRow { metric: "Dilution grade", value: m.la_dilution_grade.to_string() },
        MetricRow { metric: "Regime", value: m.regime.to_string() },
        MetricRow { metric: "Zone", value: m.zone.label().to_string() },
        MetricRow { metric: "Max-conti pace (avg)", value: pace(m.avg.max_conti_pace_min_per_km) },
        MetricRow { metric: "Max-conti distance (avg)", value: format!("{:.2} km", m.avg.max_conti_dist_km) },
        MetricRow { metric: "Stamina-left pace (avg)", value: pace(m.avg.stamina_left_pace_min_per_km) },
        MetricRow { metric: "Stamina-left distance (avg)", value: format!("{:.2} km", m.avg.stamina_left_dist_km) },
        MetricRow { metric: "Max-conti pace (last)", value: pace(m.last.max_conti_pace_min_per_km) },
        MetricRow { metric: "Stamina-left pace (last)", value: pace(m.last.stamina_left_pace_min_per_km) },
        MetricRow { metric: "Pseudo-VDOT", value: format!("{:.1}", m.pseudo_vdot) },
        MetricRow { metric: "Session VDOT", value: format!("{:.1}", m.session_vdot) },
        MetricRow { metric: "Distance", value: format!("{:.2} km", m.session_distance_km) },
    ];
    println!("{}", Table::new(rows).with(Style::rounded()));

    if !summary.trace.is_empty() {
        println!("{}", "Trace".cyan().bold());
        let rows: Vec<TraceRow> = summary
            .trace
            .iter()
            .map(|point| TraceRow {
                time: point.time,
                stamina: percent(point.stamina),
                anaerobic: percent(point.anaerobic_fraction),
                lactate: format!("{:.2}", point.lactate),
                kcal: format!("{:.1}", point.total_kcal),
            })
            .collect();
        println!("{}", Table::new(rows).with(Style::rounded()));
    }
}

fn show_zones(
    config: &EngineConfig,
    rest: Option<i32>,
    max: Option<i32>,
    exercise: ExerciseType,
    json: bool,
) -> Result<()> {
    let mut params = config.profile.clone();
    if let Some(rest) = rest {
        params.bio_rest_hr = rest;
    }
    if let Some(max) = max {
        params.bio_max_hr = max;
    }
    let profile = UserProfile::from_params(params);
    let offsets = &config.coefficients.ingest.max_hr_offsets;
    let table = HrrZoneCalculator::zone_table_for(&profile, exercise, offsets);

    if json {
        println!("{}", serde_json::to_string_pretty(&table)?);
        return Ok(());
    }

    println!(
        "{}",
        format!(
            "HRR zones for {:?} (rest {} bpm, max {:.0} bpm)",
            exercise,
            profile.bio_rest_hr(),
            profile.effective_max_hr(exercise, offsets)
        )
            .blue()
            .bold()
    );
    let rows: Vec<ZoneRow> = table
        .iter()
        .map(|row| ZoneRow {
            zone: row.zone.label(),
            fraction: format!("{}%", row.fraction * rust_decimal::Decimal::ONE_HUNDRED),
            heart_rate: row.heart_rate,
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
    Ok(())
}

fn manage_config(config: &EngineConfig, custom_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    let path = custom_path.unwrap_or_else(EngineConfig::default_config_path);

    match action {
        ConfigAction::Show => {
            println!("{}", toml::to_string_pretty(config)?);
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                bail!("{} already exists, use --force to overwrite", path.display());
            }
            let mut fresh = EngineConfig::default();
            fresh
                .save_to_file(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{}", format!("✓ Wrote {}", path.display()).green());
        }
        ConfigAction::Path => {
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

fn pace(min_per_km: f64) -> String {
    if min_per_km <= 0.0 {
        return "-".to_string();
    }
    let total_secs = (min_per_km * 60.0).round() as i64;
    format!("{}:{:02} /km", total_secs / 60, total_secs % 60)
}
