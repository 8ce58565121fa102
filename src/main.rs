use anyhow::{anyhow, Context, Result};
use chrono::{Days, Local, NaiveDate};
use clap::{Parser, Subcommand};
use colored::*;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

use runcoach::insights::InsightPriority;
use runcoach::logging::init_logging;
use runcoach::{
    AppConfig, ContextBuilder, Database, DateRange, FitnessState, FormStatus, LogLevel,
    PmcCalculator, TrainingLog, TrainingStore,
};

/// runcoach - Training load analysis for runners
///
/// Estimates Training Stress Score for logged runs, tracks fitness, fatigue
/// and form (CTL, ATL, TSB) and turns recent training into coaching insights.
#[derive(Parser)]
#[command(name = "runcoach")]
#[command(version)]
#[command(about = "Training load analysis and coaching insights", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// SQLite training log (overrides settings.database_path)
    #[arg(short, long, value_name = "FILE", global = true)]
    database: Option<PathBuf>,

    /// Athlete ID (overrides settings.default_athlete_id)
    #[arg(short, long, global = true)]
    athlete: Option<String>,

    /// Reference date, YYYY-MM-DD (default: today)
    #[arg(long, global = true)]
    date: Option<NaiveDate>,

    /// Print JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import an athlete's training log from a JSON file
    Import {
        /// JSON file with `athlete`, `workouts` and `personal_bests`
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Show current fitness, fatigue and form
    Status,

    /// Show coaching insights for the recent training window
    Insights,

    /// Show the fitness series for a date range
    Series {
        /// Range start, YYYY-MM-DD (default: 42 days before the reference date)
        #[arg(short, long)]
        from: Option<NaiveDate>,

        /// Range end, YYYY-MM-DD (default: the reference date)
        #[arg(short, long)]
        to: Option<NaiveDate>,
    },

    /// Print the training-load section of the coaching prompt
    Context,

    /// Configure application settings
    Config {
        /// List all configuration options
        #[arg(short, long)]
        list: bool,

        /// Set a configuration value (key=value)
        #[arg(short, long)]
        set: Option<String>,

        /// Get a configuration value
        #[arg(short, long)]
        get: Option<String>,
    },
}

#[derive(Tabled)]
struct SeriesRow {
    #[tabled(rename = "Date")]
    date: NaiveDate,
    #[tabled(rename = "CTL")]
    ctl: String,
    #[tabled(rename = "ATL")]
    atl: String,
    #[tabled(rename = "TSB")]
    tsb: String,
    #[tabled(rename = "Form")]
    form: &'static str,
}

impl From<&FitnessState> for SeriesRow {
    fn from(state: &FitnessState) -> Self {
        SeriesRow {
            date: state.date,
            ctl: format!("{:.1}", state.ctl),
            atl: format!("{:.1}", state.atl),
            tsb: format!("{:+.1}", state.tsb),
            form: state.form.label(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_config_path);
    let config = AppConfig::load_or_default(&config_path)
        .with_context(|| format!("Failed to load config: {}", config_path.display()))?;

    let mut log_config = config.logging.clone();
    log_config.level = LogLevel::from_verbosity(log_config.level, cli.verbose);
    init_logging(&log_config)?;

    if cli.verbose > 0 {
        eprintln!("{}", format!("Log level: {}", log_config.level.to_filter()).dimmed());
    }

    match &cli.command {
        Commands::Config { list, set, get } => {
            handle_config(config, &config_path, *list, set.as_deref(), get.as_deref())
        }
        Commands::Import { file } => handle_import(&cli, &config, file),
        Commands::Status => handle_status(&cli, &config),
        Commands::Insights => handle_insights(&cli, &config),
        Commands::Series { from, to } => handle_series(&cli, &config, *from, *to),
        Commands::Context => handle_context(&cli, &config),
    }
}

fn open_database(cli: &Cli, config: &AppConfig) -> Result<Database> {
    let path = cli
        .database
        .clone()
        .unwrap_or_else(|| config.settings.database_path.clone());

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create database directory: {}", parent.display()))?;
    }

    Database::new(&path).with_context(|| format!("Failed to open database: {}", path.display()))
}

fn athlete_id(cli: &Cli, config: &AppConfig) -> Result<String> {
    cli.athlete
        .clone()
        .or_else(|| config.settings.default_athlete_id.clone())
        .ok_or_else(|| {
            anyhow!("No athlete selected: pass --athlete or set settings.default_athlete_id")
        })
}

fn reference_date(cli: &Cli) -> NaiveDate {
    cli.date.unwrap_or_else(|| Local::now().date_naive())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn paint_form(form: FormStatus) -> ColoredString {
    let label = form.label();
    match form.color() {
        "green" => label.green().bold(),
        "lightgreen" => label.bright_green(),
        "yellow" => label.yellow(),
        "orange" => label.truecolor(255, 165, 0),
        _ => label.red().bold(),
    }
}

fn handle_import(cli: &Cli, config: &AppConfig, file: &Path) -> Result<()> {
    let content = fs::read_to_string(file)
        .with_context(|| format!("Failed to read training log: {}", file.display()))?;
    let log: TrainingLog = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse training log: {}", file.display()))?;

    let db = open_database(cli, config)?;
    let count = db.import_log(&log).context("Failed to import training log")?;

    println!(
        "{}",
        format!(
            "✓ Imported {} workouts and {} personal bests for {}",
            count,
            log.personal_bests.len(),
            log.athlete.name
        )
        .green()
    );
    Ok(())
}

fn handle_status(cli: &Cli, config: &AppConfig) -> Result<()> {
    let db = open_database(cli, config)?;
    let athlete = athlete_id(cli, config)?;
    let context = ContextBuilder::from_app_config(&db, config)
        .try_build(&athlete, reference_date(cli))
        .with_context(|| format!("Failed to load training history for {}", athlete))?;

    let Some(fitness) = context.fitness else {
        return Err(anyhow!("No fitness data for {}", athlete));
    };

    if cli.json {
        return print_json(&fitness);
    }

    println!("{}", format!("Training load as of {}", fitness.date).cyan().bold());
    println!("  Fitness (CTL): {:.1}", fitness.ctl);
    println!("  Fatigue (ATL): {:.1}", fitness.atl);
    println!("  Form (TSB):    {:+.1}", fitness.tsb);
    println!("  Status:        {}", paint_form(fitness.form));
    println!("  {}", fitness.form.description().dimmed());
    println!(
        "  Workouts in the last {} days: {}",
        config.insights.window_days, context.recent_workout_count
    );
    Ok(())
}

fn handle_insights(cli: &Cli, config: &AppConfig) -> Result<()> {
    let db = open_database(cli, config)?;
    let athlete = athlete_id(cli, config)?;
    let context = ContextBuilder::from_app_config(&db, config)
        .try_build(&athlete, reference_date(cli))
        .with_context(|| format!("Failed to load training history for {}", athlete))?;

    if cli.json {
        return print_json(&context.insights);
    }

    if context.insights.is_empty() {
        println!("{}", "No insights for the recent training window".dimmed());
        return Ok(());
    }

    for insight in &context.insights {
        let title = match insight.priority {
            InsightPriority::High => insight.title.red().bold(),
            InsightPriority::Medium => insight.title.yellow().bold(),
            InsightPriority::Low => insight.title.green(),
        };
        println!("{} {}", format!("[{:?}]", insight.priority).dimmed(), title);
        println!("  {}", insight.description);
        println!("  {} {}", "→".cyan(), insight.recommendation);
    }
    Ok(())
}

fn handle_series(
    cli: &Cli,
    config: &AppConfig,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<()> {
    let db = open_database(cli, config)?;
    let athlete = athlete_id(cli, config)?;

    let end = to.unwrap_or_else(|| reference_date(cli));
    let start = match from {
        Some(start) => start,
        None => end
            .checked_sub_days(Days::new(u64::from(config.pmc.ctl.window_days)))
            .ok_or_else(|| anyhow!("Date out of range: {}", end))?,
    };

    // Every day in the range needs its full load window of history
    let lookback = u64::from(config.pmc.ctl.window_days.max(config.pmc.atl.window_days));
    let history_start = start
        .checked_sub_days(Days::new(lookback))
        .unwrap_or(NaiveDate::MIN);

    let workouts = db
        .fetch_workouts(&athlete, DateRange::new(history_start, end))
        .with_context(|| format!("Failed to load workouts for {}", athlete))?;
    let max_hr = db.fetch_user_max_heart_rate(&athlete)?;

    let pmc = PmcCalculator::with_config(config.pmc.clone());
    let daily_tss = pmc.aggregate_daily_tss(&workouts, max_hr);
    let series = pmc.calculate_series(&daily_tss, start, end)?;

    if cli.json {
        return print_json(&series);
    }

    let rows: Vec<SeriesRow> = series.iter().map(SeriesRow::from).collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
    Ok(())
}

fn handle_context(cli: &Cli, config: &AppConfig) -> Result<()> {
    let db = open_database(cli, config)?;
    let athlete = athlete_id(cli, config)?;
    let context = ContextBuilder::from_app_config(&db, config).build(&athlete, reference_date(cli));

    if cli.json {
        return print_json(&context);
    }

    print!("{}", context.render());
    Ok(())
}

fn handle_config(
    mut config: AppConfig,
    config_path: &Path,
    list: bool,
    set: Option<&str>,
    get: Option<&str>,
) -> Result<()> {
    if let Some(key_value) = set {
        let (key, value) = key_value
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected key=value, got: {}", key_value))?;
        config.set(key.trim(), value.trim())?;
        config
            .save_to_file(config_path)
            .with_context(|| format!("Failed to save config: {}", config_path.display()))?;
        println!("{}", format!("✓ {} = {}", key.trim(), config.get(key.trim())?).green());
    } else if let Some(key) = get {
        println!("{}", config.get(key)?);
    } else if list {
        println!("{}", format!("# {}", config_path.display()).dimmed());
        print!("{}", toml::to_string_pretty(&config)?);
    } else {
        println!("Config file: {}", config_path.display());
        println!("Use --list, --get <key> or --set <key=value>");
    }
    Ok(())
}
