//! `habits`: evaluate habit schedules and completion records against local
//! calendar days.
//!
//! Habits and completions are read from JSON files (arrays of objects in the
//! same shape the library serializes). Results go to stdout; diagnostics go
//! to stderr through `tracing`.

mod config;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use habit_engine::calendar::parse_rfc3339;
use habit_engine::{
    collapse_duplicates, is_due_on, status_on, summarize, toggle, CalendarDay, CompletionRecord,
    DayRange, DayStatus, Habit, Zone,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::CliConfig;

#[derive(Parser)]
#[command(
    name = "habits",
    version,
    about = "Evaluate habit schedules and completions against local calendar days"
)]
struct Cli {
    /// Zone for deriving calendar days: an IANA name or "local" (overrides HABITS_TZ)
    #[arg(long, global = true)]
    tz: Option<Zone>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print today's calendar day
    Today,
    /// Print the calendar day an RFC 3339 instant falls on
    Day {
        /// e.g. 2024-07-01T04:45:00Z
        instant: String,
    },
    /// List ids of habits due on a day
    Due {
        /// JSON array of habits
        #[arg(long)]
        habits: PathBuf,
        /// Day to evaluate (YYYY-MM-DD); defaults to today
        #[arg(long)]
        day: Option<CalendarDay>,
    },
    /// Print each habit's status on a day as JSON
    Status {
        #[command(flatten)]
        input: Inputs,
        /// Day to evaluate (YYYY-MM-DD); defaults to today
        #[arg(long)]
        day: Option<CalendarDay>,
    },
    /// Print the completion record to upsert when toggling a habit
    Toggle {
        habit_id: String,
        #[command(flatten)]
        input: Inputs,
        /// Day to toggle (YYYY-MM-DD); defaults to today
        #[arg(long)]
        day: Option<CalendarDay>,
    },
    /// Print due/completed counts and streaks for a habit
    Summary {
        habit_id: String,
        #[command(flatten)]
        input: Inputs,
        /// Window length in days, ending at --day
        #[arg(long, default_value_t = 30)]
        days: u32,
        /// Last day of the window (YYYY-MM-DD); defaults to today
        #[arg(long)]
        day: Option<CalendarDay>,
    },
    /// Print completion records with duplicates per habit and day removed
    Collapse {
        /// JSON array of completion records
        #[arg(long)]
        completions: PathBuf,
    },
}

#[derive(Args)]
struct Inputs {
    /// JSON array of habits
    #[arg(long)]
    habits: PathBuf,
    /// JSON array of completion records
    #[arg(long)]
    completions: PathBuf,
}

impl Inputs {
    fn load(&self) -> Result<(Vec<Habit>, Vec<CompletionRecord>)> {
        let habits = read_json(&self.habits)?;
        let completions = load_completions(&self.completions)?;
        Ok((habits, completions))
    }
}

#[derive(Serialize)]
struct StatusRow<'a> {
    habit_id: &'a str,
    day: CalendarDay,
    status: DayStatus,
}

#[derive(Serialize)]
struct Upsert {
    key: String,
    #[serde(flatten)]
    record: CompletionRecord,
}

fn main() {
    let cli = Cli::parse();
    let config = match CliConfig::from_env() {
        Ok(config) => config.with_zone(cli.tz),
        Err(err) => {
            eprintln!("Error: {err:#}");
            process::exit(2);
        }
    };

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(config.log_level)
        .with_target(false)
        .init();

    if let Err(err) = run(cli.command, &config) {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

fn run(command: Command, config: &CliConfig) -> Result<()> {
    let zone = config.zone;
    let resolve_day = |day: Option<CalendarDay>| day.unwrap_or_else(|| zone.today());
    debug!(%zone, "using zone");

    let mut out = io::stdout().lock();
    match command {
        Command::Today => writeln!(out, "{}", zone.today())?,
        Command::Day { instant } => {
            let instant = parse_rfc3339(&instant)?;
            writeln!(out, "{}", zone.day_of(instant)?)?;
        }
        Command::Due { habits, day } => {
            let day = resolve_day(day);
            let habits: Vec<Habit> = read_json(&habits)?;
            for habit in habits.iter().filter(|h| is_due_on(h, day)) {
                writeln!(out, "{}", habit.id)?;
            }
        }
        Command::Status { input, day } => {
            let day = resolve_day(day);
            let (habits, completions) = input.load()?;
            let rows: Vec<StatusRow<'_>> = habits
                .iter()
                .map(|habit| StatusRow {
                    habit_id: &habit.id,
                    day,
                    status: status_on(habit, day, &completions),
                })
                .collect();
            write_json(&mut out, &rows)?;
        }
        Command::Toggle {
            habit_id,
            input,
            day,
        } => {
            let day = resolve_day(day);
            let (habits, completions) = input.load()?;
            let habit = find_habit(&habits, &habit_id)?;
            if !is_due_on(habit, day) {
                warn!(habit_id = %habit.id, %day, "toggling a habit that is not due");
            }
            let record = toggle(habit, day, &completions, Utc::now());
            write_json(
                &mut out,
                &Upsert {
                    key: record.key(),
                    record,
                },
            )?;
        }
        Command::Summary {
            habit_id,
            input,
            days,
            day,
        } => {
            let range = DayRange::ending(resolve_day(day), days)?;
            let (habits, completions) = input.load()?;
            let habit = find_habit(&habits, &habit_id)?;
            write_json(&mut out, &summarize(habit, range, &completions))?;
        }
        Command::Collapse { completions } => {
            let completions: Vec<CompletionRecord> = read_json(&completions)?;
            write_json(&mut out, &collapse_duplicates(&completions))?;
        }
    }
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn load_completions(path: &Path) -> Result<Vec<CompletionRecord>> {
    let completions: Vec<CompletionRecord> = read_json(path)?;
    let collapsed = collapse_duplicates(&completions);
    if collapsed.len() < completions.len() {
        warn!(
            path = %path.display(),
            duplicates = completions.len() - collapsed.len(),
            "input has duplicate completion records; using the latest of each"
        );
    }
    Ok(collapsed)
}

fn find_habit<'a>(habits: &'a [Habit], habit_id: &str) -> Result<&'a Habit> {
    habits
        .iter()
        .find(|h| h.id == habit_id)
        .ok_or_else(|| anyhow!("unknown habit '{habit_id}'"))
}

fn write_json<T: Serialize>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
