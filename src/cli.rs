use crate::config::{ClassificationConfig, DedupPolicy, FileConfig, HolidaySection, OfficeHoursSection};
use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser)]
#[command(name = "offhours")]
#[command(about = "Audit git history for commits made on weekends, holidays, and outside office hours")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone, Debug)]
pub struct CommonArgs {
    #[arg(long, global = true, help = "Path to a TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(
        long = "tz",
        global = true,
        help = "IANA time zone used to read commit times (default: UTC)"
    )]
    pub time_zone: Option<String>,

    #[arg(
        long,
        global = true,
        help = "Only audit commits authored in this year (default: current year)"
    )]
    pub year: Option<i32>,

    #[arg(long, global = true, help = "Author email to audit")]
    pub author: Option<String>,

    #[arg(
        long,
        global = true,
        help = "Holiday window start (YYYY-MM-DD, YYYY-MM-DD HH:MM:SS, or RFC3339)"
    )]
    pub holiday_start: Option<String>,

    #[arg(
        long,
        global = true,
        help = "Holiday window end (YYYY-MM-DD, YYYY-MM-DD HH:MM:SS, or RFC3339)"
    )]
    pub holiday_end: Option<String>,

    #[arg(
        long,
        global = true,
        help = "Office start hour; commits at or before this hour are off-hours (default: 9)"
    )]
    pub office_start: Option<u32>,

    #[arg(
        long,
        global = true,
        help = "Office end hour; commits at or after this hour are off-hours (default: 19)"
    )]
    pub office_end: Option<u32>,

    #[arg(
        long,
        global = true,
        value_enum,
        help = "How commits shared between branches are counted"
    )]
    pub dedup: Option<DedupPolicy>,

    #[arg(
        short,
        long,
        global = true,
        action = ArgAction::Count,
        help = "Increase log verbosity (repeatable)"
    )]
    pub verbose: u8,

    #[arg(short, long, global = true, help = "Only log errors")]
    pub quiet: bool,
}

impl CommonArgs {
    /// Log level selected by `-q` and `-v`.
    pub fn level_filter(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::ERROR;
        }
        match self.verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    fn overrides(&self) -> FileConfig {
        let holiday = (self.holiday_start.is_some() || self.holiday_end.is_some()).then(|| HolidaySection {
            start: self.holiday_start.clone(),
            end: self.holiday_end.clone(),
        });
        let office_hours = (self.office_start.is_some() || self.office_end.is_some()).then_some(OfficeHoursSection {
            start: self.office_start,
            end: self.office_end,
        });
        FileConfig {
            time_zone: self.time_zone.clone(),
            target_year: self.year,
            author: self.author.clone(),
            dedup: self.dedup,
            holiday,
            office_hours,
        }
    }

    /// Defaults, then the config file, then command line flags.
    pub fn classification_config(&self) -> Result<ClassificationConfig> {
        let base = match &self.config {
            Some(path) => FileConfig::load(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?,
            None => FileConfig::default(),
        };
        let config = ClassificationConfig::from_file_config(base.overlay(self.overrides()))
            .context("Invalid audit configuration")?;
        Ok(config)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Audit every repository under ROOT and write the per-day reports
    Scan {
        #[arg(help = "Directory to search for repositories (default: current dir)")]
        root: Option<PathBuf>,

        #[arg(long, default_value = "sql", help = "Directory for per-repository SQL scripts")]
        sql_dir: PathBuf,

        #[arg(long, help = "Do not write SQL scripts")]
        no_sql: bool,

        #[arg(long, help = "Also store reports in this SQLite database")]
        sqlite: Option<PathBuf>,

        #[arg(long, help = "Output as JSON")]
        json: bool,

        #[arg(long, help = "Output as NDJSON")]
        ndjson: bool,
    },
    /// List every commit author found under ROOT
    Authors {
        #[arg(help = "Directory to search for repositories (default: current dir)")]
        root: Option<PathBuf>,

        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
    /// List the repositories found under ROOT
    Repos {
        #[arg(help = "Directory to search for repositories (default: current dir)")]
        root: Option<PathBuf>,

        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn execute(self) -> Result<()> {
        match self.command {
            Commands::Scan { root, sql_dir, no_sql, sqlite, json, ndjson } => {
                let sql_dir = (!no_sql).then_some(sql_dir);
                crate::scan::exec(&self.common, root_or_cwd(root)?, sql_dir, sqlite, json, ndjson)
            }
            Commands::Authors { root, json } => crate::authors::exec(&self.common, root_or_cwd(root)?, json),
            Commands::Repos { root, json } => crate::repos::exec(root_or_cwd(root)?, json),
        }
    }
}

fn root_or_cwd(root: Option<PathBuf>) -> Result<PathBuf> {
    match root {
        Some(root) => Ok(root),
        None => std::env::current_dir().context("Failed to determine current directory"),
    }
}
