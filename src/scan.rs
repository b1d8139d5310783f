use crate::audit::{run_audit, write_reports, AuditRun};
use crate::cli::CommonArgs;
use crate::config::ClassificationConfig;
use crate::sink::{ReportSink, SqlFileSink, SqliteSink};
use anyhow::{bail, Context};
use console::style;
use std::path::PathBuf;

pub fn exec(
    common: &CommonArgs,
    root: PathBuf,
    sql_dir: Option<PathBuf>,
    sqlite: Option<PathBuf>,
    json: bool,
    ndjson: bool,
) -> anyhow::Result<()> {
    let config = common.classification_config()?;

    let mut sinks: Vec<Box<dyn ReportSink>> = Vec::new();
    if let Some(dir) = sql_dir {
        sinks.push(Box::new(SqlFileSink::new(dir)));
    }
    if let Some(path) = sqlite {
        let sink = SqliteSink::open(&path)
            .with_context(|| format!("Failed to open report database {}", path.display()))?;
        sinks.push(Box::new(sink));
    }

    let show_progress = !(json || ndjson || common.quiet);
    let mut run = run_audit(&root, &config, show_progress)
        .with_context(|| format!("Failed to scan {}", root.display()))?;
    write_reports(&mut run, &mut sinks);

    if json {
        output_json(&run, &config)?;
    } else if ndjson {
        output_ndjson(&run)?;
    } else {
        output_summary(&run, &config, common.verbose > 0);
    }

    if !run.is_clean() {
        bail!(
            "{} repository error(s); affected repositories have no complete report",
            run.failures.len()
        );
    }
    Ok(())
}

fn output_json(run: &AuditRun, config: &ClassificationConfig) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&run.to_output(config))?);
    Ok(())
}

fn output_ndjson(run: &AuditRun) -> anyhow::Result<()> {
    for outcome in &run.outcomes {
        for row in outcome.aggregation.report.rows() {
            println!("{}", serde_json::to_string(&row)?);
        }
    }
    Ok(())
}

fn output_summary(run: &AuditRun, config: &ClassificationConfig, per_day: bool) {
    println!(
        "{} {} in {} ({})",
        style("Off-hours audit for").bold(),
        style(&config.target_author).cyan(),
        config.target_year,
        config.time_zone.name()
    );
    println!("{}", "─".repeat(72));
    println!(
        "{:<40} {:>8} {:>10} {:>8} {:>6}",
        style("Repository").bold(),
        style("Weekend").bold(),
        style("Off-hours").bold(),
        style("Holiday").bold(),
        style("Days").bold()
    );

    for outcome in &run.outcomes {
        let report = &outcome.aggregation.report;
        let totals = report.totals();
        println!(
            "{:<40} {:>8} {:>10} {:>8} {:>6}",
            report.repository,
            totals.weekend,
            totals.off_hours,
            totals.holiday,
            report.days.len()
        );
        if per_day {
            for row in report.rows() {
                println!(
                    "  {} weekend: {}, off-hours: {}, holiday: {}",
                    style(&row.date).dim(),
                    row.weekend,
                    row.off_hours,
                    row.holiday
                );
            }
        }
    }

    for failure in &run.failures {
        println!(
            "{:<40} {}",
            failure.repository,
            style(format!("FAILED: {}", failure.error)).red()
        );
    }

    println!(
        "\nScanned {} repositories in {}",
        style(run.outcomes.len() + failed_repositories(run)).cyan(),
        humantime::format_duration(std::time::Duration::from_millis(run.elapsed.as_millis() as u64))
    );
}

/// Failures that never produced an outcome; sink failures are counted with their outcome.
fn failed_repositories(run: &AuditRun) -> usize {
    run.failures
        .iter()
        .filter(|f| !run.outcomes.iter().any(|o| o.path.to_string_lossy() == f.path.as_str()))
        .count()
}
