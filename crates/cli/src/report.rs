use anyhow::Result;
use console::style;
use refine_analyzer::AnalysisStats;
use refine_protocol::{AnalysisResult, Finding, Severity, UnitStatus};

/// JSON report: unit results plus run statistics, already sorted and
/// de-duplicated by the pipeline.
pub fn render_json(results: &[AnalysisResult], stats: &AnalysisStats) -> Result<String> {
    let document = serde_json::json!({
        "units": results,
        "stats": stats,
    });
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Human-facing report. Ordering comes straight from the pipeline.
pub fn render_console(results: &[AnalysisResult], stats: &AnalysisStats) {
    for result in results {
        println!("{} {}", status_badge(result.status), style(&result.unit).bold());

        for finding in &result.findings {
            println!("  {}", format_finding(finding));
            if let Some(suggestion) = &finding.suggestion {
                println!("        {}", style(format!("fix: {suggestion}")).dim());
            }
        }

        for error in &result.chunk_errors {
            println!(
                "  {} chunk {}: {}",
                style("error").red(),
                error.chunk_index,
                error.error
            );
        }
        for warning in &result.warnings {
            println!("  {} {}", style("warning").yellow(), warning);
        }
        if result.findings.is_empty() && result.status == UnitStatus::Complete {
            println!("  {}", style("no findings").dim());
        }
        println!();
    }

    println!(
        "{} units ({} complete, {} partial, {} failed), {} findings in {}ms",
        stats.units, stats.complete, stats.partial, stats.failed, stats.findings, stats.time_ms
    );
    if !stats.by_severity.is_empty() {
        let breakdown: Vec<String> = stats
            .by_severity
            .iter()
            .map(|(severity, count)| format!("{severity}: {count}"))
            .collect();
        println!("{}", breakdown.join(", "));
    }
}

fn format_finding(finding: &Finding) -> String {
    format!(
        "{:<8} {:>9}  {:<13} {}",
        severity_badge(finding.severity),
        finding.range.to_string(),
        finding.category.as_str(),
        finding.message
    )
}

fn severity_badge(severity: Severity) -> String {
    let text = severity.as_str();
    match severity {
        Severity::Critical => style(text).red().bold().to_string(),
        Severity::High => style(text).red().to_string(),
        Severity::Medium => style(text).yellow().to_string(),
        Severity::Low => style(text).green().to_string(),
        Severity::Info => style(text).blue().to_string(),
    }
}

fn status_badge(status: UnitStatus) -> String {
    match status {
        UnitStatus::Complete => style("COMPLETE").green().to_string(),
        UnitStatus::Partial => style("PARTIAL").yellow().to_string(),
        UnitStatus::Failed => style("FAILED").red().to_string(),
    }
}
