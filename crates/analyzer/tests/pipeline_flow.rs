//! End-to-end pipeline behavior with a deterministic in-process model.

use refine_analyzer::{AnalysisStats, Pipeline};
use refine_code_chunker::SourceUnit;
use refine_finding_cache::MemoryCache;
use refine_inference::MockProvider;
use refine_protocol::{AnalysisConfig, Category, LineRange, Severity, UnitStatus};
use std::sync::Arc;
use std::time::Duration;

/// 19 visible bytes + newline, so chunk geometry is exact in tests.
fn padded_line(text: &str) -> String {
    assert!(text.len() <= 19);
    format!("{text:<19}\n")
}

fn uniform_unit(name: &str, total_lines: usize, marker_lines: &[usize]) -> SourceUnit {
    let mut content = String::new();
    for i in 1..=total_lines {
        if marker_lines.contains(&i) {
            content.push_str(&padded_line("x(); // FIXME"));
        } else {
            content.push_str(&padded_line(&format!("stmt_{i:03}();")));
        }
    }
    SourceUnit::new(name.to_string(), content)
}

fn flagging_provider() -> MockProvider {
    MockProvider::empty().flagging(
        "FIXME",
        Category::Bug,
        Severity::High,
        "leftover FIXME marker",
    )
}

fn small_chunk_config() -> AnalysisConfig {
    let mut config = AnalysisConfig::default();
    config.max_chunk_bytes = 300;
    config.overlap_lines = 0;
    config
}

#[tokio::test]
async fn single_chunk_unit_completes() {
    let provider = Arc::new(flagging_provider());
    let pipeline = Pipeline::new(
        provider.clone(),
        Arc::new(MemoryCache::new()),
        AnalysisConfig::default(),
    )
    .unwrap();

    let unit = SourceUnit::new("main.rs", "fn main() {\n    x(); // FIXME\n}\n");
    let result = pipeline.analyze_unit(&unit).await;

    assert_eq!(result.status, UnitStatus::Complete);
    assert_eq!(result.findings.len(), 1);
    assert_eq!(result.findings[0].range, LineRange::line(2));
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn findings_map_back_to_unit_lines_across_chunks() {
    let provider = Arc::new(flagging_provider());
    let pipeline = Pipeline::new(
        provider.clone(),
        Arc::new(MemoryCache::new()),
        small_chunk_config(),
    )
    .unwrap();

    // 40 lines at 20 bytes each against a 300-byte budget: chunks own lines
    // 1-15, 16-30, 31-40. Markers sit in the first and second chunks.
    let unit = uniform_unit("wide.log", 40, &[5, 20]);
    let result = pipeline.analyze_unit(&unit).await;

    assert_eq!(result.status, UnitStatus::Complete);
    assert!(provider.call_count() > 1, "unit should have been split");

    let lines: Vec<usize> = result.findings.iter().map(|f| f.range.start).collect();
    assert_eq!(lines, vec![5, 20]);
}

#[tokio::test]
async fn second_run_issues_zero_model_calls() {
    let provider = Arc::new(flagging_provider());
    let pipeline = Pipeline::new(
        provider.clone(),
        Arc::new(MemoryCache::new()),
        small_chunk_config(),
    )
    .unwrap();

    let unit = uniform_unit("repeat.log", 40, &[5, 20]);

    let first = pipeline.analyze_unit(&unit).await;
    let calls_after_first = provider.call_count();
    assert!(calls_after_first > 0);

    let second = pipeline.analyze_unit(&unit).await;
    assert_eq!(provider.call_count(), calls_after_first);
    assert_eq!(first.findings, second.findings);
    assert_eq!(first.status, second.status);
}

#[tokio::test]
async fn overlapping_chunks_report_one_finding() {
    let mut config = small_chunk_config();
    config.overlap_lines = 2;
    let provider = Arc::new(flagging_provider());
    let pipeline = Pipeline::new(provider.clone(), Arc::new(MemoryCache::new()), config).unwrap();

    // 20 lines; the split lands after line 15, and the marker on line 15 is
    // also visible to the second chunk through its overlap.
    let unit = uniform_unit("overlap.log", 20, &[15]);
    let result = pipeline.analyze_unit(&unit).await;

    assert_eq!(result.status, UnitStatus::Complete);
    assert!(provider.call_count() >= 2);
    assert_eq!(result.findings.len(), 1, "overlap duplicate must collapse");
    assert_eq!(result.findings[0].range, LineRange::line(15));
}

#[tokio::test]
async fn fatal_chunk_yields_partial_result() {
    let provider = Arc::new(
        MockProvider::empty()
            .flagging("FIXME", Category::Bug, Severity::High, "leftover FIXME")
            .fatal_when_contains("REJECT_ME"),
    );
    let pipeline = Pipeline::new(
        provider.clone(),
        Arc::new(MemoryCache::new()),
        small_chunk_config(),
    )
    .unwrap();

    // Marker in chunk 1 (line 5) and chunk 3 (line 35); poison in chunk 2.
    let mut content = String::new();
    for i in 1..=40 {
        let line = match i {
            5 | 35 => padded_line("x(); // FIXME"),
            20 => padded_line("REJECT_ME();"),
            _ => padded_line(&format!("stmt_{i:03}();")),
        };
        content.push_str(&line);
    }
    let unit = SourceUnit::new("poisoned.log", content);
    let result = pipeline.analyze_unit(&unit).await;

    assert_eq!(result.status, UnitStatus::Partial);
    assert_eq!(result.chunk_errors.len(), 1);
    assert!(result.chunk_errors[0].error.contains("rejected"));

    let lines: Vec<usize> = result.findings.iter().map(|f| f.range.start).collect();
    assert_eq!(lines, vec![5, 35]);
}

#[tokio::test]
async fn cancelled_run_stops_dispatching() {
    let provider = Arc::new(flagging_provider());
    let pipeline = Pipeline::new(
        provider.clone(),
        Arc::new(MemoryCache::new()),
        small_chunk_config(),
    )
    .unwrap();

    pipeline.cancel_token().cancel();
    let unit = uniform_unit("cancelled.log", 40, &[5]);
    let result = pipeline.analyze_unit(&unit).await;

    assert_eq!(result.status, UnitStatus::Failed);
    assert_eq!(provider.call_count(), 0);
    assert!(result
        .chunk_errors
        .iter()
        .all(|e| e.error.contains("cancelled")));
}

#[tokio::test(start_paused = true)]
async fn unit_budget_fails_unfinished_chunks() {
    let provider = Arc::new(
        MockProvider::empty().with_delay(Duration::from_secs(600)),
    );
    let mut config = small_chunk_config();
    config.unit_budget_ms = Some(100);
    config.max_retries = 0;
    let pipeline = Pipeline::new(provider.clone(), Arc::new(MemoryCache::new()), config).unwrap();

    let unit = uniform_unit("slow.log", 40, &[]);
    let result = pipeline.analyze_unit(&unit).await;

    assert_eq!(result.status, UnitStatus::Failed);
    assert!(!result.chunk_errors.is_empty());
    assert!(result
        .chunk_errors
        .iter()
        .all(|e| e.error.contains("budget exhausted")));
    // Calls were issued, then abandoned at the deadline.
    assert!(provider.call_count() >= 1);
}

#[tokio::test]
async fn project_run_isolates_unit_failures() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.rs"), "fn a() {\n    x(); // FIXME\n}\n").unwrap();
    std::fs::write(dir.path().join("b.py"), "def b():\n    pass\n").unwrap();
    std::fs::write(dir.path().join("empty.rs"), "").unwrap();

    let provider = Arc::new(flagging_provider());
    let pipeline = Arc::new(
        Pipeline::new(
            provider.clone(),
            Arc::new(MemoryCache::new()),
            AnalysisConfig::default(),
        )
        .unwrap(),
    );

    let results = pipeline.analyze_project(dir.path()).await.unwrap();
    assert_eq!(results.len(), 3);

    // Sorted by unit name, so failures land deterministically.
    let names: Vec<&str> = results.iter().map(|r| r.unit.as_str()).collect();
    assert!(names[0].ends_with("a.rs"));
    assert!(names[1].ends_with("b.py"));
    assert!(names[2].ends_with("empty.rs"));

    assert_eq!(results[0].status, UnitStatus::Complete);
    assert_eq!(results[0].findings.len(), 1);
    assert_eq!(results[1].status, UnitStatus::Complete);
    assert!(results[1].findings.is_empty());
    assert_eq!(results[2].status, UnitStatus::Failed);
    assert!(results[2].chunk_errors[0].error.contains("empty unit"));

    let mut stats = AnalysisStats::new();
    for result in &results {
        stats.record(result);
    }
    assert_eq!(stats.units, 3);
    assert_eq!(stats.complete, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.worst_severity(), Some(Severity::High));
}
