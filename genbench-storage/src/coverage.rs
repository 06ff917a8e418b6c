//! Coverage figures from the tool's own report

use crate::analysis::analyze_log;
use genbench_core::layout::TOOL_STATISTICS_FILE;
use genbench_core::record::round_to;
use genbench_core::CoverageFigures;
use std::path::Path;
use tracing::{debug, warn};

const COVERAGE_COLUMN: &str = "Coverage";
const TOTAL_GOALS_COLUMN: &str = "Total_Goals";
const COVERED_GOALS_COLUMN: &str = "Covered_Goals";

/// Read coverage for one run.
///
/// Prefers `statistics.csv` in `report_dir`; goal counts fall back to the
/// `N goals covered out of M` log line. Anything missing stays unavailable.
pub fn read_coverage(report_dir: &Path, log: &str) -> CoverageFigures {
    let mut figures = read_statistics(&report_dir.join(TOOL_STATISTICS_FILE)).unwrap_or_default();

    if figures.total_goals.is_none() || figures.covered_goals.is_none() {
        if let Some((covered, total)) = analyze_log(log).coverage_goals {
            figures.covered_goals.get_or_insert(covered);
            figures.total_goals.get_or_insert(total);
        }
    }

    if figures.coverage.is_none() {
        if let (Some(covered), Some(total)) = (figures.covered_goals, figures.total_goals) {
            if total > 0 {
                figures.coverage = Some(round_to(covered as f64 / total as f64, 4));
            }
        }
    }

    figures
}

fn read_statistics(path: &Path) -> Option<CoverageFigures> {
    if !path.is_file() {
        debug!("No tool statistics at {}", path.display());
        return None;
    }

    let mut reader = match csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
    {
        Ok(reader) => reader,
        Err(e) => {
            warn!("Unreadable tool statistics {}: {}", path.display(), e);
            return None;
        }
    };

    let headers = reader.headers().ok()?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);
    let coverage_at = column(COVERAGE_COLUMN);
    let total_at = column(TOTAL_GOALS_COLUMN);
    let covered_at = column(COVERED_GOALS_COLUMN);

    // One row per target class; the harness targets a single class, so the last row wins
    let row = reader.records().filter_map(Result::ok).last()?;
    let field = |at: Option<usize>| at.and_then(|i| row.get(i)).filter(|v| !v.is_empty());

    Some(CoverageFigures {
        coverage: field(coverage_at)
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite()),
        total_goals: field(total_at).and_then(|v| v.parse().ok()),
        covered_goals: field(covered_at).and_then(|v| v.parse().ok()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_statistics_csv_preferred() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(TOOL_STATISTICS_FILE),
            "TARGET_CLASS,criterion,Coverage,Total_Goals,Covered_Goals\n\
             com.x.ContactsController,LINE;BRANCH,0.8125,48,39\n",
        )
        .unwrap();

        let figures = read_coverage(temp.path(), "1 goals covered out of 2");
        assert_eq!(figures.coverage, Some(0.8125));
        assert_eq!(figures.total_goals, Some(48));
        assert_eq!(figures.covered_goals, Some(39));
    }

    #[test]
    fn test_log_fallback_fills_goals_and_ratio() {
        let temp = TempDir::new().unwrap();
        let figures = read_coverage(temp.path(), "* 3 goals covered out of 8\n");
        assert_eq!(figures.covered_goals, Some(3));
        assert_eq!(figures.total_goals, Some(8));
        assert_eq!(figures.coverage, Some(0.375));
    }

    #[test]
    fn test_absent_report_is_unavailable() {
        let temp = TempDir::new().unwrap();
        let figures = read_coverage(temp.path(), "nothing useful");
        assert_eq!(figures, CoverageFigures::unavailable());
        assert!(!figures.is_available());
    }

    #[test]
    fn test_partial_statistics_columns() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(TOOL_STATISTICS_FILE),
            "TARGET_CLASS,Coverage\ncom.x.A,0.5\n",
        )
        .unwrap();

        let figures = read_coverage(temp.path(), "");
        assert_eq!(figures.coverage, Some(0.5));
        assert_eq!(figures.total_goals, None);
    }
}
