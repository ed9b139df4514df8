//! Output formatting for CLI results

use colorful::Colorful;
use serde::Serialize;
use std::path::Path;

use crate::detection::{AnalysisReport, CryVerdict};

/// Terminal rendering of one report
pub fn format_report(report: &AnalysisReport, verbose: bool) -> String {
    let mut output = String::new();

    let headline = format!("{} {}", report.verdict.symbol(), report.source);
    let headline = match &report.verdict {
        CryVerdict::Rejected { .. } => headline.as_str().dim().to_string(),
        CryVerdict::Classified {
            is_atypical: false, ..
        } => headline.as_str().green().bold().to_string(),
        CryVerdict::Classified {
            is_atypical: true, ..
        } => headline.as_str().yellow().bold().to_string(),
    };
    output.push_str(&headline);
    output.push('\n');

    output.push_str(&format!("  Result: {}\n", report.verdict.summary()));
    output.push_str(&format!("  Duration: {:.2}s\n", report.duration_secs));

    if let Some(probabilities) = &report.probabilities {
        let mut ranked: Vec<_> = probabilities.iter().collect();
        ranked.sort_by(|a, b| {
            b.probability
                .partial_cmp(&a.probability)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let shown: Vec<String> = ranked
            .iter()
            .take(if verbose { ranked.len() } else { 3 })
            .map(|s| format!("{} {:.0}%", s.label, s.probability * 100.0))
            .collect();
        output.push_str(&format!("  Probabilities: {}\n", shown.join(", ")));
    }

    if let Some(score) = report.anomaly_score {
        output.push_str(&format!("  Anomaly score: {:+.3}\n", score));
    }

    if verbose {
        let voiced = report
            .gate
            .voiced_ratio
            .map_or_else(|| "n/a".to_string(), |r| format!("{:.2}", r));
        output.push_str(
            &format!(
                "  Gate: mean RMS {:.4}, voiced ratio {}\n",
                report.gate.mean_rms, voiced
            )
            .as_str()
            .dim()
            .to_string(),
        );

        let stages: Vec<String> = report
            .stages
            .iter()
            .map(|s| format!("{:?} {:.1}ms", s.stage, s.elapsed_ms))
            .collect();
        output.push_str(
            &format!("  Stages: {}\n", stages.join(" → "))
                .as_str()
                .dim()
                .to_string(),
        );

        if let Some(features) = &report.features {
            for (name, value) in features.iter() {
                output.push_str(&format!("    {:<16} {:.4}\n", name, value));
            }
        }
    }

    output
}

/// Terminal rendering of a failed file
pub fn format_failure(path: &Path, error: &anyhow::Error) -> String {
    format!("✗ {}\n  {:#}\n", path.display(), error)
        .as_str()
        .red()
        .to_string()
}

/// Per-run tallies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub classified: usize,
    pub atypical: usize,
    pub rejected: usize,
    pub failed: usize,
}

impl Summary {
    pub fn record(&mut self, report: Option<&AnalysisReport>) {
        self.total += 1;
        match report.map(|r| &r.verdict) {
            None => self.failed += 1,
            Some(CryVerdict::Rejected { .. }) => self.rejected += 1,
            Some(CryVerdict::Classified { is_atypical, .. }) => {
                self.classified += 1;
                if *is_atypical {
                    self.atypical += 1;
                }
            }
        }
    }
}

pub fn format_summary(summary: &Summary) -> String {
    let line = format!(
        "{} file(s): {} classified ({} atypical), {} rejected, {} failed",
        summary.total, summary.classified, summary.atypical, summary.rejected, summary.failed
    );
    if summary.failed > 0 {
        line.as_str().red().to_string()
    } else {
        line.as_str().bold().to_string()
    }
}

#[derive(Serialize)]
struct FailureJson<'a> {
    source: String,
    error: &'a str,
}

#[derive(Serialize)]
struct RunJson<'a> {
    reports: &'a [AnalysisReport],
    failures: Vec<FailureJson<'a>>,
    summary: &'a Summary,
}

/// Whole-run JSON document
pub fn format_json(
    reports: &[AnalysisReport],
    failures: &[(String, String)],
    summary: &Summary,
) -> serde_json::Result<String> {
    let doc = RunJson {
        reports,
        failures: failures
            .iter()
            .map(|(source, error)| FailureJson {
                source: source.clone(),
                error,
            })
            .collect(),
        summary,
    };
    serde_json::to_string_pretty(&doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gate::{GateStats, RejectReason};
    use chrono::Utc;
    use uuid::Uuid;

    fn report(verdict: CryVerdict) -> AnalysisReport {
        AnalysisReport {
            id: Uuid::new_v4(),
            source: "clip.wav".into(),
            analyzed_at: Utc::now(),
            duration_secs: 3.0,
            verdict,
            gate: GateStats {
                mean_rms: 0.0,
                voiced_ratio: None,
            },
            probabilities: None,
            anomaly_score: None,
            features: None,
            stages: Vec::new(),
        }
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = Summary::default();
        summary.record(Some(&report(CryVerdict::Rejected {
            reason: RejectReason::Silence,
        })));
        summary.record(Some(&report(CryVerdict::Classified {
            label: "hungry".into(),
            is_atypical: true,
        })));
        summary.record(None);

        assert_eq!(
            summary,
            Summary {
                total: 3,
                classified: 1,
                atypical: 1,
                rejected: 1,
                failed: 1,
            }
        );
    }

    #[test]
    fn test_text_mentions_verdict() {
        let text = format_report(
            &report(CryVerdict::Rejected {
                reason: RejectReason::Silence,
            }),
            true,
        );
        assert!(text.contains("clip.wav"));
        assert!(text.contains("rejected (silence)"));
    }

    #[test]
    fn test_json_document() {
        let reports = vec![report(CryVerdict::Classified {
            label: "pain".into(),
            is_atypical: false,
        })];
        let failures = vec![("bad.wav".to_string(), "decode error".to_string())];
        let mut summary = Summary::default();
        summary.record(Some(&reports[0]));
        summary.record(None);

        let json = format_json(&reports, &failures, &summary).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["reports"][0]["verdict"]["label"], "pain");
        assert_eq!(value["failures"][0]["source"], "bad.wav");
        assert_eq!(value["summary"]["failed"], 1);
    }
}
