use crate::reports::formatters::{JsonFormatter, ReportFormatter, TextFormatter};
use crate::types::Report;
use anyhow::Result;

/// Report generator for creating various output formats
pub struct ReportGenerator;

impl ReportGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate report in the specified format
    pub fn generate(&self, report: &Report, format: &str) -> Result<String> {
        let formatter: Box<dyn ReportFormatter> = match format.to_lowercase().as_str() {
            "json" => Box::new(JsonFormatter),
            "text" => Box::new(TextFormatter),
            _ => return Err(anyhow::anyhow!("Unsupported format: {}", format)),
        };
        formatter.format(report)
    }
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genealogy::ParentageError;
    use crate::kinship::{KinshipMode, KinshipStats};
    use crate::types::{KinshipEntry, KinshipReport, PerturbationReport};

    fn kinship_report() -> Report {
        Report::Kinship(KinshipReport {
            mode: KinshipMode::IncrementalEviction,
            vertices: vec![3, 4],
            entries: vec![
                KinshipEntry { first: 3, second: 3, kinship: 0.5 },
                KinshipEntry { first: 3, second: 4, kinship: 0.25 },
                KinshipEntry { first: 4, second: 4, kinship: 0.5 },
            ],
            stats: Some(KinshipStats {
                processed: 4,
                evicted: 2,
                peak_live: 4,
                peak_pairs: 5,
            }),
        })
    }

    #[test]
    fn test_json_output() {
        let output = ReportGenerator::new().generate(&kinship_report(), "JSON").unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["report"], "kinship");
        assert_eq!(value["mode"], "incremental-eviction");
        assert_eq!(value["entries"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_text_output() {
        let output = ReportGenerator::new().generate(&kinship_report(), "text").unwrap();
        assert!(output.contains("Mode: incremental-eviction"));
        assert!(output.contains("Related pairs: 1"));
        assert!(output.contains("3\t4\t0.25"));
    }

    #[test]
    fn test_perturbation_text() {
        let report = Report::Perturbation(PerturbationReport {
            error_rate: 0.1,
            seed: Some(9),
            candidates: 10,
            errors: vec![ParentageError {
                child: 5,
                removed_parents: vec![1],
                added_parents: vec![2],
            }],
        });
        let output = ReportGenerator::new().generate(&report, "text").unwrap();
        assert!(output.contains("Errors: 1 (2 edges changed)"));
        assert!(output.contains("- 5: removed [1], added [2]"));
    }

    #[test]
    fn test_unsupported_format() {
        assert!(ReportGenerator::new().generate(&kinship_report(), "markdown").is_err());
    }
}
