use crate::types::{
    AscendingReport, CladeReport, ContributionReport, KinshipReport, PerturbationReport, Report,
};
use crate::genealogy::GraphStatistics;
use anyhow::Result;
use std::fmt::Write;

/// Trait for report formatters
pub trait ReportFormatter {
    fn format(&self, report: &Report) -> Result<String>;
}

/// JSON formatter
pub struct JsonFormatter;

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &Report) -> Result<String> {
        Ok(serde_json::to_string_pretty(report)?)
    }
}

/// Plain text formatter
pub struct TextFormatter;

impl ReportFormatter for TextFormatter {
    fn format(&self, report: &Report) -> Result<String> {
        let mut out = String::new();
        match report {
            Report::Kinship(report) => write_kinship(&mut out, report)?,
            Report::Ascending(report) => write_ascending(&mut out, report)?,
            Report::Statistics(stats) => write_statistics(&mut out, stats)?,
            Report::Clade(report) => write_clade(&mut out, report)?,
            Report::Contribution(report) => write_contribution(&mut out, report)?,
            Report::Perturbation(report) => write_perturbation(&mut out, report)?,
        }
        Ok(out)
    }
}

fn write_kinship(out: &mut String, report: &KinshipReport) -> Result<()> {
    writeln!(out, "Kinship Report")?;
    writeln!(out, "==============")?;
    writeln!(out, "Mode: {}", report.mode)?;
    writeln!(out, "Vertices: {}", report.vertices.len())?;
    writeln!(out, "Related pairs: {}", report.related_pair_count())?;
    writeln!(out, "Mean pairwise kinship: {:.6}", report.mean_pairwise_kinship())?;
    if let Some(stats) = &report.stats {
        writeln!(
            out,
            "Sweep: {} processed, {} evicted, peak {} rows, peak {} pairs",
            stats.processed, stats.evicted, stats.peak_live, stats.peak_pairs
        )?;
    }
    writeln!(out)?;
    for entry in &report.entries {
        writeln!(out, "{}\t{}\t{}", entry.first, entry.second, entry.kinship)?;
    }
    Ok(())
}

fn write_ascending(out: &mut String, report: &AscendingReport) -> Result<()> {
    writeln!(out, "Ascending Genealogy")?;
    writeln!(out, "===================")?;
    writeln!(out, "Seeds: {:?}", report.seeds)?;
    writeln!(out, "Total vertices: {}", report.total_vertices)?;
    for level in &report.levels {
        writeln!(out, "- Level {}: {} vertices", level.level, level.vertices.len())?;
    }
    Ok(())
}

fn write_statistics(out: &mut String, stats: &GraphStatistics) -> Result<()> {
    writeln!(out, "Graph Statistics")?;
    writeln!(out, "================")?;
    writeln!(out, "- Vertices: {}", stats.total_vertices)?;
    writeln!(out, "- Edges: {}", stats.total_edges)?;
    writeln!(out, "- Founders: {}", stats.founders)?;
    writeln!(out, "- Sinks: {}", stats.sinks)?;
    writeln!(out, "- Depth: {}", stats.depth)?;
    writeln!(out, "- Average degree: {:.3}", stats.average_degree)?;
    Ok(())
}

fn write_clade(out: &mut String, report: &CladeReport) -> Result<()> {
    writeln!(out, "Clade Report")?;
    writeln!(out, "============")?;
    writeln!(out, "Criterion: {:?}", report.criterion)?;
    if report.unary_removed > 0 {
        writeln!(out, "Unary vertices removed: {}", report.unary_removed)?;
    }
    match report.root {
        Some(root) => writeln!(out, "Root: {}", root)?,
        None => writeln!(out, "Root: none (empty tree or forest)")?,
    }
    match report.vertex {
        Some(vertex) => {
            writeln!(out, "Largest clade: {}", vertex)?;
            writeln!(out, "- Size: {}", report.clade_size)?;
            writeln!(out, "- Probands: {}", report.proband_count)?;
            writeln!(out, "- Members: {:?}", report.probands)?;
        }
        None => writeln!(out, "Largest clade: none (no internal vertices)")?,
    }
    Ok(())
}

fn write_contribution(out: &mut String, report: &ContributionReport) -> Result<()> {
    writeln!(out, "Founder Contributions")?;
    writeln!(out, "=====================")?;
    writeln!(out, "Targets: {}", report.target_count)?;
    for entry in &report.founders {
        writeln!(out, "{}\t{:.6}", entry.vertex, entry.factor)?;
    }
    Ok(())
}

fn write_perturbation(out: &mut String, report: &PerturbationReport) -> Result<()> {
    writeln!(out, "Parentage Errors")?;
    writeln!(out, "================")?;
    writeln!(out, "Rate: {}", report.error_rate)?;
    if let Some(seed) = report.seed {
        writeln!(out, "Seed: {}", seed)?;
    }
    writeln!(out, "Individuals with parents: {}", report.candidates)?;
    writeln!(
        out,
        "Errors: {} ({} edges changed)",
        report.errors.len(),
        report.edges_changed()
    )?;
    for error in &report.errors {
        writeln!(
            out,
            "- {}: removed {:?}, added {:?}",
            error.child, error.removed_parents, error.added_parents
        )?;
    }
    Ok(())
}
