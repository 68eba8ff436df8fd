use crate::coalescent::CoalescentTree;
use crate::error::{Error, Result};
use crate::genealogy::{GenealogicalGraph, Pedigree, DEFAULT_MAX_PARENTS};
use crate::types::{Sex, VertexId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// How pedigree and tree text files are laid out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParserSettings {
    /// Column separator; any run of whitespace when unset
    pub separator: Option<String>,
    /// Tokens meaning "no parent"
    pub missing_parent_notation: Vec<String>,
    /// Skip the first line even when it does not contain `#`
    pub skip_first_line: bool,
    /// Record the first parent column as male and the second as female
    pub infer_sex_from_columns: bool,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            separator: None,
            missing_parent_notation: vec!["-1".to_string(), ".".to_string()],
            skip_first_line: false,
            infer_sex_from_columns: false,
        }
    }
}

/// One `child parent...` line after parsing
type Record = (VertexId, Vec<VertexId>);

/// Reads `child parent1 parent2 [metadata...]` records into genealogies
pub struct PedigreeParser {
    settings: ParserSettings,
}

impl PedigreeParser {
    pub fn new(settings: ParserSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ParserSettings {
        &self.settings
    }

    /// Parses records with at most `parent_columns` parents each.
    ///
    /// A child defined twice with the same parents keeps its first definition; with
    /// different parents, the later definition replaces the earlier one. Both cases
    /// are logged.
    pub fn parse_records(&self, content: &str, parent_columns: usize) -> Result<Vec<Record>> {
        let mut records: Vec<Record> = Vec::new();
        let mut position_of: HashMap<VertexId, usize> = HashMap::new();

        for (line_number, line) in content.lines().enumerate() {
            if line_number == 0 && (self.settings.skip_first_line || line.contains('#')) {
                continue;
            }
            if line.trim().is_empty() {
                continue;
            }

            let (child, parents) = self.parse_line(line, line_number + 1, parent_columns)?;
            match position_of.get(&child) {
                Some(&position) if same_parents(&records[position].1, &parents) => {
                    warn!(
                        "Individual {} is specified multiple times with the same parents",
                        child
                    );
                }
                Some(&position) => {
                    warn!(
                        "Individual {} is specified multiple times; replacing parents {:?} with {:?}",
                        child, records[position].1, parents
                    );
                    records[position].1 = parents;
                }
                None => {
                    position_of.insert(child, records.len());
                    records.push((child, parents));
                }
            }
        }

        debug!("Parsed {} records", records.len());
        Ok(records)
    }

    pub fn parse_graph(&self, content: &str, max_parents: usize) -> Result<GenealogicalGraph> {
        let records = self.parse_records(content, max_parents)?;
        GenealogicalGraph::from_records(records, max_parents)
    }

    pub fn parse_pedigree(&self, content: &str) -> Result<Pedigree> {
        let records = self.parse_records(content, DEFAULT_MAX_PARENTS)?;
        let sexes: Vec<(VertexId, Sex)> = if self.settings.infer_sex_from_columns {
            infer_sexes(&records)
        } else {
            Vec::new()
        };

        let mut pedigree = Pedigree::from_graph(GenealogicalGraph::from_records(
            records,
            DEFAULT_MAX_PARENTS,
        )?)?;
        for (vertex, sex) in sexes {
            pedigree.set_sex(vertex, sex)?;
        }
        Ok(pedigree)
    }

    /// Parses `child parent` lines into a coalescent tree
    pub fn parse_coalescent_tree(&self, content: &str) -> Result<CoalescentTree> {
        CoalescentTree::from_graph(self.parse_graph(content, 1)?)
    }

    pub fn read_graph(&self, path: &Path, max_parents: usize) -> Result<GenealogicalGraph> {
        let graph = self.parse_graph(&std::fs::read_to_string(path)?, max_parents)?;
        info!(
            "Loaded {} vertices and {} edges from {}",
            graph.vertex_count(),
            graph.edge_count(),
            path.display()
        );
        Ok(graph)
    }

    pub fn read_pedigree(&self, path: &Path) -> Result<Pedigree> {
        let pedigree = self.parse_pedigree(&std::fs::read_to_string(path)?)?;
        info!("Loaded pedigree from {}", path.display());
        Ok(pedigree)
    }

    pub fn read_coalescent_tree(&self, path: &Path) -> Result<CoalescentTree> {
        let tree = self.parse_coalescent_tree(&std::fs::read_to_string(path)?)?;
        info!("Loaded coalescent tree from {}", path.display());
        Ok(tree)
    }

    /// Renders the graph in the format read by [`parse_graph`](Self::parse_graph).
    ///
    /// Every vertex gets one line, ascending by id, with missing parent columns
    /// filled by the first missing-parent token.
    pub fn format_graph(&self, graph: &GenealogicalGraph) -> Result<String> {
        let separator = self.settings.separator.as_deref().unwrap_or(" ");
        let missing = self
            .settings
            .missing_parent_notation
            .first()
            .map(String::as_str)
            .unwrap_or("-1");
        let columns = graph.max_parents().max(1);

        let mut output = String::new();
        for vertex in graph.vertices() {
            let parents = graph.parents(vertex)?;
            let mut line = vertex.to_string();
            for column in 0..columns {
                line.push_str(separator);
                match parents.get(column) {
                    Some(parent) => line.push_str(&parent.to_string()),
                    None => line.push_str(missing),
                }
            }
            line.push('\n');
            output.push_str(&line);
        }
        Ok(output)
    }

    pub fn write_graph(&self, graph: &GenealogicalGraph, path: &Path) -> Result<()> {
        std::fs::write(path, self.format_graph(graph)?)?;
        Ok(())
    }

    fn parse_line(&self, line: &str, line_number: usize, parent_columns: usize) -> Result<Record> {
        let tokens: Vec<&str> = match self.settings.separator.as_deref() {
            Some(separator) => line.trim().split(separator).map(str::trim).collect(),
            None => line.split_whitespace().collect(),
        };

        let mut columns = tokens.into_iter().take(parent_columns + 1);
        let child = match columns.next() {
            Some(token) => parse_id(token, line_number)?,
            None => {
                return Err(Error::structural(format!("line {}: missing individual id", line_number)))
            }
        };

        let mut parents = Vec::with_capacity(parent_columns);
        for token in columns {
            if self.is_missing(token) {
                continue;
            }
            let parent = parse_id(token, line_number)?;
            if !parents.contains(&parent) {
                parents.push(parent);
            }
        }
        Ok((child, parents))
    }

    fn is_missing(&self, token: &str) -> bool {
        token.is_empty()
            || self
                .settings
                .missing_parent_notation
                .iter()
                .any(|notation| notation == token)
    }
}

impl Default for PedigreeParser {
    fn default() -> Self {
        Self::new(ParserSettings::default())
    }
}

fn parse_id(token: &str, line_number: usize) -> Result<VertexId> {
    token.parse::<VertexId>().map_err(|_| {
        Error::structural(format!(
            "line {}: '{}' is not a valid individual id",
            line_number, token
        ))
    })
}

fn same_parents(a: &[VertexId], b: &[VertexId]) -> bool {
    a.len() == b.len() && a.iter().all(|parent| b.contains(parent))
}

/// First parent column is the father, second the mother. Individuals seen in both
/// roles stay unknown.
fn infer_sexes(records: &[Record]) -> Vec<(VertexId, Sex)> {
    let mut sexes: HashMap<VertexId, Sex> = HashMap::new();
    for (_, parents) in records {
        for (parent, sex) in parents.iter().zip([Sex::Male, Sex::Female]) {
            let entry = sexes.entry(*parent).or_insert(sex);
            if *entry != sex {
                warn!("Individual {} appears both as a father and as a mother", parent);
                *entry = Sex::Unknown;
            }
        }
    }
    let mut sexes: Vec<(VertexId, Sex)> = sexes.into_iter().collect();
    sexes.sort_unstable_by_key(|(vertex, _)| *vertex);
    sexes
}
