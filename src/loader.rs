//! Readers for the co-occurrence table and the pattern label table.
//!
//! Occurrence lines look like `entity\tpattern:count\tpattern:count...` and
//! label lines like `pattern\tlabel`. Both files use 1-based indices; the
//! loaded structures are 0-based, with patterns as matrix rows and entity
//! pairs as columns.

use crate::error::{DiscoveryError, Result};
use crate::sparse::SparseMatrix;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Display names of patterns keyed by 0-based row index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatternLabels {
    labels: HashMap<usize, String>,
}

impl PatternLabels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, row: usize, label: impl Into<String>) -> Option<String> {
        self.labels.insert(row, label.into())
    }

    pub fn get(&self, row: usize) -> Result<&str> {
        self.labels
            .get(&row)
            .map(String::as_str)
            .ok_or(DiscoveryError::MissingLabel { row })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl FromIterator<(usize, String)> for PatternLabels {
    fn from_iter<I: IntoIterator<Item = (usize, String)>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().collect(),
        }
    }
}

pub fn load_occurrences(
    path: impl AsRef<Path>,
    num_patterns: usize,
    num_entity_pairs: usize,
) -> Result<SparseMatrix> {
    let path = path.as_ref();
    let reader = open(path)?;
    read_occurrences(reader, &path.display().to_string(), num_patterns, num_entity_pairs)
}

/// Parses the co-occurrence table into a `num_patterns x num_entity_pairs` matrix.
///
/// Blank lines and lines without any `pattern:count` field are skipped.
pub fn read_occurrences<R: BufRead>(
    reader: R,
    source_name: &str,
    num_patterns: usize,
    num_entity_pairs: usize,
) -> Result<SparseMatrix> {
    let mut builder = SparseMatrix::builder(num_patterns, num_entity_pairs);

    for (line_index, line) in reader.lines().enumerate() {
        let line_number = line_index + 1;
        let line = line.map_err(|source| DiscoveryError::Io {
            path: source_name.into(),
            source,
        })?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 2 {
            continue;
        }

        let entity = parse_index(
            fields[0],
            "entity pair",
            num_entity_pairs,
            source_name,
            line_number,
        )?;
        for field in fields[1..].iter().filter(|field| !field.is_empty()) {
            let (pattern, count) = field.split_once(':').ok_or_else(|| DiscoveryError::Parse {
                source_name: source_name.to_string(),
                line: line_number,
                message: format!("expected 'pattern:count', found '{field}'"),
            })?;
            let pattern = parse_index(pattern, "pattern", num_patterns, source_name, line_number)?;
            let count: f64 = count.trim().parse().map_err(|_| DiscoveryError::Parse {
                source_name: source_name.to_string(),
                line: line_number,
                message: format!("invalid count '{count}'"),
            })?;
            if !count.is_finite() {
                return Err(DiscoveryError::Parse {
                    source_name: source_name.to_string(),
                    line: line_number,
                    message: format!("non-finite count {count} for pattern {}", pattern + 1),
                });
            }
            builder.set(pattern, entity, count)?;
        }
    }

    Ok(builder.build())
}

pub fn load_labels(path: impl AsRef<Path>, num_patterns: usize) -> Result<PatternLabels> {
    let path = path.as_ref();
    let reader = open(path)?;
    read_labels(reader, &path.display().to_string(), num_patterns)
}

/// Parses `pattern\tlabel` lines. Extra fields after the label are ignored.
pub fn read_labels<R: BufRead>(
    reader: R,
    source_name: &str,
    num_patterns: usize,
) -> Result<PatternLabels> {
    let mut labels = PatternLabels::new();

    for (line_index, line) in reader.lines().enumerate() {
        let line_number = line_index + 1;
        let line = line.map_err(|source| DiscoveryError::Io {
            path: source_name.into(),
            source,
        })?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let mut fields = line.split('\t');
        let index = fields.next().unwrap_or_default();
        let label = fields.next().ok_or_else(|| DiscoveryError::Parse {
            source_name: source_name.to_string(),
            line: line_number,
            message: "expected 'pattern<TAB>label'".to_string(),
        })?;
        let row = parse_index(index, "pattern", num_patterns, source_name, line_number)?;
        labels.insert(row, label);
    }

    Ok(labels)
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).map_err(|source| DiscoveryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

/// Converts a 1-based index field into a 0-based index below `bound`.
fn parse_index(
    field: &str,
    what: &'static str,
    bound: usize,
    source_name: &str,
    line: usize,
) -> Result<usize> {
    let index: usize = field.trim().parse().map_err(|_| DiscoveryError::Parse {
        source_name: source_name.to_string(),
        line,
        message: format!("invalid {what} index '{field}'"),
    })?;
    if index == 0 || index > bound {
        return Err(DiscoveryError::IndexOutOfBounds {
            what,
            index,
            bound,
            line: Some(line),
        });
    }
    Ok(index - 1)
}
