//! Header rewriting: drop ignored columns, rename remapped ones.

use std::collections::HashSet;

use crate::config::ColumnRules;
use crate::error::ConfigError;

/// The effective header plus the raw positions every data row must drop.
///
/// Built once from the raw header; rows are never inspected by name again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPlan {
    columns: Vec<String>,
    dropped: Vec<bool>,
}

impl ColumnPlan {
    /// Resolve `rules` against the raw header, left to right.
    ///
    /// A column that is both ignored and remapped is dropped.
    pub fn resolve(raw_header: &[String], rules: &ColumnRules) -> Result<Self, ConfigError> {
        let ignored: HashSet<&str> = rules.ignore.iter().map(String::as_str).collect();

        let mut columns = Vec::with_capacity(raw_header.len());
        let mut dropped = Vec::with_capacity(raw_header.len());

        for name in raw_header {
            if ignored.contains(name.as_str()) {
                dropped.push(true);
                continue;
            }

            dropped.push(false);
            let effective = rules.remap.get(name).unwrap_or(name);
            columns.push(effective.clone());
        }

        if columns.is_empty() {
            return Err(ConfigError::EmptyHeader);
        }

        Ok(Self { columns, dropped })
    }

    /// Effective column names, in statement order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Width of the raw header before any column was dropped.
    pub fn raw_width(&self) -> usize {
        self.dropped.len()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_dropped(&self, position: usize) -> bool {
        self.dropped.get(position).copied().unwrap_or(false)
    }

    /// Raw positions removed from every row, ascending.
    pub fn dropped_positions(&self) -> Vec<usize> {
        self.dropped
            .iter()
            .enumerate()
            .filter_map(|(pos, &drop)| drop.then_some(pos))
            .collect()
    }

    /// The fields of a raw row that survive, in position order.
    pub fn project<'a>(&'a self, fields: &'a [String]) -> impl Iterator<Item = &'a String> + 'a {
        fields
            .iter()
            .enumerate()
            .filter(move |(pos, _)| !self.is_dropped(*pos))
            .map(|(_, value)| value)
    }
}
