//! Identifier to destination-row mapping for one consolidation call.

use std::collections::HashMap;
use thiserror::Error;

use crate::excel::MAX_EXCEL_ROW;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot assign row for file ID {0}")]
pub struct RowAssignError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAssignment {
    /// The identifier already had a row (from the template or an earlier file).
    Existing(u32),
    New(u32),
}

impl RowAssignment {
    pub fn row(self) -> u32 {
        match self {
            RowAssignment::Existing(row) | RowAssignment::New(row) => row,
        }
    }
}

/// Rows are 1-based. New identifiers land at `max(frontier + 1, id)` and move
/// the frontier there, so every new row is strictly above every row handed out
/// before it and two identifiers can never share a row.
#[derive(Debug, Clone, Default)]
pub struct RowIndex {
    rows: HashMap<String, u32>,
    last_template_row: u32,
    frontier: u32,
}

impl RowIndex {
    /// Seed from `(normalized id, row)` pairs found in the template. The first
    /// row seen for an identifier wins.
    pub fn seed(entries: impl IntoIterator<Item = (String, u32)>) -> Self {
        let mut rows = HashMap::new();
        let mut last_template_row = 0;
        for (id, row) in entries {
            rows.entry(id).or_insert(row);
            last_template_row = last_template_row.max(row);
        }
        Self {
            rows,
            last_template_row,
            frontier: last_template_row,
        }
    }

    pub fn last_template_row(&self) -> u32 {
        self.last_template_row
    }

    pub fn frontier(&self) -> u32 {
        self.frontier
    }

    pub fn get(&self, id: &str) -> Option<u32> {
        self.rows.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn assign(&mut self, id: &str) -> Result<RowAssignment, RowAssignError> {
        if let Some(row) = self.get(id) {
            return Ok(RowAssignment::Existing(row));
        }
        let numeric = id
            .parse::<u64>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| RowAssignError(id.to_string()))?;
        let row = numeric.max(u64::from(self.frontier) + 1);
        if row > u64::from(MAX_EXCEL_ROW) {
            return Err(RowAssignError(id.to_string()));
        }
        let row = row as u32;
        self.rows.insert(id.to_string(), row);
        self.frontier = row;
        Ok(RowAssignment::New(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_template_places_id_at_its_own_row() {
        let mut index = RowIndex::seed(Vec::new());
        assert_eq!(index.last_template_row(), 0);
        assert_eq!(index.assign("5"), Ok(RowAssignment::New(5)));
        assert_eq!(index.frontier(), 5);
    }

    #[test]
    fn reuses_template_rows() {
        let mut index = RowIndex::seed(vec![("3".to_string(), 4), ("9".to_string(), 10)]);
        assert_eq!(index.last_template_row(), 10);
        assert_eq!(index.assign("3"), Ok(RowAssignment::Existing(4)));
        assert_eq!(index.assign("4"), Ok(RowAssignment::New(11)));
        assert_eq!(index.assign("4"), Ok(RowAssignment::Existing(11)));
    }

    #[test]
    fn first_template_occurrence_wins() {
        let index = RowIndex::seed(vec![("3".to_string(), 4), ("3".to_string(), 8)]);
        assert_eq!(index.get("3"), Some(4));
        assert_eq!(index.last_template_row(), 8);
    }

    #[test]
    fn out_of_order_ids_never_collide() {
        let mut index = RowIndex::seed(Vec::new());
        let a = index.assign("7").unwrap().row();
        let b = index.assign("3").unwrap().row();
        let c = index.assign("8").unwrap().row();
        assert_eq!((a, b, c), (7, 8, 9));
    }

    #[test]
    fn same_start_state_gives_same_row() {
        let template = vec![("1".to_string(), 2)];
        let first = RowIndex::seed(template.clone()).assign("6").unwrap();
        let second = RowIndex::seed(template).assign("6").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rejects_zero_huge_and_non_numeric_ids() {
        let mut index = RowIndex::default();
        assert_eq!(index.assign("0"), Err(RowAssignError("0".to_string())));
        assert!(index.assign("2000000").is_err());
        assert!(index.assign("99999999999999999999999").is_err());
        assert!(index.assign("abc").is_err());
        assert!(index.is_empty());
        assert_eq!(
            RowAssignError("0".to_string()).to_string(),
            "cannot assign row for file ID 0"
        );
    }
}
