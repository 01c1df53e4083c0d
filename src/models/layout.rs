use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::ConfigError;
use crate::excel::{col_index_to_letter, letter_to_col_index, CellAddress};

/// A worksheet column, written as its letter ("C") in layout files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Column(pub u32);

impl Column {
    pub fn letter(letter: &str) -> Result<Self, ConfigError> {
        letter_to_col_index(letter).map(Column)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Absolute address of this column at a 1-based row.
    pub fn at_row(self, row: u32) -> CellAddress {
        CellAddress::new(row.saturating_sub(1), self.0)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&col_index_to_letter(self.0))
    }
}

impl TryFrom<String> for Column {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Column::letter(&value)
    }
}

impl From<Column> for String {
    fn from(value: Column) -> Self {
        value.to_string()
    }
}

/// Row offsets from the account-details anchor for one person's name parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameOffsets {
    pub first: usize,
    pub middle: usize,
    pub last: usize,
}

/// Where identity fields live on the account-details sheet.
/// Rows are 1-based; offsets are counted from the anchor row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountLayout {
    pub anchor: String,
    pub value_column: Column,
    pub lot_offset: usize,
    pub owner: NameOffsets,
    pub farmer: NameOffsets,
    pub division_cell: CellAddress,
    pub ia_cell: CellAddress,
    pub area_column: Column,
    pub area_start_row: u32,
    pub area_window: u32,
}

impl Default for AccountLayout {
    fn default() -> Self {
        Self {
            anchor: "account details".to_string(),
            value_column: Column(2),
            lot_offset: 1,
            owner: NameOffsets {
                first: 5,
                middle: 6,
                last: 7,
            },
            farmer: NameOffsets {
                first: 9,
                middle: 10,
                last: 11,
            },
            division_cell: CellAddress::new(2, 2),
            ia_cell: CellAddress::new(3, 2),
            area_column: Column(5),
            area_start_row: 20,
            area_window: 30,
        }
    }
}

/// Where financial fields live on a statement-of-account sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SoaLayout {
    /// Case-insensitive substrings that mark a sheet name as a statement of account.
    pub sheet_markers: Vec<String>,
    pub anchor: String,
    pub area_cell: CellAddress,
    pub principal_cell: CellAddress,
    pub penalty_cell: CellAddress,
    pub old_account_cell: CellAddress,
    pub total_cell: CellAddress,
    pub ifr_start_row: u32,
    pub ifr_rows: u32,
    pub ifr_principal_column: Column,
    pub ifr_penalty_column: Column,
    pub rate_column: Column,
    pub penalty_percent_column: Column,
    pub computed_start_row: u32,
    pub computed_rows: u32,
}

impl Default for SoaLayout {
    fn default() -> Self {
        Self {
            sheet_markers: vec!["statement of account".to_string(), "soa".to_string()],
            anchor: "statement of account".to_string(),
            area_cell: CellAddress::new(7, 3),
            principal_cell: CellAddress::new(24, 4),
            penalty_cell: CellAddress::new(24, 5),
            old_account_cell: CellAddress::new(26, 4),
            total_cell: CellAddress::new(28, 4),
            ifr_start_row: 14,
            ifr_rows: 5,
            ifr_principal_column: Column(4),
            ifr_penalty_column: Column(5),
            rate_column: Column(2),
            penalty_percent_column: Column(3),
            computed_start_row: 14,
            computed_rows: 10,
        }
    }
}

impl SoaLayout {
    pub fn is_soa_sheet_name(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.sheet_markers
            .iter()
            .any(|marker| !marker.is_empty() && name.contains(&marker.to_lowercase()))
    }
}

/// Complete positional layout of a source document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SheetLayout {
    pub account: AccountLayout,
    pub soa: SoaLayout,
}

impl SheetLayout {
    /// Load a JSON layout; any field left out keeps its built-in default.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::LayoutRead {
            path: display.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::LayoutParse { path: display, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_uses_documented_cells() {
        let layout = SheetLayout::default();
        assert_eq!(layout.account.division_cell.to_string(), "C3");
        assert_eq!(layout.account.ia_cell.to_string(), "C4");
        assert_eq!(layout.soa.principal_cell.to_string(), "E25");
        assert_eq!(layout.soa.total_cell.to_string(), "E29");
        assert_eq!(layout.account.area_column.to_string(), "F");
    }

    #[test]
    fn partial_json_overrides_keep_defaults() {
        let json = r#"{ "soa": { "principalCell": "G30", "rateColumn": "H" } }"#;
        let layout: SheetLayout = serde_json::from_str(json).unwrap();
        assert_eq!(layout.soa.principal_cell, CellAddress::new(29, 6));
        assert_eq!(layout.soa.rate_column, Column(7));
        assert_eq!(layout.soa.penalty_cell.to_string(), "F25");
        assert_eq!(layout.account, AccountLayout::default());
    }

    #[test]
    fn rejects_bad_addresses() {
        let json = r#"{ "soa": { "totalCell": "29E" } }"#;
        assert!(serde_json::from_str::<SheetLayout>(json).is_err());
    }

    #[test]
    fn matches_soa_sheet_names() {
        let soa = SoaLayout::default();
        assert!(soa.is_soa_sheet_name("SOA 2024"));
        assert!(soa.is_soa_sheet_name("Statement of Account"));
        assert!(!soa.is_soa_sheet_name("Account Details"));
    }
}
