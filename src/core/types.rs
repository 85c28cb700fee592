//! Shared types used across sei-termos modules
//!
//! Process numbers, scraped rows and the item records written to the store.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a filing in the portal, used as the search key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessNumber(String);

impl ProcessNumber {
    /// Create a process number from raw sheet text, trimming whitespace.
    ///
    /// Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Borrow the identifier text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File-name friendly form.
    ///
    /// ASCII alphanumerics, `-` and `.` are kept; every other byte becomes
    /// `_XX` (upper-case hex), so distinct numbers never share a stem.
    pub fn file_stem(&self) -> String {
        let mut stem = String::with_capacity(self.0.len());
        for byte in self.0.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'.' {
                stem.push(char::from(byte));
            } else {
                stem.push_str(&format!("_{:02X}", byte));
            }
        }
        stem
    }
}

impl fmt::Display for ProcessNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One candidate row read from a document table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub material: String,
    pub model: String,
    pub size: String,
    /// Raw quantity text, empty when the table has no fourth column
    pub quantity: String,
}

impl RawRow {
    /// Build a row from trimmed cell texts.
    ///
    /// Returns `None` when the cells do not describe an item: fewer than three
    /// cells, an empty model cell, or nothing besides the material.
    pub fn from_cells(cells: &[String]) -> Option<Self> {
        if cells.len() < 3 || cells[1].trim().is_empty() {
            return None;
        }

        let row = Self {
            material: cells[0].trim().to_string(),
            model: cells[1].trim().to_string(),
            size: cells[2].trim().to_string(),
            quantity: cells.get(3).map(|c| c.trim().to_string()).unwrap_or_default(),
        };

        row.has_item_data().then_some(row)
    }

    /// A row qualifies only when model, size or quantity carry text
    pub fn has_item_data(&self) -> bool {
        !self.model.is_empty() || !self.size.is_empty() || !self.quantity.is_empty()
    }
}

/// An item record tied to the process and document it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedItem {
    #[serde(rename = "PROCESSO", alias = "PROCESSO SEI")]
    pub process_number: String,
    #[serde(rename = "NOME ARQUIVO")]
    pub document_title: String,
    #[serde(rename = "NOME")]
    pub employee_name: String,
    #[serde(rename = "MATERIAL")]
    pub material: String,
    #[serde(rename = "MODELO")]
    pub model: String,
    #[serde(rename = "TAMANHO/GENERO")]
    pub size_or_gender: String,
    #[serde(rename = "QUANTIDADE", default)]
    pub quantity: String,
    /// Process-level employee name, filled in when the batch is flushed
    #[serde(rename = "NOME FUNCIONARIO", default)]
    pub process_employee: String,
}

impl ExtractedItem {
    /// Attach a scraped row to its process and document
    pub fn new(
        process: &ProcessNumber,
        document_title: impl Into<String>,
        employee_name: impl Into<String>,
        row: RawRow,
    ) -> Self {
        Self {
            process_number: process.as_str().to_string(),
            document_title: document_title.into(),
            employee_name: employee_name.into(),
            material: row.material,
            model: row.model,
            size_or_gender: row.size,
            quantity: row.quantity,
            process_employee: String::new(),
        }
    }

    /// Key used by the record store index
    pub fn key(&self) -> (String, String) {
        (self.process_number.clone(), self.document_title.clone())
    }
}

/// Column headers of the record store, in order
pub const STORE_COLUMNS: [&str; 8] = [
    "PROCESSO",
    "NOME ARQUIVO",
    "NOME",
    "MATERIAL",
    "MODELO",
    "TAMANHO/GENERO",
    "QUANTIDADE",
    "NOME FUNCIONARIO",
];
