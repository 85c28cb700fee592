//! Item table scraping
//!
//! Reads every table of the current frame and keeps the rows that describe an
//! item. Also reads the employee name paragraph of the same document.

use std::collections::HashSet;
use tracing::debug;

use crate::browser::{BrowserSession, By, Element};
use crate::core::{RawRow, Result, SeiError};

/// Turns the tables of the current frame into item rows
#[derive(Debug, Clone)]
pub struct TableExtractor {
    employee: By,
}

impl TableExtractor {
    /// `employee_class` is the class of the paragraph holding the name
    pub fn new(employee_class: impl Into<String>) -> Self {
        Self {
            employee: By::ClassName(employee_class.into()),
        }
    }

    /// Scan all tables in the current context.
    ///
    /// The first row of each table is its header. A row reachable through
    /// several tables (nested layouts) is read once, and the header of a
    /// nested table is skipped even when listed under the outer table.
    pub async fn extract_rows(&self, session: &dyn BrowserSession) -> Result<Vec<RawRow>> {
        let tables = session
            .find_elements(&By::tag_name("table"))
            .await
            .map_err(|e| SeiError::extraction(format!("Listing tables failed: {}", e)))?;

        let mut per_table: Vec<Vec<Element>> = Vec::with_capacity(tables.len());
        for table in &tables {
            let rows = table
                .find_children(&By::tag_name("tr"))
                .await
                .map_err(|e| SeiError::extraction(format!("Listing rows failed: {}", e)))?;
            per_table.push(rows);
        }

        let headers: HashSet<String> = per_table
            .iter()
            .filter_map(|rows| rows.first())
            .map(|row| row.reference().to_string())
            .collect();

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for row in per_table.iter().flatten() {
            let reference = row.reference().to_string();
            if headers.contains(&reference) || !seen.insert(reference) {
                continue;
            }

            let cells = Self::row_cells(row.as_ref()).await?;
            if let Some(raw) = RawRow::from_cells(&cells) {
                out.push(raw);
            }
        }

        debug!(tables = tables.len(), rows = out.len(), "Tables scanned");
        Ok(out)
    }

    async fn row_cells(row: &dyn crate::browser::UiElement) -> Result<Vec<String>> {
        let cells = row
            .find_children(&By::tag_name("td"))
            .await
            .map_err(|e| SeiError::extraction(format!("Listing cells failed: {}", e)))?;

        let mut texts = Vec::with_capacity(cells.len());
        for cell in cells {
            let text = cell
                .text()
                .await
                .map_err(|e| SeiError::extraction(format!("Reading cell failed: {}", e)))?;
            texts.push(text.trim().to_string());
        }
        Ok(texts)
    }

    /// Text of the first employee-name paragraph, if any and non-empty
    pub async fn employee_name(&self, session: &dyn BrowserSession) -> Result<Option<String>> {
        let found = session.find_elements(&self.employee).await?;
        let Some(first) = found.into_iter().next() else {
            return Ok(None);
        };

        let name = first.text().await?.trim().to_string();
        Ok((!name.is_empty()).then_some(name))
    }
}
