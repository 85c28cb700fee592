//! Sheet formats for item rows
//!
//! The store only needs two primitives from a format: read every row of a
//! file and write a complete file.

use csv::{ReaderBuilder, WriterBuilder};
use std::fs::File;
use std::path::Path;

use crate::core::{ExtractedItem, Result, STORE_COLUMNS};

/// Reads and writes whole files of item rows
pub trait ItemSheet: Send + Sync {
    /// Every row of `path`, in file order
    fn read_items(&self, path: &Path) -> Result<Vec<ExtractedItem>>;

    /// Write the header and `items` to `path`, replacing its contents
    fn write_items(&self, path: &Path, items: &[ExtractedItem]) -> Result<()>;

    /// File extension used for backups
    fn extension(&self) -> &'static str;
}

/// Comma-separated sheet with the store header
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvSheet;

impl ItemSheet for CsvSheet {
    fn read_items(&self, path: &Path) -> Result<Vec<ExtractedItem>> {
        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .trim(csv::Trim::Headers)
            .from_reader(file);

        let mut items = Vec::new();
        for record in reader.deserialize() {
            items.push(record?);
        }
        Ok(items)
    }

    fn write_items(&self, path: &Path, items: &[ExtractedItem]) -> Result<()> {
        let mut writer = WriterBuilder::new().has_headers(false).from_path(path)?;
        writer.write_record(STORE_COLUMNS)?;
        for item in items {
            writer.serialize(item)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn extension(&self) -> &'static str {
        "csv"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_header_only_file_reads_empty() {
        let file = NamedTempFile::new().unwrap();
        CsvSheet.write_items(file.path(), &[]).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.starts_with("PROCESSO,NOME ARQUIVO,NOME,MATERIAL"));
        assert!(CsvSheet.read_items(file.path()).unwrap().is_empty());
    }

    #[test]
    fn test_reads_seven_column_store() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "PROCESSO,NOME ARQUIVO,NOME,MATERIAL,MODELO,TAMANHO/GENERO,QUANTIDADE").unwrap();
        writeln!(file, "1,Termo A,Ana,Camisa,Polo,M,").unwrap();

        let items = CsvSheet.read_items(file.path()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, "");
        assert_eq!(items[0].process_employee, "");
    }

    #[test]
    fn test_reads_processo_sei_header() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "PROCESSO SEI,NOME ARQUIVO,NOME,MATERIAL,MODELO,TAMANHO/GENERO,QUANTIDADE").unwrap();
        writeln!(file, "1,Termo A,Ana,Camisa,Polo,M,10").unwrap();

        let items = CsvSheet.read_items(file.path()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].process_number, "1");
        assert_eq!(items[0].quantity, "10");

        // Rewrites use the current header
        CsvSheet.write_items(file.path(), &items).unwrap();
        let content = std::fs::read_to_string(file.path()).unwrap();
        assert!(content.starts_with("PROCESSO,NOME ARQUIVO"));
    }

    #[test]
    fn test_ragged_row_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "PROCESSO,NOME ARQUIVO,NOME,MATERIAL,MODELO,TAMANHO/GENERO,QUANTIDADE").unwrap();
        writeln!(file, "1,Termo A").unwrap();

        assert!(CsvSheet.read_items(file.path()).is_err());
    }
}
