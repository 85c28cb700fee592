//! Record store module
//!
//! Persistent item rows, their sheet formats, and the process work list.

mod record_store;
mod sheet;
mod worklist;

pub use record_store::{FlushOutcome, RecordStore};
pub use sheet::{CsvSheet, ItemSheet};
pub use worklist::WorkList;
