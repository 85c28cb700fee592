//! SEI portal workflow
//!
//! Frame navigation, document lookup, table scraping and the process driver
//! that ties them together.

mod documents;
mod driver;
mod frames;
mod gate;
mod session;
mod state;
mod table;

pub use documents::{Document, DocumentLocator};
pub use driver::ProcessDriver;
pub use frames::{FrameHandle, FrameNavigator};
pub use gate::StartGate;
pub use session::{Login, PortalLogin};
pub use state::{
    DocumentReport, DocumentState, ProcessBatch, ProcessReport, ProcessState, ProcessTracker,
    RunSummary,
};
pub use table::TableExtractor;
