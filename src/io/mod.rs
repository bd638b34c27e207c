//! Input and output around the dedup engine
//!
//! - `source` - Where source images come from
//! - `sink` - Where unique tiles are exported to
//! - `report` - HTML and JSON run reports

pub mod report;
pub mod sink;
pub mod source;

pub use report::{render_html, write_html_report, write_json_report, ReportData};
pub use sink::{export_prototypes, DirectorySink, ExportStats, MemorySink, TileSink};
pub use source::{ImageSource, MemorySource, PngFileSource};
