//! Dataset input: parsing exports, mapping columns, finding the latest file.

mod dataset;
mod locate;
mod parser;
mod source;

pub use dataset::{ColumnLayout, Dataset, DatasetRow};
pub use locate::latest_dataset;
pub use parser::{Delimiter, Parser, ParserConfig};
pub use source::{DataTable, DatasetSource};
