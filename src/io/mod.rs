//! CSV boundary adapters for series input and result tables.

mod reader;
mod writer;

pub use reader::{parse_series_csv, parse_timestamp, read_series_csv};
pub use writer::{
    write_grid_table, write_score_file, write_score_table, write_summary_file,
    write_summary_table,
};
