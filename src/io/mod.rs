//! Input/Output: GEO files, processed tables and DEG results

mod csv;
pub mod geo;
mod results;

pub use self::csv::{
    read_annotation, read_expression_matrix, read_metadata, write_annotation,
    write_expression_matrix, write_metadata, write_results, write_significant,
};
pub use geo::{read_platform_annotation, read_series_matrix, SeriesMatrix};
pub use results::{DegRecord, DegResults, Regulation, ResultsSummary};
