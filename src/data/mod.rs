//! Data structures for the expression analysis

mod annotation;
mod collapse;
mod expression;
mod metadata;

pub use annotation::{ProbeAnnotation, ProbeRecord};
pub use collapse::{collapse_probes, CollapseRule, GeneMatrix};
pub use expression::ExpressionMatrix;
pub use metadata::{GroupDesign, SampleGroup, SampleMetadata};
