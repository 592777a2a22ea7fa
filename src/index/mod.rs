pub mod firstcodes;
pub mod fmindex;
pub mod keyval;
pub mod project;
pub mod stats;
pub mod suffix_array;
pub mod types;

pub use fmindex::FmIndex;
pub use project::ProjectRecord;
pub use suffix_array::{SuffixArray, SuffixArrayStream};
pub use types::*;
