//! Post-processing of generated documentation
//!
//! Both steps are invoked explicitly by the caller after a successful build.

pub mod cruft;
pub mod line_separators;

pub use cruft::{CRUFTS, delete_cruft};
pub use line_separators::{convert_file, convert_line_separators, is_text_file};
