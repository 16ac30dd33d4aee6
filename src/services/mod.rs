pub mod report_writer;
pub mod translator;

pub use report_writer::{ReportFiles, ReportWriter};
pub use translator::{Translate, Translator};
