mod locator;
mod parser;
mod source;

pub use locator::{LogFileRef, LogLocator};
pub use parser::{FailureReason, LineParser, ParseFailure, ParseOutcome, ParsedRecord};
pub use source::LineSource;
