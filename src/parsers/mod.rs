pub mod cobertura;
pub mod json;
pub mod lcov;

use crate::detect::Format;
use crate::error::Result;
use crate::model::CoverageReport;

/// Every format parser implements this trait.
pub trait Parser {
    /// Parse the input bytes into a coverage report.
    fn parse(&self, input: &[u8]) -> Result<CoverageReport>;
}

/// The parser for a given format.
pub fn parser_for(format: Format) -> &'static dyn Parser {
    match format {
        Format::Cobertura => &cobertura::CoberturaParser,
        Format::Json => &json::JsonParser,
        Format::Lcov => &lcov::LcovParser,
    }
}
