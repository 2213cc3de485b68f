pub mod front_matter_parser;

pub use front_matter_parser::{FrontMatterParser, ParseError, ParseResult};
