//! Property file discovery and parsing.
//!
//! Files are looked up by the usual naming convention: `{application}-{profile}`,
//! `{application}`, `application-{profile}` and `application`, in each
//! search location of a working copy.

mod aggregator;
mod parser;

pub use aggregator::{LoadOutcome, PropertySourceAggregator};
pub use parser::ConfigParser;
