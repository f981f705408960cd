//! Configuration source abstraction.

mod environment;
mod query;
mod traits;

pub use environment::Environment;
pub use query::ConfigQuery;
pub use traits::ConfigSource;
