//! Configuration values, maps and property sources.

pub mod map;
pub mod source;
pub mod value;

pub use map::ConfigMap;
pub use source::PropertySource;
pub use value::ConfigValue;
