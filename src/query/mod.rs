pub mod expander;
pub mod normalizer;

pub use expander::expand_query;
pub use normalizer::{QueryNormalizer, SpecialIntent, RAISE_QUERY_SENTINEL};
