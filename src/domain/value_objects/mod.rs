//! Value objects - Immutable objects defined by their attributes

mod ids;
mod rank;

pub use ids::*;
pub use rank::Rank;

/// Lowercase lookup key used for case-insensitive name matching
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Treat blank optional text as "no value"
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
