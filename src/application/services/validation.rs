//! Input validation shared by the entity services

use crate::domain::errors::CatalogError;
use crate::domain::value_objects::non_blank;

pub const MAX_CHARACTER_NAME: usize = 150;
pub const MAX_CLAN_NAME: usize = 120;
pub const MAX_TECHNIQUE_NAME: usize = 150;
pub const MAX_EXPANSION_NAME: usize = 150;
pub const MAX_DESCRIPTION: usize = 1000;
pub const MAX_EFFECT: usize = 2000;

/// Trimmed, non-blank name no longer than `max` characters
pub fn require_name<'a>(kind: &str, name: &'a str, max: usize) -> Result<&'a str, CatalogError> {
    let name = non_blank(Some(name))
        .ok_or_else(|| CatalogError::invalid(format!("{kind} name is required")))?;
    if name.chars().count() > max {
        return Err(CatalogError::invalid(format!(
            "{kind} name cannot exceed {max} characters"
        )));
    }
    Ok(name)
}

/// Optional free text, empty when absent
pub fn optional_text(field: &str, value: Option<&str>, max: usize) -> Result<String, CatalogError> {
    let value = value.unwrap_or_default();
    if value.chars().count() > max {
        return Err(CatalogError::invalid(format!(
            "{field} cannot exceed {max} characters"
        )));
    }
    Ok(value.to_string())
}
