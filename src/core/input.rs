use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("{0} cannot be empty")]
    Empty(&'static str),
}

/// Trim a list name or task title, rejecting blank input.
/// `field` names the value in the error ("list name", "task text").
pub fn normalize_name(text: &str, field: &'static str) -> Result<String, InputError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(InputError::Empty(field));
    }
    Ok(trimmed.to_string())
}
