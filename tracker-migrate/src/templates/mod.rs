//! Template rendering using Handlebars.
//!
//! Two templates exist: the attribution block put in front of migrated
//! comments (configurable) and the one-line dry-run preview of a record.

mod error;
mod renderer;

pub use error::TemplateError;
pub use renderer::{create_handlebars_registry, TemplateRenderer, PREVIEW_TEMPLATE};

use chrono::NaiveDateTime;

/// Checks that `template` parses, without rendering it.
///
/// # Errors
///
/// Returns [`TemplateError::Syntax`] describing the first parse error.
pub fn check_template(template: &str) -> Result<(), TemplateError> {
    handlebars::Template::compile(template)?;
    Ok(())
}

/// Formats a source timestamp the way migrated comments show it.
#[must_use]
pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format("%Y-%m-%d %H:%M").to_string()
}
