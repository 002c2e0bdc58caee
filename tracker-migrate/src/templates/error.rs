//! Template error types.

use thiserror::Error;

/// Errors raised while checking or rendering a template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The template text does not parse.
    #[error("Invalid template syntax: {0}")]
    Syntax(#[from] handlebars::TemplateError),

    /// The template referenced missing data or a helper failed.
    #[error("Failed to render template: {0}")]
    Render(#[from] handlebars::RenderError),
}
