//! Template renderer.

use crate::statuses::ResolvedStatus;
use crate::summary::MigrationResult;
use crate::users::{MatchKind, Resolution};
use chrono::NaiveDateTime;
use handlebars::{no_escape, Context, Handlebars, Helper, HelperResult, Output, RenderContext};
use serde_json::{json, Value};

/// One-line dry-run summary of a record.
pub const PREVIEW_TEMPLATE: &str = "[DRY RUN] Row {{row}}: {{title}} | Status: {{status}} | \
Assignee: {{assignee}}{{#if (eq match_kind \"fuzzy\")}} (fuzzy {{score}}){{/if}} | \
Comments: {{comments}} | Attachments: {{attachments}}";

/// Creates a configured Handlebars registry with custom helpers.
///
/// The registry is configured with:
/// - No HTML escaping (output is Markdown)
/// - Strict mode (catches missing variables)
/// - `eq` helper for equality comparisons
#[must_use]
pub fn create_handlebars_registry() -> Handlebars<'static> {
    let mut hbs = Handlebars::new();

    hbs.register_escape_fn(no_escape);
    hbs.set_strict_mode(true);
    hbs.register_helper("eq", Box::new(eq_helper));

    hbs
}

/// Helper function for equality comparison in templates.
///
/// Usage: `{{#if (eq variable "value")}}...{{/if}}`
fn eq_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let param1 = h.param(0).and_then(|v| v.value().as_str());
    let param2 = h.param(1).and_then(|v| v.value().as_str());

    let result = match (param1, param2) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    };

    out.write(if result { "true" } else { "" })?;
    Ok(())
}

/// Template renderer for comment attribution and previews.
pub struct TemplateRenderer {
    handlebars: Handlebars<'static>,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer {
    /// Creates a new template renderer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlebars: create_handlebars_registry(),
        }
    }

    /// Renders a migrated comment.
    ///
    /// # Arguments
    ///
    /// * `template` - Comment template; sees `author`, `timestamp` and `body`
    /// * `author` - Source author, empty string in the template when unknown
    /// * `timestamp` - Source timestamp, empty string in the template when unknown
    /// * `body` - Comment body, already converted
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn render_comment(
        &self,
        template: &str,
        author: Option<&str>,
        timestamp: Option<&NaiveDateTime>,
        body: &str,
    ) -> Result<String, super::TemplateError> {
        let data = json!({
            "author": author.unwrap_or(""),
            "timestamp": timestamp.map(super::format_timestamp).unwrap_or_default(),
            "body": body,
        });

        self.render_template(template, &data)
    }

    /// Renders the dry-run preview line for a record.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn render_preview(&self, result: &MigrationResult) -> Result<String, super::TemplateError> {
        let status = match &result.status {
            Some(ResolvedStatus::Existing { id }) => format!("existing #{id}"),
            Some(ResolvedStatus::Created { id }) => format!("created #{id}"),
            Some(ResolvedStatus::Planned) => "new".to_string(),
            Some(ResolvedStatus::Default) => "project default".to_string(),
            None => "unresolved".to_string(),
        };
        let (assignee, match_kind, score) = match &result.assignment {
            Some(Resolution::Matched {
                identity,
                kind,
                score,
            }) => (identity.full_name.clone(), match_kind_name(*kind), *score),
            Some(Resolution::Unassigned { reason }) => (format!("unassigned ({reason})"), "", 0.0),
            None => ("-".to_string(), "", 0.0),
        };

        let data = json!({
            "row": result.row,
            "title": result.title,
            "status": status,
            "assignee": assignee,
            "match_kind": match_kind,
            "score": format!("{score:.2}"),
            "comments": result.comments.len(),
            "attachments": result.attachments.len(),
        });

        self.render_template(PREVIEW_TEMPLATE, &data)
    }

    /// Renders a template with the given data.
    fn render_template(
        &self,
        template: &str,
        data: &Value,
    ) -> Result<String, super::TemplateError> {
        Ok(self.handlebars.render_template(template, data)?)
    }
}

fn match_kind_name(kind: MatchKind) -> &'static str {
    match kind {
        MatchKind::Override => "override",
        MatchKind::Exact => "exact",
        MatchKind::Fuzzy => "fuzzy",
    }
}
