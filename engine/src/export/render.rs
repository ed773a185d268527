//! Side-table rendering.
//!
//! A bean configured as the `errors` or `strings` table is additionally
//! rendered through a text template per export target, e.g. to generate
//! error-code constants for client code.

use serde_json::Value;

/// Side-table kinds, as used in config keys (`<kind>-table`).
pub const SIDE_TABLES: [&str; 2] = ["errors", "strings"];

/// Renders table rows through a template.
pub trait TableRenderer {
    /// Render `rows` with template source `template`.
    fn render(&self, template: &str, rows: &[Value]) -> Result<String, String>;
}

/// Substitutes `{{rows}}` with the rows as pretty JSON and `{{count}}` with
/// the number of rows.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderRenderer;

impl PlaceholderRenderer {
    pub const ROWS: &'static str = "{{rows}}";
    pub const COUNT: &'static str = "{{count}}";
}

impl TableRenderer for PlaceholderRenderer {
    fn render(&self, template: &str, rows: &[Value]) -> Result<String, String> {
        let json = serde_json::to_string_pretty(rows).map_err(|e| e.to_string())?;
        Ok(template
            .replace(Self::ROWS, &json)
            .replace(Self::COUNT, &rows.len().to_string()))
    }
}
