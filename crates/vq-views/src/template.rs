//! Dynamic view titles
//!
//! Titles may reference `{measure}`, `{optional_filter}` and `{<slug>}` of any
//! active filter, with optional whitespace inside the braces. A template that
//! does not parse or references an unknown name is shown as written.

use indexmap::IndexMap;
use thiserror::Error;

use vq_core::FilterChain;

/// Errors raised while rendering a title template
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unclosed placeholder starting at byte {0}")]
    Unclosed(usize),

    #[error("invalid placeholder name '{0}'")]
    InvalidName(String),

    #[error("no value for placeholder '{0}'")]
    Unresolved(String),
}

/// Values available to a title template
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleContext {
    pub measure: Option<String>,
    pub optional_filter: Option<String>,

    /// Filter values keyed by slug
    pub filters: IndexMap<String, String>,
}

impl TitleContext {
    pub fn new(measure: impl Into<String>) -> Self {
        Self {
            measure: Some(measure.into()),
            ..Default::default()
        }
    }

    /// Add the well-formed clauses of a chain, keyed by the slug of their field
    pub fn with_filters(mut self, chain: &FilterChain) -> Self {
        for clause in chain.well_formed() {
            self.filters
                .entry(slugify(&clause.field))
                .or_insert_with(|| clause.value.clone());
        }
        self
    }

    /// Resolve `{optional_filter}` from the clause on `field`, if any
    pub fn with_optional_filter(mut self, chain: &FilterChain, field: &str) -> Self {
        self.optional_filter = chain
            .well_formed()
            .find(|clause| clause.field == field)
            .map(|clause| clause.value.clone());
        self
    }

    fn lookup(&self, name: &str) -> Option<&str> {
        match name {
            "measure" => self.measure.as_deref(),
            "optional_filter" => self.optional_filter.as_deref(),
            slug => self.filters.get(slug).map(String::as_str),
        }
    }
}

/// Render a title, falling back to the literal template on any error
pub fn render_title(template: &str, context: &TitleContext) -> String {
    match try_render_title(template, context) {
        Ok(title) => title,
        Err(e) => {
            tracing::debug!("Title template '{}' left as is: {}", template, e);
            template.to_string()
        }
    }
}

pub fn try_render_title(template: &str, context: &TitleContext) -> Result<String, TemplateError> {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;
    let mut offset = 0;

    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or(TemplateError::Unclosed(offset + open))?;

        let name = after[..close].trim();
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(TemplateError::InvalidName(name.to_string()));
        }
        let value = context
            .lookup(name)
            .ok_or_else(|| TemplateError::Unresolved(name.to_string()))?;
        rendered.push_str(value);

        let consumed = open + 1 + close + 1;
        offset += consumed;
        rest = &rest[consumed..];
    }

    rendered.push_str(rest);
    Ok(rendered)
}

/// Placeholder name of a filter field: lower case, runs of other characters
/// collapsed to `_`
pub fn slugify(field: &str) -> String {
    let mut slug = String::with_capacity(field.len());
    let mut pending_separator = false;

    for c in field.trim().chars() {
        if c.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_separator = true;
        }
    }
    slug
}
