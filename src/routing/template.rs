//! Method url templates parsed into literal and parameter segments.

use crate::error::DefinitionError;
use regex::Regex;
use std::sync::OnceLock;

fn param_segment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\{([^{}/]+)\}$").expect("static regex"))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
}

/// Parsed method template. Empty for the API base url itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteTemplate {
    segments: Vec<Segment>,
}

/// Result of matching a template: the raw request segment bound to the parameter, if any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateMatch<'p> {
    pub param_value: Option<&'p str>,
}

impl RouteTemplate {
    pub fn parse(url: &str) -> Result<Self, DefinitionError> {
        let invalid = |reason: &'static str| DefinitionError::InvalidTemplate {
            url: url.to_string(),
            reason,
        };
        if url.is_empty() {
            return Ok(RouteTemplate { segments: Vec::new() });
        }
        if !url.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }
        if url.ends_with('/') {
            return Err(invalid("must not end with '/'"));
        }
        if url.contains('?') {
            return Err(invalid("query strings are not supported"));
        }
        let mut segments = Vec::new();
        for raw in url[1..].split('/') {
            if raw.is_empty() {
                return Err(invalid("empty path segment"));
            }
            if let Some(caps) = param_segment().captures(raw) {
                segments.push(Segment::Param(caps[1].to_string()));
            } else if raw.contains('{') || raw.contains('}') {
                return Err(invalid("parameters must fill a whole segment"));
            } else {
                segments.push(Segment::Literal(raw.to_string()));
            }
        }
        let template = RouteTemplate { segments };
        if template.param_count() > 1 {
            return Err(invalid("at most one parameter is supported"));
        }
        Ok(template)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn param_name(&self) -> Option<&str> {
        self.segments.iter().find_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn param_count(&self) -> usize {
        self.segments.iter().filter(|s| matches!(s, Segment::Param(_))).count()
    }

    pub fn literal_count(&self) -> usize {
        self.segments.len() - self.param_count()
    }

    /// (segment count, parameter count). Two methods of one verb may not share a shape.
    pub fn shape(&self) -> (usize, usize) {
        (self.segments.len(), self.param_count())
    }

    /// Match the part of a request path that follows the API base url.
    pub fn match_suffix<'p>(&self, suffix: &'p str) -> Option<TemplateMatch<'p>> {
        let parts = split_suffix(suffix);
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut param_value = None;
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(text) if text == part => {}
                Segment::Param(_) if !part.is_empty() => param_value = Some(part),
                _ => return None,
            }
        }
        Some(TemplateMatch { param_value })
    }
}

fn split_suffix(suffix: &str) -> Vec<&str> {
    let trimmed = suffix.strip_prefix('/').unwrap_or(suffix);
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}
