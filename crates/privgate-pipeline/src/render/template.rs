//! Minimal placeholder templates.
//!
//! Placeholders are `{{ name }}` with lowercase ASCII letters and underscores. A
//! template is validated against a [`SlotSpec`] when loaded: unknown names, missing
//! required names and stray braces are all reported as unavailable templates.

use std::path::Path;

use tokio::fs;

use crate::error::{RenderingError, RenderingResult};

/// Placeholders a template may and must contain.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SlotSpec {
    pub(crate) allowed: &'static [&'static str],
    pub(crate) required: &'static [&'static str],
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Slot(String),
}

/// Parsed template ready for substitution.
#[derive(Debug, Clone)]
pub(crate) struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Read and validate the template at `path`.
    pub(crate) async fn load(path: &Path, spec: SlotSpec) -> RenderingResult<Self> {
        let source = fs::read_to_string(path).await.map_err(|source| {
            RenderingError::TemplateUnavailable {
                path: path.to_path_buf(),
                reason: "unreadable",
                source: Some(source),
            }
        })?;
        Self::parse(path, &source, spec)
    }

    fn parse(path: &Path, source: &str, spec: SlotSpec) -> RenderingResult<Self> {
        let fail = |reason| RenderingError::template(path.to_path_buf(), reason);
        let mut segments = Vec::new();
        let mut rest = source;

        while let Some(open) = rest.find("{{") {
            let (text, tail) = rest.split_at(open);
            if text.contains("}}") {
                return Err(fail("unbalanced_braces"));
            }
            if !text.is_empty() {
                segments.push(Segment::Text(text.to_string()));
            }
            let tail = &tail[2..];
            let close = tail.find("}}").ok_or_else(|| fail("unbalanced_braces"))?;
            let name = tail[..close].trim();
            if name.is_empty() || !name.bytes().all(|b| b.is_ascii_lowercase() || b == b'_') {
                return Err(fail("malformed_placeholder"));
            }
            if !spec.allowed.contains(&name) {
                return Err(fail("unknown_placeholder"));
            }
            segments.push(Segment::Slot(name.to_string()));
            rest = &tail[close + 2..];
        }
        if rest.contains("}}") {
            return Err(fail("unbalanced_braces"));
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        let has_slot = |wanted: &str| {
            segments
                .iter()
                .any(|segment| matches!(segment, Segment::Slot(name) if name == wanted))
        };
        if !spec.required.iter().all(|name| has_slot(name)) {
            return Err(fail("missing_placeholder"));
        }
        Ok(Self { segments })
    }

    /// Substitute `values`; slots without a value render empty. Values are inserted verbatim.
    pub(crate) fn fill(&self, values: &[(&str, &str)]) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Slot(name) => {
                    if let Some((_, value)) = values.iter().find(|(key, _)| *key == name.as_str()) {
                        out.push_str(value);
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: SlotSpec = SlotSpec {
        allowed: &["title", "content", "build"],
        required: &["title", "content"],
    };

    fn parse(source: &str) -> RenderingResult<Template> {
        Template::parse(Path::new("result.html"), source, SPEC)
    }

    fn reason(source: &str) -> Option<&'static str> {
        match parse(source) {
            Err(RenderingError::TemplateUnavailable { reason, .. }) => Some(reason),
            _ => None,
        }
    }

    #[test]
    fn fills_known_slots() -> RenderingResult<()> {
        let template = parse("<title>{{ title }}</title><main>{{content}}</main>{{ build }}")?;
        let rendered = template.fill(&[("title", "Result"), ("content", "<p>ok</p>")]);
        assert_eq!(rendered, "<title>Result</title><main><p>ok</p></main>");
        Ok(())
    }

    #[test]
    fn rejects_malformed_templates() {
        assert_eq!(reason("{{ title }} {{ content"), Some("unbalanced_braces"));
        assert_eq!(reason("{{ title }} }} {{ content }}"), Some("unbalanced_braces"));
        assert_eq!(reason("{{ title }} {{ content }} {{ secret }}"), Some("unknown_placeholder"));
        assert_eq!(reason("{{ title }} {{ Content }}"), Some("malformed_placeholder"));
        assert_eq!(reason("{{ title }} {{ }}"), Some("malformed_placeholder"));
        assert_eq!(reason("{{ title }} only"), Some("missing_placeholder"));
    }

    #[tokio::test]
    async fn missing_file_is_unavailable() {
        let err = Template::load(Path::new("/definitely/not/here.html"), SPEC).await;
        assert!(matches!(
            err,
            Err(RenderingError::TemplateUnavailable {
                reason: "unreadable",
                source: Some(_),
                ..
            })
        ));
    }
}
