//! Structured `Content-Type` and `Content-Disposition` values.

use serde::{Deserialize, Serialize};

/// Parsed `Content-Type` header: primary/subtype plus ordered parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentType {
    /// Primary type, lowercase (e.g. `"text"`, `"multipart"`).
    pub primary: String,

    /// Subtype, lowercase (e.g. `"plain"`, `"mixed"`).
    pub subtype: String,

    /// Parameters in document order: lowercase key, unquoted value.
    pub parameters: Vec<(String, String)>,
}

impl ContentType {
    /// Parse a raw `Content-Type` value, e.g.
    /// `multipart/mixed; boundary="xyz"; charset=utf-8`.
    pub fn parse(value: &str) -> Self {
        let mut fields = value.split(';');
        let essence = fields.next().unwrap_or("").trim();
        let (primary, subtype) = match essence.split_once('/') {
            Some((p, s)) => (p.trim().to_lowercase(), s.trim().to_lowercase()),
            None => (essence.to_lowercase(), String::new()),
        };
        Self {
            primary,
            subtype,
            parameters: parse_parameters(fields),
        }
    }

    /// The RFC default applied when the header is absent: `text/plain`.
    pub fn default_text_plain() -> Self {
        Self {
            primary: "text".to_string(),
            subtype: "plain".to_string(),
            parameters: Vec::new(),
        }
    }

    /// `"primary/subtype"` without parameters.
    pub fn essence(&self) -> String {
        format!("{}/{}", self.primary, self.subtype)
    }

    /// `true` for any `multipart/*` type.
    pub fn is_multipart(&self) -> bool {
        self.primary == "multipart"
    }

    /// First parameter value for `key` (keys are stored lowercase).
    pub fn parameter(&self, key: &str) -> Option<&str> {
        let key = key.to_lowercase();
        self.parameters
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The multipart `boundary` parameter, if present and non-empty.
    pub fn boundary(&self) -> Option<&str> {
        self.parameter("boundary").filter(|b| !b.is_empty())
    }
}

impl Default for ContentType {
    fn default() -> Self {
        Self::default_text_plain()
    }
}

/// Parsed `Content-Disposition` header: kind token plus ordered parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDisposition {
    /// Disposition token, lowercase (`"attachment"`, `"inline"`, ...).
    pub kind: String,

    /// Parameters in document order: lowercase key, unquoted value.
    pub parameters: Vec<(String, String)>,
}

impl ContentDisposition {
    /// Parse a raw `Content-Disposition` value, e.g.
    /// `attachment; filename="a.pdf"`.
    pub fn parse(value: &str) -> Self {
        let mut fields = value.split(';');
        let kind = fields.next().unwrap_or("").trim().to_lowercase();
        Self {
            kind,
            parameters: parse_parameters(fields),
        }
    }

    /// The `filename` parameter, if present.
    pub fn filename(&self) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k == "filename")
            .map(|(_, v)| v.as_str())
    }
}

/// Parse `key=value` fields separated by `;`, unquoting quoted values.
fn parse_parameters<'a>(fields: impl Iterator<Item = &'a str>) -> Vec<(String, String)> {
    let mut parameters = Vec::new();
    for field in fields {
        let field = field.trim();
        if field.is_empty() {
            continue;
        }
        let (key, value) = match field.split_once('=') {
            Some((k, v)) => (k.trim().to_lowercase(), unquote(v.trim())),
            // Bare token without a value, kept with an empty value.
            None => (field.to_lowercase(), String::new()),
        };
        parameters.push((key, value));
    }
    parameters
}

/// Strip one level of surrounding double quotes.
fn unquote(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        value[1..value.len() - 1].to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_content_type() {
        let ct = ContentType::parse("text/plain");
        assert_eq!(ct.primary, "text");
        assert_eq!(ct.subtype, "plain");
        assert!(ct.parameters.is_empty());
        assert_eq!(ct.essence(), "text/plain");
    }

    #[test]
    fn test_parse_content_type_with_parameters() {
        let ct = ContentType::parse("Multipart/Mixed; boundary=\"=_abc 123\"; charset=utf-8");
        assert_eq!(ct.essence(), "multipart/mixed");
        assert!(ct.is_multipart());
        assert_eq!(ct.boundary(), Some("=_abc 123"));
        assert_eq!(ct.parameter("charset"), Some("utf-8"));
        assert_eq!(ct.parameters.len(), 2);
    }

    #[test]
    fn test_parameter_keys_case_insensitive() {
        let ct = ContentType::parse("text/plain; CharSet=ISO-8859-1");
        assert_eq!(ct.parameter("charset"), Some("ISO-8859-1"));
    }

    #[test]
    fn test_missing_subtype() {
        let ct = ContentType::parse("text");
        assert_eq!(ct.primary, "text");
        assert_eq!(ct.subtype, "");
    }

    #[test]
    fn test_empty_boundary_is_missing() {
        let ct = ContentType::parse("multipart/mixed; boundary=\"\"");
        assert_eq!(ct.boundary(), None);
    }

    #[test]
    fn test_parse_disposition() {
        let cd = ContentDisposition::parse("Attachment; filename=\"report.pdf\"");
        assert_eq!(cd.kind, "attachment");
        assert_eq!(cd.filename(), Some("report.pdf"));
    }

    #[test]
    fn test_parse_disposition_inline_bare() {
        let cd = ContentDisposition::parse("inline");
        assert_eq!(cd.kind, "inline");
        assert_eq!(cd.filename(), None);
    }
}
