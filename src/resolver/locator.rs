//! Locator model: structural parsing of recorded locators.
//!
//! XPath values written by test authors embed attribute and text predicates
//! (`//input[@name='email']`, `//button[contains(text(), 'Log in')]`). The
//! candidate rules need those parts individually, so this module pulls them
//! out. Parsing is tolerant: a malformed or partial expression yields
//! `None`/empty, never an error.

use regex::Regex;
use std::fmt;

use crate::parser::types::{Locator, LocatorKind};

/// A concrete, executable query expression tried against the live DOM.
///
/// Same shape as [`Locator`], but guaranteed to be resolvable by the
/// driver: either a passthrough of the original locator or a synthesized
/// xpath from the candidate generator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Strategy {
    pub kind: LocatorKind,
    pub value: String,
}

impl Strategy {
    pub fn new(kind: LocatorKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Self::new(LocatorKind::Xpath, value)
    }

    pub fn from_locator(locator: &Locator) -> Self {
        Self::new(locator.kind, locator.value.clone())
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.kind, self.value)
    }
}

/// How an attribute predicate matches its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOp {
    Equals,
    Contains,
    StartsWith,
    EndsWith,
}

/// One attribute predicate extracted from an xpath value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrPredicate {
    pub name: String,
    pub value: String,
    pub op: MatchOp,
}

/// Structured view of a locator, consumed by the candidate rules.
#[derive(Debug, Clone)]
pub struct ParsedLocator {
    pub locator: Locator,
    /// Element tag for xpath locators (`*` for wildcard), if present.
    pub tag: Option<String>,
    /// Attribute predicates in source order.
    pub attributes: Vec<AttrPredicate>,
    /// Text predicate (`text()=` exact or `contains(text(), …)`).
    pub text: Option<String>,
}

impl ParsedLocator {
    pub fn parse(locator: &Locator) -> Self {
        let (tag, attributes, text) = match locator.kind {
            LocatorKind::Xpath => (
                extract_tag_name(&locator.value),
                extract_attributes(&locator.value),
                extract_text(&locator.value),
            ),
            // Simple one-term CSS selectors still carry an identifier worth
            // falling back on; anything more complex parses to nothing.
            LocatorKind::Css => parse_simple_css(&locator.value),
            _ => (None, Vec::new(), None),
        };

        Self {
            locator: locator.clone(),
            tag,
            attributes,
            text,
        }
    }

    /// Equality attribute predicates only.
    pub fn eq_attributes(&self) -> impl Iterator<Item = &AttrPredicate> {
        self.attributes
            .iter()
            .filter(|a| a.op == MatchOp::Equals)
    }

    /// First equality value for the given attribute name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name && a.op == MatchOp::Equals)
            .map(|a| a.value.as_str())
    }

    /// The tag to synthesize candidates on: the parsed tag, or `*`.
    pub fn tag_or_any(&self) -> &str {
        self.tag.as_deref().unwrap_or("*")
    }
}

/// Extract the leading element tag from an xpath value.
///
/// `//button[@id='x']` -> `button`, `//*[...]` -> `*`. Anything that does
/// not start with a `//tag` step yields `None`.
pub fn extract_tag_name(value: &str) -> Option<String> {
    let re = Regex::new(r"^\s*//([A-Za-z][A-Za-z0-9_-]*|\*)").unwrap();
    re.captures(value).map(|c| c[1].to_string())
}

/// A quoted xpath string literal: double- or single-quoted, each form
/// free to contain the other quote character. Two capture groups.
const QUOTED: &str = r#"(?:"([^"]*)"|'([^']*)')"#;

/// The capture from a [`QUOTED`] alternation, whichever side matched.
/// `first` is the double-quoted group's index; the single-quoted group
/// follows it.
fn quoted_group(captures: &regex::Captures<'_>, first: usize) -> String {
    captures
        .get(first)
        .or_else(|| captures.get(first + 1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Extract the value of an `@attr=` predicate from an xpath value.
pub fn extract_attribute(value: &str, attribute: &str) -> Option<String> {
    let re = Regex::new(&format!(
        r"@{}\s*=\s*{}",
        regex::escape(attribute),
        QUOTED
    ))
    .unwrap();
    re.captures(value).map(|c| quoted_group(&c, 1))
}

/// Extract the text predicate from an xpath value, exact or substring form.
pub fn extract_text(value: &str) -> Option<String> {
    let exact = Regex::new(&format!(r"text\(\)\s*=\s*{}", QUOTED)).unwrap();
    if let Some(c) = exact.captures(value) {
        return Some(quoted_group(&c, 1));
    }
    let contains =
        Regex::new(&format!(r"contains\(\s*text\(\)\s*,\s*{}\s*\)", QUOTED)).unwrap();
    contains.captures(value).map(|c| quoted_group(&c, 1))
}

/// All attribute predicates in source order.
pub fn extract_attributes(value: &str) -> Vec<AttrPredicate> {
    let mut found: Vec<(usize, AttrPredicate)> = Vec::new();

    let eq = Regex::new(&format!(
        r"@([A-Za-z_][A-Za-z0-9_-]*)\s*=\s*{}",
        QUOTED
    ))
    .unwrap();
    for c in eq.captures_iter(value) {
        found.push((
            c.get(0).unwrap().start(),
            AttrPredicate {
                name: c[1].to_string(),
                value: quoted_group(&c, 2),
                op: MatchOp::Equals,
            },
        ));
    }

    for (func, op) in [
        ("contains", MatchOp::Contains),
        ("starts-with", MatchOp::StartsWith),
        ("ends-with", MatchOp::EndsWith),
    ] {
        let re = Regex::new(&format!(
            r"{}\(\s*@([A-Za-z_][A-Za-z0-9_-]*)\s*,\s*{}\s*\)",
            func, QUOTED
        ))
        .unwrap();
        for c in re.captures_iter(value) {
            found.push((
                c.get(0).unwrap().start(),
                AttrPredicate {
                    name: c[1].to_string(),
                    value: quoted_group(&c, 2),
                    op,
                },
            ));
        }
    }

    found.sort_by_key(|(pos, _)| *pos);
    found.into_iter().map(|(_, p)| p).collect()
}

/// Quote a value as an xpath string literal.
///
/// XPath 1.0 has no escape sequences, so a value containing both quote
/// kinds has to be stitched together with `concat()`.
pub fn sanitize_xpath_value(value: &str) -> String {
    if value.contains('\'') && value.contains('"') {
        let parts: Vec<String> = value.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", parts.join(r#", "'", "#))
    } else if value.contains('\'') {
        format!("\"{}\"", value)
    } else {
        format!("'{}'", value)
    }
}

/// Pull (tag, attributes, text) out of a single-term CSS selector.
fn parse_simple_css(value: &str) -> (Option<String>, Vec<AttrPredicate>, Option<String>) {
    let re = Regex::new(r"^([A-Za-z][A-Za-z0-9_-]*)?([#.])([A-Za-z0-9_-]+)$").unwrap();
    if let Some(c) = re.captures(value.trim()) {
        let tag = c.get(1).map(|m| m.as_str().to_string());
        let attr = if &c[2] == "#" { "id" } else { "class" };
        let pred = AttrPredicate {
            name: attr.to_string(),
            value: c[3].to_string(),
            op: MatchOp::Equals,
        };
        return (tag, vec![pred], None);
    }
    (None, Vec::new(), None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_tag_name() {
        assert_eq!(
            extract_tag_name("//button[@id='submitBtn']").as_deref(),
            Some("button")
        );
        assert_eq!(extract_tag_name("//*[text()='Hi']").as_deref(), Some("*"));
        assert_eq!(extract_tag_name("div.btn"), None);
        assert_eq!(extract_tag_name(""), None);
    }

    #[test]
    fn test_extract_attribute() {
        let value = "//input[@name='userName' and @type=\"text\"]";
        assert_eq!(extract_attribute(value, "name").as_deref(), Some("userName"));
        assert_eq!(extract_attribute(value, "type").as_deref(), Some("text"));
        assert_eq!(extract_attribute(value, "id"), None);
    }

    #[test]
    fn test_extract_text() {
        assert_eq!(
            extract_text("//button[text()='Log in']").as_deref(),
            Some("Log in")
        );
        assert_eq!(
            extract_text("//a[contains(text(), 'Sign up')]").as_deref(),
            Some("Sign up")
        );
        assert_eq!(extract_text("//a[@href='/x']"), None);
    }

    #[test]
    fn test_extract_attributes_keeps_source_order() {
        let attrs =
            extract_attributes("//input[contains(@class, 'form') and @name='email']");
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].name, "class");
        assert_eq!(attrs[0].op, MatchOp::Contains);
        assert_eq!(attrs[1].name, "name");
        assert_eq!(attrs[1].op, MatchOp::Equals);
    }

    #[test]
    fn test_extract_text_with_embedded_quote() {
        assert_eq!(
            extract_text(r#"//button[text()="Don't save"]"#).as_deref(),
            Some("Don't save")
        );
    }

    #[test]
    fn test_malformed_xpath_parses_to_nothing() {
        let parsed = ParsedLocator::parse(&Locator::new(
            LocatorKind::Xpath,
            "button[@id='x'", // missing leading // and closing bracket
        ));
        assert_eq!(parsed.tag, None);
        // The attribute regex is still able to pick up the @id pair.
        assert_eq!(parsed.attribute("id"), Some("x"));
        assert_eq!(parsed.text, None);
    }

    #[test]
    fn test_sanitize_xpath_value() {
        assert_eq!(sanitize_xpath_value("plain"), "'plain'");
        assert_eq!(sanitize_xpath_value("it's"), "\"it's\"");
        assert_eq!(
            sanitize_xpath_value(r#"a'b"c"#),
            r#"concat('a', "'", 'b"c')"#
        );
    }

    #[test]
    fn test_parse_simple_css() {
        let parsed = ParsedLocator::parse(&Locator::new(LocatorKind::Css, "#login-form"));
        assert_eq!(parsed.attribute("id"), Some("login-form"));

        let parsed = ParsedLocator::parse(&Locator::new(LocatorKind::Css, "button.primary"));
        assert_eq!(parsed.tag.as_deref(), Some("button"));
        assert_eq!(parsed.attribute("class"), Some("primary"));

        let parsed =
            ParsedLocator::parse(&Locator::new(LocatorKind::Css, "div > span.label"));
        assert!(parsed.attributes.is_empty());
    }
}
