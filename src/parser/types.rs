use serde::{Deserialize, Serialize};
use std::fmt;

/// A test suite file: an ordered list of test cases.
pub type TestSuite = Vec<TestCase>;

/// A single named test case with its ordered steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub test_name: String,

    #[serde(default)]
    pub steps: Vec<TestStep>,
}

/// One step of a test case.
///
/// `input_value` is only meaningful for `input` and `select` actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestStep {
    pub action: Action,

    pub locator: Locator,

    #[serde(default)]
    pub input_value: Option<String>,
}

impl TestStep {
    /// Short human-readable description for progress output.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.action, self.locator)
    }
}

/// The supported step actions. Anything else fails at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Goto,
    Input,
    Click,
    Select,
    WaitForElementVisible,
    WaitForRedirect,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Goto => "goto",
            Action::Input => "input",
            Action::Click => "click",
            Action::Select => "select",
            Action::WaitForElementVisible => "waitForElementVisible",
            Action::WaitForRedirect => "waitForRedirect",
        };
        write!(f, "{}", name)
    }
}

/// Symbolic reference to a DOM element as recorded in a step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    #[serde(rename = "type")]
    pub kind: LocatorKind,

    pub value: String,
}

impl Locator {
    pub fn new(kind: LocatorKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.kind, self.value)
    }
}

/// Locator query languages accepted in step files.
///
/// `url` is not an element reference: `goto` and `waitForRedirect` steps
/// carry their target address in `locator.value` with this kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorKind {
    Id,
    Name,
    Xpath,
    Css,
    Class,
    LinkText,
    PartialLinkText,
    Tag,
    Url,
}

impl fmt::Display for LocatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LocatorKind::Id => "id",
            LocatorKind::Name => "name",
            LocatorKind::Xpath => "xpath",
            LocatorKind::Css => "css",
            LocatorKind::Class => "class",
            LocatorKind::LinkText => "link_text",
            LocatorKind::PartialLinkText => "partial_link_text",
            LocatorKind::Tag => "tag",
            LocatorKind::Url => "url",
        };
        write!(f, "{}", name)
    }
}
