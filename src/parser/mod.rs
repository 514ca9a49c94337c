pub mod json;
pub mod types;

pub use json::parse_suite_file;
pub use types::{Action, Locator, LocatorKind, TestCase, TestStep, TestSuite};
