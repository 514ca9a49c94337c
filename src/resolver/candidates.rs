//! Candidate generation: the ordered fallback rule table.
//!
//! Given a locator that failed to resolve, this module synthesizes the
//! prioritized list of alternative strategies the resolver will probe. It
//! is a pure function of `(locator, action, input value)` with no I/O and
//! no environment dependence, so the produced list is deterministic and
//! the priority encoded in the rule table is directly testable.
//!
//! Rule families, in fixed priority order:
//! 1. contains-relaxation   exact attribute match -> substring match
//! 2. cross-field           id <-> name, same and related tags
//! 3. case-variation        respellings of the identifier or text
//! 4. tokenization          word tokens, single and AND-combined
//! 5. tag-substitution      semantically related tags, full predicate set
//! 6. action extras         radio groups for select, href tails for links
//! 7. catch-all             AND-combined tokens on any tag, always last

use std::collections::HashSet;

use crate::parser::types::{Action, Locator, LocatorKind};

use super::locator::{sanitize_xpath_value, ParsedLocator, Strategy};
use super::variations::{case_variations, match_tokens, split_identifier};

const XPATH_UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const XPATH_LOWER: &str = "abcdefghijklmnopqrstuvwxyz";

/// Everything a rule may look at.
struct RuleContext<'a> {
    parsed: &'a ParsedLocator,
    action: Action,
    input_value: Option<&'a str>,
}

type Rule = fn(&RuleContext<'_>) -> Vec<Strategy>;

/// The rule table. Earlier entries produce higher-priority candidates.
const RULES: &[(&str, Rule)] = &[
    ("contains-relaxation", contains_relaxation),
    ("cross-field", cross_field),
    ("case-variation", case_variation),
    ("tokenization", tokenization),
    ("tag-substitution", tag_substitution),
    ("action-extras", action_extras),
    ("catch-all", catch_all),
];

/// Build the ordered, deduplicated candidate list for a failed locator.
pub fn build_candidates(
    locator: &Locator,
    action: Action,
    input_value: Option<&str>,
) -> Vec<Strategy> {
    let parsed = ParsedLocator::parse(locator);
    let ctx = RuleContext {
        parsed: &parsed,
        action,
        input_value,
    };

    let mut seen: HashSet<Strategy> = HashSet::new();
    let mut out: Vec<Strategy> = Vec::new();
    for (name, rule) in RULES {
        for strategy in rule(&ctx) {
            if seen.insert(strategy.clone()) {
                log::debug!("candidate [{}] {}", name, strategy);
                out.push(strategy);
            }
        }
    }
    out
}

// ---- rule implementations ----------------------------------------------

/// Family 1: relax exact attribute equality (and exact text) into
/// substring matches on the same tag.
fn contains_relaxation(ctx: &RuleContext) -> Vec<Strategy> {
    let tag = base_tag(ctx);
    let mut out = Vec::new();

    for (field, value) in identifier_fields(ctx.parsed) {
        out.push(xp1(&tag, &contains_pred(&field, &value)));
    }
    if let Some(text) = text_value(ctx.parsed) {
        out.push(xp1(&tag, &text_contains_pred(&text)));
    }
    out
}

/// Family 2: an element recorded by `id` often lives under `name` on the
/// live page (and vice versa), sometimes on a sibling control tag.
fn cross_field(ctx: &RuleContext) -> Vec<Strategy> {
    let tag = base_tag(ctx);
    let reserves = reserve_tags(ctx, &tag);
    let mut out = Vec::new();

    for (field, value) in identifier_fields(ctx.parsed) {
        let Some(other) = cross_partner(&field) else {
            continue;
        };

        out.push(xp1(&tag, &eq_pred(other, &value)));
        out.push(xp1(&tag, &contains_pred(other, &value)));

        for reserve in &reserves {
            out.push(xp1(reserve, &eq_pred(&field, &value)));
            out.push(xp1(reserve, &contains_pred(&field, &value)));
            out.push(xp1(reserve, &eq_pred(other, &value)));
            out.push(xp1(reserve, &contains_pred(other, &value)));
        }
    }
    out
}

/// Family 3: respellings of the identifier value (and the text), exact and
/// substring, on the identifier's own field and its cross partner.
fn case_variation(ctx: &RuleContext) -> Vec<Strategy> {
    let tag = base_tag(ctx);
    let mut out = Vec::new();

    for (field, value) in identifier_fields(ctx.parsed) {
        let other = cross_partner(&field);
        for variation in case_variations(&value) {
            if variation == value {
                continue;
            }
            out.push(xp1(&tag, &eq_pred(&field, &variation)));
            out.push(xp1(&tag, &contains_pred(&field, &variation)));
            if let Some(other) = other {
                out.push(xp1(&tag, &eq_pred(other, &variation)));
                out.push(xp1(&tag, &contains_pred(other, &variation)));
            }
        }
    }

    if let Some(text) = text_value(ctx.parsed) {
        for variation in case_variations(&text) {
            if variation == text {
                continue;
            }
            out.push(xp1(&tag, &text_eq_pred(&variation)));
            out.push(xp1(&tag, &text_contains_pred(&variation)));
        }
    }
    out
}

/// Family 4: word tokens. Each token alone as a substring match; all
/// tokens AND-combined case-insensitively, which survives rewording and
/// reordering of the live value.
fn tokenization(ctx: &RuleContext) -> Vec<Strategy> {
    let tag = base_tag(ctx);
    token_strategies_for_tag(ctx.parsed, &tag)
}

/// Family 5: swap the tag for its semantic siblings, re-deriving the full
/// predicate set (exact, substring, variations, tokens) on each. A button
/// that became an anchor keeps its identity in the attributes, not the tag.
fn tag_substitution(ctx: &RuleContext) -> Vec<Strategy> {
    let mut out = Vec::new();
    let tag = base_tag(ctx);

    for substitute in substitute_tags(&tag) {
        for (field, value) in identifier_fields(ctx.parsed) {
            out.push(xp1(substitute, &eq_pred(&field, &value)));
            out.push(xp1(substitute, &contains_pred(&field, &value)));
            if let Some(other) = cross_partner(&field) {
                out.push(xp1(substitute, &eq_pred(other, &value)));
                out.push(xp1(substitute, &contains_pred(other, &value)));
            }
            for variation in case_variations(&value) {
                if variation == value {
                    continue;
                }
                out.push(xp1(substitute, &eq_pred(&field, &variation)));
                out.push(xp1(substitute, &contains_pred(&field, &variation)));
            }
        }
        if let Some(text) = text_value(ctx.parsed) {
            out.push(xp1(substitute, &text_eq_pred(&text)));
            out.push(xp1(substitute, &text_contains_pred(&text)));
        }
        out.extend(token_strategies_for_tag(ctx.parsed, substitute));
    }

    // Custom widgets replacing a native <select>.
    if tag == "select" {
        for (field, value) in identifier_fields(ctx.parsed) {
            for class_hint in ["select", "dropdown"] {
                out.push(Strategy::xpath(format!(
                    "//div[contains(@class, '{}') and {}]",
                    class_hint,
                    eq_pred(&field, &value)
                )));
            }
        }
    }

    // Label stand-ins: a label wired to the control, or carrying its text.
    if let Some(value) = primary_identifier(ctx.parsed) {
        out.push(xp1("label", &eq_pred("for", &value)));
    }
    if let Some(text) = text_value(ctx.parsed) {
        out.push(xp1("label", &text_eq_pred(&text)));
        out.push(xp1("label", &text_contains_pred(&text)));
    }
    out
}

/// Family 6: action-specific extras.
fn action_extras(ctx: &RuleContext) -> Vec<Strategy> {
    let mut out = Vec::new();

    match ctx.action {
        Action::Select => {
            // A native <select> replaced by a radio group sharing the
            // recorded id/name, optionally narrowed by the target value.
            for (_, value) in identifier_fields(ctx.parsed) {
                if let Some(input) = ctx.input_value.filter(|v| !v.trim().is_empty()) {
                    out.push(Strategy::xpath(format!(
                        "//input[@type='radio' and @name={} and @value={}]",
                        sanitize_xpath_value(&value),
                        sanitize_xpath_value(input)
                    )));
                    let lower = input.to_lowercase();
                    if lower != input {
                        out.push(Strategy::xpath(format!(
                            "//input[@type='radio' and @name={} and @value={}]",
                            sanitize_xpath_value(&value),
                            sanitize_xpath_value(&lower)
                        )));
                    }
                }
                out.push(Strategy::xpath(format!(
                    "//input[@type='radio' and @name={}]",
                    sanitize_xpath_value(&value)
                )));
                out.push(xp1("div", &eq_pred("data-select", &value)));
            }
        }
        Action::Click => {
            // Anchor recorded by href: the path tail survives most
            // routing changes.
            if let Some(href) = ctx.parsed.attribute("href") {
                out.push(xp1("a", &contains_pred("href", href)));
                if let Some(segment) = last_path_segment(href) {
                    out.push(xp1("a", &contains_pred("href", segment)));
                }
            }
        }
        _ => {}
    }
    out
}

/// Family 7: the last resort. AND-combined tokens with no tag constraint.
fn catch_all(ctx: &RuleContext) -> Vec<Strategy> {
    let mut out = Vec::new();

    for (field, value) in identifier_fields(ctx.parsed) {
        let tokens = match_tokens(&value);
        if !tokens.is_empty() {
            out.push(xp1("*", &and_tokens_pred(&attr_expr(&field), &tokens)));
        }
    }

    if let Some(text) = text_value(ctx.parsed) {
        let tokens = match_tokens(&text);
        if !tokens.is_empty() {
            out.push(xp1("*", &and_tokens_pred("normalize-space(.)", &tokens)));
        } else {
            out.push(xp1("*", &text_contains_pred(&text)));
        }
    }
    out
}

// ---- shared pieces ------------------------------------------------------

/// The identifier attributes worth falling back on, as (field, value).
fn identifier_fields(parsed: &ParsedLocator) -> Vec<(String, String)> {
    match parsed.locator.kind {
        LocatorKind::Id => vec![("id".to_string(), parsed.locator.value.clone())],
        LocatorKind::Name => vec![("name".to_string(), parsed.locator.value.clone())],
        LocatorKind::Class => vec![("class".to_string(), parsed.locator.value.clone())],
        LocatorKind::Xpath | LocatorKind::Css => parsed
            .eq_attributes()
            .filter(|a| !matches!(a.name.as_str(), "href" | "type" | "value"))
            .map(|a| (a.name.clone(), a.value.clone()))
            .collect(),
        _ => Vec::new(),
    }
}

/// The highest-value identifier for label wiring: id before name.
fn primary_identifier(parsed: &ParsedLocator) -> Option<String> {
    match parsed.locator.kind {
        LocatorKind::Id | LocatorKind::Name => Some(parsed.locator.value.clone()),
        _ => parsed
            .attribute("id")
            .or_else(|| parsed.attribute("name"))
            .map(str::to_string),
    }
}

/// Textual value to match against element text.
fn text_value(parsed: &ParsedLocator) -> Option<String> {
    match parsed.locator.kind {
        LocatorKind::LinkText | LocatorKind::PartialLinkText => {
            Some(parsed.locator.value.clone())
        }
        _ => parsed.text.clone(),
    }
}

/// Tag candidates are generated on.
fn base_tag(ctx: &RuleContext) -> String {
    match ctx.parsed.locator.kind {
        LocatorKind::LinkText | LocatorKind::PartialLinkText => "a".to_string(),
        LocatorKind::Tag => ctx.parsed.locator.value.clone(),
        _ => match ctx.parsed.tag.as_deref() {
            Some(tag) => tag.to_string(),
            // No structural tag: id/name/class locators fall back on the
            // action's natural control tag.
            None => match ctx.action {
                Action::Input => "input".to_string(),
                Action::Select => "select".to_string(),
                _ => "*".to_string(),
            },
        },
    }
}

/// Sibling control tags probed by the cross-field rule.
fn reserve_tags(ctx: &RuleContext, tag: &str) -> Vec<&'static str> {
    match ctx.action {
        Action::Input => match tag {
            "textarea" => vec!["input"],
            _ => vec!["textarea"],
        },
        Action::Select => vec!["option"],
        Action::Click | Action::WaitForElementVisible => match tag {
            "button" => vec!["a"],
            "a" => vec!["button"],
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Tags an element migrates to when markup is restyled.
fn substitute_tags(tag: &str) -> Vec<&'static str> {
    const CLICKABLE_SET: &[&str] = &["button", "a", "div", "span", "input"];

    match tag {
        "button" | "a" | "div" | "span" | "input" => CLICKABLE_SET
            .iter()
            .copied()
            .filter(|t| *t != tag)
            .collect(),
        "select" => Vec::new(), // handled via the class-hint divs
        _ => Vec::new(),
    }
}

fn cross_partner(field: &str) -> Option<&'static str> {
    match field {
        "id" => Some("name"),
        "name" => Some("id"),
        _ => None,
    }
}

/// Single-token and AND-combined token strategies for a tag.
fn token_strategies_for_tag(parsed: &ParsedLocator, tag: &str) -> Vec<Strategy> {
    let mut out = Vec::new();

    for (field, value) in identifier_fields(parsed) {
        for part in split_identifier(&value) {
            if part.len() > 2 {
                out.push(xp1(tag, &contains_pred(&field, &part)));
            }
        }
        let tokens = match_tokens(&value);
        if tokens.len() >= 2 {
            out.push(xp1(tag, &and_tokens_pred(&attr_expr(&field), &tokens)));
        }
    }

    if let Some(text) = text_value(parsed) {
        for part in split_identifier(&text) {
            if part.len() > 2 {
                out.push(xp1(tag, &text_contains_pred(&part)));
            }
        }
        let tokens = match_tokens(&text);
        if tokens.len() >= 2 {
            out.push(xp1(tag, &and_tokens_pred("normalize-space(.)", &tokens)));
        }
    }
    out
}

// ---- xpath assembly -----------------------------------------------------

fn xp1(tag: &str, predicate: &str) -> Strategy {
    Strategy::xpath(format!("//{}[{}]", tag, predicate))
}

fn attr_expr(field: &str) -> String {
    format!("@{}", field)
}

fn eq_pred(field: &str, value: &str) -> String {
    format!("@{}={}", field, sanitize_xpath_value(value))
}

fn contains_pred(field: &str, value: &str) -> String {
    format!("contains(@{}, {})", field, sanitize_xpath_value(value))
}

fn text_eq_pred(value: &str) -> String {
    format!("text()={}", sanitize_xpath_value(value))
}

fn text_contains_pred(value: &str) -> String {
    format!("contains(text(), {})", sanitize_xpath_value(value))
}

/// Case-insensitive "all tokens present" predicate over an expression,
/// lower-casing via `translate` (xpath 1.0 has no lower-case()).
fn and_tokens_pred(expr: &str, tokens: &[String]) -> String {
    let lowered = format!(
        "translate({}, '{}', '{}')",
        expr, XPATH_UPPER, XPATH_LOWER
    );
    tokens
        .iter()
        .map(|t| format!("contains({}, {})", lowered, sanitize_xpath_value(t)))
        .collect::<Vec<_>>()
        .join(" and ")
}

fn last_path_segment(href: &str) -> Option<&str> {
    href.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty() && !s.contains(':'))
}
