//! HTML helpers for the portal: login form discovery and attendance extraction.
//!
//! Everything here is synchronous and returns owned data, so the parsed
//! document never lives across an `.await`.

use regex::Regex;
use scraper::{Html, Node, Selector};
use std::sync::OnceLock;

/// Login form fields discovered on the portal's login page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoginForm {
    pub action: Option<String>,
    pub hidden_fields: Vec<(String, String)>,
}

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

/// Picks the form that holds a password input, falling back to the first form.
pub fn parse_login_form(html: &str) -> LoginForm {
    let document = Html::parse_document(html);
    let form_sel = selector("form");
    let password_sel = selector(r#"input[type="password"]"#);
    let hidden_sel = selector(r#"input[type="hidden"]"#);

    let form = document
        .select(&form_sel)
        .find(|form| form.select(&password_sel).next().is_some())
        .or_else(|| document.select(&form_sel).next());

    let Some(form) = form else {
        return LoginForm::default();
    };

    let hidden_fields = form
        .select(&hidden_sel)
        .filter_map(|input| {
            let name = input.value().attr("name")?;
            let value = input.value().attr("value").unwrap_or_default();
            Some((name.to_string(), value.to_string()))
        })
        .collect();

    LoginForm {
        action: form
            .value()
            .attr("action")
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string),
        hidden_fields,
    }
}

/// A rendered password input means the portal is still showing a login form.
pub fn has_password_input(html: &str) -> bool {
    let document = Html::parse_document(html);
    let password_sel = selector(r#"input[type="password"]"#);
    document.select(&password_sel).next().is_some()
}

/// Visible text of the page, one space between text nodes.
pub fn page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut parts = Vec::new();

    for node in document.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|parent| parent.value().as_element().map(|el| el.name()))
            .is_some_and(|name| matches!(name, "script" | "style" | "noscript" | "title"));
        if hidden {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed.to_string());
        }
    }

    parts.join(" ")
}

fn extraction_rules() -> &'static [Regex] {
    static RULES: OnceLock<Vec<Regex>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            // Attendance : 1234/1400 (88.14)
            r"(?i)attendance\s*:?[^()%]{0,80}?\(\s*\b(\d{1,3}(?:\.\d+)?)\s*%?\s*\)",
            // Attendance: 87%
            r"(?i)attendance[^%]{0,80}?\b(\d{1,3}(?:\.\d+)?)\s*%",
            r"\b(\d{1,3}(?:\.\d+)?)%",
            r"\b(\d{1,3}(?:\.\d+)?)\s*(?:%|$)",
        ]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("static regex is valid"))
        .collect()
    })
}

/// Finds the attendance percentage in page text. Rules run from most to
/// least specific; within a rule the first value in 0..=100 wins.
pub fn extract_percentage(text: &str) -> Option<f64> {
    extraction_rules().iter().find_map(|rule| {
        rule.captures_iter(text)
            .filter_map(|caps| caps.get(1)?.as_str().parse::<f64>().ok())
            .find(|value| (0.0..=100.0).contains(value))
    })
}

const DEFAULT_FAILURE_PATTERN: &str = r"(?i)(invalid|incorrect|wrong)\s+(user\s*name|username|user\s*id|password|credentials|login)|login\s+failed|authentication\s+failed|do\s+not\s+match";

pub fn default_failure_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(DEFAULT_FAILURE_PATTERN).expect("static regex is valid"))
}
