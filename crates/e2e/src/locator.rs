//! Element locators
//!
//! Case files and defaults use one string form for every selector. XPath is
//! recognized by its leading `/`, `./` or `(`. The jQuery-style
//! `tag:contains('text')` form is rewritten to an XPath text match since
//! browsers do not support it natively. Everything else is CSS.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static CONTAINS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*([A-Za-z][A-Za-z0-9-]*)?\s*:contains\(\s*(?:'([^']*)'|"([^"]*)")\s*\)\s*$"#)
        .expect("valid :contains regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn parse(selector: &str) -> Self {
        let trimmed = selector.trim_start();
        if trimmed.starts_with('/') || trimmed.starts_with("./") || trimmed.starts_with('(') {
            return Locator::XPath(selector.to_string());
        }

        if let Some(caps) = CONTAINS_RE.captures(selector) {
            let tag = caps.get(1).map(|m| m.as_str()).unwrap_or("*");
            let text = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or_default();
            return Self::text(tag, text);
        }

        Locator::Css(selector.to_string())
    }

    /// Elements of `tag` whose text content contains `text`
    pub fn text(tag: &str, text: &str) -> Self {
        Locator::XPath(format!("//{}[contains(., {})]", tag, xpath_literal(text)))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Locator::Css(s) | Locator::XPath(s) => s,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Locator {
    fn from(selector: &str) -> Self {
        Locator::parse(selector)
    }
}

impl From<String> for Locator {
    fn from(selector: String) -> Self {
        Locator::parse(&selector)
    }
}

/// Quote a string for use inside an XPath expression
fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        return format!("'{}'", text);
    }
    if !text.contains('"') {
        return format!("\"{}\"", text);
    }
    let parts: Vec<String> = text.split('\'').map(|p| format!("'{}'", p)).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("#loginbtn", Locator::Css("#loginbtn".into()); "id")]
    #[test_case("[data-mce-name=\"italic\"]", Locator::Css("[data-mce-name=\"italic\"]".into()); "attribute")]
    #[test_case("//div[@id='x']", Locator::XPath("//div[@id='x']".into()); "absolute xpath")]
    #[test_case("(//a)[1]", Locator::XPath("(//a)[1]".into()); "grouped xpath")]
    #[test_case("a:contains('Log out')", Locator::XPath("//a[contains(., 'Log out')]".into()); "contains single quoted")]
    #[test_case("a:contains(\"L01.25-Q\")", Locator::XPath("//a[contains(., 'L01.25-Q')]".into()); "contains double quoted")]
    #[test_case(":contains('Settings')", Locator::XPath("//*[contains(., 'Settings')]".into()); "contains without tag")]
    fn test_parse(selector: &str, expected: Locator) {
        assert_eq!(Locator::parse(selector), expected);
    }

    #[test]
    fn test_text_with_apostrophe() {
        assert_eq!(
            Locator::text("a", "Bob's course").as_str(),
            "//a[contains(., \"Bob's course\")]"
        );
        assert_eq!(
            Locator::text("a", "it's \"x\"").as_str(),
            "//a[contains(., concat('it', \"'\", 's \"x\"'))]"
        );
    }
}
