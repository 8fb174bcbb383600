//! Property filter for list views.
//!
//! A [`PropertyFilter`] decides whether an item belongs to a view. The view
//! only talks to it through two calls: [`PropertyFilter::prepare`], which
//! compiles the pattern once per batch, and [`PropertyFilter::matches`],
//! which evaluates one item through its numeric and string accessors.

use std::fmt;

use regex::{Regex, RegexBuilder};
use viewsync_core::logging::targets;

use crate::error::{Result, ViewError};
use crate::property::{Property, SortMethod};

/// How the filter pattern is matched against text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum StringMatchMethod {
    /// Case-insensitive substring.
    #[default]
    Partial = 0,
    /// Case-insensitive regular expression.
    Regex = 1,
    /// Case-insensitive whole-string wildcard (`*` and `?`).
    Wildcard = 2,
    /// Case-sensitive equality.
    Exact = 3,
}

impl TryFrom<u8> for StringMatchMethod {
    type Error = ViewError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Partial),
            1 => Ok(Self::Regex),
            2 => Ok(Self::Wildcard),
            3 => Ok(Self::Exact),
            other => Err(ViewError::InvalidFilterMethod(other)),
        }
    }
}

/// Numeric comparison operators understood in patterns like `>= 100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Equal,
    NotEqual,
}

impl CompareOp {
    /// Splits a leading operator off the pattern.
    fn parse(pattern: &str) -> Option<(Self, &str)> {
        const OPS: [(&str, CompareOp); 6] = [
            (">=", CompareOp::GreaterOrEqual),
            ("<=", CompareOp::LessOrEqual),
            ("!=", CompareOp::NotEqual),
            (">", CompareOp::Greater),
            ("<", CompareOp::Less),
            ("=", CompareOp::Equal),
        ];

        let trimmed = pattern.trim_start();
        OPS.iter()
            .find_map(|(prefix, op)| trimmed.strip_prefix(prefix).map(|rest| (*op, rest.trim())))
    }

    fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Less => lhs < rhs,
            Self::LessOrEqual => lhs <= rhs,
            Self::Greater => lhs > rhs,
            Self::GreaterOrEqual => lhs >= rhs,
            Self::Equal => lhs == rhs,
            Self::NotEqual => lhs != rhs,
        }
    }
}

/// A compiled filter, produced by [`PropertyFilter::prepare`].
#[derive(Debug, Clone)]
pub struct FilterPreparation {
    matcher: Matcher,
    property: Option<usize>,
    numeric_properties: Vec<bool>,
}

#[derive(Debug, Clone)]
enum Matcher {
    /// The filter is empty; everything matches.
    All,
    /// Nothing can match (invalid regex).
    Nothing,
    Partial(String),
    Exact(String),
    Pattern(Regex),
    Numeric(CompareOp, f64),
}

impl Matcher {
    fn matches_text(&self, text: &str) -> bool {
        match self {
            Self::All => true,
            Self::Nothing | Self::Numeric(..) => false,
            Self::Partial(needle) => text.to_lowercase().contains(needle.as_str()),
            Self::Exact(expected) => text == expected,
            Self::Pattern(regex) => regex.is_match(text),
        }
    }
}

/// A single-pattern filter over the properties of an item.
#[derive(Clone, Default)]
pub struct PropertyFilter {
    pattern: String,
    method: StringMatchMethod,
    property: Option<usize>,
    properties: Vec<Property>,
}

impl fmt::Debug for PropertyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyFilter")
            .field("pattern", &self.pattern)
            .field("method", &self.method)
            .field("property", &self.property)
            .finish()
    }
}

impl PropertyFilter {
    /// Creates an empty filter over the given schema.
    pub fn new(properties: Vec<Property>) -> Self {
        Self {
            properties,
            ..Default::default()
        }
    }

    /// Sets the pattern. An empty pattern matches every item.
    pub fn set_text(&mut self, pattern: impl Into<String>) {
        self.pattern = pattern.into();
    }

    /// Sets the text matching method.
    pub fn set_method(&mut self, method: StringMatchMethod) {
        self.method = method;
    }

    /// Sets the property to match, or `None` to match any property.
    pub fn set_property(&mut self, property: Option<usize>) {
        self.property = property;
    }

    /// Resets the filter so that it matches everything.
    pub fn clear(&mut self) {
        self.pattern.clear();
        self.method = StringMatchMethod::default();
        self.property = None;
    }

    /// Whether the filter has no pattern.
    pub fn is_empty(&self) -> bool {
        self.pattern.is_empty()
    }

    /// Returns the current pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Compiles the filter for a batch of [`matches`](Self::matches) calls.
    pub fn prepare(&self) -> FilterPreparation {
        let numeric_properties = self
            .properties
            .iter()
            .map(|p| p.sort_method == SortMethod::Numeric)
            .collect::<Vec<_>>();

        let numeric_target = self.property.is_some_and(|p| numeric_properties.get(p) == Some(&true));

        let matcher = if self.pattern.is_empty() {
            Matcher::All
        } else if let Some((op, value)) = CompareOp::parse(&self.pattern)
            .filter(|_| numeric_target)
            .and_then(|(op, rest)| rest.parse::<f64>().ok().map(|v| (op, v)))
        {
            Matcher::Numeric(op, value)
        } else {
            self.compile_text_matcher()
        };

        FilterPreparation {
            matcher,
            property: self.property,
            numeric_properties,
        }
    }

    fn compile_text_matcher(&self) -> Matcher {
        let source = match self.method {
            StringMatchMethod::Partial => return Matcher::Partial(self.pattern.to_lowercase()),
            StringMatchMethod::Exact => return Matcher::Exact(self.pattern.clone()),
            StringMatchMethod::Regex => self.pattern.clone(),
            StringMatchMethod::Wildcard => wildcard_to_regex(&self.pattern),
        };

        match RegexBuilder::new(&source).case_insensitive(true).build() {
            Ok(regex) => Matcher::Pattern(regex),
            Err(err) => {
                tracing::debug!(target: targets::FILTER, pattern = %self.pattern, %err, "invalid filter pattern");
                Matcher::Nothing
            }
        }
    }

    /// Evaluates one item through its accessors.
    pub fn matches<N, S>(&self, prep: &FilterPreparation, number: N, string: S) -> bool
    where
        N: Fn(usize) -> f64,
        S: Fn(usize) -> String,
    {
        match (&prep.matcher, prep.property) {
            (Matcher::All, _) => true,
            (Matcher::Numeric(op, value), Some(property)) => op.apply(number(property), *value),
            (matcher, Some(property)) => matcher.matches_text(&string(property)),
            (matcher, None) => {
                (0..prep.numeric_properties.len()).any(|property| matcher.matches_text(&string(property)))
            }
        }
    }
}

/// Converts a `*`/`?` wildcard pattern to an anchored regular expression.
fn wildcard_to_regex(pattern: &str) -> String {
    let mut source = String::with_capacity(pattern.len() + 2);
    source.push('^');
    for c in pattern.chars() {
        match c {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            other => source.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    source.push('$');
    source
}
