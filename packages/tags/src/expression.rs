//! Boolean tag-expression language.
//!
//! An expression is a list of clauses combined with OR. The text form
//! separates clauses with `,`:
//!
//! - each clause is a list of conditions combined with AND, separated by `§`
//! - each condition lists alternative tag names combined with OR,
//!   separated by `!`
//! - a tag name may require a value, written after `~`; the value may list
//!   alternatives separated by `;`
//! - a tag name or value starting with `#` is a regular expression matched
//!   against the whole key or value
//!
//! Because of this syntax the characters `! , ; # § ~` can never be
//! matched literally.
//!
//! ```text
//! addr:housenumber§addr:street
//! amenity~library;hospital
//! shop!amenity§#(name|alt_name)(:[a-z]{2})?
//! ```

use std::str::FromStr;

use osm_import_document_models::Tags;
use regex::Regex;

const CLAUSE_SEPARATOR: char = ',';
const CONDITION_SEPARATOR: char = '§';
const ALTERNATIVE_SEPARATOR: char = '!';
const VALUE_MARKER: char = '~';
const VALUE_SEPARATOR: char = ';';
const REGEX_MARKER: char = '#';

/// Errors from parsing a tag expression.
#[derive(Debug, thiserror::Error)]
pub enum ExpressionError {
    /// The expression has no clauses at all.
    #[error("Tag expression is empty")]
    Empty,

    /// A clause, condition, tag name or value is empty.
    #[error("Empty {part} in tag expression '{expression}'")]
    EmptyPart {
        /// Which syntactic element was empty.
        part: &'static str,
        /// The offending (sub)expression.
        expression: String,
    },

    /// A `#` pattern is not a valid regular expression.
    #[error("Invalid regex '{pattern}' in tag expression: {source}")]
    Regex {
        /// The pattern text without the `#` marker.
        pattern: String,
        /// Underlying regex error.
        source: regex::Error,
    },
}

/// A literal string or an anchored regular expression.
#[derive(Debug, Clone)]
enum Pattern {
    Literal(String),
    Regex(Regex),
}

impl Pattern {
    fn parse(text: &str, part: &'static str) -> Result<Self, ExpressionError> {
        if text.is_empty() {
            return Err(ExpressionError::EmptyPart {
                part,
                expression: text.to_string(),
            });
        }
        let Some(pattern) = text.strip_prefix(REGEX_MARKER) else {
            return Ok(Self::Literal(text.to_string()));
        };
        if pattern.is_empty() {
            return Err(ExpressionError::EmptyPart {
                part,
                expression: text.to_string(),
            });
        }
        Regex::new(&format!("^(?:{pattern})$"))
            .map(Self::Regex)
            .map_err(|source| ExpressionError::Regex {
                pattern: pattern.to_string(),
                source,
            })
    }

    fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Literal(literal) => literal == text,
            Self::Regex(re) => re.is_match(text),
        }
    }
}

/// One tag-name alternative with an optional value requirement.
#[derive(Debug, Clone)]
struct TagMatcher {
    key: Pattern,
    values: Option<Vec<Pattern>>,
}

impl TagMatcher {
    fn parse(text: &str) -> Result<Self, ExpressionError> {
        let (key, values) = match text.split_once(VALUE_MARKER) {
            Some((key, values)) => {
                let values = values
                    .split(VALUE_SEPARATOR)
                    .map(|v| Pattern::parse(v, "tag value"))
                    .collect::<Result<Vec<_>, _>>()?;
                (key, Some(values))
            }
            None => (text, None),
        };

        Ok(Self {
            key: Pattern::parse(key, "tag name")?,
            values,
        })
    }

    fn value_matches(&self, value: &str) -> bool {
        self.values
            .as_ref()
            .is_none_or(|values| values.iter().any(|v| v.is_match(value)))
    }

    fn matches(&self, tags: &Tags) -> bool {
        match &self.key {
            Pattern::Literal(key) => tags.get(key).is_some_and(|v| self.value_matches(v)),
            Pattern::Regex(re) => tags
                .iter()
                .any(|(k, v)| re.is_match(k) && self.value_matches(v)),
        }
    }
}

/// OR over tag-name alternatives.
#[derive(Debug, Clone)]
struct Condition {
    alternatives: Vec<TagMatcher>,
}

/// AND over conditions.
#[derive(Debug, Clone)]
struct Clause {
    conditions: Vec<Condition>,
}

impl Clause {
    fn parse(text: &str) -> Result<Self, ExpressionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ExpressionError::EmptyPart {
                part: "clause",
                expression: text.to_string(),
            });
        }

        let conditions = text
            .split(CONDITION_SEPARATOR)
            .map(|condition| {
                if condition.is_empty() {
                    return Err(ExpressionError::EmptyPart {
                        part: "condition",
                        expression: text.to_string(),
                    });
                }
                let alternatives = condition
                    .split(ALTERNATIVE_SEPARATOR)
                    .map(TagMatcher::parse)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Condition { alternatives })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { conditions })
    }

    fn matches(&self, tags: &Tags) -> bool {
        self.conditions
            .iter()
            .all(|c| c.alternatives.iter().any(|alt| alt.matches(tags)))
    }
}

/// A compiled tag expression.
#[derive(Debug, Clone)]
pub struct TagExpression {
    clauses: Vec<Clause>,
}

impl TagExpression {
    /// Parses the comma-separated text form.
    ///
    /// # Errors
    ///
    /// Returns [`ExpressionError`] if any part is empty or a regular
    /// expression does not compile.
    pub fn parse(text: &str) -> Result<Self, ExpressionError> {
        Self::from_clauses(text.split(CLAUSE_SEPARATOR))
    }

    /// Builds an expression from individual clause strings, one per OR
    /// branch.
    ///
    /// # Errors
    ///
    /// Returns [`ExpressionError`] if the list is empty or a clause is
    /// invalid.
    pub fn from_clauses<'a>(
        clauses: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, ExpressionError> {
        let clauses = clauses
            .into_iter()
            .map(Clause::parse)
            .collect::<Result<Vec<_>, _>>()?;
        if clauses.is_empty() {
            return Err(ExpressionError::Empty);
        }
        Ok(Self { clauses })
    }

    /// Returns `true` if any clause is satisfied by `tags`.
    #[must_use]
    pub fn matches(&self, tags: &Tags) -> bool {
        self.clauses.iter().any(|clause| clause.matches(tags))
    }
}

impl FromStr for TagExpression {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Evaluates `expression` against `tags`.
#[must_use]
pub fn matches(tags: &Tags, expression: &TagExpression) -> bool {
    expression.matches(tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn bare_name_requires_presence() {
        let expr = TagExpression::parse("addr:housename").unwrap();
        assert!(expr.matches(&tags(&[("addr:housename", "Villa")])));
        assert!(!expr.matches(&tags(&[("name", "Villa")])));
    }

    #[test]
    fn and_requires_every_condition() {
        let expr = TagExpression::parse("addr:housenumber§addr:street").unwrap();
        assert!(expr.matches(&tags(&[
            ("addr:housenumber", "12"),
            ("addr:street", "Main St"),
        ])));
        assert!(!expr.matches(&tags(&[("addr:housenumber", "12")])));
    }

    #[test]
    fn or_over_clauses() {
        let expr = TagExpression::parse("shop,amenity~library").unwrap();
        assert!(expr.matches(&tags(&[("shop", "bakery")])));
        assert!(expr.matches(&tags(&[("amenity", "library")])));
        assert!(!expr.matches(&tags(&[("amenity", "bench")])));
    }

    #[test]
    fn value_alternatives() {
        let expr = TagExpression::parse("amenity~library;hospital").unwrap();
        assert!(expr.matches(&tags(&[("amenity", "hospital")])));
        assert!(!expr.matches(&tags(&[("amenity", "hospitals")])));
    }

    #[test]
    fn name_alternatives_carry_their_own_values() {
        let expr = TagExpression::parse("public_transport~station!amenity~bus_station").unwrap();
        assert!(expr.matches(&tags(&[("amenity", "bus_station")])));
        assert!(expr.matches(&tags(&[("public_transport", "station")])));
        assert!(!expr.matches(&tags(&[("amenity", "station")])));
    }

    #[test]
    fn regex_key_is_anchored() {
        let expr = TagExpression::parse("shop§#(name|alt_name)(:(fi|sv))?").unwrap();
        assert!(expr.matches(&tags(&[("shop", "kiosk"), ("name:sv", "Kiosken")])));
        assert!(expr.matches(&tags(&[("shop", "kiosk"), ("alt_name", "K")])));
        assert!(!expr.matches(&tags(&[("shop", "kiosk"), ("old_name", "K")])));
        assert!(!expr.matches(&tags(&[("shop", "kiosk"), ("name:de", "K")])));
    }

    #[test]
    fn regex_value() {
        let expr = TagExpression::parse("highway~#.*_link").unwrap();
        assert!(expr.matches(&tags(&[("highway", "motorway_link")])));
        assert!(!expr.matches(&tags(&[("highway", "motorway")])));
    }

    #[test]
    fn unrelated_tags_never_flip_a_match() {
        let expr = TagExpression::parse("addr:housenumber§addr:street,amenity~library").unwrap();
        let mut t = tags(&[("amenity", "library")]);
        assert!(expr.matches(&t));
        t.insert("building".to_string(), "yes".to_string());
        t.insert("name".to_string(), "Oodi".to_string());
        assert!(expr.matches(&t));
    }

    #[test]
    fn free_function_delegates() {
        let expr: TagExpression = "shop".parse().unwrap();
        assert!(matches(&tags(&[("shop", "x")]), &expr));
    }

    #[test]
    fn rejects_empty_parts() {
        assert!(matches!(
            TagExpression::parse("shop,,amenity"),
            Err(ExpressionError::EmptyPart { part: "clause", .. })
        ));
        assert!(matches!(
            TagExpression::parse("shop§"),
            Err(ExpressionError::EmptyPart {
                part: "condition",
                ..
            })
        ));
        assert!(matches!(
            TagExpression::parse("shop!"),
            Err(ExpressionError::EmptyPart { part: "tag name", .. })
        ));
        assert!(matches!(
            TagExpression::parse("amenity~"),
            Err(ExpressionError::EmptyPart {
                part: "tag value",
                ..
            })
        ));
        assert!(matches!(TagExpression::from_clauses([]), Err(ExpressionError::Empty)));
    }

    #[test]
    fn rejects_invalid_regex() {
        assert!(matches!(
            TagExpression::parse("#(name"),
            Err(ExpressionError::Regex { .. })
        ));
    }
}
