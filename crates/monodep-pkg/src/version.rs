//! npm-style version ranges on top of [`semver::VersionReq`].
//!
//! `semver` speaks Cargo's dialect: comparators are comma separated and a bare
//! version means a caret requirement. npm ranges separate comparators with
//! whitespace, allow `||` alternatives and hyphen ranges, and treat a bare
//! version as an exact match. [`VersionConstraint`] rewrites each alternative
//! into Cargo syntax before handing it to `semver`.

use semver::{Version, VersionReq};
use std::fmt;

/// A parsed npm version range: any of the alternatives may match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConstraint {
    alternatives: Vec<VersionReq>,
}

impl VersionConstraint {
    /// Parse an npm range such as `^1.2.3`, `>=1.0.0 <2.0.0 || 3.x` or
    /// `1.0.0 - 1.4.0`. An empty alternative accepts any version.
    ///
    /// # Errors
    ///
    /// Returns the `semver` error of the first alternative that does not
    /// parse.
    pub fn parse(range: &str) -> Result<Self, semver::Error> {
        let alternatives = range
            .split("||")
            .map(|alternative| match alternative.trim() {
                "" => Ok(VersionReq::STAR),
                alternative => VersionReq::parse(&to_cargo_syntax(alternative)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { alternatives })
    }

    /// Check whether `version` satisfies at least one alternative.
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.alternatives.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join(" || "))
    }
}

/// Parse a package version, tolerating a leading `v`.
///
/// # Errors
///
/// Returns the `semver` error when the string is not a valid version.
pub fn parse_version(version: &str) -> Result<Version, semver::Error> {
    let trimmed = version.trim();
    Version::parse(trimmed.strip_prefix('v').unwrap_or(trimmed))
}

/// Rewrite one `||` alternative into comma separated comparators.
fn to_cargo_syntax(alternative: &str) -> String {
    let tokens: Vec<&str> = alternative.split_whitespace().collect();

    if let [low, "-", high] = tokens.as_slice() {
        return format!(">={}, <={}", strip_v(low), strip_v(high));
    }

    let mut comparators: Vec<String> = Vec::with_capacity(tokens.len());
    let mut pending_op: Option<&str> = None;
    for token in tokens {
        if is_operator(token) {
            pending_op = Some(token);
            continue;
        }
        let comparator = match pending_op.take() {
            Some(op) => format!("{op}{}", strip_v(token)),
            None => bare_to_exact(token),
        };
        comparators.push(comparator);
    }
    if let Some(op) = pending_op {
        // dangling operator, let semver report it
        comparators.push(op.to_string());
    }

    comparators.join(", ")
}

fn is_operator(token: &str) -> bool {
    matches!(token, "=" | ">" | ">=" | "<" | "<=" | "~" | "^")
}

fn strip_v(token: &str) -> &str {
    match token.strip_prefix('v') {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
        _ => token,
    }
}

/// npm reads a bare, fully specified version as an exact requirement.
/// Partial or wildcard versions (`1.2`, `1.x`) are left for `semver`.
fn bare_to_exact(token: &str) -> String {
    let token = strip_v(token);
    let starts_with_digit = token.starts_with(|c: char| c.is_ascii_digit());
    let has_wildcard = token
        .split('.')
        .any(|part| matches!(part, "x" | "X" | "*"));
    if starts_with_digit && !has_wildcard {
        format!("={token}")
    } else {
        token.to_string()
    }
}
