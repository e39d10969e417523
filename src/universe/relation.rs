// src/universe/relation.rs

//! Package relationship types and field parsing
//!
//! Relationship fields are comma-separated groups of `|`-separated
//! alternatives, e.g. `libc6 (>= 2.36), default-mta | mail-transport-agent`.

use super::PackageId;
use crate::error::{Error, Result};
use crate::version::{DebVersion, VersionConstraint};

/// Kind of relationship a group expresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DepKind {
    PreDepends,
    Depends,
    Recommends,
    Suggests,
    Conflicts,
    Breaks,
}

impl DepKind {
    /// Control field name for this kind
    pub fn field_name(&self) -> &'static str {
        match self {
            DepKind::PreDepends => "Pre-Depends",
            DepKind::Depends => "Depends",
            DepKind::Recommends => "Recommends",
            DepKind::Suggests => "Suggests",
            DepKind::Conflicts => "Conflicts",
            DepKind::Breaks => "Breaks",
        }
    }

    /// Conflicts and Breaks forbid their targets instead of requiring them
    pub fn is_negative(&self) -> bool {
        matches!(self, DepKind::Conflicts | DepKind::Breaks)
    }

    /// Hard relations: violating one leaves the package broken
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            DepKind::PreDepends | DepKind::Depends | DepKind::Conflicts | DepKind::Breaks
        )
    }
}

/// One alternative of a relationship group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub target: PackageId,
    pub constraint: VersionConstraint,
}

/// A comma-separated entry of a relationship field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGroup {
    pub kind: DepKind,
    pub alternatives: Vec<Relation>,
}

/// A name a version declares it can stand in for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provide {
    pub target: PackageId,
    /// Only versioned provides can satisfy versioned relations
    pub version: Option<DebVersion>,
}

/// A relation alternative before package names are resolved to ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawRelation {
    pub name: String,
    pub constraint: VersionConstraint,
}

/// Parse a relationship field into groups of alternatives
pub(crate) fn parse_relation_field(field: &str) -> Result<Vec<Vec<RawRelation>>> {
    let mut groups = Vec::new();

    for group in field.split(',') {
        let mut alternatives = Vec::new();
        for alternative in group.split('|') {
            if let Some(relation) = parse_alternative(alternative)? {
                alternatives.push(relation);
            }
        }
        if !alternatives.is_empty() {
            groups.push(alternatives);
        }
    }

    Ok(groups)
}

/// Parse a `Provides` field
pub(crate) fn parse_provides_field(field: &str) -> Result<Vec<(String, Option<DebVersion>)>> {
    let mut provides = Vec::new();

    for group in parse_relation_field(field)? {
        for relation in group {
            let version = match relation.constraint {
                VersionConstraint::Any => None,
                VersionConstraint::Exact(v) => Some(v),
                other => {
                    return Err(Error::ParseError(format!(
                        "Provides of {} must use '=', found '{}'",
                        relation.name, other
                    )));
                }
            };
            provides.push((relation.name, version));
        }
    }

    Ok(provides)
}

/// Parse one alternative: `name[:qual] [(op version)] [[archs]] [<profiles>]`
fn parse_alternative(text: &str) -> Result<Option<RawRelation>> {
    let cleaned = strip_restrictions(text);
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Ok(None);
    }

    let (name, constraint) = match cleaned.find('(') {
        Some(start) => {
            let end = cleaned[start..].find(')').map(|e| start + e).ok_or_else(|| {
                Error::ParseError(format!("Unclosed version constraint in '{}'", text.trim()))
            })?;
            (
                &cleaned[..start],
                VersionConstraint::parse(&cleaned[start + 1..end])?,
            )
        }
        None => (cleaned, VersionConstraint::Any),
    };

    // Architecture qualifiers (foo:any, foo:native) do not change the target
    let name = name.trim();
    let name = name.split_once(':').map_or(name, |(n, _)| n).trim();
    if name.is_empty() {
        return Err(Error::ParseError(format!(
            "Missing package name in relation '{}'",
            text.trim()
        )));
    }

    Ok(Some(RawRelation {
        name: name.to_string(),
        constraint,
    }))
}

/// Drop `[arch]` lists and `<profile>` restrictions outside the version parentheses
fn strip_restrictions(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_parens = false;
    let mut skip_until: Option<char> = None;

    for c in text.chars() {
        if let Some(end) = skip_until {
            if c == end {
                skip_until = None;
            }
            continue;
        }
        match c {
            '(' => in_parens = true,
            ')' => in_parens = false,
            '[' if !in_parens => {
                skip_until = Some(']');
                continue;
            }
            '<' if !in_parens => {
                skip_until = Some('>');
                continue;
            }
            _ => {}
        }
        out.push(c);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(groups: &[Vec<RawRelation>]) -> Vec<Vec<&str>> {
        groups
            .iter()
            .map(|g| g.iter().map(|r| r.name.as_str()).collect())
            .collect()
    }

    #[test]
    fn test_parse_relation_field() {
        let groups =
            parse_relation_field("libc6 (>= 2.36), default-mta | mail-transport-agent, perl")
                .unwrap();
        assert_eq!(
            names(&groups),
            vec![
                vec!["libc6"],
                vec!["default-mta", "mail-transport-agent"],
                vec!["perl"]
            ]
        );
        assert_eq!(
            groups[0][0].constraint,
            VersionConstraint::GreaterOrEqual(DebVersion::parse("2.36").unwrap())
        );
        assert_eq!(groups[2][0].constraint, VersionConstraint::Any);
    }

    #[test]
    fn test_parse_strips_qualifiers_and_restrictions() {
        let groups = parse_relation_field(
            "python3:any (<< 3.13), libfoo [amd64 i386] <!nocheck>, bar (<< 2) [!armel]",
        )
        .unwrap();
        assert_eq!(names(&groups), vec![vec!["python3"], vec!["libfoo"], vec!["bar"]]);
        assert_eq!(
            groups[2][0].constraint,
            VersionConstraint::LessThan(DebVersion::parse("2").unwrap())
        );
    }

    #[test]
    fn test_parse_rejects_unclosed_constraint() {
        assert!(parse_relation_field("libc6 (>= 2.36").is_err());
    }

    #[test]
    fn test_parse_provides_field() {
        let provides = parse_provides_field("awk, mail-transport-agent (= 1.2)").unwrap();
        assert_eq!(provides.len(), 2);
        assert_eq!(provides[0], ("awk".to_string(), None));
        assert_eq!(provides[1].1, Some(DebVersion::parse("1.2").unwrap()));

        assert!(parse_provides_field("awk (>= 1)").is_err());
    }

    #[test]
    fn test_dep_kind_classification() {
        assert!(DepKind::Breaks.is_negative());
        assert!(!DepKind::Recommends.is_negative());
        assert!(DepKind::PreDepends.is_critical());
        assert!(!DepKind::Suggests.is_critical());
        assert_eq!(DepKind::PreDepends.field_name(), "Pre-Depends");
    }
}
