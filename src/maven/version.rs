//! Maven version ordering and version ranges.
//!
//! Maven versions are not semantic versions: `1.0.0.Final`, `2.1.0.Beta3` and
//! `30.1-jre` all appear in practice. [`MavenVersion`] implements Maven's
//! ordering closely enough to pick the highest version satisfying a range:
//!
//! - numeric segments compare numerically, and trailing zeros are ignored
//!   (`1.0` equals `1`);
//! - numbers sort after qualifiers (`1.0.1` > `1.0.Final` > `1.0.CR1`);
//! - well-known qualifiers sort `alpha < beta < milestone < rc < snapshot <
//!   release < sp`; `ga`, `final` and `release` are all releases; unknown
//!   qualifiers sort after known ones, lexically among themselves.
//!
//! [`VersionRange`] understands the usual range syntax: `[1.0,2.0)`, `(,1.0]`,
//! `[1.0,)`, the exact form `[1.0]` and comma-joined unions.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::core::FpkitError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    Number(u64),
    Qualifier(String),
}

/// A parsed Maven version.
#[derive(Debug, Clone)]
pub struct MavenVersion {
    raw: String,
    items: Vec<Item>,
}

impl MavenVersion {
    pub fn parse(raw: &str) -> Self {
        let mut items = Vec::new();
        let mut current = String::new();
        let mut current_is_digit = None;

        let flush = |current: &mut String, items: &mut Vec<Item>| {
            if current.is_empty() {
                return;
            }
            let item = match current.parse::<u64>() {
                Ok(number) => Item::Number(number),
                Err(_) => Item::Qualifier(normalize_qualifier(current)),
            };
            items.push(item);
            current.clear();
        };

        for c in raw.trim().chars() {
            if c == '.' || c == '-' || c == '_' {
                flush(&mut current, &mut items);
                current_is_digit = None;
                continue;
            }
            let is_digit = c.is_ascii_digit();
            if current_is_digit.is_some_and(|d| d != is_digit) {
                flush(&mut current, &mut items);
            }
            current_is_digit = Some(is_digit);
            current.push(c);
        }
        flush(&mut current, &mut items);

        Self {
            raw: raw.trim().to_string(),
            items,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

fn normalize_qualifier(q: &str) -> String {
    let lower = q.to_ascii_lowercase();
    match lower.as_str() {
        "a" => "alpha".to_string(),
        "b" => "beta".to_string(),
        "m" => "milestone".to_string(),
        "cr" => "rc".to_string(),
        "ga" | "final" | "release" => String::new(),
        _ => lower,
    }
}

fn qualifier_rank(q: &str) -> u8 {
    match q {
        "alpha" => 0,
        "beta" => 1,
        "milestone" => 2,
        "rc" => 3,
        "snapshot" => 4,
        "" => 5,
        "sp" => 6,
        _ => 7,
    }
}

fn compare_qualifiers(a: &str, b: &str) -> Ordering {
    qualifier_rank(a).cmp(&qualifier_rank(b)).then_with(|| a.cmp(b))
}

fn compare_items(a: Option<&Item>, b: Option<&Item>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(Item::Number(x)), Some(Item::Number(y))) => x.cmp(y),
        (Some(Item::Number(x)), None) => {
            if *x == 0 {
                Ordering::Equal
            } else {
                Ordering::Greater
            }
        }
        (None, Some(Item::Number(_))) => compare_items(b, a).reverse(),
        (Some(Item::Number(_)), Some(Item::Qualifier(_))) => Ordering::Greater,
        (Some(Item::Qualifier(_)), Some(Item::Number(_))) => Ordering::Less,
        (Some(Item::Qualifier(x)), Some(Item::Qualifier(y))) => compare_qualifiers(x, y),
        (Some(Item::Qualifier(x)), None) => compare_qualifiers(x, ""),
        (None, Some(Item::Qualifier(y))) => compare_qualifiers("", y),
    }
}

impl Ord for MavenVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.items.len().max(other.items.len());
        for i in 0..len {
            let ordering = compare_items(self.items.get(i), other.items.get(i));
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for MavenVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for MavenVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MavenVersion {}

impl fmt::Display for MavenVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[derive(Debug, Clone)]
struct Bound {
    version: MavenVersion,
    inclusive: bool,
}

#[derive(Debug, Clone)]
struct Restriction {
    lower: Option<Bound>,
    upper: Option<Bound>,
}

impl Restriction {
    fn contains(&self, version: &MavenVersion) -> bool {
        if let Some(lower) = &self.lower {
            match version.cmp(&lower.version) {
                Ordering::Less => return false,
                Ordering::Equal if !lower.inclusive => return false,
                _ => {}
            }
        }
        if let Some(upper) = &self.upper {
            match version.cmp(&upper.version) {
                Ordering::Greater => return false,
                Ordering::Equal if !upper.inclusive => return false,
                _ => {}
            }
        }
        true
    }
}

/// A Maven version range such as `[1.0,2.0)`.
#[derive(Debug, Clone)]
pub struct VersionRange {
    raw: String,
    restrictions: Vec<Restriction>,
}

impl VersionRange {
    pub fn contains(&self, version: &MavenVersion) -> bool {
        self.restrictions.iter().any(|r| r.contains(version))
    }

    /// Highest of `candidates` that satisfies the range.
    pub fn select_highest<'a, I>(&self, candidates: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        candidates
            .into_iter()
            .map(|c| (c, MavenVersion::parse(c)))
            .filter(|(_, v)| self.contains(v))
            .max_by(|(_, a), (_, b)| a.cmp(b))
            .map(|(c, _)| c)
    }
}

impl FromStr for VersionRange {
    type Err = FpkitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| FpkitError::InvalidCoordinates {
            coords: s.to_string(),
            reason: format!("invalid version range: {reason}"),
        };

        let mut restrictions = Vec::new();
        let mut rest = s.trim();
        while !rest.is_empty() {
            let lower_inclusive = match rest.chars().next() {
                Some('[') => true,
                Some('(') => false,
                _ => return Err(invalid("expected '[' or '('")),
            };
            let close = rest.find([']', ')']).ok_or_else(|| invalid("unterminated restriction"))?;
            let upper_inclusive = rest[close..].starts_with(']');
            let body = &rest[1..close];

            let restriction = match body.split_once(',') {
                None => {
                    if !lower_inclusive || !upper_inclusive || body.trim().is_empty() {
                        return Err(invalid("single version must be written [v]"));
                    }
                    let version = MavenVersion::parse(body);
                    Restriction {
                        lower: Some(Bound {
                            version: version.clone(),
                            inclusive: true,
                        }),
                        upper: Some(Bound {
                            version,
                            inclusive: true,
                        }),
                    }
                }
                Some((lower, upper)) => {
                    let bound = |v: &str, inclusive: bool| {
                        (!v.trim().is_empty()).then(|| Bound {
                            version: MavenVersion::parse(v),
                            inclusive,
                        })
                    };
                    Restriction {
                        lower: bound(lower, lower_inclusive),
                        upper: bound(upper, upper_inclusive),
                    }
                }
            };
            restrictions.push(restriction);

            rest = rest[close + 1..].trim_start();
            if let Some(stripped) = rest.strip_prefix(',') {
                rest = stripped.trim_start();
            }
        }

        if restrictions.is_empty() {
            return Err(invalid("empty range"));
        }
        Ok(Self {
            raw: s.trim().to_string(),
            restrictions,
        })
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
