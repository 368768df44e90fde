use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Dotted revision or branch number such as `1.4` or `1.2.0.6`.
///
/// Ordering is component-wise and numeric, so `1.10` sorts after `1.9` and
/// a branch revision like `1.2.1.1` sorts between `1.2` and `1.3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RevisionNumber(Vec<u32>);

/// Failure to interpret a dotted revision number.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RevisionNumberError {
    /// A component is empty or not a decimal integer.
    #[error("invalid revision number {input:?}")]
    InvalidComponent {
        /// Text that failed to parse.
        input: String,
    },
    /// Fewer than two components were supplied.
    #[error("revision number {input:?} needs at least two components")]
    TooShort {
        /// Text that failed to parse.
        input: String,
    },
}

impl RevisionNumber {
    /// Parse a dotted number with at least two components.
    ///
    /// # Errors
    ///
    /// Returns [`RevisionNumberError`] when a component is not numeric or
    /// when the number has a single component.
    pub fn parse(input: &str) -> Result<Self, RevisionNumberError> {
        let components = parse_components(input)?;
        Self::from_components(components).ok_or_else(|| RevisionNumberError::TooShort {
            input: input.to_owned(),
        })
    }

    /// Build a number from raw components, rejecting fewer than two.
    #[must_use]
    pub fn from_components(components: Vec<u32>) -> Option<Self> {
        (components.len() >= 2).then_some(Self(components))
    }

    /// The numeric components.
    #[must_use]
    pub fn components(&self) -> &[u32] {
        &self.0
    }

    /// Number of dotted components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True for two-component revisions such as `1.7`.
    #[must_use]
    pub fn is_trunk(&self) -> bool {
        self.0.len() == 2
    }

    /// True for CVS "magic" branch numbers of the form `A.B.0.C`.
    #[must_use]
    pub fn is_magic_branch(&self) -> bool {
        let len = self.0.len();
        len > 2 && len % 2 == 0 && self.0[len - 2] == 0
    }

    /// Whether this names a branch rather than a single revision: an odd
    /// component count, or the `A.B.0.C` encoding.
    #[must_use]
    pub fn is_branch(&self) -> bool {
        self.0.len() % 2 == 1 || self.is_magic_branch()
    }

    /// Rewrite `A.B.0.C` to the branch number `A.B.C`; other numbers are
    /// returned unchanged.
    #[must_use]
    pub fn decode_branch_tag(&self) -> Self {
        if self.is_magic_branch() {
            let mut components = self.0.clone();
            components.remove(components.len() - 2);
            Self(components)
        } else {
            self.clone()
        }
    }

    /// The revision a branch (or a revision on a branch) is rooted at.
    ///
    /// For a revision `1.2.4.3` this strips the last two components
    /// (`1.2`); for a branch number `1.2.4` it strips the last one. Trunk
    /// revisions have no branch point.
    #[must_use]
    pub fn branch_point(&self) -> Option<Self> {
        let number = self.decode_branch_tag();
        let keep = if number.0.len() % 2 == 1 {
            number.0.len() - 1
        } else {
            number.0.len().saturating_sub(2)
        };
        Self::from_components(number.0[..keep].to_vec())
    }

    /// Components of the branch a revision lives on: `1.2.4.3` yields
    /// `[1, 2, 4]` and a trunk revision `1.7` yields `[1]`.
    #[must_use]
    pub fn branch_prefix(&self) -> &[u32] {
        &self.0[..self.0.len() - 1]
    }

    /// Whether this revision is a commit directly on `branch`.
    #[must_use]
    pub fn is_on_branch(&self, branch: &[u32]) -> bool {
        self.branch_prefix() == branch
    }

    /// Branch nesting depth: zero on trunk, one on `1.2.4.x`, and so on.
    #[must_use]
    pub fn depth(&self) -> usize {
        (self.0.len() / 2).saturating_sub(1)
    }

    /// Walk the numbering scheme backwards until `exists` accepts a number.
    ///
    /// Each step decrements the final component. A trailing `0` (left by
    /// `cvs commit -r X.Y.Z.0`, or reached by decrementing the first commit
    /// on a branch) trims the final pair instead, so `1.2.4.1` falls back
    /// to `1.2`. Returns `None` once the number runs out of components.
    #[must_use]
    pub fn previous_existing(&self, exists: impl Fn(&Self) -> bool) -> Option<Self> {
        let mut components = self.0.clone();
        loop {
            match components.last_mut() {
                Some(0) => {
                    let keep = components.len().saturating_sub(2);
                    components.truncate(keep);
                }
                Some(last) => *last -= 1,
                None => return None,
            }
            let candidate = Self::from_components(components.clone())?;
            if exists(&candidate) {
                return Some(candidate);
            }
        }
    }
}

impl fmt::Display for RevisionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for component in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{component}")?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for RevisionNumber {
    type Err = RevisionNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RevisionNumber {
    type Error = RevisionNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RevisionNumber> for String {
    fn from(value: RevisionNumber) -> Self {
        value.to_string()
    }
}

/// What a tag, the principal branch, or a request string points at once the
/// `A.B.0.C` encoding has been decoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "number", rename_all = "snake_case")]
pub enum TagTarget {
    /// The trunk itself; written as an empty or single-component number.
    Trunk,
    /// A branch number with an odd component count, e.g. `1.2.4`.
    Branch(RevisionNumber),
    /// A single revision, e.g. `1.2.4.3`.
    Revision(RevisionNumber),
}

impl TagTarget {
    /// Classify a raw symbol value such as `1.2.0.4`, `1.1.1`, or `1.5`.
    ///
    /// # Errors
    ///
    /// Returns [`RevisionNumberError::InvalidComponent`] when the text is
    /// not a dotted decimal number.
    pub fn parse(input: &str) -> Result<Self, RevisionNumberError> {
        if input.is_empty() {
            return Ok(Self::Trunk);
        }
        let components = parse_components(input)?;
        let Some(number) = RevisionNumber::from_components(components) else {
            return Ok(Self::Trunk);
        };
        Ok(Self::from_number(&number))
    }

    /// Classify an already parsed number.
    #[must_use]
    pub fn from_number(number: &RevisionNumber) -> Self {
        let decoded = number.decode_branch_tag();
        if decoded.len() % 2 == 1 {
            Self::Branch(decoded)
        } else {
            Self::Revision(decoded)
        }
    }

    /// Trunk and branch targets name a line of development.
    #[must_use]
    pub const fn is_branch(&self) -> bool {
        matches!(self, Self::Trunk | Self::Branch(_))
    }

    /// Whether `revision` is a commit on the line this target names; always
    /// false for revision targets.
    #[must_use]
    pub fn contains(&self, revision: &RevisionNumber) -> bool {
        match self {
            Self::Trunk => revision.is_trunk(),
            Self::Branch(branch) => revision.is_on_branch(branch.components()),
            Self::Revision(_) => false,
        }
    }

    /// The decoded number, if any.
    #[must_use]
    pub const fn number(&self) -> Option<&RevisionNumber> {
        match self {
            Self::Trunk => None,
            Self::Branch(number) | Self::Revision(number) => Some(number),
        }
    }
}

fn parse_components(input: &str) -> Result<Vec<u32>, RevisionNumberError> {
    input
        .split('.')
        .map(|part| {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(RevisionNumberError::InvalidComponent {
                    input: input.to_owned(),
                });
            }
            part.parse::<u32>()
                .map_err(|_| RevisionNumberError::InvalidComponent {
                    input: input.to_owned(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rev(s: &str) -> RevisionNumber {
        RevisionNumber::parse(s).expect("valid revision")
    }

    #[test]
    fn parse_rejects_malformed_numbers() {
        assert!(matches!(
            RevisionNumber::parse("1"),
            Err(RevisionNumberError::TooShort { .. })
        ));
        assert!(matches!(
            RevisionNumber::parse("1..2"),
            Err(RevisionNumberError::InvalidComponent { .. })
        ));
        assert!(matches!(
            RevisionNumber::parse("1.x"),
            Err(RevisionNumberError::InvalidComponent { .. })
        ));
        assert!(matches!(
            RevisionNumber::parse("desc"),
            Err(RevisionNumberError::InvalidComponent { .. })
        ));
        assert_eq!(rev("1.2.3.4").components(), &[1, 2, 3, 4]);
    }

    #[test]
    fn ordering_is_numeric() {
        assert!(rev("1.10") > rev("1.9"));
        assert!(rev("1.2") < rev("1.2.1.1"));
        assert!(rev("1.2.1.1") < rev("1.3"));
        assert!(rev("1.2.2.1") > rev("1.2.1.9"));
    }

    #[test]
    fn branch_classification() {
        assert!(!rev("1.2").is_branch());
        assert!(!rev("1.2.3.4").is_branch());
        assert!(rev("1.2.3").is_branch());
        assert!(rev("1.2.0.1").is_branch());
        assert_eq!(rev("1.2.0.1").decode_branch_tag(), rev("1.2.1"));
        assert_eq!(rev("1.2.3.4").decode_branch_tag(), rev("1.2.3.4"));
    }

    #[test]
    fn branch_point_strips_to_root_revision() {
        assert_eq!(rev("1.2.4.3").branch_point(), Some(rev("1.2")));
        assert_eq!(rev("1.2.4").branch_point(), Some(rev("1.2")));
        assert_eq!(rev("1.2.0.4").branch_point(), Some(rev("1.2")));
        assert_eq!(rev("1.2.4.3.2.1").branch_point(), Some(rev("1.2.4.3")));
        assert_eq!(rev("1.7").branch_point(), None);
    }

    #[test]
    fn branch_prefix_and_depth() {
        assert_eq!(rev("1.2.4.3").branch_prefix(), &[1, 2, 4]);
        assert!(rev("1.2.4.3").is_on_branch(&[1, 2, 4]));
        assert!(rev("1.7").is_on_branch(&[1]));
        assert_eq!(rev("1.7").depth(), 0);
        assert_eq!(rev("1.2.4.3").depth(), 1);
    }

    #[test]
    fn previous_existing_trims_zero_pairs() {
        let known = [rev("1.1"), rev("1.2"), rev("1.2.4.1")];
        let exists = |candidate: &RevisionNumber| known.contains(candidate);

        assert_eq!(rev("1.3").previous_existing(exists), Some(rev("1.2")));
        assert_eq!(rev("1.2.4.1").previous_existing(exists), Some(rev("1.2")));
        assert_eq!(rev("1.2.4.2").previous_existing(exists), Some(rev("1.2.4.1")));
        assert_eq!(rev("1.1").previous_existing(exists), None);
    }

    #[test]
    fn tag_targets_decode_magic_branches() {
        assert_eq!(TagTarget::parse("1.2.0.4"), Ok(TagTarget::Branch(rev("1.2.4"))));
        assert_eq!(TagTarget::parse("1.1.1"), Ok(TagTarget::Branch(rev("1.1.1"))));
        assert_eq!(TagTarget::parse("1.5"), Ok(TagTarget::Revision(rev("1.5"))));
        assert_eq!(TagTarget::parse(""), Ok(TagTarget::Trunk));
        assert_eq!(TagTarget::parse("1"), Ok(TagTarget::Trunk));
        assert!(TagTarget::parse("v1").is_err());
        assert!(TagTarget::Trunk.is_branch());
        assert!(TagTarget::Trunk.contains(&rev("2.3")));
        assert!(TagTarget::Branch(rev("1.2.4")).contains(&rev("1.2.4.7")));
        assert!(!TagTarget::Branch(rev("1.2.4")).contains(&rev("1.2")));
    }

    #[test]
    fn serializes_as_dotted_string() {
        let json = serde_json::to_string(&rev("1.2.0.4")).expect("serialize");
        assert_eq!(json, "\"1.2.0.4\"");
        let decoded: RevisionNumber = serde_json::from_str("\"1.10\"").expect("deserialize");
        assert_eq!(decoded, rev("1.10"));
        assert!(serde_json::from_str::<RevisionNumber>("\"7\"").is_err());
    }
}
