//! Field violations and their aggregation into a validation outcome.

use std::fmt;

use serde_json::Value;

/// Dotted path to a spec field, using the resource's JSON field names.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<&'static str>,
}

impl FieldPath {
    /// The empty path (the spec itself)
    pub fn root() -> Self {
        Self::default()
    }

    /// Path to a child field of this path
    pub fn child(&self, name: &'static str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name);
        Self { segments }
    }

    /// Whether `self` equals `ancestor` or lies beneath it.
    ///
    /// `ancestor` is a dotted path such as `sink.ref`.
    pub fn is_within(&self, ancestor: &str) -> bool {
        let mut parts = ancestor.split('.');
        let mut own = self.segments.iter();
        loop {
            match (parts.next(), own.next()) {
                (None, _) => return true,
                (Some(want), Some(have)) if want == *have => continue,
                _ => return false,
            }
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// One immutable field whose value differs between the stored and proposed spec.
///
/// An absent optional value is reported as `null`.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldViolation {
    pub path: FieldPath,
    pub old: Value,
    pub new: Value,
}

impl FieldViolation {
    /// Create a violation at `path` with the stored and proposed values
    pub fn new(path: FieldPath, old: Value, new: Value) -> Self {
        Self { path, old, new }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} → {}", self.path, self.old, self.new)
    }
}

/// Ordered, non-empty collection of violations found in one comparison.
#[derive(Clone, Debug, PartialEq)]
pub struct ViolationSet(Vec<FieldViolation>);

impl ViolationSet {
    /// Wrap violations, returning `None` when there are none.
    pub fn new(violations: Vec<FieldViolation>) -> Option<Self> {
        if violations.is_empty() {
            None
        } else {
            Some(Self(violations))
        }
    }

    /// The violations, in report order.
    pub fn violations(&self) -> &[FieldViolation] {
        &self.0
    }

    /// Number of violations; at least one.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Never true for a constructed set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Paths of all violations, rendered dotted, in report order.
    pub fn paths(&self) -> Vec<String> {
        self.0.iter().map(|v| v.path.to_string()).collect()
    }
}

impl fmt::Display for ViolationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", violation)?;
        }
        Ok(())
    }
}

/// Result of comparing a stored spec with a proposed one
#[derive(Clone, Debug, PartialEq)]
pub enum ValidationOutcome {
    Valid,
    Invalid(ViolationSet),
}

impl ValidationOutcome {
    /// Check if no violations were found
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }
}

/// Collect violations into an outcome, preserving their order.
pub fn aggregate(violations: Vec<FieldViolation>) -> ValidationOutcome {
    match ViolationSet::new(violations) {
        Some(set) => ValidationOutcome::Invalid(set),
        None => ValidationOutcome::Valid,
    }
}
