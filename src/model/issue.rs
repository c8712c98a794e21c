//! Issue record types: stories, bugs, and the dataset document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of an issue record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    /// A requirement ("story").
    Story,
    /// A defect ("bug").
    Bug,
}

impl IssueKind {
    /// Stable lowercase label used in chunk ids, file names and output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Story => "story",
            Self::Bug => "bug",
        }
    }
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for IssueKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "story" | "stories" => Ok(Self::Story),
            "bug" | "bugs" => Ok(Self::Bug),
            other => Err(format!("unknown issue kind: {other}")),
        }
    }
}

/// A requirement record.
///
/// Timestamps use the tracker's `YYYY-MM-DD HH:MM:SS` convention and are kept
/// as opaque strings; parsing happens at the analysis layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Story {
    /// Stable identifier.
    #[serde(default)]
    pub id: String,
    /// Short name.
    #[serde(default)]
    pub name: String,
    /// Rich description (plain text).
    #[serde(default)]
    pub description: String,
    /// Status label (opaque).
    #[serde(default)]
    pub status: String,
    /// Priority label (opaque, kind-specific).
    #[serde(default)]
    pub priority: String,
    /// Creator of the record.
    #[serde(default)]
    pub creator: String,
    /// Iteration the story is planned into.
    #[serde(default)]
    pub iteration_id: String,
    /// Creation timestamp.
    #[serde(default)]
    pub created: String,
    /// Last-modified timestamp.
    #[serde(default)]
    pub modified: String,
    /// Planned begin date.
    #[serde(default)]
    pub begin: String,
    /// Planned due date.
    #[serde(default)]
    pub due: String,
    /// Unknown fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A defect record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bug {
    /// Stable identifier.
    #[serde(default)]
    pub id: String,
    /// Short title.
    #[serde(default)]
    pub title: String,
    /// Rich description (plain text).
    #[serde(default)]
    pub description: String,
    /// Priority label (opaque, kind-specific).
    #[serde(default)]
    pub priority: String,
    /// Severity label.
    #[serde(default)]
    pub severity: String,
    /// Status label (opaque).
    #[serde(default)]
    pub status: String,
    /// Reporter of the defect.
    #[serde(default)]
    pub reporter: String,
    /// Regression counter.
    #[serde(default)]
    pub regression_number: String,
    /// Creation timestamp.
    #[serde(default)]
    pub created: String,
    /// Last-modified timestamp.
    #[serde(default)]
    pub modified: String,
    /// Unknown fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A typed reference to either record kind.
///
/// Borrowed view used by the extractor and analysis layers so they can walk
/// both sequences uniformly without cloning.
#[derive(Debug, Clone, Copy)]
pub enum IssueRecord<'a> {
    /// A story reference.
    Story(&'a Story),
    /// A bug reference.
    Bug(&'a Bug),
}

impl IssueRecord<'_> {
    /// Returns the record kind.
    #[must_use]
    pub const fn kind(&self) -> IssueKind {
        match self {
            Self::Story(_) => IssueKind::Story,
            Self::Bug(_) => IssueKind::Bug,
        }
    }

    /// Returns the stable id.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Story(s) => &s.id,
            Self::Bug(b) => &b.id,
        }
    }

    /// Returns the display title (story name or bug title).
    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Story(s) => &s.name,
            Self::Bug(b) => &b.title,
        }
    }

    /// Returns the status label.
    #[must_use]
    pub fn status(&self) -> &str {
        match self {
            Self::Story(s) => &s.status,
            Self::Bug(b) => &b.status,
        }
    }

    /// Returns the priority label.
    #[must_use]
    pub fn priority(&self) -> &str {
        match self {
            Self::Story(s) => &s.priority,
            Self::Bug(b) => &b.priority,
        }
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn created(&self) -> &str {
        match self {
            Self::Story(s) => &s.created,
            Self::Bug(b) => &b.created,
        }
    }

    /// Returns the value of a named time field, if the record carries it.
    ///
    /// `begin` and `due` only exist on stories.
    #[must_use]
    pub fn time_field(&self, field: &str) -> Option<&str> {
        match (self, field) {
            (Self::Story(s), "created") => Some(&s.created),
            (Self::Story(s), "modified") => Some(&s.modified),
            (Self::Story(s), "begin") => Some(&s.begin),
            (Self::Story(s), "due") => Some(&s.due),
            (Self::Bug(b), "created") => Some(&b.created),
            (Self::Bug(b), "modified") => Some(&b.modified),
            _ => None,
        }
    }

    /// Serializes the full record (including preserved unknown fields) to a
    /// JSON value for echoing back in search results.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Story(s) => serde_json::to_value(s).unwrap_or(Value::Null),
            Self::Bug(b) => serde_json::to_value(b).unwrap_or(Value::Null),
        }
    }
}

/// The authoritative dataset document: two ordered sequences.
///
/// Persisted as one JSON object with top-level `stories` and `bugs` arrays.
/// Regeneration replaces it wholesale; records are immutable within one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueDataset {
    /// Requirement records, in tracker order.
    #[serde(default)]
    pub stories: Vec<Story>,
    /// Defect records, in tracker order.
    #[serde(default)]
    pub bugs: Vec<Bug>,
}

impl IssueDataset {
    /// Returns true when both sequences are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stories.is_empty() && self.bugs.is_empty()
    }

    /// Total record count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stories.len() + self.bugs.len()
    }

    /// Returns the records of one kind as uniform references.
    #[must_use]
    pub fn records_of(&self, kind: IssueKind) -> Vec<IssueRecord<'_>> {
        match kind {
            IssueKind::Story => self.stories.iter().map(IssueRecord::Story).collect(),
            IssueKind::Bug => self.bugs.iter().map(IssueRecord::Bug).collect(),
        }
    }

    /// Returns all records, stories first, in tracker order.
    #[must_use]
    pub fn records(&self) -> Vec<IssueRecord<'_>> {
        let mut all = self.records_of(IssueKind::Story);
        all.extend(self.records_of(IssueKind::Bug));
        all
    }
}
