//! Core record type definitions.
//!
//! Defines [`PrivacyLevel`] (the access-control tag), [`MemoryRecord`] (a full
//! durable record), [`Caller`] (the identity the routing layer supplies), and
//! the request/filter structs the manager operations take.

use serde::{Deserialize, Serialize};

/// Access-control tag governing retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyLevel {
    /// Visible only to the owning caller.
    Private,
    /// Visible to authorized callers beyond the owner.
    Shared,
    /// Visible to everyone.
    Public,
}

impl PrivacyLevel {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Shared => "shared",
            Self::Public => "public",
        }
    }

    pub const ALL: [PrivacyLevel; 3] = [Self::Private, Self::Shared, Self::Public];
}

impl std::fmt::Display for PrivacyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PrivacyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Self::Private),
            "shared" => Ok(Self::Shared),
            "public" => Ok(Self::Public),
            _ => Err(format!("unknown privacy level: {s}")),
        }
    }
}

/// A memory record, matching the `memories` table schema.
///
/// The embedding is stored redundantly alongside the metadata so the vector
/// index can be rebuilt on startup without calling the embedding provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// UUID v7 (time-sortable) primary key.
    pub id: String,
    /// Caller that owns this record.
    pub owner_id: String,
    /// Optional group the record belongs to (e.g. a project).
    pub group_id: Option<String>,
    /// The full text content of the memory.
    pub content: String,
    /// The content's embedding. Excluded from serialized output.
    #[serde(skip)]
    pub embedding: Vec<f32>,
    /// Arbitrary JSON metadata.
    pub metadata: Option<serde_json::Value>,
    /// Where the memory came from (e.g. `"chat"`, `"import"`).
    pub source: Option<String>,
    /// Access-control tag.
    pub privacy: PrivacyLevel,
    /// Free-form tag set.
    pub tags: Vec<String>,
    /// Pinned records are exempt from any future cleanup policy.
    pub pinned: bool,
    /// Number of times this record has been returned by a read path.
    pub access_count: u32,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 timestamp of the last recall, or `None` if never accessed.
    pub last_accessed: Option<String>,
}

/// Identity attached to every operation by the routing layer.
///
/// Authentication itself is out of scope; the manager only needs the id for
/// ownership checks and the admin flag for the update/delete override.
#[derive(Debug, Clone)]
pub struct Caller {
    pub id: String,
    pub is_admin: bool,
}

impl Caller {
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_admin: false,
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_admin: true,
        }
    }

    /// Owner-or-admin check used by update and delete.
    pub fn may_modify(&self, record: &MemoryRecord) -> bool {
        self.is_admin || record.owner_id == self.id
    }
}

/// Request body for `add`.
#[derive(Debug, Clone, Deserialize)]
pub struct AddMemory {
    pub content: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default = "default_privacy")]
    pub privacy: PrivacyLevel,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub group_id: Option<String>,
}

fn default_privacy() -> PrivacyLevel {
    PrivacyLevel::Private
}

impl AddMemory {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: None,
            source: None,
            privacy: PrivacyLevel::Private,
            tags: Vec::new(),
            group_id: None,
        }
    }

    pub fn privacy(mut self, privacy: PrivacyLevel) -> Self {
        self.privacy = privacy;
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Fields an `update` may change. Unset fields are left untouched.
///
/// A content change forces re-embedding; access counters are owned by the
/// read paths and cannot be set here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateFields {
    pub content: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub tags: Option<Vec<String>>,
    pub privacy: Option<PrivacyLevel>,
    pub pinned: Option<bool>,
}

/// Filters for `list`.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub group_id: Option<String>,
    pub tag: Option<String>,
    pub source: Option<String>,
    pub privacy: Option<PrivacyLevel>,
}

/// A search result: the record plus its similarity to the query, in (0, 1].
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub record: MemoryRecord,
    pub similarity: f32,
}
