use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub about: String,
    pub karma: i64,
    pub is_banned: bool,
    pub is_superadmin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A named sub-community. `is_closed` is the soft-delete flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub header_msg: String,
    pub is_sticky: bool,
    pub is_private: bool,
    pub is_closed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author_id: i64,
    pub group_id: i64,
    pub is_deleted: bool,
    pub is_sticky: bool,
    pub is_closed: bool,
    pub num_comments: i64,
    pub upvotes: i64,
    pub downvotes: i64,
    pub flagvotes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A reply inside a topic. `parent_id == None` means a direct reply to the
/// topic; otherwise the parent is a comment of the same topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub author_id: i64,
    pub topic_id: i64,
    pub parent_id: Option<i64>,
    pub is_deleted: bool,
    pub is_sticky: bool,
    pub upvotes: i64,
    pub downvotes: i64,
    pub flagvotes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtraNote {
    pub id: i64,
    pub name: String,
    pub content: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Id and name only, for navigation lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraNoteShort {
    pub id: i64,
    pub name: String,
}

// -- Votes --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Up,
    Down,
    /// Moderation signal, no karma effect.
    Flag,
}

impl VoteKind {
    /// Stored representation in the `vote_type` column.
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Up => 1,
            Self::Down => 2,
            Self::Flag => 3,
        }
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Up),
            2 => Some(Self::Down),
            3 => Some(Self::Flag),
            _ => None,
        }
    }

    /// Karma applied to the author of the voted item.
    pub fn karma_delta(self) -> i64 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
            Self::Flag => 0,
        }
    }
}

// -- Roles --

/// Caller privilege relative to a group and an item in it.
/// Variants are ordered weakest to strongest, so `role >= Role::GroupMod`
/// reads as "at least a moderator".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Anonymous,
    Author,
    GroupMod,
    GroupAdmin,
    SuperAdmin,
}

impl Role {
    /// Whether this role may edit or soft-delete content in the group.
    pub fn can_moderate(self) -> bool {
        self >= Self::GroupMod
    }

    /// Whether this role may manage the group itself (roles, description).
    pub fn can_manage_group(self) -> bool {
        self >= Self::GroupAdmin
    }
}
