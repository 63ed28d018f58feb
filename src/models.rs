use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Division {
    Pelagic,
    Reef,
}

impl Division {
    pub const ALL: [Division; 2] = [Division::Pelagic, Division::Reef];

    pub fn as_str(self) -> &'static str {
        match self {
            Division::Pelagic => "Pelagic",
            Division::Reef => "Reef",
        }
    }
}

impl Display for Division {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Division {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Division::ALL
            .into_iter()
            .find(|division| division.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::validation(format!("Unknown division `{s}`")))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Angler,
    /// Recorded for display only, grants nothing beyond [`Role::Angler`].
    Captain,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Angler, Role::Captain, Role::Admin];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Angler => "angler",
            Role::Captain => "captain",
            Role::Admin => "admin",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::validation(format!("Unknown role `{s}`")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub username: String,
    /// Encoded credential, an Argon2 hash unless the plaintext policy is on.
    #[serde(skip_serializing)]
    pub password: String,
    pub role: Role,
}

impl User {
    pub fn identity(&self) -> Identity {
        Identity {
            username: self.username.clone(),
            role: self.role,
        }
    }
}

/// Who is acting, as established by a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub username: String,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatchRecord {
    pub id: i64,
    pub username: String,
    pub division: Division,
    pub species: String,
    /// Pounds, never negative.
    pub weight: f64,
    pub evidence_ref: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCatch {
    pub username: String,
    pub division: Division,
    pub species: String,
    pub weight: f64,
    pub evidence_ref: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl NewCatch {
    pub(crate) fn into_record(self, id: i64) -> CatchRecord {
        CatchRecord {
            id,
            username: self.username,
            division: self.division,
            species: self.species,
            weight: self.weight,
            evidence_ref: self.evidence_ref,
            submitted_at: self.submitted_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    pub id: i64,
    pub username: String,
    pub content: String,
    pub media_ref: Option<String>,
    pub like_count: i64,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub username: String,
    pub content: String,
    pub media_ref: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl NewPost {
    pub(crate) fn into_post(self, id: i64) -> Post {
        Post {
            id,
            username: self.username,
            content: self.content,
            media_ref: self.media_ref,
            like_count: 0,
            submitted_at: self.submitted_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user: String,
    pub species: String,
    /// Weight after the species bonus, shown as "Weight (lbs)".
    pub display_weight: f64,
    pub date: NaiveDate,
}

/// Normalizes a handle handed out by the blob store. Blank means absent.
pub fn blob_ref(raw: Option<String>) -> Option<String> {
    raw.map(|handle| handle.trim().to_string())
        .filter(|handle| !handle.is_empty())
}
