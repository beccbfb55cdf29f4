use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Voter,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Voter => "voter",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(email: String, role: Role, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email,
            role,
            password_hash,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// Ordered option labels. Label uniqueness is not enforced.
    pub options: Vec<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Poll {
    pub fn new(
        title: String,
        description: Option<String>,
        options: Vec<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        created_by: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            description,
            options,
            start_time,
            end_time,
            created_by,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub id: String,
    pub poll_id: String,
    pub user_id: String,
    pub selected_option: String,
    pub created_at: DateTime<Utc>,
}

impl Vote {
    pub fn new(poll_id: String, user_id: String, selected_option: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            poll_id,
            user_id,
            selected_option,
            created_at: Utc::now(),
        }
    }
}
