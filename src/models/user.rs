// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The authenticated caller, as resolved by the auth collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
}

/// A student row of the 'profiles' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl Student {
    pub fn display_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        )
        .trim()
        .to_string()
    }
}
