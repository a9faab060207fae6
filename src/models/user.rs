use serde::{Deserialize, Serialize};
use sqlx::{Row, sqlite::SqliteRow};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Administrator,
    School,
    Supervisor,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Administrator => "administrator",
            Self::School => "school",
            Self::Supervisor => "supervisor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "administrator" => Ok(Self::Administrator),
            "school" => Ok(Self::School),
            "supervisor" => Ok(Self::Supervisor),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Parses the comma-joined role list stored in `accounts.roles`.
pub fn parse_roles(raw: &str) -> Result<Vec<Role>, String> {
    raw.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(Role::from_str)
        .collect()
}

pub fn join_roles(roles: &[Role]) -> String {
    roles
        .iter()
        .map(|role| role.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Debug, Clone)]
pub struct UserAccount {
    pub id: i64,
    pub full_name: String,
    pub username: String,
    pub roles: Vec<Role>,
    pub created_at: OffsetDateTime,
}

impl sqlx::FromRow<'_, SqliteRow> for UserAccount {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let raw_roles: String = row.try_get("roles")?;
        let roles = parse_roles(&raw_roles).map_err(|e| sqlx::Error::ColumnDecode {
            index: "roles".to_string(),
            source: e.into(),
        })?;

        Ok(Self {
            id: row.try_get("id")?,
            full_name: row.try_get("full_name")?,
            username: row.try_get("username")?,
            roles,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AccountInfo {
    #[schema(example = 1)]
    pub id: i64,

    #[schema(example = "Jane Doe")]
    pub full_name: String,

    #[schema(example = "jane.doe")]
    pub username: String,

    #[schema(example = json!(["school"]))]
    pub roles: Vec<Role>,
}

impl From<UserAccount> for AccountInfo {
    fn from(account: UserAccount) -> Self {
        Self {
            id: account.id,
            full_name: account.full_name,
            username: account.username,
            roles: account.roles,
        }
    }
}
