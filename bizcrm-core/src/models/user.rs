use serde::{Deserialize, Serialize};
use std::fmt;

/// The six roles a user can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Exec,
    Accountant,
    Engineer,
    Client,
}

impl Role {
    /// Display name given to the demo account holding this role.
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Admin => "Administrator",
            Role::Manager => "Sales Manager",
            Role::Exec => "Sales Executive",
            Role::Accountant => "Accountant",
            Role::Engineer => "Engineer",
            Role::Client => "Client User",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Manager => write!(f, "manager"),
            Role::Exec => write!(f, "exec"),
            Role::Accountant => write!(f, "accountant"),
            Role::Engineer => write!(f, "engineer"),
            Role::Client => write!(f, "client"),
        }
    }
}

/// User model.
///
/// Users are created at startup and never modified afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier (UUID string)
    pub id: String,

    /// Login name (unique)
    pub username: String,

    /// Bcrypt hashed password
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub role: Role,

    /// Display name
    pub name: String,
}

/// User creation request. The password must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub name: String,
}

/// User response (public representation, excludes the password hash)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub name: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            username: user.username,
            role: user.role,
            name: user.name,
        }
    }
}
