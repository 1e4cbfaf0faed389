//! Document-level permissions.
//!
//! A [`Permission`] grants one [`PermissionAction`] to one [`Role`]. It renders
//! in the backend's string form, e.g. `read("any")` or `update("team:core/owner")`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// An action a permission grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionAction {
    Create,
    Read,
    Update,
    Delete,
    /// Shorthand for create, update and delete.
    Write,
}

impl PermissionAction {
    fn as_str(&self) -> &'static str {
        match self {
            PermissionAction::Create => "create",
            PermissionAction::Read => "read",
            PermissionAction::Update => "update",
            PermissionAction::Delete => "delete",
            PermissionAction::Write => "write",
        }
    }
}

/// The principal a permission is granted to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    /// Anyone, signed in or not.
    Any,
    /// Anonymous visitors only.
    Guests,
    /// Any signed-in user.
    Users,
    /// One user.
    User(String),
    /// Members of a team, optionally restricted to a team role.
    Team { id: String, role: Option<String> },
    /// One team membership.
    Member(String),
    /// Users carrying a label.
    Label(String),
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Any => f.write_str("any"),
            Role::Guests => f.write_str("guests"),
            Role::Users => f.write_str("users"),
            Role::User(id) => write!(f, "user:{id}"),
            Role::Team { id, role: Some(role) } => write!(f, "team:{id}/{role}"),
            Role::Team { id, role: None } => write!(f, "team:{id}"),
            Role::Member(id) => write!(f, "member:{id}"),
            Role::Label(name) => write!(f, "label:{name}"),
        }
    }
}

/// One action granted to one role.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Permission {
    pub action: PermissionAction,
    pub role: Role,
}

impl Permission {
    pub fn new(action: PermissionAction, role: Role) -> Self {
        Self { action, role }
    }

    pub fn create(role: Role) -> Self {
        Self::new(PermissionAction::Create, role)
    }

    pub fn read(role: Role) -> Self {
        Self::new(PermissionAction::Read, role)
    }

    pub fn update(role: Role) -> Self {
        Self::new(PermissionAction::Update, role)
    }

    pub fn delete(role: Role) -> Self {
        Self::new(PermissionAction::Delete, role)
    }

    pub fn write(role: Role) -> Self {
        Self::new(PermissionAction::Write, role)
    }

    /// The permission set a newly created document gets when the caller passes none:
    /// create, read, update and delete for [`Role::Any`].
    pub fn open() -> Vec<Permission> {
        vec![
            Permission::create(Role::Any),
            Permission::read(Role::Any),
            Permission::update(Role::Any),
            Permission::delete(Role::Any),
        ]
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(\"{}\")", self.action.as_str(), self.role)
    }
}

/// Raised when a permission string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid permission: {0}")]
pub struct ParsePermissionError(String);

impl FromStr for Role {
    type Err = ParsePermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParsePermissionError(s.to_string());

        match s.split_once(':') {
            None => match s {
                "any" => Ok(Role::Any),
                "guests" => Ok(Role::Guests),
                "users" => Ok(Role::Users),
                _ => Err(invalid()),
            },
            Some((_, "")) => Err(invalid()),
            Some(("user", id)) => Ok(Role::User(id.to_string())),
            Some(("member", id)) => Ok(Role::Member(id.to_string())),
            Some(("label", name)) => Ok(Role::Label(name.to_string())),
            Some(("team", rest)) => Ok(match rest.split_once('/') {
                Some((id, role)) => Role::Team { id: id.to_string(), role: Some(role.to_string()) },
                None => Role::Team { id: rest.to_string(), role: None },
            }),
            Some(_) => Err(invalid()),
        }
    }
}

impl FromStr for Permission {
    type Err = ParsePermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParsePermissionError(s.to_string());

        let (action, rest) = s.split_once('(').ok_or_else(invalid)?;
        let role = rest
            .strip_suffix(')')
            .and_then(|r| r.strip_prefix('"'))
            .and_then(|r| r.strip_suffix('"'))
            .ok_or_else(invalid)?;

        let action = match action {
            "create" => PermissionAction::Create,
            "read" => PermissionAction::Read,
            "update" => PermissionAction::Update,
            "delete" => PermissionAction::Delete,
            "write" => PermissionAction::Write,
            _ => return Err(invalid()),
        };

        Ok(Permission::new(action, role.parse()?))
    }
}

impl Serialize for Permission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Permission {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}
