use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AuthError;

/// 每个账户所属的教会角色
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Bishop,
    Reverend,
    Overseer,
    SeniorPastor,
    DeptLeader,
    #[default]
    Member,
    Admin,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Bishop,
        Role::Reverend,
        Role::Overseer,
        Role::SeniorPastor,
        Role::DeptLeader,
        Role::Member,
        Role::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Bishop => "BISHOP",
            Role::Reverend => "REVEREND",
            Role::Overseer => "OVERSEER",
            Role::SeniorPastor => "SENIOR_PASTOR",
            Role::DeptLeader => "DEPT_LEADER",
            Role::Member => "MEMBER",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AuthError::InvalidRole(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::Role;

    #[test]
    fn role_parses_wire_names() {
        assert_eq!("SENIOR_PASTOR".parse::<Role>().unwrap(), Role::SeniorPastor);
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("DEACON".parse::<Role>().is_err());
    }

    #[test]
    fn role_serializes_screaming_snake() {
        let json = serde_json::to_string(&Role::DeptLeader).unwrap();
        assert_eq!(json, "\"DEPT_LEADER\"");
    }
}
