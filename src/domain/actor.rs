//! The acting party behind a lifecycle action
//!
//! Authentication happens elsewhere; the engine only sees the resolved
//! actor, passed explicitly into every call.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::id::ResourceId;
use super::shift::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// A staff member acting on their own shifts
    #[default]
    Staff,
    /// The approver
    Privileged,
    /// Automated jobs (e.g. completing elapsed shifts)
    System,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Staff => "staff",
            ActorRole::Privileged => "privileged",
            ActorRole::System => "system",
        }
    }

    /// Returns true if the role may see every resource's shifts
    pub fn sees_all(&self) -> bool {
        !matches!(self, ActorRole::Staff)
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorRole {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "staff" => Ok(ActorRole::Staff),
            "privileged" | "admin" => Ok(ActorRole::Privileged),
            "system" => Ok(ActorRole::System),
            _ => Err(ParseError::Unknown {
                kind: "actor role",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ResourceId,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(id: ResourceId, role: ActorRole) -> Self {
        Self { id, role }
    }

    pub fn staff(id: ResourceId) -> Self {
        Self::new(id, ActorRole::Staff)
    }

    pub fn privileged(id: ResourceId) -> Self {
        Self::new(id, ActorRole::Privileged)
    }

    /// The actor used for automated sweeps
    pub fn system() -> Self {
        Self {
            id: ResourceId::system(),
            role: ActorRole::System,
        }
    }

    /// Returns true if the actor may act on shifts assigned to `resource`
    pub fn may_act_for(&self, resource: &ResourceId) -> bool {
        self.role.sees_all() || &self.id == resource
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse() {
        assert_eq!("staff".parse::<ActorRole>().unwrap(), ActorRole::Staff);
        assert_eq!("admin".parse::<ActorRole>().unwrap(), ActorRole::Privileged);
        assert!("root".parse::<ActorRole>().is_err());
    }

    #[test]
    fn staff_may_only_act_for_themselves() {
        let alice: ResourceId = "alice".parse().unwrap();
        let bob: ResourceId = "bob".parse().unwrap();

        let actor = Actor::staff(alice.clone());
        assert!(actor.may_act_for(&alice));
        assert!(!actor.may_act_for(&bob));

        let boss = Actor::privileged("boss".parse().unwrap());
        assert!(boss.may_act_for(&bob));
    }
}
