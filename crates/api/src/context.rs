use core::str::FromStr;

/// Role of the caller, as asserted by the upstream auth gateway.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ActorRole {
    /// Reception desk staff: opens/closes receptions, scans products.
    Employee,
    /// Registers pickup points.
    Moderator,
}

impl ActorRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ActorRole::Employee => "employee",
            ActorRole::Moderator => "moderator",
        }
    }
}

impl FromStr for ActorRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "employee" => Ok(ActorRole::Employee),
            "moderator" => Ok(ActorRole::Moderator),
            _ => Err(()),
        }
    }
}

/// Actor context for a request.
///
/// Inserted by the actor middleware; present for all protected routes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ActorContext {
    role: ActorRole,
}

impl ActorContext {
    pub fn new(role: ActorRole) -> Self {
        Self { role }
    }

    pub fn role(&self) -> ActorRole {
        self.role
    }
}
