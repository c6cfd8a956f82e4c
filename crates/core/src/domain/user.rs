use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The closed set of workflow roles. CTSD is the corporate-wide role and is
/// not bound to a single site.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleCode {
    #[serde(rename = "STLD")]
    Stld,
    #[serde(rename = "SH")]
    Sh,
    #[serde(rename = "EH")]
    Eh,
    #[serde(rename = "IL")]
    Il,
    #[serde(rename = "CTSD")]
    Ctsd,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown role code `{0}`")]
pub struct UnknownRole(pub String);

impl RoleCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stld => "STLD",
            Self::Sh => "SH",
            Self::Eh => "EH",
            Self::Il => "IL",
            Self::Ctsd => "CTSD",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Stld => "Site TSD Lead",
            Self::Sh => "Site Head",
            Self::Eh => "Engg Head",
            Self::Il => "Initiative Lead",
            Self::Ctsd => "Corp TSD",
        }
    }

    pub fn is_corporate(&self) -> bool {
        matches!(self, Self::Ctsd)
    }
}

impl std::str::FromStr for RoleCode {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "STLD" => Ok(Self::Stld),
            "SH" => Ok(Self::Sh),
            "EH" => Ok(Self::Eh),
            "IL" => Ok(Self::Il),
            "CTSD" => Ok(Self::Ctsd),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl std::fmt::Display for RoleCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated identity acting on a workflow call. Supplied by the
/// authentication collaborator on every request; never persisted here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub identity: String,
    pub role: RoleCode,
    pub site: Option<String>,
}

impl Actor {
    pub fn new(identity: impl Into<String>, role: RoleCode, site: Option<&str>) -> Self {
        Self { identity: identity.into(), role, site: site.map(ToString::to_string) }
    }
}
