//! Enrollment status enumeration
//!
//! The raw status of a student's enrollment in an offer, exactly as the
//! enrollment store records it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnrollmentStatus {
    Activated,
    Completed,
    Approved,
    Unenrolled,
    Failed,
    Inactivate,
}

impl EnrollmentStatus {
    /// Every status, in the store's canonical order. Chart series follow
    /// this order.
    pub const ALL: [EnrollmentStatus; 6] = [
        Self::Activated,
        Self::Completed,
        Self::Approved,
        Self::Unenrolled,
        Self::Failed,
        Self::Inactivate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Activated => "Activated",
            Self::Completed => "Completed",
            Self::Approved => "Approved",
            Self::Unenrolled => "Unenrolled",
            Self::Failed => "Failed",
            Self::Inactivate => "Inactivate",
        }
    }

    /// The status this one is reported as. `Approved` and `Completed` mean
    /// the same thing to a student looking at their progress.
    pub fn normalized(self) -> Self {
        match self {
            Self::Approved => Self::Completed,
            other => other,
        }
    }
}

impl std::fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EnrollmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Unknown enrollment status: {}", s))
    }
}

impl TryFrom<String> for EnrollmentStatus {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}
