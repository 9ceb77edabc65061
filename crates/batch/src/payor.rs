//! Payor import record schema.
//!
//! One record per prospective indirect client. Every field is optional at parse
//! time: a missing value is reported by the validation rules, not by the parser.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// One payor entry of an import file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayorEnrolmentRequest {
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_reference: Option<String>,
    #[serde(default)]
    pub persons: Option<Vec<PersonRequest>>,
}

impl PayorEnrolmentRequest {
    /// Persons listed for this payor (empty when absent).
    pub fn persons(&self) -> &[PersonRequest] {
        self.persons.as_deref().unwrap_or_default()
    }

    /// Persons that will receive an administrator account.
    pub fn admins(&self) -> impl Iterator<Item = &PersonRequest> {
        self.persons()
            .iter()
            .filter(|p| p.parsed_role() == Some(PersonRole::Admin))
    }
}

/// A related person of a payor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl PersonRequest {
    pub fn parsed_role(&self) -> Option<PersonRole> {
        self.role.as_deref().and_then(|r| r.parse().ok())
    }
}

/// Role of a related person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PersonRole {
    Admin,
    Contact,
}

impl PersonRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonRole::Admin => "ADMIN",
            PersonRole::Contact => "CONTACT",
        }
    }
}

impl FromStr for PersonRole {
    type Err = String;

    /// Role names are matched exactly (`ADMIN`, `CONTACT`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(PersonRole::Admin),
            "CONTACT" => Ok(PersonRole::Contact),
            other => Err(format!("unknown person role: {other}")),
        }
    }
}

/// Identifiers created by a successful enrolment (stored as item result data).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrolmentResult {
    pub indirect_client_id: String,
    pub profile_id: String,
    pub user_ids: Vec<String>,
}
