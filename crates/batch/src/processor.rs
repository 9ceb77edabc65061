//! Ports to the collaborators that own the real enrolment side effects.
//!
//! The pipeline never creates clients, profiles or users itself. It asks a
//! [`PayorDirectory`] whether records already exist and hands each validated
//! record to a [`PayorEnrolmentProcessor`].

use payorflow_core::ProfileId;

use crate::payor::{EnrolmentResult, PayorEnrolmentRequest};

/// Infrastructure fault raised by a collaborator (not a business outcome).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProcessorError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
    #[error("collaborator fault: {0}")]
    Fault(String),
}

/// Existence lookups used while validating an import file.
pub trait PayorDirectory: Send + Sync {
    /// Whether an indirect client with this business name already exists under the profile.
    fn exists_by_business_name(
        &self,
        profile_id: ProfileId,
        business_name: &str,
    ) -> Result<bool, ProcessorError>;

    /// Whether a local user already uses this e-mail address.
    fn exists_by_email(&self, _email: &str) -> Result<bool, ProcessorError> {
        Ok(false)
    }

    /// Whether the identity provider already knows this e-mail address.
    fn exists_in_identity_provider(&self, _email: &str) -> Result<bool, ProcessorError> {
        Ok(false)
    }
}

/// Business outcome of enrolling one payor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayorOutcome {
    /// The indirect client, its profile and admin users were created.
    Enrolled(EnrolmentResult),
    /// The collaborator refused the record; the reason ends up on the item.
    Rejected(String),
}

impl PayorOutcome {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }
}

/// Performs the enrolment side effects for one payor.
///
/// Each call commits independently: a later failure in the same batch never
/// rolls back an earlier `Enrolled` outcome.
pub trait PayorEnrolmentProcessor: PayorDirectory {
    fn process_payor(
        &self,
        source_profile_id: ProfileId,
        request: &PayorEnrolmentRequest,
        actor: &str,
    ) -> Result<PayorOutcome, ProcessorError>;
}
