//! Offline check of a payor import file.
//!
//! Usage: `payorflow-validate <file> [source-profile-id]`
//!
//! Runs the field and in-file rules without a directory backend (existence
//! checks always pass) and prints the validation result as JSON. Exits
//! non-zero when the file is rejected.

use anyhow::{Context, bail};

use payorflow_batch::{
    PayorDirectory, PayorValidation, ProcessorError, ValidationResult, validate_payors,
};
use payorflow_core::ProfileId;
use payorflow_infra::EnrolmentConfig;

/// Directory that knows no existing clients or users.
struct OfflineDirectory;

impl PayorDirectory for OfflineDirectory {
    fn exists_by_business_name(&self, _: ProfileId, _: &str) -> Result<bool, ProcessorError> {
        Ok(false)
    }
}

fn main() -> anyhow::Result<()> {
    payorflow_observability::init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        bail!("usage: payorflow-validate <file> [source-profile-id]");
    };
    let profile_id = match args.next() {
        Some(raw) => raw
            .parse::<ProfileId>()
            .with_context(|| format!("invalid source profile id: {raw}"))?,
        None => ProfileId::new(),
    };

    let config = EnrolmentConfig::from_env();
    let raw = std::fs::read_to_string(&path).with_context(|| format!("failed to read {path}"))?;

    let result = match validate_payors(profile_id, &raw, config.max_payors_per_file, &OfflineDirectory)? {
        PayorValidation::Valid(payors) => ValidationResult {
            valid: true,
            payor_count: payors.len(),
            errors: Vec::new(),
            batch_id: None,
        },
        PayorValidation::Invalid { payor_count, errors } => ValidationResult::failure(payor_count, errors),
    };

    tracing::info!(file = %path, valid = result.valid, payor_count = result.payor_count, "file checked");
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.valid {
        bail!("{} validation error(s)", result.errors.len());
    }
    Ok(())
}
