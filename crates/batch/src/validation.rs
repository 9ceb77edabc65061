//! Import file validation.
//!
//! Parses a payor file and checks every record against field rules and
//! cross-record rules. Violations are collected as data, never raised: a file
//! is either entirely valid or rejected with the full list of problems.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use payorflow_core::{BatchId, ProfileId};

use crate::payor::{PayorEnrolmentRequest, PersonRequest, PersonRole};
use crate::processor::{PayorDirectory, ProcessorError};

/// Default upper bound of records accepted in one file.
pub const MAX_PAYORS_PER_FILE: usize = 500;

const MAX_BUSINESS_NAME_CHARS: usize = 255;
const MAX_PERSON_NAME_CHARS: usize = 100;
const MAX_PHONE_CHARS: usize = 50;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9+_.-]+@[A-Za-z0-9.-]+$").expect("valid regex"));

/// One rule violation, addressed by record index and field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    /// 0-based position of the record in the file.
    pub record_index: usize,
    /// Business name of the record, for display only.
    pub business_name: Option<String>,
    /// Field path, e.g. `businessName` or `persons[0].email`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(
        record_index: usize,
        business_name: Option<&str>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            record_index,
            business_name: business_name.map(str::to_owned),
            field: field.into(),
            message: message.into(),
        }
    }

    /// File-level error (not tied to a specific record).
    fn file(field: &str, message: impl Into<String>) -> Self {
        Self::new(0, None, field, message)
    }
}

/// Outcome of validating an import file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    pub payor_count: usize,
    pub errors: Vec<ValidationError>,
    /// Set only when the file was valid and a batch was persisted.
    pub batch_id: Option<BatchId>,
}

impl ValidationResult {
    pub fn success(payor_count: usize, batch_id: BatchId) -> Self {
        Self {
            valid: true,
            payor_count,
            errors: Vec::new(),
            batch_id: Some(batch_id),
        }
    }

    pub fn failure(payor_count: usize, errors: Vec<ValidationError>) -> Self {
        Self {
            valid: false,
            payor_count,
            errors,
            batch_id: None,
        }
    }
}

/// Result of running the rules, before anything is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayorValidation {
    /// Every record passed; records are in file order.
    Valid(Vec<PayorEnrolmentRequest>),
    Invalid {
        payor_count: usize,
        errors: Vec<ValidationError>,
    },
}

impl PayorValidation {
    fn rejected(payor_count: usize, error: ValidationError) -> Self {
        Self::Invalid {
            payor_count,
            errors: vec![error],
        }
    }
}

/// Parse an import file: either `{"payors": [...]}` or a bare `[...]`.
pub fn parse_payors(raw: &str) -> Result<Vec<PayorEnrolmentRequest>, serde_json::Error> {
    let value: JsonValue = serde_json::from_str(raw)?;
    let records = match value {
        JsonValue::Object(mut map) => map.remove("payors").unwrap_or(JsonValue::Object(map)),
        other => other,
    };
    serde_json::from_value(records)
}

/// Run every rule over an import file.
///
/// Returns `Err` only when a directory lookup fails; rule violations are
/// reported through [`PayorValidation::Invalid`].
pub fn validate_payors<D>(
    source_profile_id: ProfileId,
    raw: &str,
    max_payors: usize,
    directory: &D,
) -> Result<PayorValidation, ProcessorError>
where
    D: PayorDirectory + ?Sized,
{
    let payors = match parse_payors(raw) {
        Ok(payors) => payors,
        Err(e) => {
            return Ok(PayorValidation::rejected(
                0,
                ValidationError::file("json", format!("Invalid JSON format: {e}")),
            ));
        }
    };

    if payors.is_empty() {
        return Ok(PayorValidation::rejected(
            0,
            ValidationError::file("payors", "No payors found in file"),
        ));
    }

    if payors.len() > max_payors {
        return Ok(PayorValidation::rejected(
            payors.len(),
            ValidationError::file("payors", format!("Too many payors. Maximum is {max_payors}")),
        ));
    }

    let mut checker = RecordChecker {
        source_profile_id,
        directory,
        business_names: HashSet::new(),
        emails: HashSet::new(),
        errors: Vec::new(),
    };
    for (index, payor) in payors.iter().enumerate() {
        checker.check(index, payor)?;
    }

    if checker.errors.is_empty() {
        Ok(PayorValidation::Valid(payors))
    } else {
        Ok(PayorValidation::Invalid {
            payor_count: payors.len(),
            errors: checker.errors,
        })
    }
}

/// Accumulates violations across records; holds the in-file duplicate sets.
struct RecordChecker<'a, D: ?Sized> {
    source_profile_id: ProfileId,
    directory: &'a D,
    business_names: HashSet<String>,
    emails: HashSet<String>,
    errors: Vec<ValidationError>,
}

impl<D> RecordChecker<'_, D>
where
    D: PayorDirectory + ?Sized,
{
    fn check(&mut self, index: usize, payor: &PayorEnrolmentRequest) -> Result<(), ProcessorError> {
        let name = payor.business_name.as_deref();
        self.check_business_name(index, name)?;

        let persons = payor.persons();
        if persons.is_empty() {
            self.push(index, name, "persons", "At least one person is required");
            return Ok(());
        }

        let mut has_admin = false;
        for (p, person) in persons.iter().enumerate() {
            has_admin |= self.check_person(index, name, p, person)?;
        }
        if !has_admin {
            self.push(index, name, "persons", "At least one ADMIN person is required");
        }
        Ok(())
    }

    fn check_business_name(&mut self, index: usize, name: Option<&str>) -> Result<(), ProcessorError> {
        let Some(business_name) = name.filter(|n| !n.trim().is_empty()) else {
            self.push(index, name, "businessName", "Business name is required");
            return Ok(());
        };

        if business_name.chars().count() > MAX_BUSINESS_NAME_CHARS {
            self.push(index, name, "businessName", "Business name exceeds 255 characters");
        } else if !self.business_names.insert(business_name.to_owned()) {
            self.push(index, name, "businessName", "Duplicate business name in file");
        }

        if self
            .directory
            .exists_by_business_name(self.source_profile_id, business_name)?
        {
            self.push(index, name, "businessName", "Business name already exists");
        }
        Ok(())
    }

    /// Returns whether the person is a valid ADMIN.
    fn check_person(
        &mut self,
        index: usize,
        name: Option<&str>,
        p: usize,
        person: &PersonRequest,
    ) -> Result<bool, ProcessorError> {
        let field = |f: &str| format!("persons[{p}].{f}");

        match person.name.as_deref().filter(|n| !n.trim().is_empty()) {
            None => self.push(index, name, field("name"), "Name is required"),
            Some(n) if n.chars().count() > MAX_PERSON_NAME_CHARS => {
                self.push(index, name, field("name"), "Name exceeds 100 characters")
            }
            Some(_) => {}
        }

        if let Some(message) = self.email_violation(person.email.as_deref())? {
            self.push(index, name, field("email"), message);
        }

        let mut is_admin = false;
        match person.role.as_deref().filter(|r| !r.trim().is_empty()) {
            None => self.push(index, name, field("role"), "Role is required"),
            Some(role) => match role.parse::<PersonRole>() {
                Ok(PersonRole::Admin) => is_admin = true,
                Ok(PersonRole::Contact) => {}
                Err(_) => self.push(index, name, field("role"), "Role must be ADMIN or CONTACT"),
            },
        }

        if let Some(phone) = person.phone.as_deref() {
            if phone.chars().count() > MAX_PHONE_CHARS {
                self.push(index, name, field("phone"), "Phone exceeds 50 characters");
            }
        }

        Ok(is_admin)
    }

    /// First failing e-mail rule, if any. Rules are checked in order and stop
    /// at the first violation.
    fn email_violation(&mut self, email: Option<&str>) -> Result<Option<&'static str>, ProcessorError> {
        let Some(email) = email.filter(|e| !e.trim().is_empty()) else {
            return Ok(Some("Email is required"));
        };
        if !EMAIL_RE.is_match(email) {
            return Ok(Some("Invalid email format"));
        }
        if !self.emails.insert(email.to_lowercase()) {
            return Ok(Some("Duplicate email in file"));
        }
        if self.directory.exists_by_email(email)? {
            return Ok(Some("User with this email already exists"));
        }
        if self.directory.exists_in_identity_provider(email)? {
            return Ok(Some("User already exists in identity provider"));
        }
        Ok(None)
    }

    fn push(&mut self, index: usize, name: Option<&str>, field: impl Into<String>, message: &str) {
        self.errors
            .push(ValidationError::new(index, name, field, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Directory with a fixed set of known business names and e-mails.
    #[derive(Default)]
    struct FakeDirectory {
        names: Vec<String>,
        local_emails: Vec<String>,
        idp_emails: Vec<String>,
        broken: bool,
    }

    impl PayorDirectory for FakeDirectory {
        fn exists_by_business_name(
            &self,
            _profile_id: ProfileId,
            business_name: &str,
        ) -> Result<bool, ProcessorError> {
            if self.broken {
                return Err(ProcessorError::Unavailable("directory down".to_string()));
            }
            Ok(self.names.iter().any(|n| n == business_name))
        }

        fn exists_by_email(&self, email: &str) -> Result<bool, ProcessorError> {
            Ok(self.local_emails.iter().any(|e| e == email))
        }

        fn exists_in_identity_provider(&self, email: &str) -> Result<bool, ProcessorError> {
            Ok(self.idp_emails.iter().any(|e| e == email))
        }
    }

    fn payor(name: &str, email: &str) -> JsonValue {
        json!({
            "businessName": name,
            "persons": [{"name": "Jane Doe", "email": email, "role": "ADMIN"}]
        })
    }

    fn run(input: JsonValue) -> PayorValidation {
        run_with(input, &FakeDirectory::default())
    }

    fn run_with(input: JsonValue, directory: &FakeDirectory) -> PayorValidation {
        validate_payors(ProfileId::new(), &input.to_string(), MAX_PAYORS_PER_FILE, directory).unwrap()
    }

    fn errors(v: PayorValidation) -> Vec<ValidationError> {
        match v {
            PayorValidation::Invalid { errors, .. } => errors,
            PayorValidation::Valid(_) => panic!("expected invalid file"),
        }
    }

    fn has_error(errors: &[ValidationError], field: &str, message: &str) -> bool {
        errors.iter().any(|e| e.field == field && e.message == message)
    }

    #[test]
    fn accepts_wrapped_and_bare_formats() {
        let wrapped = run(json!({"payors": [payor("Acme", "a@acme.test")]}));
        assert!(matches!(wrapped, PayorValidation::Valid(ref p) if p.len() == 1));

        let bare = run(json!([payor("Acme", "a@acme.test"), payor("Beta", "b@beta.test")]));
        match bare {
            PayorValidation::Valid(p) => {
                assert_eq!(p.len(), 2);
                assert_eq!(p[1].business_name.as_deref(), Some("Beta"));
            }
            other => panic!("expected valid file, got {other:?}"),
        }
    }

    #[test]
    fn malformed_json_is_a_single_json_error() {
        let result = validate_payors(
            ProfileId::new(),
            "{ not json",
            MAX_PAYORS_PER_FILE,
            &FakeDirectory::default(),
        )
        .unwrap();

        match result {
            PayorValidation::Invalid { payor_count, errors } => {
                assert_eq!(payor_count, 0);
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "json");
                assert!(errors[0].message.starts_with("Invalid JSON format"));
            }
            other => panic!("expected invalid file, got {other:?}"),
        }
    }

    #[test]
    fn object_without_payors_key_is_a_json_error() {
        let errs = errors(run(json!({"records": []})));
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].field, "json");
    }

    #[test]
    fn empty_file_reports_no_payors() {
        let errs = errors(run(json!({"payors": []})));
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].field, "payors");
        assert_eq!(errs[0].message, "No payors found in file");
    }

    #[test]
    fn too_many_payors_reports_true_count() {
        let records: Vec<JsonValue> = (0..501)
            .map(|i| payor(&format!("Payor {i}"), &format!("user{i}@example.test")))
            .collect();

        match run(JsonValue::Array(records)) {
            PayorValidation::Invalid { payor_count, errors } => {
                assert_eq!(payor_count, 501);
                assert_eq!(errors.len(), 1);
                assert!(errors[0].message.contains("Too many payors. Maximum is 500"));
            }
            other => panic!("expected invalid file, got {other:?}"),
        }
    }

    #[test]
    fn configured_limit_is_honoured() {
        let input = json!([payor("A", "a@a.test"), payor("B", "b@b.test")]);
        let result =
            validate_payors(ProfileId::new(), &input.to_string(), 1, &FakeDirectory::default()).unwrap();
        let errs = errors(result);
        assert_eq!(errs[0].message, "Too many payors. Maximum is 1");
    }

    #[test]
    fn business_name_rules() {
        let long = "x".repeat(256);
        let errs = errors(run(json!([
            {"persons": [{"name": "A", "email": "a@a.test", "role": "ADMIN"}]},
            payor(&long, "b@b.test"),
            payor("   ", "c@c.test"),
        ])));

        assert!(errs.iter().any(|e| e.record_index == 0
            && e.field == "businessName"
            && e.message == "Business name is required"));
        assert!(errs.iter().any(|e| e.record_index == 1
            && e.message == "Business name exceeds 255 characters"));
        assert!(errs.iter().any(|e| e.record_index == 2
            && e.message == "Business name is required"));
    }

    #[test]
    fn business_name_limit_counts_characters_not_bytes() {
        let name = "é".repeat(255);
        assert!(matches!(run(json!([payor(&name, "a@a.test")])), PayorValidation::Valid(_)));
    }

    #[test]
    fn duplicate_business_name_flags_later_occurrences() {
        let errs = errors(run(json!([
            payor("Acme", "a@acme.test"),
            payor("Acme", "b@acme.test"),
            payor("Acme", "c@acme.test"),
        ])));

        let dups: Vec<usize> = errs
            .iter()
            .filter(|e| e.field == "businessName" && e.message == "Duplicate business name in file")
            .map(|e| e.record_index)
            .collect();
        assert_eq!(dups, vec![1, 2]);
        assert_eq!(errs[0].business_name.as_deref(), Some("Acme"));
    }

    #[test]
    fn existing_business_name_is_rejected() {
        let directory = FakeDirectory {
            names: vec!["Acme".to_string()],
            ..Default::default()
        };
        let errs = errors(run_with(json!([payor("Acme", "a@acme.test")]), &directory));
        assert!(has_error(&errs, "businessName", "Business name already exists"));
    }

    #[test]
    fn persons_are_required() {
        let errs = errors(run(json!([{"businessName": "Acme"}])));
        assert_eq!(errs.len(), 1);
        assert!(has_error(&errs, "persons", "At least one person is required"));
    }

    #[test]
    fn contact_only_record_needs_an_admin() {
        let errs = errors(run(json!([{
            "businessName": "Acme",
            "persons": [{"name": "Bob", "email": "bob@acme.test", "role": "CONTACT"}]
        }])));
        assert!(has_error(&errs, "persons", "At least one ADMIN person is required"));
    }

    #[test]
    fn person_field_rules_use_indexed_paths() {
        let errs = errors(run(json!([{
            "businessName": "Acme",
            "persons": [
                {"name": "Jane", "email": "jane@acme.test", "role": "ADMIN"},
                {"email": "bad-email", "role": "OWNER", "phone": "1".repeat(51)},
                {"name": "n".repeat(101), "role": ""}
            ]
        }])));

        assert!(has_error(&errs, "persons[1].name", "Name is required"));
        assert!(has_error(&errs, "persons[1].email", "Invalid email format"));
        assert!(has_error(&errs, "persons[1].role", "Role must be ADMIN or CONTACT"));
        assert!(has_error(&errs, "persons[1].phone", "Phone exceeds 50 characters"));
        assert!(has_error(&errs, "persons[2].name", "Name exceeds 100 characters"));
        assert!(has_error(&errs, "persons[2].email", "Email is required"));
        assert!(has_error(&errs, "persons[2].role", "Role is required"));
        assert!(!errs.iter().any(|e| e.field.starts_with("persons[0]")));
    }

    #[test]
    fn duplicate_email_is_case_insensitive_across_records() {
        let errs = errors(run(json!([
            payor("Acme", "Jane@Acme.test"),
            payor("Beta", "jane@acme.TEST"),
        ])));
        let dup = errs
            .iter()
            .find(|e| e.message == "Duplicate email in file")
            .unwrap();
        assert_eq!(dup.record_index, 1);
        assert_eq!(dup.field, "persons[0].email");
    }

    #[test]
    fn known_emails_are_rejected() {
        let directory = FakeDirectory {
            local_emails: vec!["local@acme.test".to_string()],
            idp_emails: vec!["idp@beta.test".to_string()],
            ..Default::default()
        };
        let errs = errors(run_with(
            json!([payor("Acme", "local@acme.test"), payor("Beta", "idp@beta.test")]),
            &directory,
        ));
        assert!(has_error(&errs, "persons[0].email", "User with this email already exists"));
        assert!(has_error(
            &errs,
            "persons[0].email",
            "User already exists in identity provider"
        ));
    }

    #[test]
    fn violations_accumulate_across_records() {
        let errs = errors(run(json!([
            {"persons": []},
            payor("Fine", "fine@x.test"),
            {"businessName": "Beta", "persons": [{"name": "B", "email": "b@b.test", "role": "CONTACT"}]},
        ])));

        let indexes: HashSet<usize> = errs.iter().map(|e| e.record_index).collect();
        assert_eq!(indexes, HashSet::from([0, 2]));
        assert_eq!(errs.len(), 3);
    }

    #[test]
    fn directory_fault_aborts_validation() {
        let directory = FakeDirectory {
            broken: true,
            ..Default::default()
        };
        let result = validate_payors(
            ProfileId::new(),
            &json!([payor("Acme", "a@acme.test")]).to_string(),
            MAX_PAYORS_PER_FILE,
            &directory,
        );
        assert!(matches!(result, Err(ProcessorError::Unavailable(_))));
    }
}
