//! Built-in rules.
//!
//! Small, parameterised rules covering the common cases: restricting by
//! purpose, role, authorisation or serialised format, and stripping or
//! masking record fields. They are registered by identifier in
//! [`RuleRegistry::with_builtin`](crate::registry::RuleRegistry::with_builtin).

use arbor_core::{Context, Resource, User};
use serde_json::Value;

use crate::policy::Record;
use crate::rule::Rule;

// =============================================================================
// Generic Rules
// =============================================================================

/// Lets every value through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughRule;

impl<T> Rule<T> for PassThroughRule {
    fn apply(&self, value: T, _user: &User, _context: &Context) -> Option<T> {
        Some(value)
    }
}

/// Allows only requests made for a given purpose.
#[derive(Debug, Clone)]
pub struct PurposeRule {
    purpose: String,
}

impl PurposeRule {
    pub fn new(purpose: impl Into<String>) -> Self {
        Self {
            purpose: purpose.into(),
        }
    }
}

impl<T> Rule<T> for PurposeRule {
    fn apply(&self, value: T, _user: &User, context: &Context) -> Option<T> {
        (context.purpose() == self.purpose).then_some(value)
    }
}

/// Allows only users holding a role.
#[derive(Debug, Clone)]
pub struct RoleRule {
    role: String,
}

impl RoleRule {
    pub fn new(role: impl Into<String>) -> Self {
        Self { role: role.into() }
    }
}

impl<T> Rule<T> for RoleRule {
    fn apply(&self, value: T, user: &User, _context: &Context) -> Option<T> {
        user.has_role(&self.role).then_some(value)
    }
}

/// Allows only users holding an authorisation.
#[derive(Debug, Clone)]
pub struct AuthorisationRule {
    auth: String,
}

impl AuthorisationRule {
    pub fn new(auth: impl Into<String>) -> Self {
        Self { auth: auth.into() }
    }
}

impl<T> Rule<T> for AuthorisationRule {
    fn apply(&self, value: T, user: &User, _context: &Context) -> Option<T> {
        user.has_auth(&self.auth).then_some(value)
    }
}

// =============================================================================
// Resource Rules
// =============================================================================

/// Allows only leaf resources stored in a given serialised format.
///
/// Systems and directories carry no format and are denied.
#[derive(Debug, Clone)]
pub struct SerialisedFormatRule {
    format: String,
}

impl SerialisedFormatRule {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
        }
    }
}

impl Rule<Resource> for SerialisedFormatRule {
    fn apply(&self, resource: Resource, _user: &User, _context: &Context) -> Option<Resource> {
        let matches = resource
            .serialised_format()
            .is_some_and(|format| format.eq_ignore_ascii_case(&self.format));
        matches.then_some(resource)
    }
}

// =============================================================================
// Record Rules
// =============================================================================

/// Removes fields from object records.
///
/// Users holding the exempt role, if one is set, see records untouched.
/// Records that are not JSON objects pass through unchanged.
#[derive(Debug, Clone)]
pub struct RedactFieldsRule {
    fields: Vec<String>,
    exempt_role: Option<String>,
}

impl RedactFieldsRule {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            exempt_role: None,
        }
    }

    #[must_use]
    pub fn exempt_role(mut self, role: impl Into<String>) -> Self {
        self.exempt_role = Some(role.into());
        self
    }
}

impl Rule<Record> for RedactFieldsRule {
    fn apply(&self, mut record: Record, user: &User, _context: &Context) -> Option<Record> {
        if self
            .exempt_role
            .as_deref()
            .is_some_and(|role| user.has_role(role))
        {
            return Some(record);
        }

        if let Some(object) = record.as_object_mut() {
            for field in &self.fields {
                object.remove(field);
            }
        }
        Some(record)
    }
}

/// Replaces the values of present fields with a fixed mask string.
#[derive(Debug, Clone)]
pub struct MaskFieldsRule {
    fields: Vec<String>,
    mask: String,
}

impl MaskFieldsRule {
    /// Mask used when none is configured.
    pub const DEFAULT_MASK: &'static str = "***";

    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            mask: Self::DEFAULT_MASK.to_string(),
        }
    }

    #[must_use]
    pub fn mask(mut self, mask: impl Into<String>) -> Self {
        self.mask = mask.into();
        self
    }
}

impl Rule<Record> for MaskFieldsRule {
    fn apply(&self, mut record: Record, _user: &User, _context: &Context) -> Option<Record> {
        if let Some(object) = record.as_object_mut() {
            for field in &self.fields {
                if let Some(slot) = object.get_mut(field) {
                    *slot = Value::String(self.mask.clone());
                }
            }
        }
        Some(record)
    }
}
