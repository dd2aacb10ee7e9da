//! Deployment-time audit of configured secrets.
//!
//! The auditor reads the same [`ConfigLookup`] surface as [`SecretProvider`](crate::SecretProvider)
//! and classifies every required secret:
//!
//! | Condition | Classification |
//! |-----------|----------------|
//! | unset or empty | `Error(NotSet)` |
//! | contains a placeholder marker (`your_`, `_here`, `example`) | `Warning(Placeholder)` |
//! | shorter than [`MIN_SECRET_LENGTH`] characters | `Warning(TooShort)` |
//! | contains a deny-listed fragment | `Error(WeakSecret)` |
//! | none of the above | `Ok` |
//!
//! The environment mode must equal [`PRODUCTION`], otherwise a
//! `Warning(NotProduction)` is reported.
//!
//! ## Known imprecision
//!
//! Both the placeholder and the deny-list checks are case-insensitive substring
//! matches. A strong secret that happens to contain a fragment such as `admin`
//! is reported as weak, and a weak secret that avoids every fragment passes.
//! The findings are a heuristic, not a guarantee.

use std::fmt;

use rand::RngCore;
use serde::Serialize;
use subtle::ConstantTimeEq;
use tracing::{debug, info};

use crate::config::{
    ConfigLookup, ENVIRONMENT_KEY, PRODUCTION, SESSION_SECRET_KEY, TOKEN_SECRET_KEY,
};

/// Secrets every deployment must configure
pub const REQUIRED_SECRETS: [&str; 2] = [TOKEN_SECRET_KEY, SESSION_SECRET_KEY];

/// Minimum recommended secret length in characters
pub const MIN_SECRET_LENGTH: usize = 32;

/// Fragments indicating a template value was never replaced
pub const PLACEHOLDER_MARKERS: &[&str] = &["your_", "_here", "example"];

/// Known-weak values and defaults shipped by earlier releases
pub const WEAK_SECRETS: &[&str] = &[
    "secret",
    "password",
    "123456",
    "admin",
    "default",
    "oursecret",
    "some_secret_token",
    "8fe171f3-0046-4df5-9216-14099434339f",
];

/// Random bytes per generated remediation secret (rendered as twice as many hex digits)
pub const REMEDIATION_SECRET_BYTES: usize = 64;

/// Why a value was flagged
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    /// The value is absent or empty
    NotSet,
    /// The value looks like a template placeholder
    Placeholder,
    /// The value is shorter than [`MIN_SECRET_LENGTH`]
    TooShort,
    /// The value contains a deny-listed fragment
    WeakSecret,
    /// Two trust domains share one value
    SharedSecret,
    /// The environment mode is not production
    NotProduction {
        /// Mode actually configured
        actual: Option<String>,
    },
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSet => f.write_str("not set"),
            Self::Placeholder => f.write_str("placeholder value"),
            Self::TooShort => f.write_str("too short"),
            Self::WeakSecret => f.write_str("weak/default secret"),
            Self::SharedSecret => f.write_str("shared between trust domains"),
            Self::NotProduction { .. } => f.write_str("not production"),
        }
    }
}

/// Classification of one checked subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "level", content = "reason", rename_all = "snake_case")]
pub enum Classification {
    /// Acceptable
    Ok,
    /// Should be addressed before production
    Warning(Reason),
    /// Must be fixed; fails the audit
    Error(Reason),
}

impl Classification {
    /// Whether this is an error
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Whether this is a warning
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Warning(_))
    }
}

/// One audit line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditFinding {
    /// Configuration key (or keys) the finding is about
    pub subject: String,
    /// Outcome for that subject
    pub classification: Classification,
}

impl AuditFinding {
    fn new(subject: impl Into<String>, classification: Classification) -> Self {
        Self {
            subject: subject.into(),
            classification,
        }
    }

    /// Human-readable description
    pub fn message(&self) -> String {
        let subject = &self.subject;
        match &self.classification {
            Classification::Ok if subject == ENVIRONMENT_KEY => {
                format!("{subject} is set to {PRODUCTION}")
            }
            Classification::Ok => format!("{subject} is properly configured"),
            Classification::Warning(reason) | Classification::Error(reason) => match reason {
                Reason::NotSet => format!("{subject} is not set"),
                Reason::Placeholder => {
                    format!("{subject} appears to be using a placeholder value")
                }
                Reason::TooShort => format!(
                    "{subject} is shorter than recommended ({MIN_SECRET_LENGTH}+ characters)"
                ),
                Reason::WeakSecret => format!("{subject} contains a weak or default secret"),
                Reason::SharedSecret => {
                    format!("{subject} share one value; trust domains are not separated")
                }
                Reason::NotProduction { actual } => format!(
                    "{subject} is set to '{}' (should be '{PRODUCTION}' for production deployments)",
                    actual.as_deref().unwrap_or("undefined")
                ),
            },
        }
    }
}

/// Overall audit result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// No warnings or errors
    Pass,
    /// Warnings only
    PassWithWarnings,
    /// At least one error
    Fail,
}

impl Verdict {
    /// Process exit code for this verdict
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Pass | Self::PassWithWarnings => 0,
            Self::Fail => 1,
        }
    }
}

/// Freshly generated replacement for a required secret; never applied automatically
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct RemediationSecret {
    /// Configuration key
    pub name: String,
    /// Suggested hex value
    pub value: String,
}

impl fmt::Debug for RemediationSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemediationSecret")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Everything an audit run found
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    /// Findings in check order
    pub findings: Vec<AuditFinding>,
    /// Suggested replacements, present only when the audit failed
    pub remediation: Vec<RemediationSecret>,
    /// Overall result
    pub verdict: Verdict,
}

impl AuditReport {
    /// Whether any finding is an error
    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.classification.is_error())
    }

    /// Whether any finding is a warning
    pub fn has_warnings(&self) -> bool {
        self.findings.iter().any(|f| f.classification.is_warning())
    }

    /// Findings for one subject
    pub fn findings_for<'a>(&'a self, subject: &'a str) -> impl Iterator<Item = &'a AuditFinding> {
        self.findings.iter().filter(move |f| f.subject == subject)
    }

    /// Process exit code
    pub fn exit_code(&self) -> i32 {
        self.verdict.exit_code()
    }
}

/// Classify one secret value.
///
/// An unset value yields a single `Error(NotSet)`. Otherwise the placeholder or
/// length warning (at most one, placeholder first) is followed by the deny-list
/// error if it applies; a value with neither yields a single `Ok`.
pub fn classify_secret(value: Option<&str>) -> Vec<Classification> {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return vec![Classification::Error(Reason::NotSet)];
    };
    let lowered = value.to_lowercase();

    let mut classes = Vec::new();
    if PLACEHOLDER_MARKERS.iter().any(|m| lowered.contains(m)) {
        classes.push(Classification::Warning(Reason::Placeholder));
    } else if value.chars().count() < MIN_SECRET_LENGTH {
        classes.push(Classification::Warning(Reason::TooShort));
    }

    if WEAK_SECRETS
        .iter()
        .any(|weak| lowered.contains(&weak.to_lowercase()))
    {
        classes.push(Classification::Error(Reason::WeakSecret));
    }

    if classes.is_empty() {
        classes.push(Classification::Ok);
    }
    classes
}

/// Classify the environment mode
pub fn check_environment(mode: Option<&str>) -> Classification {
    match mode {
        Some(PRODUCTION) => Classification::Ok,
        other => Classification::Warning(Reason::NotProduction {
            actual: other.map(str::to_string),
        }),
    }
}

/// A fresh hex-encoded secret of [`REMEDIATION_SECRET_BYTES`] random bytes
pub fn generate_secret() -> String {
    let mut bytes = [0u8; REMEDIATION_SECRET_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Preflight check over a fixed list of required secrets
#[derive(Debug, Clone)]
pub struct SecurityAuditor {
    required: Vec<String>,
}

impl Default for SecurityAuditor {
    fn default() -> Self {
        Self {
            required: REQUIRED_SECRETS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SecurityAuditor {
    /// Auditor over [`REQUIRED_SECRETS`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Auditor over a custom list of secret names
    pub fn with_required<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Names this auditor checks
    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Run the audit against `lookup`
    pub fn run<L: ConfigLookup + ?Sized>(&self, lookup: &L) -> AuditReport {
        let mut findings = Vec::new();
        let values: Vec<(String, Option<String>)> = self
            .required
            .iter()
            .map(|name| (name.clone(), lookup.lookup(name)))
            .collect();

        for (name, value) in &values {
            for class in classify_secret(value.as_deref()) {
                findings.push(AuditFinding::new(name.clone(), class));
            }
        }

        findings.extend(shared_secret_findings(&values));
        findings.push(AuditFinding::new(
            ENVIRONMENT_KEY,
            check_environment(lookup.lookup(ENVIRONMENT_KEY).as_deref()),
        ));

        let verdict = if findings.iter().any(|f| f.classification.is_error()) {
            Verdict::Fail
        } else if findings.iter().any(|f| f.classification.is_warning()) {
            Verdict::PassWithWarnings
        } else {
            Verdict::Pass
        };

        let remediation = if verdict == Verdict::Fail {
            self.required
                .iter()
                .map(|name| RemediationSecret {
                    name: name.clone(),
                    value: generate_secret(),
                })
                .collect()
        } else {
            Vec::new()
        };

        info!(
            checked = self.required.len(),
            findings = findings.len(),
            verdict = ?verdict,
            "security audit finished"
        );

        AuditReport {
            findings,
            remediation,
            verdict,
        }
    }
}

fn shared_secret_findings(values: &[(String, Option<String>)]) -> Vec<AuditFinding> {
    let mut findings = Vec::new();
    for (i, (first, a)) in values.iter().enumerate() {
        for (second, b) in &values[i + 1..] {
            let (Some(a), Some(b)) = (a.as_deref(), b.as_deref()) else {
                continue;
            };
            if !a.is_empty() && bool::from(a.as_bytes().ct_eq(b.as_bytes())) {
                debug!(first, second, "trust domains share a secret");
                findings.push(AuditFinding::new(
                    format!("{first} and {second}"),
                    Classification::Warning(Reason::SharedSecret),
                ));
            }
        }
    }
    findings
}
