//! Output formatting for the CLI
//!
//! Every printer writes to a caller-supplied [`Write`] so commands can be
//! exercised against a buffer.

use std::io::{self, Write};

use adminauth::{AuditFinding, AuditReport, Classification, VerificationOutcome, Verdict};
use owo_colors::OwoColorize;
use serde::Serialize;

use crate::cli::OutputFormat;

/// Format and display output based on format preference
#[derive(Debug, Clone, Copy)]
pub struct Formatter {
    format: OutputFormat,
    colored: bool,
}

impl Formatter {
    #[must_use]
    pub fn new(format: OutputFormat, colored: bool) -> Self {
        Self { format, colored }
    }

    /// Selected output format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Display any serializable value as pretty JSON
    pub fn display_json<T: Serialize + ?Sized, W: Write>(
        &self,
        out: &mut W,
        value: &T,
    ) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(out, "{json}")
    }

    /// Display an audit report
    pub fn display_report<W: Write>(&self, out: &mut W, report: &AuditReport) -> io::Result<()> {
        if self.format == OutputFormat::Json {
            return self.display_json(out, report);
        }

        self.print_header(out, "Security Configuration Check")?;
        for finding in &report.findings {
            self.print_finding(out, finding)?;
        }

        if !report.remediation.is_empty() {
            self.print_header(out, "Suggested Secrets")?;
            writeln!(out, "Generate secure secrets with:")?;
            for secret in &report.remediation {
                writeln!(out, "  export {}=\"{}\"", secret.name, secret.value)?;
            }
            writeln!(out)?;
            writeln!(out, "Or add them to your .env file:")?;
            for secret in &report.remediation {
                writeln!(out, "  {}={}", secret.name, secret.value)?;
            }
        }

        self.print_summary(out, report.verdict)
    }

    /// Display a verification outcome
    pub fn display_outcome<W: Write>(
        &self,
        out: &mut W,
        outcome: &VerificationOutcome,
    ) -> io::Result<()> {
        if self.format == OutputFormat::Json {
            let value = serde_json::json!({
                "outcome": outcome.label(),
                "claims": outcome.payload(),
            });
            return self.display_json(out, &value);
        }

        let label = outcome.label();
        if outcome.is_valid() {
            if self.colored {
                writeln!(out, "{}", label.bright_green().bold())?;
            } else {
                writeln!(out, "{label}")?;
            }
            if let Some(claims) = outcome.payload() {
                for (name, value) in claims {
                    self.print_kv(out, name, &value.to_string())?;
                }
            }
            Ok(())
        } else if self.colored {
            writeln!(out, "{}", label.bright_red().bold())
        } else {
            writeln!(out, "{label}")
        }
    }

    /// Display freshly generated secrets, one per line
    pub fn display_secrets<W: Write>(&self, out: &mut W, secrets: &[String]) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => self.display_json(out, secrets),
            OutputFormat::Human => {
                for secret in secrets {
                    writeln!(out, "{secret}")?;
                }
                Ok(())
            }
        }
    }

    /// Display an issued token
    pub fn display_token<W: Write>(&self, out: &mut W, token: &str) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => self.display_json(out, &serde_json::json!({ "token": token })),
            OutputFormat::Human => writeln!(out, "{token}"),
        }
    }

    // Internal formatting helpers

    fn print_finding<W: Write>(&self, out: &mut W, finding: &AuditFinding) -> io::Result<()> {
        let (tag, message) = match &finding.classification {
            Classification::Ok => ("OK", finding.message()),
            Classification::Warning(_) => ("WARNING", finding.message()),
            Classification::Error(_) => ("ERROR", finding.message()),
        };

        if !self.colored {
            return writeln!(out, "  [{tag}] {message}");
        }

        match &finding.classification {
            Classification::Ok => writeln!(out, "  [{}] {message}", tag.bright_green()),
            Classification::Warning(_) => writeln!(out, "  [{}] {message}", tag.bright_yellow()),
            Classification::Error(_) => {
                writeln!(out, "  [{}] {message}", tag.bright_red().bold())
            }
        }
    }

    fn print_summary<W: Write>(&self, out: &mut W, verdict: Verdict) -> io::Result<()> {
        let text = match verdict {
            Verdict::Pass => "Security configuration check passed",
            Verdict::PassWithWarnings => {
                "Security configuration has warnings; review before production deployment"
            }
            Verdict::Fail => {
                "CRITICAL: security configuration has errors that must be fixed before production deployment"
            }
        };

        writeln!(out)?;
        if !self.colored {
            return writeln!(out, "{text}");
        }
        match verdict {
            Verdict::Pass => writeln!(out, "{}", text.bright_green().bold()),
            Verdict::PassWithWarnings => writeln!(out, "{}", text.bright_yellow().bold()),
            Verdict::Fail => writeln!(out, "{}", text.bright_red().bold()),
        }
    }

    fn print_header<W: Write>(&self, out: &mut W, text: &str) -> io::Result<()> {
        if self.colored {
            writeln!(out, "\n{}", text.bright_cyan().bold())?;
            writeln!(out, "{}", "=".repeat(text.len()).bright_cyan())
        } else {
            writeln!(out, "\n{text}")?;
            writeln!(out, "{}", "=".repeat(text.len()))
        }
    }

    fn print_kv<W: Write>(&self, out: &mut W, key: &str, value: &str) -> io::Result<()> {
        if self.colored {
            writeln!(out, "  {}: {}", key.bright_green().bold(), value)
        } else {
            writeln!(out, "  {key}: {value}")
        }
    }
}
