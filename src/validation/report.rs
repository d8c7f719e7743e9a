//! Validation report types.
//!
//! A report is a flat list of issues, each with a severity, a stable code
//! and the file (and line) it was found in.

use serde::Serialize;
use std::fmt;

/// Everything found while validating an output dataset.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ValidationReport {
    pub images_checked: usize,
    pub labels_checked: usize,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    /// True if there are no errors.
    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    /// True if there are no errors or warnings.
    pub fn is_ok_strict(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has_code(&self, code: IssueCode) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Checked {} image(s) and {} label file(s)",
            self.images_checked, self.labels_checked
        )?;

        if self.issues.is_empty() {
            return writeln!(f, "Validation passed: no issues found");
        }

        writeln!(
            f,
            "Validation completed with {} error(s) and {} warning(s):",
            self.error_count(),
            self.warning_count()
        )?;
        writeln!(f)?;

        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }

        Ok(())
    }
}

/// A single validation issue.
#[derive(Clone, Debug, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: IssueCode,
    pub message: String,
    pub context: IssueContext,
}

impl ValidationIssue {
    pub fn new(
        severity: Severity,
        code: IssueCode,
        message: impl Into<String>,
        context: IssueContext,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            context,
        }
    }

    pub fn error(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self::new(Severity::Error, code, message, context)
    }

    pub fn warning(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self::new(Severity::Warning, code, message, context)
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN ",
        };
        write!(
            f,
            "[{}] {:?} in {}: {}",
            severity, self.code, self.context, self.message
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Severity {
    /// Suspicious but usable.
    Warning,
    /// The training consumer would reject or misread this.
    Error,
}

/// Stable code identifying the kind of issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum IssueCode {
    // Label content
    /// A line that is not a box or polygon record.
    MalformedLabelLine,
    /// A class id missing from the class registry.
    UnknownClassId,
    /// A normalized value outside [0, 1] or not finite.
    CoordinateOutOfRange,
    /// A box with zero width or height.
    DegenerateBox,
    /// A label file that could not be read as UTF-8 text.
    UnreadableLabel,

    // Pairing
    /// A label file with no image of the same stem.
    LabelWithoutImage,
    /// An image with no label file.
    ImageWithoutLabel,

    // Images
    /// Image header could not be read.
    UnreadableImage,
    /// Image reports zero width or height.
    InvalidImageDimensions,
}

/// Where an issue was found.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueContext {
    Dataset,
    Image { name: String },
    Label { name: String, line: Option<usize> },
}

impl fmt::Display for IssueContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueContext::Dataset => write!(f, "dataset"),
            IssueContext::Image { name } => write!(f, "image {}", name),
            IssueContext::Label {
                name,
                line: Some(line),
            } => write!(f, "label {}:{}", name, line),
            IssueContext::Label { name, line: None } => write!(f, "label {}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_display() {
        let mut report = ValidationReport::new();
        report.add(ValidationIssue::error(
            IssueCode::UnknownClassId,
            "class 7 is not registered",
            IssueContext::Label {
                name: "a.txt".into(),
                line: Some(3),
            },
        ));
        report.add(ValidationIssue::warning(
            IssueCode::ImageWithoutLabel,
            "no label file",
            IssueContext::Image {
                name: "b.png".into(),
            },
        ));

        assert_eq!(report.error_count(), 1);
        assert_eq!(report.warning_count(), 1);
        assert!(!report.is_ok());
        let text = report.to_string();
        assert!(text.contains("[ERROR] UnknownClassId in label a.txt:3"));
        assert!(text.contains("[WARN ] ImageWithoutLabel in image b.png"));
    }
}
