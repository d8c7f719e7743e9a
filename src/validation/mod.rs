//! Validation of an output dataset.
//!
//! Checks the saved image/label folders the way a training consumer would
//! read them:
//! - every label line parses as a box or polygon record
//! - class ids exist in the class registry
//! - normalized values are finite and inside [0, 1]
//! - images and label files pair up by file stem
//! - image headers are readable with positive dimensions

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::config::ClassRegistry;
use crate::error::LabelkitError;
use crate::ir::io_label::LABEL_EXTENSION;
use crate::ir::{parse_label_line, LabelRecord};
use crate::session::{list_images, ListOrder};

/// Slack allowed on normalized values for float formatting.
const RANGE_TOLERANCE: f64 = 1e-6;

#[derive(Clone, Debug, Default)]
pub struct ValidateOptions {
    /// Treat warnings as errors.
    pub strict: bool,
    /// Skip the class id check even when a registry is configured.
    pub ignore_classes: bool,
}

/// Validates the image folder against the label folder.
///
/// Only a missing image folder is an error here; everything else ends up
/// in the report.
pub fn validate_output(
    image_dir: &Path,
    label_dir: &Path,
    classes: &ClassRegistry,
    opts: &ValidateOptions,
) -> Result<ValidationReport, LabelkitError> {
    let mut report = ValidationReport::new();

    let images = list_images(image_dir, ListOrder::Sorted)?;
    let labels = list_label_files(label_dir)?;

    let image_stems: BTreeSet<String> = images.iter().map(|n| file_stem(n)).collect();
    let label_stems: BTreeSet<String> = labels.iter().map(|n| file_stem(n)).collect();

    for name in &images {
        report.images_checked += 1;
        validate_image(&image_dir.join(name), name, &mut report);
        if !label_stems.contains(&file_stem(name)) {
            report.add(ValidationIssue::warning(
                IssueCode::ImageWithoutLabel,
                "no label file (image not processed)",
                IssueContext::Image { name: name.clone() },
            ));
        }
    }

    let check_classes = !opts.ignore_classes && !classes.classes.is_empty();
    for name in &labels {
        report.labels_checked += 1;
        if !image_stems.contains(&file_stem(name)) {
            report.add(ValidationIssue::warning(
                IssueCode::LabelWithoutImage,
                "no image with the same name",
                IssueContext::Label {
                    name: name.clone(),
                    line: None,
                },
            ));
        }
        let content = match fs::read_to_string(label_dir.join(name)) {
            Ok(content) => content,
            Err(err) => {
                report.add(ValidationIssue::error(
                    IssueCode::UnreadableLabel,
                    format!("cannot read label file: {err}"),
                    IssueContext::Label {
                        name: name.clone(),
                        line: None,
                    },
                ));
                continue;
            }
        };
        validate_label_content(
            &content,
            name,
            check_classes.then_some(classes),
            &mut report,
        );
    }

    log::debug!(
        "validated {} image(s), {} label file(s): {} issue(s)",
        report.images_checked,
        report.labels_checked,
        report.issues.len()
    );
    Ok(report)
}

fn file_stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Label file names in `dir`, sorted. A missing folder holds no labels.
fn list_label_files(dir: &Path) -> Result<Vec<String>, LabelkitError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| LabelkitError::ListDir {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;
        let is_label = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(LABEL_EXTENSION));
        if entry.file_type().is_file() && is_label {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

fn validate_image(path: &Path, name: &str, report: &mut ValidationReport) {
    let context = || IssueContext::Image {
        name: name.to_string(),
    };
    match imagesize::size(path) {
        Ok(size) if size.width == 0 || size.height == 0 => {
            report.add(ValidationIssue::error(
                IssueCode::InvalidImageDimensions,
                format!("invalid dimensions {}x{}", size.width, size.height),
                context(),
            ));
        }
        Ok(_) => {}
        Err(source) => {
            let err = LabelkitError::ImageDimensionRead {
                path: path.to_path_buf(),
                source,
            };
            report.add(ValidationIssue::error(
                IssueCode::UnreadableImage,
                err.to_string(),
                context(),
            ));
        }
    }
}

/// Checks every line of one label file.
pub fn validate_label_content(
    content: &str,
    name: &str,
    classes: Option<&ClassRegistry>,
    report: &mut ValidationReport,
) {
    for (idx, line) in content.lines().enumerate() {
        let line_num = idx + 1;
        let context = || IssueContext::Label {
            name: name.to_string(),
            line: Some(line_num),
        };

        let record = match parse_label_line(line, Path::new(name), line_num) {
            Ok(Some(record)) => record,
            Ok(None) => continue,
            Err(LabelkitError::LabelParse { message, .. }) => {
                report.add(ValidationIssue::error(
                    IssueCode::MalformedLabelLine,
                    message,
                    context(),
                ));
                continue;
            }
            Err(other) => {
                report.add(ValidationIssue::error(
                    IssueCode::MalformedLabelLine,
                    other.to_string(),
                    context(),
                ));
                continue;
            }
        };

        if let Some(classes) = classes {
            if !classes.contains(record.class_id()) {
                report.add(ValidationIssue::error(
                    IssueCode::UnknownClassId,
                    format!("class {} is not in the class registry", record.class_id()),
                    context(),
                ));
            }
        }

        let out_of_range = record
            .values()
            .into_iter()
            .find(|v| !v.is_finite() || *v < -RANGE_TOLERANCE || *v > 1.0 + RANGE_TOLERANCE);
        if let Some(value) = out_of_range {
            report.add(ValidationIssue::error(
                IssueCode::CoordinateOutOfRange,
                format!("normalized value {} outside [0, 1]", value),
                context(),
            ));
        }

        if let LabelRecord::Box { w, h, .. } = record {
            if w <= 0.0 || h <= 0.0 {
                report.add(ValidationIssue::warning(
                    IssueCode::DegenerateBox,
                    format!("box has zero area ({}x{})", w, h),
                    context(),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassEntry;
    use crate::ir::ClassId;

    fn registry() -> ClassRegistry {
        ClassRegistry::new(vec![ClassEntry {
            id: ClassId(0),
            name: "cow".into(),
            color: "#00FF00".into(),
        }])
    }

    fn check(content: &str) -> ValidationReport {
        let mut report = ValidationReport::new();
        validate_label_content(content, "a.txt", Some(&registry()), &mut report);
        report
    }

    #[test]
    fn valid_lines_are_clean() {
        let report = check("0 0.5 0.5 0.2 0.2\n0 0.1 0.1 0.9 0.1 0.5 0.9\n\n");
        assert!(report.is_ok_strict(), "{:?}", report.issues);
    }

    #[test]
    fn malformed_line_is_reported_with_line_number() {
        let report = check("0 0.5 0.5 0.2 0.2\n0 0.5 0.5\n");
        assert!(report.has_code(IssueCode::MalformedLabelLine));
        assert!(matches!(
            report.issues[0].context,
            IssueContext::Label { line: Some(2), .. }
        ));
    }

    #[test]
    fn unknown_class_and_range() {
        let report = check("3 0.5 0.5 0.2 0.2\n0 1.5 0.5 0.2 0.2\n");
        assert!(report.has_code(IssueCode::UnknownClassId));
        assert!(report.has_code(IssueCode::CoordinateOutOfRange));
        assert_eq!(report.error_count(), 2);
    }

    #[test]
    fn zero_area_box_warns() {
        let report = check("0 0.5 0.5 0.0 0.2\n");
        assert_eq!(report.warning_count(), 1);
        assert!(report.has_code(IssueCode::DegenerateBox));
    }

    #[test]
    fn folders_pair_by_stem() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let images = temp.path().join("images");
        let labels = temp.path().join("labels");
        fs::create_dir_all(&images).unwrap();
        fs::create_dir_all(&labels).unwrap();
        image::RgbImage::new(8, 8).save(images.join("a.png")).unwrap();
        image::RgbImage::new(8, 8).save(images.join("b.png")).unwrap();
        fs::write(labels.join("a.txt"), "").unwrap();
        fs::write(labels.join("c.txt"), "0 0.5 0.5 0.2 0.2\n").unwrap();

        let report =
            validate_output(&images, &labels, &registry(), &ValidateOptions::default()).unwrap();
        assert_eq!(report.images_checked, 2);
        assert_eq!(report.labels_checked, 2);
        assert!(report.is_ok());
        assert!(report.has_code(IssueCode::ImageWithoutLabel));
        assert!(report.has_code(IssueCode::LabelWithoutImage));
    }

    #[test]
    fn unreadable_image_is_an_error() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let images = temp.path().join("images");
        fs::create_dir_all(&images).unwrap();
        fs::write(images.join("x.jpg"), b"junk").unwrap();

        let report = validate_output(
            &images,
            &temp.path().join("labels"),
            &ClassRegistry::default(),
            &ValidateOptions::default(),
        )
        .unwrap();
        assert!(report.has_code(IssueCode::UnreadableImage));
    }

    #[test]
    fn non_utf8_label_is_reported_and_validation_continues() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let images = temp.path().join("images");
        let labels = temp.path().join("labels");
        fs::create_dir_all(&images).unwrap();
        fs::create_dir_all(&labels).unwrap();
        image::RgbImage::new(8, 8).save(images.join("a.png")).unwrap();
        image::RgbImage::new(8, 8).save(images.join("b.png")).unwrap();
        fs::write(labels.join("a.txt"), [0xff, 0xfe, 0x00, 0x80]).unwrap();
        fs::write(labels.join("b.txt"), "7 0.5 0.5 0.2 0.2\n").unwrap();

        let report =
            validate_output(&images, &labels, &registry(), &ValidateOptions::default()).unwrap();
        assert_eq!(report.labels_checked, 2);
        let unreadable: Vec<_> = report
            .issues
            .iter()
            .filter(|i| i.code == IssueCode::UnreadableLabel)
            .collect();
        assert_eq!(unreadable.len(), 1);
        assert!(matches!(
            &unreadable[0].context,
            IssueContext::Label { name, line: None } if name == "a.txt"
        ));
        assert!(report.has_code(IssueCode::UnknownClassId));
    }

    #[test]
    fn ignore_classes_skips_registry_check() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let images = temp.path().join("images");
        let labels = temp.path().join("labels");
        fs::create_dir_all(&images).unwrap();
        fs::create_dir_all(&labels).unwrap();
        image::RgbImage::new(8, 8).save(images.join("a.png")).unwrap();
        fs::write(labels.join("a.txt"), "7 0.5 0.5 0.2 0.2\n").unwrap();

        let opts = ValidateOptions {
            ignore_classes: true,
            ..Default::default()
        };
        let report = validate_output(&images, &labels, &registry(), &opts).unwrap();
        assert!(report.is_ok_strict(), "{:?}", report.issues);
    }
}
