//! Structural validation of annotations.
//!
//! Checks annotation sets for:
//! - Geometric validity (finite coordinates, non-negative extents, usable polygons)
//! - Coordinate space consistency (normalized range, image bounds)
//! - Metadata quality (labels present, numeric scores)
//!
//! and segmentation annotations for label and layer consistency.

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::collections::HashSet;

use serde::Deserialize;

use crate::ir::{
    AnnotationSet, CoordSpace, ImageSegmentationAnnotations, LocatedObject, Polygon, SCORE_KEY,
};

/// Slack for absolute pixel comparisons.
const PIXEL_TOLERANCE: f64 = 0.5;

/// Slack for normalized comparisons.
const NORMALIZED_TOLERANCE: f64 = 1e-6;

/// Options for validation behavior.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ValidateOptions {
    /// If true, treat warnings as errors.
    pub strict: bool,
    /// Image size as `(width, height)`, enabling bounds checks.
    pub image_size: Option<(u32, u32)>,
}

/// Validates an annotation set and returns a report of all issues found.
pub fn validate_set(set: &AnnotationSet, opts: &ValidateOptions) -> ValidationReport {
    let mut report = ValidationReport::new();
    for (index, object) in set.iter().enumerate() {
        validate_object(set.space, index, object, opts, &mut report);
    }
    report
}

fn validate_object(
    space: CoordSpace,
    index: usize,
    object: &LocatedObject,
    opts: &ValidateOptions,
    report: &mut ValidationReport,
) {
    let context = || IssueContext::Object { index };

    if object.label().is_none() {
        report.add(ValidationIssue::warning(
            IssueCode::MissingLabel,
            "No 'type' label",
            context(),
        ));
    }

    if let Some(score) = object.metadata.get(SCORE_KEY) {
        if score.as_f64().is_none() {
            report.add(ValidationIssue::warning(
                IssueCode::ScoreNotNumeric,
                format!("Score '{}' is not a number", score),
                context(),
            ));
        }
    }

    if !object.is_finite() {
        report.add(ValidationIssue::error(
            IssueCode::CoordinateNotFinite,
            format!(
                "Non-finite coordinates ({}, {}, {}, {})",
                object.x, object.y, object.width, object.height
            ),
            context(),
        ));
        return; // Skip further geometry checks
    }

    if object.width < 0.0 || object.height < 0.0 {
        report.add(ValidationIssue::error(
            IssueCode::NegativeExtent,
            format!("Negative extent {}x{}", object.width, object.height),
            context(),
        ));
    } else if object.width == 0.0 || object.height == 0.0 {
        report.add(ValidationIssue::warning(
            IssueCode::ZeroArea,
            format!("Zero extent {}x{}", object.width, object.height),
            context(),
        ));
    }

    let tolerance = match space {
        CoordSpace::Absolute => PIXEL_TOLERANCE,
        CoordSpace::Normalized => NORMALIZED_TOLERANCE,
    };

    if let Some(polygon) = &object.polygon {
        if distinct_vertices(polygon) < 3 {
            report.add(ValidationIssue::error(
                IssueCode::PolygonTooFewPoints,
                format!(
                    "Polygon has {} point(s) but fewer than 3 distinct vertices",
                    polygon.len()
                ),
                context(),
            ));
        }
        let bounds = polygon.bounds();
        // Boxes are inclusive in pixel space, so allow one extra pixel there.
        let slack = match space {
            CoordSpace::Absolute => 1.0 + tolerance,
            CoordSpace::Normalized => tolerance,
        };
        if bounds.xmin() < object.x - tolerance
            || bounds.ymin() < object.y - tolerance
            || bounds.xmax() > object.x + object.width + slack
            || bounds.ymax() > object.y + object.height + slack
        {
            report.add(ValidationIssue::error(
                IssueCode::PolygonBBoxMismatch,
                format!(
                    "Polygon bounds ({:.2}, {:.2}, {:.2}, {:.2}) exceed box ({:.2}, {:.2}, {:.2}, {:.2})",
                    bounds.xmin(), bounds.ymin(), bounds.xmax(), bounds.ymax(),
                    object.x, object.y, object.width, object.height
                ),
                context(),
            ));
        }
    }

    match space {
        CoordSpace::Normalized => {
            let in_range = |v: f64| (-tolerance..=1.0 + tolerance).contains(&v);
            let polygon_ok = object
                .polygon
                .as_ref()
                .map_or(true, |p| p.points().iter().all(|pt| in_range(pt.x) && in_range(pt.y)));
            if !(in_range(object.x)
                && in_range(object.y)
                && in_range(object.x + object.width)
                && in_range(object.y + object.height)
                && polygon_ok)
            {
                report.add(ValidationIssue::error(
                    IssueCode::NormalizedOutOfRange,
                    format!(
                        "Normalized box ({}, {}, {}, {}) leaves [0, 1]",
                        object.x, object.y, object.width, object.height
                    ),
                    context(),
                ));
            }
        }
        CoordSpace::Absolute => {
            if let Some((width, height)) = opts.image_size {
                let (w, h) = (width as f64, height as f64);
                if object.x < -tolerance
                    || object.y < -tolerance
                    || object.x + object.width > w + tolerance
                    || object.y + object.height > h + tolerance
                {
                    report.add(ValidationIssue::error(
                        IssueCode::ObjectOutOfBounds,
                        format!(
                            "Box ({:.1}, {:.1}, {:.1}, {:.1}) extends outside image bounds (0, 0, {}, {})",
                            object.x, object.y, object.width, object.height, width, height
                        ),
                        context(),
                    ));
                }
            }
        }
    }
}

fn distinct_vertices(polygon: &Polygon) -> usize {
    let points = polygon.points();
    let mut count = 0;
    for (i, p) in points.iter().enumerate() {
        if !points[..i].contains(p) {
            count += 1;
        }
    }
    count
}

/// Validates segmentation annotations.
pub fn validate_segmentation(
    segmentation: &ImageSegmentationAnnotations,
    opts: &ValidateOptions,
) -> ValidationReport {
    let mut report = ValidationReport::new();

    let mut seen: HashSet<&str> = HashSet::new();
    for label in segmentation.labels() {
        if !seen.insert(label.as_str()) {
            report.add(ValidationIssue::warning(
                IssueCode::DuplicateLabel,
                format!("Label '{}' is declared more than once", label),
                IssueContext::Set,
            ));
        }
    }

    for (label, layer) in segmentation.layers() {
        let context = || IssueContext::Layer {
            label: label.clone(),
        };
        if let Some(expected) = opts.image_size {
            if layer.dimensions() != expected {
                report.add(ValidationIssue::error(
                    IssueCode::LayerSizeMismatch,
                    format!(
                        "Layer is {}x{}, image is {}x{}",
                        layer.width(),
                        layer.height(),
                        expected.0,
                        expected.1
                    ),
                    context(),
                ));
            }
        }
        if layer.pixels().all(|p| p.0[0] == 0) {
            report.add(ValidationIssue::warning(
                IssueCode::EmptyLayer,
                "No foreground pixels",
                context(),
            ));
        }
    }

    report
}
