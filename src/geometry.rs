//! Keypoint geometry: percentage-to-pixel conversion, calibration fitting and
//! the target-distance calculator.
//!
//! Everything here is pure. Persistence and the "is there an active
//! calibration" question belong to the callers.

use crate::error::FieldErrors;
use crate::models::{Keypoint, PixelPoint, TargetDistances};

// ---

/// Shortest and longest reference lengths the calibration wizard accepts.
pub const MIN_REFERENCE_LENGTH_CM: f64 = 0.1;
pub const MAX_REFERENCE_LENGTH_CM: f64 = 1000.0;

/// Pixel dimensions of a camera frame or reference image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

/// Round to two decimal places (centimetre hundredths).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Convert a percentage coordinate (0-100) into absolute pixels.
pub fn percent_to_pixels(x_pct: f64, y_pct: f64, frame: FrameSize) -> PixelPoint {
    PixelPoint {
        x: x_pct / 100.0 * f64::from(frame.width),
        y: y_pct / 100.0 * f64::from(frame.height),
    }
}

/// Euclidean distance between two pixel points.
pub fn pixel_distance(a: PixelPoint, b: PixelPoint) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

/// Real-world length of a pixel span at the given scale, rounded to 2 decimals.
pub fn reference_length_cm(a: PixelPoint, b: PixelPoint, pixels_per_cm: f64) -> f64 {
    round2(pixel_distance(a, b) / pixels_per_cm)
}

/// Output of the target-distance calculator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairDistances {
    /// Centimetres per 1-based pair index.
    pub distances: TargetDistances,

    /// True when the keypoint count was odd and the last point was dropped.
    pub unpaired_trailing_point: bool,
}

/// Compute per-pair target distances from percentage keypoints.
///
/// Keypoints are consumed in consecutive pairs (1-2, 3-4, ...). Each point is
/// converted to pixels in `image`, the pair's Euclidean pixel distance is
/// divided by `pixels_per_cm` and rounded to 2 decimals. Fewer than two
/// points yields an empty map. A missing or non-positive scale yields an
/// empty map as well; callers that require a calibration must check for it
/// before calling.
pub fn target_distances(
    keypoints: &[Keypoint],
    image: FrameSize,
    pixels_per_cm: Option<f64>,
) -> PairDistances {
    // ---
    let unpaired_trailing_point = keypoints.len() % 2 == 1;

    let Some(scale) = pixels_per_cm.filter(|s| s.is_finite() && *s > 0.0) else {
        return PairDistances {
            distances: TargetDistances::new(),
            unpaired_trailing_point,
        };
    };

    let distances = keypoints
        .chunks_exact(2)
        .zip(1u32..)
        .map(|(pair, index)| {
            let a = percent_to_pixels(pair[0].x, pair[0].y, image);
            let b = percent_to_pixels(pair[1].x, pair[1].y, image);
            (index, round2(pixel_distance(a, b) / scale))
        })
        .collect();

    PairDistances {
        distances,
        unpaired_trailing_point,
    }
}

/// True for a finite value in `[0, 100]`.
pub fn is_percentage(value: f64) -> bool {
    value.is_finite() && (0.0..=100.0).contains(&value)
}

/// A calibration derived from two wizard points and a known length.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationFit {
    pub points: [PixelPoint; 2],
    pub pixel_distance: f64,
    pub pixels_per_cm: f64,
}

/// Derive `pixels_per_cm` from two percentage points on the capture frame
/// and the real length between them.
///
/// Exactly two points are required, the reference length must lie in
/// `[0.1, 1000]` cm and the points must not coincide.
pub fn fit_calibration(
    points_pct: &[[f64; 2]],
    capture: FrameSize,
    reference_length_cm: f64,
) -> Result<CalibrationFit, FieldErrors> {
    // ---
    let mut errors = FieldErrors::new();

    if points_pct.len() != 2 {
        errors.add(
            "calibration_points",
            "Exactly two calibration points are required.",
        );
    }
    for (i, point) in points_pct.iter().enumerate() {
        if !point.iter().all(|c| is_percentage(*c)) {
            errors.add(
                format!("calibration_points.{i}"),
                "Coordinates must be percentages between 0 and 100.",
            );
        }
    }
    if !(MIN_REFERENCE_LENGTH_CM..=MAX_REFERENCE_LENGTH_CM).contains(&reference_length_cm) {
        errors.add(
            "reference_length_cm",
            format!(
                "The reference length must be between {MIN_REFERENCE_LENGTH_CM} and {MAX_REFERENCE_LENGTH_CM} cm."
            ),
        );
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let a = percent_to_pixels(points_pct[0][0], points_pct[0][1], capture);
    let b = percent_to_pixels(points_pct[1][0], points_pct[1][1], capture);
    let distance = pixel_distance(a, b);

    if distance <= 0.0 {
        errors.add("calibration_points", "Calibration points must not coincide.");
        return Err(errors);
    }

    Ok(CalibrationFit {
        points: [a, b],
        pixel_distance: distance,
        pixels_per_cm: distance / reference_length_cm,
    })
}

/// Percentage keypoints as whole pixels on the native camera frame.
pub fn keypoints_to_native(keypoints: &[Keypoint], native: FrameSize) -> Vec<[i64; 2]> {
    // ---
    keypoints
        .iter()
        .map(|kp| {
            let p = percent_to_pixels(kp.x, kp.y, native);
            [p.x.round() as i64, p.y.round() as i64]
        })
        .collect()
}
