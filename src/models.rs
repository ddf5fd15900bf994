//! Data models for the QC measurement pipeline.
//!
//! Row types map 1:1 onto the tables in `migrations/`; input types are the
//! JSON bodies accepted from the operator panel and the admin UI.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

// ---

/// Implements text round-tripping (`as_str`, `FromStr`, `Display`) and the
/// sqlx Postgres `TEXT` encoding for a fieldless enum.
macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl std::str::FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!("invalid {} value: {:?}", stringify!($ty), other)),
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl sqlx::Type<sqlx::Postgres> for $ty {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $ty {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let text = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
                Ok(text.parse::<$ty>()?)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Postgres> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
            }
        }
    };
}

/// Garment side. Measurements and annotations are tracked per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Front,
    Back,
}

text_enum!(Side { Front => "front", Back => "back" });

/// Garment colour class used to disambiguate annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GarmentColor {
    Black,
    White,
    Other,
}

text_enum!(GarmentColor { Black => "black", White => "white", Other => "other" });

/// Outcome of a single point-of-measure check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResultStatus {
    Pass,
    Fail,
    Pending,
}

text_enum!(ResultStatus { Pass => "PASS", Fail => "FAIL", Pending => "PENDING" });

/// Lifecycle of a per-size measurement session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    InProgress,
    Completed,
}

text_enum!(SessionStatus {
    Pending => "pending",
    InProgress => "in_progress",
    Completed => "completed",
});

impl ResultStatus {
    /// Judge a measured value against its expected value and tolerances.
    ///
    /// A deviation above the expected value is checked against `tol_plus`,
    /// below it against `tol_minus`. Values are compared in hundredths so
    /// that float noise cannot flip a boundary result. A missing tolerance
    /// allows no deviation. Without both a measured and an expected value
    /// the result is `Pending`.
    pub fn evaluate(
        measured: Option<f64>,
        expected: Option<f64>,
        tol_plus: Option<f64>,
        tol_minus: Option<f64>,
    ) -> Self {
        // ---
        let (Some(measured), Some(expected)) = (measured, expected) else {
            return ResultStatus::Pending;
        };

        let deviation = to_hundredths(measured - expected);
        let tolerance = if deviation >= 0 { tol_plus } else { tol_minus };
        let allowed = tolerance.map(|t| to_hundredths(t.abs())).unwrap_or(0);

        if deviation.abs() <= allowed {
            ResultStatus::Pass
        } else {
            ResultStatus::Fail
        }
    }
}

fn to_hundredths(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

// --- geometry -------------------------------------------------------------

/// A keypoint marked on a reference image, as a percentage (0-100) of the
/// image width and height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// An absolute pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

/// Real-world distances in centimetres keyed by 1-based pair index.
pub type TargetDistances = BTreeMap<u32, f64>;

// --- calibration ----------------------------------------------------------

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Calibration {
    // ---
    pub id: i64,
    pub name: String,
    pub pixels_per_cm: f64,
    pub reference_length_cm: f64,
    pub pixel_distance: f64,
    pub calibration_points: Json<Vec<PixelPoint>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Calibration wizard submission. Points are percentages of the capture frame.
#[derive(Debug, Deserialize)]
pub struct NewCalibration {
    // ---
    pub name: Option<String>,
    pub calibration_points: Vec<[f64; 2]>,
    pub reference_length_cm: f64,
}

// --- annotations ----------------------------------------------------------

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Annotation {
    // ---
    pub id: i64,
    pub article_id: i64,
    pub article_style: String,
    pub size: String,
    pub side: Side,
    pub color: Option<GarmentColor>,
    pub name: Option<String>,
    pub keypoints: Json<Vec<Keypoint>>,
    pub target_distances: Json<TargetDistances>,
    pub image_width: i32,
    pub image_height: i32,
    pub placement_box: Option<Json<Vec<f64>>>,
    pub calibration_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin UI submission for creating or replacing an annotation.
#[derive(Debug, Deserialize)]
pub struct SaveAnnotation {
    // ---
    pub article_id: i64,
    pub size: String,
    #[serde(default = "default_side")]
    pub side: Side,
    pub color: Option<GarmentColor>,
    pub name: Option<String>,
    pub keypoints: Vec<Keypoint>,
    pub image_width: i32,
    pub image_height: i32,
    pub placement_box: Option<Vec<f64>>,
}

fn default_side() -> Side {
    Side::Front
}

/// Annotation in the shape the operator panel's measurement system consumes:
/// pixel keypoints at native camera resolution and integer-keyed distances.
#[derive(Debug, Serialize)]
pub struct MeasurementSystemAnnotation {
    // ---
    pub article_style: String,
    pub size: String,
    pub side: Side,
    pub color: Option<GarmentColor>,
    pub keypoints: Vec<[i64; 2]>,
    pub target_distances: TargetDistances,
    pub placement_box: Vec<f64>,
    pub image_width: u32,
    pub image_height: u32,
    pub annotation_date: DateTime<Utc>,
}

// --- measurement specs ----------------------------------------------------

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Measurement {
    // ---
    pub id: i64,
    pub article_id: i64,
    pub code: String,
    pub measurement: String,
    pub tol_plus: Option<f64>,
    pub tol_minus: Option<f64>,
    pub side: Option<Side>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MeasurementSize {
    // ---
    pub id: i64,
    pub measurement_id: i64,
    pub size: String,
    pub value: f64,
    pub unit: String,
}

/// Expected value and tolerances for one measurement code at one size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSpec {
    // ---
    pub measurement_id: i64,
    pub code: String,
    pub measurement: String,
    pub expected_value: Option<f64>,
    pub tol_plus: Option<f64>,
    pub tol_minus: Option<f64>,
    pub side: Option<Side>,
}

#[derive(Debug, Deserialize)]
pub struct NewMeasurement {
    // ---
    pub article_id: i64,
    pub code: String,
    pub measurement: String,
    pub tol_plus: Option<f64>,
    pub tol_minus: Option<f64>,
    pub side: Option<Side>,
    #[serde(default)]
    pub sizes: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
pub struct SizeValue {
    pub value: f64,
    pub unit: Option<String>,
}

// --- results --------------------------------------------------------------

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MeasurementResult {
    // ---
    pub id: i64,
    pub purchase_order_article_id: i64,
    pub measurement_id: i64,
    pub size: String,
    pub side: Option<Side>,
    pub article_style: Option<String>,
    pub measured_value: Option<f64>,
    pub expected_value: Option<f64>,
    pub tol_plus: Option<f64>,
    pub tol_minus: Option<f64>,
    pub status: ResultStatus,
    pub operator_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row of an aggregate result batch.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultInput {
    // ---
    pub purchase_order_article_id: i64,
    pub measurement_id: i64,
    pub size: String,
    pub article_style: Option<String>,
    pub measured_value: Option<f64>,
    pub expected_value: Option<f64>,
    pub tol_plus: Option<f64>,
    pub tol_minus: Option<f64>,
    pub status: Option<ResultStatus>,
    pub operator_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ResultBatch {
    #[serde(default)]
    pub results: Vec<ResultInput>,
}

/// One row of a per-side submission; the key triple lives on the envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct DetailedResultInput {
    // ---
    pub measurement_id: i64,
    pub article_style: Option<String>,
    pub measured_value: Option<f64>,
    pub expected_value: Option<f64>,
    pub tol_plus: Option<f64>,
    pub tol_minus: Option<f64>,
    pub status: Option<ResultStatus>,
    pub operator_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct DetailedResultBatch {
    // ---
    pub purchase_order_article_id: i64,
    pub size: String,
    pub side: Side,
    #[serde(default)]
    pub results: Vec<DetailedResultInput>,
}

// --- sessions -------------------------------------------------------------

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MeasurementSession {
    // ---
    pub id: i64,
    pub purchase_order_article_id: i64,
    pub size: String,
    pub article_style: Option<String>,
    pub article_id: Option<i64>,
    pub purchase_order_id: Option<i64>,
    pub operator_id: Option<i64>,
    pub status: SessionStatus,
    pub front_side_complete: bool,
    pub back_side_complete: bool,
    pub front_qc_result: Option<ResultStatus>,
    pub back_qc_result: Option<ResultStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SessionInput {
    // ---
    pub purchase_order_article_id: i64,
    pub size: String,
    pub article_style: Option<String>,
    pub article_id: Option<i64>,
    pub purchase_order_id: Option<i64>,
    pub operator_id: Option<i64>,
    pub status: Option<SessionStatus>,
    #[serde(default)]
    pub front_side_complete: bool,
    #[serde(default)]
    pub back_side_complete: bool,
    pub front_qc_result: Option<ResultStatus>,
    pub back_qc_result: Option<ResultStatus>,
}

// --- operators and keys ---------------------------------------------------

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Operator {
    // ---
    pub id: i64,
    pub full_name: String,
    pub employee_id: String,
    pub department: Option<String>,
    pub login_pin: String,
}

/// Operator as exposed to clients; never carries the PIN.
#[derive(Debug, Clone, Serialize)]
pub struct OperatorSummary {
    pub id: i64,
    pub full_name: String,
    pub employee_id: String,
    pub department: Option<String>,
}

impl From<Operator> for OperatorSummary {
    fn from(op: Operator) -> Self {
        OperatorSummary {
            id: op.id,
            full_name: op.full_name,
            employee_id: op.employee_id,
            department: op.department,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PinCheck {
    pub employee_id: String,
    pub pin: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ApiKey {
    // ---
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing)]
    pub key: String,
    pub is_active: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NewApiKey {
    pub name: String,
}
