// 🎓 Student Entity - identity, grades and the derived average
//
// The identity (CIN) is the natural key and never changes.
// The average is never set directly: it is always derived from the three grades.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Number of digits in a student identity
pub const IDENTITY_LEN: usize = 8;

/// Grade bounds (inclusive)
pub const GRADE_MIN: f64 = 0.0;
pub const GRADE_MAX: f64 = 20.0;

/// Subject weights: Math(3), Physics(4), Info(2)
pub const WEIGHT_MATH: f64 = 3.0;
pub const WEIGHT_PHYSICS: f64 = 4.0;
pub const WEIGHT_INFO: f64 = 2.0;

/// Minimum average for a student to be admitted
pub const ADMISSION_THRESHOLD: f64 = 10.0;

// ============================================================================
// SUBJECT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Math,
    Physics,
    Info,
}

impl Subject {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Math => "math",
            Subject::Physics => "physics",
            Subject::Info => "info",
        }
    }

    pub fn weight(&self) -> f64 {
        match self {
            Subject::Math => WEIGHT_MATH,
            Subject::Physics => WEIGHT_PHYSICS,
            Subject::Info => WEIGHT_INFO,
        }
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// GRADES
// ============================================================================

/// The three subject grades. Each one may be missing on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Grades {
    pub math: Option<f64>,
    pub physics: Option<f64>,
    pub info: Option<f64>,
}

impl Grades {
    pub fn new(math: Option<f64>, physics: Option<f64>, info: Option<f64>) -> Self {
        Grades {
            math,
            physics,
            info,
        }
    }

    /// All three grades present
    pub fn complete(math: f64, physics: f64, info: f64) -> Self {
        Grades::new(Some(math), Some(physics), Some(info))
    }

    /// Reject any present grade outside [0, 20] (NaN and infinities included).
    pub fn validate(&self) -> StoreResult<()> {
        for (subject, grade) in [
            (Subject::Math, self.math),
            (Subject::Physics, self.physics),
            (Subject::Info, self.info),
        ] {
            if let Some(value) = grade {
                if !value.is_finite() || !(GRADE_MIN..=GRADE_MAX).contains(&value) {
                    return Err(StoreError::InvalidGrade { subject, value });
                }
            }
        }
        Ok(())
    }

    pub fn average(&self) -> Option<f64> {
        compute_average(self.math, self.physics, self.info)
    }
}

/// Weighted average of the three grades, rounded to 2 decimals.
///
/// Returns `None` as soon as one grade is missing. Rounding is half away
/// from zero (`f64::round`), so `(15, 12, 18)` gives `14.33`.
pub fn compute_average(math: Option<f64>, physics: Option<f64>, info: Option<f64>) -> Option<f64> {
    let graded = [
        (Subject::Math, math?),
        (Subject::Physics, physics?),
        (Subject::Info, info?),
    ];

    let total_weight: f64 = graded.iter().map(|(subject, _)| subject.weight()).sum();
    let weighted: f64 = graded
        .iter()
        .map(|(subject, grade)| grade * subject.weight())
        .sum();

    Some(round_2(weighted / total_weight))
}

fn round_2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Check the identity format: exactly 8 ASCII digits.
///
/// Uniqueness is checked by the store, which owns the data.
pub fn validate_identity_format(identity: &str) -> StoreResult<()> {
    if identity.len() == IDENTITY_LEN && identity.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(StoreError::InvalidFormat(identity.to_string()))
    }
}

// ============================================================================
// STUDENT
// ============================================================================

/// A stored student record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub identity: String,
    pub last_name: String,
    pub first_name: String,
    pub age: u32,
    pub track: String,
    pub grade_math: Option<f64>,
    pub grade_physics: Option<f64>,
    pub grade_info: Option<f64>,
    pub average: Option<f64>,
    pub registered_at: DateTime<Utc>,
}

impl Student {
    pub fn is_admitted(&self) -> bool {
        self.average.is_some_and(|avg| avg >= ADMISSION_THRESHOLD)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Input for creating a student
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStudent {
    pub identity: String,
    pub last_name: String,
    pub first_name: String,
    pub age: u32,
    pub track: String,
    #[serde(default)]
    pub grades: Grades,
}

impl NewStudent {
    pub fn new(identity: &str, last_name: &str, first_name: &str, age: u32, track: &str) -> Self {
        NewStudent {
            identity: identity.to_string(),
            last_name: last_name.to_string(),
            first_name: first_name.to_string(),
            age,
            track: track.to_string(),
            grades: Grades::default(),
        }
    }

    pub fn with_grades(mut self, grades: Grades) -> Self {
        self.grades = grades;
        self
    }

    /// Field checks that need no database access.
    /// The store runs identity checks (format, then uniqueness) before these.
    pub fn validate_fields(&self) -> StoreResult<()> {
        if self.last_name.trim().is_empty() {
            return Err(StoreError::InvalidField {
                field: "last_name",
                reason: "must not be empty".to_string(),
            });
        }
        if self.first_name.trim().is_empty() {
            return Err(StoreError::InvalidField {
                field: "first_name",
                reason: "must not be empty".to_string(),
            });
        }
        if self.age == 0 {
            return Err(StoreError::InvalidField {
                field: "age",
                reason: "must be a positive integer".to_string(),
            });
        }
        self.grades.validate()
    }
}

/// Name fields of a removed student, for confirmation messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedStudent {
    pub last_name: String,
    pub first_name: String,
}
