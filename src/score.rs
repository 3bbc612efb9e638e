// 📊 Quality Score - dataset report → 0-100 score and letter grade
//
// penalty = Σ (category count / total records) × category weight × 100
// score   = clamp(100 - penalty, 0, 100), rounded to one decimal
//
// Pure function of the DatasetReport: same report, same score.

use crate::error::{InputError, InputResult};
use crate::exception::Category;
use crate::pipeline::DatasetReport;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// SCORING POLICY (tunable)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryWeights {
    pub schema: f64,
    pub completeness: f64,
    pub uniqueness: f64,
    pub validity: f64,
    pub mapping: f64,
    pub outlier: f64,
}

impl CategoryWeights {
    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Schema => self.schema,
            Category::Completeness => self.completeness,
            Category::Uniqueness => self.uniqueness,
            Category::Validity => self.validity,
            Category::Mapping => self.mapping,
            Category::Outlier => self.outlier,
        }
    }
}

impl Default for CategoryWeights {
    /// Error-bearing categories count double
    fn default() -> Self {
        CategoryWeights {
            schema: 1.0,
            completeness: 0.5,
            uniqueness: 0.5,
            validity: 1.0,
            mapping: 1.0,
            outlier: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeBand {
    pub grade: String,
    pub min_score: f64,
}

impl GradeBand {
    pub fn new(grade: &str, min_score: f64) -> Self {
        GradeBand {
            grade: grade.to_string(),
            min_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub weights: CategoryWeights,

    /// Highest band first; a score gets the first band whose minimum it reaches
    pub grade_bands: Vec<GradeBand>,

    /// Grade for scores below every band
    pub fallback_grade: String,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        ScoringPolicy {
            weights: CategoryWeights::default(),
            grade_bands: vec![
                GradeBand::new("A", 90.0),
                GradeBand::new("B", 75.0),
                GradeBand::new("C", 60.0),
                GradeBand::new("D", 40.0),
            ],
            fallback_grade: "F".to_string(),
        }
    }
}

impl ScoringPolicy {
    pub fn validate(&self) -> InputResult<()> {
        for category in Category::ALL {
            let weight = self.weights.get(category);
            if !weight.is_finite() || weight < 0.0 {
                return Err(InputError::Config(format!(
                    "weight for {} must be a non-negative number, got {}",
                    category, weight
                )));
            }
        }

        let mut previous = f64::INFINITY;
        for band in &self.grade_bands {
            if band.grade.is_empty() || !(0.0..=100.0).contains(&band.min_score) {
                return Err(InputError::Config(format!(
                    "grade band '{}' needs a name and a min_score within 0-100",
                    band.grade
                )));
            }
            if band.min_score >= previous {
                return Err(InputError::Config(
                    "grade_bands must be listed from highest to lowest min_score".to_string(),
                ));
            }
            previous = band.min_score;
        }

        if self.fallback_grade.is_empty() {
            return Err(InputError::Config("fallback_grade must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn grade_for(&self, score: f64) -> &str {
        self.grade_bands
            .iter()
            .find(|band| score >= band.min_score)
            .map(|band| band.grade.as_str())
            .unwrap_or(self.fallback_grade.as_str())
    }
}

// ============================================================================
// QUALITY SCORE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    pub score: f64,
    pub grade: String,
    pub penalty: f64,
    pub total_records: usize,
    pub total_exceptions: usize,
    pub category_counts: BTreeMap<Category, usize>,
}

impl QualityScore {
    pub fn summary(&self) -> String {
        format!(
            "Quality score {:.1} (grade {}) | {} exceptions across {} records",
            self.score, self.grade, self.total_exceptions, self.total_records
        )
    }
}

// ============================================================================
// SCORE CALCULATOR
// ============================================================================

pub struct ScoreCalculator {
    policy: ScoringPolicy,
}

impl ScoreCalculator {
    pub fn new(policy: ScoringPolicy) -> Self {
        ScoreCalculator { policy }
    }

    pub fn calculate(&self, report: &DatasetReport) -> QualityScore {
        // Nothing to penalize in an empty dataset
        let penalty = if report.total_records == 0 {
            0.0
        } else {
            Category::ALL
                .iter()
                .map(|&category| {
                    let share = report.count(category) as f64 / report.total_records as f64;
                    share * self.policy.weights.get(category) * 100.0
                })
                .sum::<f64>()
        };

        let score = round1((100.0 - penalty).clamp(0.0, 100.0));

        QualityScore {
            score,
            grade: self.policy.grade_for(score).to_string(),
            penalty: round1(penalty),
            total_records: report.total_records,
            total_exceptions: report.total_exceptions,
            category_counts: report.category_counts.clone(),
        }
    }
}

impl Default for ScoreCalculator {
    fn default() -> Self {
        Self::new(ScoringPolicy::default())
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// ============================================================================
// TESTS
// ============================================================================
