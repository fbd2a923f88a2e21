use serde::{Deserialize, Serialize};

/// Lowest score a critic may assign on any dimension
pub const SCORE_MIN: i32 = -100;
/// Highest score a critic may assign on any dimension
pub const SCORE_MAX: i32 = 100;

/// One of the four quality axes every solution is scored on.
///
/// Negative scores mean deficiency (broken, incomplete, messy, wasteful),
/// positive scores mean excess (over-validated, over-scoped, over-engineered,
/// prematurely optimized) and zero is ideal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Correctness,
    Scope,
    Abstraction,
    Optimization,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Correctness,
        Dimension::Scope,
        Dimension::Abstraction,
        Dimension::Optimization,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Correctness => "correctness",
            Dimension::Scope => "scope",
            Dimension::Abstraction => "abstraction",
            Dimension::Optimization => "optimization",
        }
    }

    /// What a negative value on this dimension means
    pub fn deficiency(&self) -> &'static str {
        match self {
            Dimension::Correctness => "broken commands or syntax errors",
            Dimension::Scope => "incomplete, missing requirements",
            Dimension::Abstraction => "messy, convoluted, hard to debug",
            Dimension::Optimization => "wasteful, redundant operations",
        }
    }

    /// What a positive value on this dimension means
    pub fn excess(&self) -> &'static str {
        match self {
            Dimension::Correctness => "paranoid validation, excessive error handling",
            Dimension::Scope => "extra features, out-of-scope changes",
            Dimension::Abstraction => "over-engineered, unnecessary complexity",
            Dimension::Optimization => "premature optimization, clever but complex",
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value for each of the four dimensions
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerDimension<T> {
    pub correctness: T,
    pub scope: T,
    pub abstraction: T,
    pub optimization: T,
}

/// Scores assigned by the critic for one solution, each in [-100, 100]
pub type DimensionScores = PerDimension<i32>;

impl<T> PerDimension<T> {
    pub fn new(correctness: T, scope: T, abstraction: T, optimization: T) -> Self {
        Self {
            correctness,
            scope,
            abstraction,
            optimization,
        }
    }

    pub fn from_fn(mut f: impl FnMut(Dimension) -> T) -> Self {
        Self {
            correctness: f(Dimension::Correctness),
            scope: f(Dimension::Scope),
            abstraction: f(Dimension::Abstraction),
            optimization: f(Dimension::Optimization),
        }
    }

    pub fn get(&self, dimension: Dimension) -> &T {
        match dimension {
            Dimension::Correctness => &self.correctness,
            Dimension::Scope => &self.scope,
            Dimension::Abstraction => &self.abstraction,
            Dimension::Optimization => &self.optimization,
        }
    }

    pub fn get_mut(&mut self, dimension: Dimension) -> &mut T {
        match dimension {
            Dimension::Correctness => &mut self.correctness,
            Dimension::Scope => &mut self.scope,
            Dimension::Abstraction => &mut self.abstraction,
            Dimension::Optimization => &mut self.optimization,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> PerDimension<U> {
        PerDimension::from_fn(|d| f(self.get(d)))
    }

    /// Iterate in the fixed dimension order
    pub fn iter(&self) -> impl Iterator<Item = (Dimension, &T)> {
        Dimension::ALL.into_iter().map(move |d| (d, self.get(d)))
    }
}

impl PerDimension<i32> {
    /// Return the first dimension whose score falls outside [-100, 100]
    pub fn out_of_range(&self) -> Option<(Dimension, i32)> {
        self.iter()
            .find(|(_, v)| !(SCORE_MIN..=SCORE_MAX).contains(*v))
            .map(|(d, v)| (d, *v))
    }

    /// True when every dimension's magnitude is strictly below `limit`
    pub fn all_within(&self, limit: i32) -> bool {
        self.iter().all(|(_, v)| v.abs() < limit)
    }
}

impl std::fmt::Display for PerDimension<i32> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "C:{} S:{} A:{} O:{}",
            self.correctness, self.scope, self.abstraction, self.optimization
        )
    }
}
