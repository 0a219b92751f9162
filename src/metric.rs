use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Levenshtein distance between two sequences.
///
/// Fills a `(x.len() + 1) x (y.len() + 1)` table where `dp[i][j]` is the distance
/// between the first `i` items of `x` and the first `j` items of `y`.
///
/// # Parameters
///
/// - `x` - First sequence
/// - `y` - Second sequence
///
/// # Returns
///
/// - `usize` - Minimum number of insertions, deletions and substitutions turning `x` into `y`
///
/// # Examples
/// ```rust
/// use hanzi_bigru::metric::sequence_edit_distance;
///
/// assert_eq!(sequence_edit_distance(&[1, 2, 3], &[1, 3]), 1);
/// ```
pub fn sequence_edit_distance<T: PartialEq>(x: &[T], y: &[T]) -> usize {
    let (m, n) = (x.len(), y.len());
    let mut dp = Array2::<usize>::zeros((m + 1, n + 1));
    for i in 0..=m {
        dp[[i, 0]] = i;
    }
    for j in 0..=n {
        dp[[0, j]] = j;
    }
    for i in 1..=m {
        for j in 1..=n {
            dp[[i, j]] = if x[i - 1] == y[j - 1] {
                dp[[i - 1, j - 1]]
            } else {
                1 + dp[[i - 1, j]].min(dp[[i, j - 1]]).min(dp[[i - 1, j - 1]])
            };
        }
    }
    dp[[m, n]]
}

/// Character-level Levenshtein distance between two strings.
///
/// Characters are Unicode scalar values, so every hanzi counts as one symbol.
///
/// # Examples
/// ```rust
/// use hanzi_bigru::metric::edit_distance;
///
/// assert_eq!(edit_distance("", ""), 0);
/// assert_eq!(edit_distance("kitten", "sitting"), 3);
/// assert_eq!(edit_distance("我们", "我门"), 1);
/// ```
pub fn edit_distance(x: &str, y: &str) -> usize {
    let x: Vec<char> = x.chars().collect();
    let y: Vec<char> = y.chars().collect();
    sequence_edit_distance(&x, &y)
}

/// Aggregate character error statistics over an evaluated set.
///
/// # Fields
///
/// - `char_count` - Total number of ground-truth characters
/// - `edit_count` - Total edit distance between ground truth and predictions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub char_count: usize,
    pub edit_count: usize,
}

impl EvaluationReport {
    /// Adds one `(ground truth, prediction)` comparison
    pub fn record(&mut self, truth: &str, prediction: &str) {
        self.char_count += truth.chars().count();
        self.edit_count += edit_distance(truth, prediction);
    }

    /// Combines the counts of two partial reports
    pub fn merge(self, other: EvaluationReport) -> EvaluationReport {
        EvaluationReport {
            char_count: self.char_count + other.char_count,
            edit_count: self.edit_count + other.edit_count,
        }
    }

    /// `100 * edit_count / char_count`, or 0 when nothing was counted
    pub fn error_rate(&self) -> f64 {
        if self.char_count == 0 {
            0.0
        } else {
            100.0 * self.edit_count as f64 / self.char_count as f64
        }
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} hanzi, {} edits, error rate is {:.2}%",
            self.char_count,
            self.edit_count,
            self.error_rate()
        )
    }
}
