//! Classifier trait for outperformance models.
//!
//! The backtest never trains anything itself; it only needs a model that can
//! turn a feature matrix into probabilities. Anything implementing
//! [`Classifier`] can be plugged into the scoring step.

use crate::Result;
use ndarray::{Array1, ArrayView2};

/// A probabilistic binary classifier.
///
/// Implementations should be thread-safe (`Send + Sync`) so a fitted model
/// can be shared across scoring runs.
///
/// # Example
///
/// ```no_run
/// use ndarray::{Array1, ArrayView2};
/// use tainan_traits::{Classifier, Result};
///
/// struct CoinFlip;
///
/// impl Classifier for CoinFlip {
///     fn name(&self) -> &str {
///         "coin_flip"
///     }
///
///     fn predict_proba(&self, features: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
///         Ok(Array1::from_elem(features.nrows(), 0.5))
///     }
/// }
/// ```
pub trait Classifier: Send + Sync {
    /// Returns the name of this classifier, used in logs and reports.
    fn name(&self) -> &str;

    /// Probability of the positive class (outperformance) for every row.
    ///
    /// # Arguments
    ///
    /// * `features` - Matrix with one row per observation and one column per
    ///   feature, in the same column order the model was fitted with.
    ///
    /// # Errors
    ///
    /// Returns an error if the column count does not match the fitted model
    /// or the matrix contains non-finite values.
    fn predict_proba(&self, features: ArrayView2<'_, f64>) -> Result<Array1<f64>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    struct Constant(f64);

    impl Classifier for Constant {
        fn name(&self) -> &str {
            "constant"
        }

        fn predict_proba(&self, features: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
            Ok(Array1::from_elem(features.nrows(), self.0))
        }
    }

    #[test]
    fn test_trait_object() {
        let model: Box<dyn Classifier> = Box::new(Constant(0.25));
        let x = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let p = model.predict_proba(x.view()).unwrap();
        assert_eq!(model.name(), "constant");
        assert_eq!(p.len(), 3);
        assert!(p.iter().all(|&v| v == 0.25));
    }
}
