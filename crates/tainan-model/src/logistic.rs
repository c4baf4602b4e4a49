//! L2-regularized logistic regression fitted by batch gradient descent.

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use tainan_traits::{Classifier, Result, TainanError};
use tracing::debug;

/// Configuration for [`LogisticRegression::fit`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticConfig {
    /// Gradient descent step size
    pub learning_rate: f64,
    /// Maximum number of full-batch iterations
    pub max_iterations: usize,
    /// L2 penalty on the weights (the intercept is not penalized)
    pub l2: f64,
    /// Stop once the largest parameter update falls below this
    pub tolerance: f64,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            max_iterations: 1000,
            l2: 1e-4,
            tolerance: 1e-8,
        }
    }
}

/// Numerically stable logistic function.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// A fitted logistic regression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    weights: Array1<f64>,
    intercept: f64,
    iterations: usize,
}

impl LogisticRegression {
    /// Fit on a feature matrix and 0/1 labels.
    ///
    /// # Arguments
    ///
    /// * `x` - One row per observation
    /// * `y` - Labels, 1.0 for outperformance and 0.0 otherwise
    /// * `config` - Optimizer settings
    ///
    /// # Errors
    ///
    /// Fails on an empty matrix, a label count that differs from the row
    /// count, labels other than 0 and 1, or non-finite features.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let model = LogisticRegression::fit(x.view(), y.view(), &LogisticConfig::default())?;
    /// let proba = model.predict_proba(x_test.view())?;
    /// ```
    pub fn fit(
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        config: &LogisticConfig,
    ) -> Result<Self> {
        let (n, k) = x.dim();
        if n == 0 {
            return Err(TainanError::InsufficientData(
                "cannot fit on an empty matrix".into(),
            ));
        }
        if y.len() != n {
            return Err(TainanError::Model(format!(
                "{} labels for {} observations",
                y.len(),
                n
            )));
        }
        if y.iter().any(|&v| v != 0.0 && v != 1.0) {
            return Err(TainanError::Model("labels must be 0 or 1".into()));
        }
        ensure_finite(x)?;

        let mut weights = Array1::<f64>::zeros(k);
        let mut intercept = 0.0;
        let mut iterations = 0;
        let n_f = n as f64;

        while iterations < config.max_iterations {
            iterations += 1;
            let residual = (x.dot(&weights) + intercept).mapv(sigmoid) - y;
            let grad_w = x.t().dot(&residual) / n_f + &weights * config.l2;
            let grad_b = residual.sum() / n_f;

            let step_w = grad_w * config.learning_rate;
            let step_b = grad_b * config.learning_rate;
            weights -= &step_w;
            intercept -= step_b;

            let largest = step_w
                .iter()
                .fold(step_b.abs(), |acc, s| acc.max(s.abs()));
            if largest < config.tolerance {
                break;
            }
        }

        let model = Self {
            weights,
            intercept,
            iterations,
        };
        debug!(
            iterations,
            features = k,
            loss = model.log_loss(x, y),
            "fitted logistic regression"
        );
        Ok(model)
    }

    /// Fitted weights, one per feature column.
    pub const fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    /// Fitted intercept.
    pub const fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Iterations run before stopping.
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    /// Mean binary cross-entropy of the model on `(x, y)`.
    pub fn log_loss(&self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> f64 {
        const EPS: f64 = 1e-15;
        let p = (x.dot(&self.weights) + self.intercept).mapv(sigmoid);
        let total: f64 = p
            .iter()
            .zip(y.iter())
            .map(|(&p, &y)| {
                let p = p.clamp(EPS, 1.0 - EPS);
                -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
            })
            .sum();
        total / y.len().max(1) as f64
    }
}

fn ensure_finite(x: ArrayView2<'_, f64>) -> Result<()> {
    if x.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(TainanError::InvalidData(
            "feature matrix contains non-finite values".into(),
        ))
    }
}

impl Classifier for LogisticRegression {
    fn name(&self) -> &str {
        "logistic_regression"
    }

    fn predict_proba(&self, features: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        if features.ncols() != self.weights.len() {
            return Err(TainanError::Model(format!(
                "model fitted on {} features, got {}",
                self.weights.len(),
                features.ncols()
            )));
        }
        ensure_finite(features)?;
        Ok((features.dot(&self.weights) + self.intercept).mapv(sigmoid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{Array2, array};

    fn separable() -> (Array2<f64>, Array1<f64>) {
        let x = array![[-2.0], [-1.5], [-1.0], [-0.5], [0.5], [1.0], [1.5], [2.0]];
        let y = array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_sigmoid() {
        assert_relative_eq!(sigmoid(0.0), 0.5);
        assert_relative_eq!(sigmoid(2.0) + sigmoid(-2.0), 1.0, epsilon = 1e-12);
        assert!(sigmoid(-800.0).is_finite());
        assert!(sigmoid(800.0) <= 1.0);
    }

    #[test]
    fn test_fit_ranks_positive_class_higher() {
        let (x, y) = separable();
        let model = LogisticRegression::fit(x.view(), y.view(), &LogisticConfig::default()).unwrap();
        assert!(model.weights()[0] > 0.0);
        let p = model.predict_proba(x.view()).unwrap();
        assert!(p.iter().all(|v| (0.0..=1.0).contains(v)));
        for i in 1..p.len() {
            assert!(p[i] > p[i - 1]);
        }
        assert!(p[0] < 0.5 && p[7] > 0.5);
        assert!(model.log_loss(x.view(), y.view()) < 2.0_f64.ln());
    }

    #[test]
    fn test_symmetric_data_has_zero_intercept() {
        let (x, y) = separable();
        let model = LogisticRegression::fit(x.view(), y.view(), &LogisticConfig::default()).unwrap();
        assert_relative_eq!(model.intercept(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_tolerance_stops_early() {
        let x = array![[0.0], [0.0]];
        let y = array![0.0, 1.0];
        let model = LogisticRegression::fit(x.view(), y.view(), &LogisticConfig::default()).unwrap();
        // gradient is zero from the start
        assert_eq!(model.iterations(), 1);
    }

    #[test]
    fn test_fit_validation() {
        let (x, y) = separable();
        let config = LogisticConfig::default();
        assert!(LogisticRegression::fit(x.view(), y.slice(ndarray::s![..3]), &config).is_err());
        let empty = Array2::<f64>::zeros((0, 1));
        let no_labels = Array1::<f64>::zeros(0);
        assert!(LogisticRegression::fit(empty.view(), no_labels.view(), &config).is_err());
        let bad_labels = y.mapv(|v| v * 2.0);
        assert!(LogisticRegression::fit(x.view(), bad_labels.view(), &config).is_err());
        let mut nan = x.clone();
        nan[[0, 0]] = f64::NAN;
        assert!(LogisticRegression::fit(nan.view(), y.view(), &config).is_err());
    }

    #[test]
    fn test_predict_checks_width() {
        let (x, y) = separable();
        let model = LogisticRegression::fit(x.view(), y.view(), &LogisticConfig::default()).unwrap();
        let wide = Array2::<f64>::zeros((2, 3));
        assert!(model.predict_proba(wide.view()).is_err());
        assert_eq!(model.name(), "logistic_regression");
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: LogisticConfig = serde_json::from_str(r#"{"max_iterations": 50}"#).unwrap();
        assert_eq!(config.max_iterations, 50);
        assert_relative_eq!(config.learning_rate, 0.1);
    }
}
