//! Step calculation for the Levenberg-Marquardt algorithm.
//!
//! This module computes the damped Gauss-Newton step, which blends the
//! Gauss-Newton direction with gradient descent depending on the damping.

use crate::error::{PvFitError, Result};
use crate::lm::trust_region::TrustRegion;
use crate::utils::matrix_convert::{
    nalgebra_vec_to_ndarray, ndarray_to_nalgebra, ndarray_vec_to_nalgebra,
};
use ndarray::{Array1, Array2};

/// Floor applied to the diagonal scaling so that parameters with a zero
/// Jacobian column still receive damping.
const MIN_DIAGONAL: f64 = 1e-10;

/// How the linear system was solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveMethod {
    /// Cholesky decomposition of the damped normal matrix
    Cholesky,

    /// LU decomposition, used when Cholesky fails
    Lu,

    /// Scaled gradient step, used when both decompositions fail
    Gradient,
}

/// Result of a Levenberg-Marquardt step calculation.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// The calculated step vector
    pub step: Array1<f64>,

    /// The predicted reduction in the sum of squared residuals
    pub predicted_reduction: f64,

    /// The damping parameter used to calculate the step
    pub lambda: f64,

    /// The decomposition that produced the step
    pub method: SolveMethod,
}

/// Handles step calculation for the Levenberg-Marquardt algorithm.
pub struct LmStep;

impl LmStep {
    /// Squared column norms of `jacobian`, floored at a small positive value.
    ///
    /// This is `diag(JᵀJ)`, the Marquardt scaling for a single Jacobian.
    pub fn column_scaling(jacobian: &Array2<f64>) -> Array1<f64> {
        jacobian
            .columns()
            .into_iter()
            .map(|column| column.dot(&column).max(MIN_DIAGONAL))
            .collect()
    }

    /// Fold the scaling of a new Jacobian into the running scaling.
    ///
    /// Each entry only ever grows, so a parameter whose Jacobian column
    /// collapses (as it does at an active bound) stays damped.
    pub fn update_scaling(scaling: &mut Array1<f64>, jacobian: &Array2<f64>) {
        let current = Self::column_scaling(jacobian);
        if scaling.len() != current.len() {
            *scaling = current;
            return;
        }
        scaling.zip_mut_with(&current, |d, &c| *d = d.max(c));
    }

    /// Calculates the Levenberg-Marquardt step.
    ///
    /// Solves `(JᵀJ + λ·D) δ = −Jᵀr`, where `D` is the diagonal scaling.
    ///
    /// # Arguments
    ///
    /// * `jacobian` - The Jacobian matrix at the current position
    /// * `residuals` - The residuals at the current position
    /// * `scaling` - Diagonal scaling, see [`LmStep::update_scaling`]
    /// * `trust_region` - The trust region controller
    ///
    /// # Returns
    ///
    /// * The step result containing the step vector and other information
    pub fn calculate_step(
        jacobian: &Array2<f64>,
        residuals: &Array1<f64>,
        scaling: &Array1<f64>,
        trust_region: &TrustRegion,
    ) -> Result<StepResult> {
        if jacobian.nrows() != residuals.len() {
            return Err(PvFitError::DimensionMismatch(format!(
                "Jacobian has {} rows but there are {} residuals",
                jacobian.nrows(),
                residuals.len()
            )));
        }
        if jacobian.ncols() != scaling.len() {
            return Err(PvFitError::DimensionMismatch(format!(
                "Jacobian has {} columns but the scaling has {} entries",
                jacobian.ncols(),
                scaling.len()
            )));
        }

        let lambda = trust_region.lambda;
        let j_t_j = jacobian.t().dot(jacobian);
        let j_t_r = jacobian.t().dot(residuals);

        let mut augmented = j_t_j.clone();
        for i in 0..augmented.nrows() {
            augmented[[i, i]] += lambda * scaling[i].max(MIN_DIAGONAL);
        }

        let rhs = -&j_t_r;
        let (step, method) = match Self::solve(&augmented, &rhs) {
            Some(solution) => solution,
            None => {
                log::debug!("normal equations singular at lambda {:.3e}, taking a gradient step", lambda);
                (&rhs / (1.0 + lambda), SolveMethod::Gradient)
            }
        };

        if step.iter().any(|v| !v.is_finite()) {
            return Err(PvFitError::LinearAlgebraError(
                "step contains non-finite values".to_string(),
            ));
        }

        let predicted_reduction = Self::predicted_reduction(jacobian, &j_t_r, &step);

        Ok(StepResult {
            step,
            predicted_reduction,
            lambda,
            method,
        })
    }

    /// Solves the linear system `A x = b`, trying Cholesky first and LU next.
    fn solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<(Array1<f64>, SolveMethod)> {
        let a_na = ndarray_to_nalgebra(a);
        let b_na = ndarray_vec_to_nalgebra(b);

        if let Some(cholesky) = a_na.clone().cholesky() {
            let x = cholesky.solve(&b_na);
            return Some((nalgebra_vec_to_ndarray(&x), SolveMethod::Cholesky));
        }

        a_na.lu()
            .solve(&b_na)
            .map(|x| (nalgebra_vec_to_ndarray(&x), SolveMethod::Lu))
    }

    /// Predicted reduction of the linearized model, `‖r‖² − ‖r + Jδ‖²`.
    ///
    /// # Arguments
    ///
    /// * `jacobian` - The Jacobian matrix
    /// * `j_t_r` - The Jᵀr vector
    /// * `step` - The calculated step vector
    pub fn predicted_reduction(jacobian: &Array2<f64>, j_t_r: &Array1<f64>, step: &Array1<f64>) -> f64 {
        let j_step = jacobian.dot(step);
        -(2.0 * step.dot(j_t_r) + j_step.dot(&j_step))
    }
}
