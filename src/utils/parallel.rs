//! Parallel Jacobian evaluation.
//!
//! Each column of a finite-difference Jacobian needs its own residual
//! evaluations, which are independent of each other. For fits with many
//! peaks these are spread over the Rayon thread pool.

use ndarray::{Array1, Array2};
use rayon::prelude::*;

use crate::error::{PvFitError, Result};
use crate::problem::Problem;
use crate::utils::finite_difference::{step_size, DEFAULT_EPSILON};

/// Compute the Jacobian matrix using forward finite differences in parallel.
///
/// # Arguments
///
/// * `problem` - The problem to evaluate
/// * `params` - The parameter values at which to evaluate the Jacobian
/// * `epsilon` - The step size for finite differences (optional)
///
/// # Returns
///
/// * `Result<Array2<f64>>` - The Jacobian matrix
pub fn jacobian_parallel<P>(
    problem: &P,
    params: &Array1<f64>,
    epsilon: Option<f64>,
) -> Result<Array2<f64>>
where
    P: Problem + Sync + ?Sized,
{
    let eps = epsilon.unwrap_or(DEFAULT_EPSILON);
    let n_residuals = problem.residual_count();

    let residuals = problem.eval(params)?;
    if residuals.len() != n_residuals {
        return Err(PvFitError::DimensionMismatch(format!(
            "Expected {} residuals, got {}",
            n_residuals,
            residuals.len()
        )));
    }

    let columns: Result<Vec<Array1<f64>>> = (0..params.len())
        .into_par_iter()
        .map(|j| {
            let mut params_perturbed = params.clone();
            let eps_j = step_size(params[j], eps);
            params_perturbed[j] += eps_j;

            let residuals_perturbed = problem.eval(&params_perturbed)?;
            Ok((&residuals_perturbed - &residuals) / eps_j)
        })
        .collect();

    assemble(columns?, n_residuals)
}

/// Compute the Jacobian matrix using central finite differences in parallel.
///
/// See [`crate::utils::finite_difference::jacobian_central`].
pub fn jacobian_central_parallel<P>(
    problem: &P,
    params: &Array1<f64>,
    epsilon: Option<f64>,
) -> Result<Array2<f64>>
where
    P: Problem + Sync + ?Sized,
{
    let eps = epsilon.unwrap_or(DEFAULT_EPSILON.cbrt());
    let n_residuals = problem.residual_count();

    let columns: Result<Vec<Array1<f64>>> = (0..params.len())
        .into_par_iter()
        .map(|j| {
            let eps_j = step_size(params[j], eps);

            let mut params_forward = params.clone();
            params_forward[j] += eps_j;
            let mut params_backward = params.clone();
            params_backward[j] -= eps_j;

            let residuals_forward = problem.eval(&params_forward)?;
            let residuals_backward = problem.eval(&params_backward)?;
            Ok((&residuals_forward - &residuals_backward) / (2.0 * eps_j))
        })
        .collect();

    assemble(columns?, n_residuals)
}

fn assemble(columns: Vec<Array1<f64>>, n_residuals: usize) -> Result<Array2<f64>> {
    let mut jac = Array2::zeros((n_residuals, columns.len()));

    for (j, column) in columns.into_iter().enumerate() {
        if column.len() != n_residuals {
            return Err(PvFitError::DimensionMismatch(format!(
                "Expected {} residuals, got {}",
                n_residuals,
                column.len()
            )));
        }
        jac.column_mut(j).assign(&column);
    }

    Ok(jac)
}
