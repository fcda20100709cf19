use kryst::solver::LinearSolver;
use kryst::{
    parallel::{NoComm, UniverseComm},
    preconditioner::PcSide,
};
use nalgebra::DVector;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolveError {
    #[error("linear solve failed")]
    LinearSolveFailed,
    #[error("field solve did not converge")]
    NonConvergence,
}

/// Solve `A x = b` for a pre-assembled sparse operator with BiCGStab.
///
/// Non-convergence is a hard failure: the caller must not continue a step
/// with an unconverged potential.
pub fn solve_csr(
    matrix: &Arc<kryst::matrix::sparse::CsrMatrix<f64>>,
    b: &DVector<f64>,
    tolerance: f64,
    max_iterations: usize,
) -> Result<DVector<f64>, SolveError> {
    let n = b.len();

    if !b.iter().all(|x| x.is_finite()) {
        return Err(SolveError::LinearSolveFailed);
    }

    let op = kryst::matrix::op::CsrOp::new(Arc::clone(matrix));

    let mut bicgstab_solver = kryst::solver::bicgstab::BiCgStabSolver::new(tolerance, max_iterations);
    let mut workspace = kryst::context::ksp_context::Workspace::new(n);
    bicgstab_solver.setup_workspace(&mut workspace);

    let mut x = DVector::from_element(n, 0.0);

    let result = bicgstab_solver.solve(
        &op,
        None,
        b.as_slice(),
        x.as_mut_slice(),
        PcSide::Left,
        &UniverseComm::NoComm(NoComm {}),
        None,
        Some(&mut workspace),
    );

    match result {
        Ok(_) => {
            if !x.iter().all(|val| val.is_finite()) {
                return Err(SolveError::LinearSolveFailed);
            }
            Ok(x)
        }
        Err(_) => Err(SolveError::NonConvergence),
    }
}
