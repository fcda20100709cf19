use super::ConfigError;
use super::object::Object;
use crate::discretization::mesh::Mesh;
use crate::physics::poisson::{FieldSolver, surface_flux};
use nalgebra::{DMatrix, DVector};

/// The mutual capacitance of the conductor configuration, with its inverse.
/// Entry (j, i) is the charge induced on object j when object i is held at
/// unit potential with every other conductor grounded and no plasma charge.
/// Geometry is static, so this is computed once and cached.
pub struct CapacitanceMatrix {
    pub matrix: DMatrix<f64>,
    pub inverse: DMatrix<f64>,
}

impl CapacitanceMatrix {
    /// One homogeneous field solve per object populates one column.
    pub fn build(
        mesh: &Mesh,
        solver: &FieldSolver,
        objects: &[Object],
    ) -> Result<Self, ConfigError> {
        let n = objects.len();
        let rho = DVector::zeros(mesh.cells.len());
        let mut matrix = DMatrix::zeros(n, n);

        for i in 0..n {
            let mut potentials = vec![0.0; n];
            potentials[i] = 1.0;
            let phi = solver.solve(mesh, &rho, &potentials)?;
            for (j, obj) in objects.iter().enumerate() {
                matrix[(j, i)] = surface_flux(mesh, &phi, obj);
            }
        }

        let inverse = matrix
            .clone()
            .try_inverse()
            .ok_or(ConfigError::SingularCapacitance)?;

        Ok(Self { matrix, inverse })
    }
}
