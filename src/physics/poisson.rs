use crate::discretization::mesh::{Face, Mesh};
use crate::numerics::linear::{SolveError, solve_csr};
use crate::objects::object::Object;
use glam::DVec3;
use nalgebra::DVector;
use std::sync::Arc;

/// Exterior boundary condition of the whole domain.
#[derive(Clone, Copy, Debug)]
pub enum Exterior {
    /// Fixed potential on all wall faces.
    Dirichlet(f64),
    /// No exterior reference. The Laplacian is singular up to a constant
    /// unless objects pin it.
    Periodic,
}

/// Finite-volume Poisson solver with immersed conductors.
///
/// The two-point flux Laplacian is assembled once; conductor cells are
/// replaced by identity rows so their potentials enter only through the
/// right-hand side. Solving the same geometry with different charge
/// densities and object potentials reuses the matrix.
pub struct FieldSolver {
    matrix: Arc<kryst::matrix::sparse::CsrMatrix<f64>>,
    rhs_fixed: DVector<f64>,
    object_cells: Vec<Vec<usize>>,
    pinned: Vec<bool>,
    singular: bool,
    pub tolerance: f64,
    pub max_iterations: usize,
}

#[inline]
fn transmissibility(face: &Face, a: DVec3, b: DVec3) -> f64 {
    face.area / a.distance(b).max(1e-14)
}

impl FieldSolver {
    pub fn new(mesh: &Mesh, exterior: Exterior, objects: &[Object]) -> Self {
        let n = mesh.cells.len();

        let mut pinned = vec![false; n];
        for obj in objects {
            for &c in &obj.cells {
                pinned[c] = true;
            }
        }

        let mut rows: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        let mut rhs_fixed = DVector::zeros(n);
        let mut has_reference = !objects.is_empty();

        for face in &mesh.faces {
            match face.neighbor_cell_ids {
                (k, Some(l)) => {
                    let t = transmissibility(face, mesh.generator(k), mesh.generator(l));
                    if !pinned[k] {
                        rows[k].push((k, t));
                        rows[k].push((l, -t));
                    }
                    if !pinned[l] {
                        rows[l].push((l, t));
                        rows[l].push((k, -t));
                    }
                }
                (k, None) => {
                    if pinned[k] || !mesh.is_wall(face) {
                        continue;
                    }
                    if let Exterior::Dirichlet(g) = exterior {
                        // Ghost-cell closure: phi_ghost = 2 g - phi_k.
                        let t =
                            transmissibility(face, DVec3::from_array(face.centroid), mesh.generator(k));
                        rows[k].push((k, 2.0 * t));
                        rhs_fixed[k] += 2.0 * t * g;
                        has_reference = true;
                    }
                    // Periodic walls and slab caps close with zero flux.
                }
            }
        }

        for c in 0..n {
            if pinned[c] {
                rows[c] = vec![(c, 1.0)];
            }
        }

        let mut indptr = Vec::with_capacity(n + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);
        for row in &mut rows {
            row.sort_by_key(|e| e.0);
            let mut merged: Vec<(usize, f64)> = Vec::with_capacity(row.len());
            for &(col, val) in row.iter() {
                match merged.last_mut() {
                    Some(last) if last.0 == col => last.1 += val,
                    _ => merged.push((col, val)),
                }
            }
            for (col, val) in merged {
                indices.push(col);
                data.push(val);
            }
            indptr.push(indices.len());
        }
        let matrix = kryst::matrix::sparse::CsrMatrix::from_csr(n, n, indptr, indices, data);

        Self {
            matrix: Arc::new(matrix),
            rhs_fixed,
            object_cells: objects.iter().map(|o| o.cells.clone()).collect(),
            pinned,
            singular: !has_reference,
            tolerance: 1e-10,
            max_iterations: 2000,
        }
    }

    /// Solve for the potential given the charge density and one fixed
    /// potential per object (in object order).
    pub fn solve(
        &self,
        mesh: &Mesh,
        rho: &DVector<f64>,
        potentials: &[f64],
    ) -> Result<DVector<f64>, SolveError> {
        debug_assert_eq!(potentials.len(), self.object_cells.len());
        let n = mesh.cells.len();

        let mut b = self.rhs_fixed.clone();
        for c in 0..n {
            if !self.pinned[c] {
                b[c] += rho[c] * mesh.cells[c].volume;
            }
        }
        for (i, cells) in self.object_cells.iter().enumerate() {
            for &c in cells {
                b[c] = potentials[i];
            }
        }

        if self.singular {
            // Remove the component along the constant null vector; without a
            // reference the system is only solvable for zero-mean data.
            let mean = b.mean();
            b.add_scalar_mut(-mean);
        }

        let mut phi = solve_csr(&self.matrix, &b, self.tolerance, self.max_iterations)?;

        if self.singular {
            let mean = phi.mean();
            phi.add_scalar_mut(-mean);
        }
        Ok(phi)
    }
}

/// Cell-wise electric field `E = -grad phi` by Green-Gauss reconstruction.
pub fn electric_field(mesh: &Mesh, phi: &DVector<f64>, exterior: Exterior) -> Vec<DVec3> {
    let n = mesh.cells.len();
    let mut grad = vec![DVec3::ZERO; n];

    for face in &mesh.faces {
        let nf = DVec3::from_array(face.normal) * face.area;
        match face.neighbor_cell_ids {
            (k, Some(l)) => {
                let phi_f = 0.5 * (phi[k] + phi[l]);
                grad[k] += nf * phi_f;
                grad[l] -= nf * phi_f;
            }
            (k, None) => {
                let phi_f = match exterior {
                    Exterior::Dirichlet(g) if mesh.is_wall(face) => g,
                    _ => phi[k],
                };
                grad[k] += nf * phi_f;
            }
        }
    }

    for (c, g) in grad.iter_mut().enumerate() {
        *g = -*g / mesh.cells[c].volume;
    }
    grad
}

/// Gauss' law surface integral over an object's boundary: the charge
/// enclosed by the conductor surface under the given potential field.
pub fn surface_flux(mesh: &Mesh, phi: &DVector<f64>, object: &Object) -> f64 {
    object
        .boundary
        .iter()
        .map(|s| {
            let t = transmissibility(
                &mesh.faces[s.face],
                mesh.generator(s.inner),
                mesh.generator(s.outer),
            );
            t * (phi[s.inner] - phi[s.outer])
        })
        .sum()
}
