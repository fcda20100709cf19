use crate::discretization::mesh::Mesh;
use crate::particles::population::Population;
use nalgebra::DVector;

/// Reciprocal control-volume weights, precomputed once per mesh.
pub fn volume_inverse(mesh: &Mesh) -> Vec<f64> {
    mesh.cells.iter().map(|c| 1.0 / c.volume).collect()
}

/// Deposit particle charge onto the mesh as a density field. Weighting each
/// cell's charge sum by its reciprocal control volume makes the deposition
/// exactly charge-conserving: integrating the density over the domain
/// recovers the total particle charge.
pub fn distribute(mesh: &Mesh, pop: &Population, dv_inv: &[f64]) -> DVector<f64> {
    let mut rho = DVector::zeros(mesh.cells.len());
    for (c, bucket) in pop.cells.iter().enumerate() {
        let cell_charge: f64 = bucket.iter().map(|p| p.q).sum();
        rho[c] = cell_charge * dv_inv[c];
    }
    rho
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discretization::generator::{create_flat_3d_mesh, create_regular_2d_grid};
    use crate::particles::population::{Population, Species};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn deposited_density_integrates_to_total_charge() {
        let points = create_regular_2d_grid([2.0, 1.0], 10, 5);
        let mesh = create_flat_3d_mesh(&points, [2.0, 1.0], 0.1);
        let mut rng = StdRng::seed_from_u64(7);

        let mut pop = Population::new(&mesh);
        pop.add_species(
            &mesh,
            Species {
                name: "electron".into(),
                charge: -1.5,
                mass: 1.0,
                v_thermal: 0.1,
                density: 0.0,
            },
            4,
            &mut rng,
        );

        let dv_inv = volume_inverse(&mesh);
        let rho = distribute(&mesh, &pop, &dv_inv);

        let integral: f64 = mesh
            .cells
            .iter()
            .map(|c| rho[c.id] * c.volume)
            .sum();
        assert!((integral - pop.total_charge()).abs() < 1e-10 * integral.abs());
    }
}
