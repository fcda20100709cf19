use crate::discretization::mesh::Mesh;
use crate::objects::object::Object;
use glam::DVec3;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// One macro-particle. `q` and `m` carry the species values scaled by the
/// macro-particle weight.
#[derive(Clone, Copy, Debug)]
pub struct Particle {
    pub pos: DVec3,
    pub vel: DVec3,
    pub q: f64,
    pub m: f64,
    pub species: usize,
}

/// A particle species with its loading parameters.
#[derive(Clone, Debug)]
pub struct Species {
    pub name: String,
    pub charge: f64,
    pub mass: f64,
    pub v_thermal: f64,
    /// Macro-particles per volume in the ambient plasma; set when the
    /// species is loaded and used to scale the injection flux.
    pub density: f64,
}

/// All live particles, bucketed by the mesh cell that contains them.
///
/// Invariant: every particle appears in exactly one bucket, and that bucket
/// is the cell enclosing its current position.
pub struct Population {
    pub cells: Vec<Vec<Particle>>,
    pub species: Vec<Species>,
}

impl Population {
    pub fn new(mesh: &Mesh) -> Self {
        Self {
            cells: (0..mesh.cells.len()).map(|_| Vec::new()).collect(),
            species: Vec::new(),
        }
    }

    /// Load a new species uniformly over the domain with a Maxwellian
    /// velocity distribution, `per_cell` macro-particles per mesh cell on
    /// average. Returns the species index.
    pub fn add_species<R: Rng>(
        &mut self,
        mesh: &Mesh,
        mut species: Species,
        per_cell: usize,
        rng: &mut R,
    ) -> usize {
        let total = per_cell * mesh.cells.len();
        species.density = total as f64 / mesh.total_volume();

        let maxwellian = Normal::new(0.0, species.v_thermal)
            .expect("thermal speed must be positive and finite");
        let index = self.species.len();

        let mut hint = 0;
        let mut loaded = 0;
        while loaded < total {
            let pos = DVec3::new(
                mesh.origin[0] + rng.random::<f64>() * mesh.width[0],
                mesh.origin[1] + rng.random::<f64>() * mesh.width[1],
                if mesh.slab {
                    0.0
                } else {
                    mesh.origin[2] + rng.random::<f64>() * mesh.width[2]
                },
            );
            let Some(cell) = mesh.locate_from(hint, pos) else {
                continue;
            };
            hint = cell;

            let vel = DVec3::new(
                maxwellian.sample(rng),
                maxwellian.sample(rng),
                if mesh.slab { 0.0 } else { maxwellian.sample(rng) },
            );
            self.cells[cell].push(Particle {
                pos,
                vel,
                q: species.charge,
                m: species.mass,
                species: index,
            });
            loaded += 1;
        }

        self.species.push(species);
        index
    }

    pub fn num_particles(&self) -> usize {
        self.cells.iter().map(|b| b.len()).sum()
    }

    pub fn num_positives(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|p| p.q > 0.0)
            .count()
    }

    pub fn num_negatives(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|p| p.q < 0.0)
            .count()
    }

    pub fn total_charge(&self) -> f64 {
        self.cells.iter().flatten().map(|p| p.q).sum()
    }

    /// Absorb every particle bucketed inside a conductor, transferring its
    /// charge to the object. Returns the number absorbed. Calling this
    /// twice without intervening motion is a no-op.
    pub fn relocate(&mut self, objects: &mut [Object]) -> usize {
        let mut absorbed = 0;
        for obj in objects.iter_mut() {
            let mut dq = 0.0;
            for &c in &obj.cells {
                for p in self.cells[c].drain(..) {
                    dq += p.q;
                    absorbed += 1;
                }
            }
            obj.add_charge(dq);
        }
        absorbed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discretization::generator::{create_flat_3d_mesh, create_regular_2d_grid};
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn relocation_absorbs_once_and_is_idempotent() {
        let points = create_regular_2d_grid([2.0, 2.0], 10, 10);
        let mesh = create_flat_3d_mesh(&points, [2.0, 2.0], 0.2);
        let mut rng = StdRng::seed_from_u64(5);

        let mut pop = Population::new(&mesh);
        pop.add_species(
            &mesh,
            Species {
                name: "electron".into(),
                charge: -0.5,
                mass: 1.0,
                v_thermal: 0.1,
                density: 0.0,
            },
            4,
            &mut rng,
        );
        let before = pop.num_particles();

        let mut objects =
            vec![Object::from_region(&mesh, 0, "blob", |p| p.length_squared() <= 0.25).unwrap()];

        let absorbed = pop.relocate(&mut objects);
        assert!(absorbed > 0);
        assert_eq!(pop.num_particles(), before - absorbed);
        assert_relative_eq!(objects[0].charge, -0.5 * absorbed as f64, epsilon = 1e-12);

        let charge_after = objects[0].charge;
        assert_eq!(pop.relocate(&mut objects), 0);
        assert_relative_eq!(objects[0].charge, charge_after, epsilon = 1e-12);
    }
}
