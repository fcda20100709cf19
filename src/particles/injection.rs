use crate::discretization::mesh::Mesh;
use crate::particles::population::{Particle, Population};
use glam::DVec3;
use rand::Rng;
use rand_distr::{Distribution, Normal};

const SQRT_2PI: f64 = 2.5066282746310002;

/// One wall face through which ambient plasma enters the domain.
struct InjectionFace {
    cell: usize,
    inward: DVec3,
    area: f64,
    centroid: DVec3,
}

/// The open exterior boundary, precomputed from the mesh walls.
pub struct ExteriorBoundary {
    faces: Vec<InjectionFace>,
    pub area: f64,
}

impl ExteriorBoundary {
    pub fn new(mesh: &Mesh) -> Self {
        let mut faces = Vec::new();
        let mut area = 0.0;
        for f in mesh.wall_faces() {
            let face = &mesh.faces[f];
            faces.push(InjectionFace {
                cell: face.neighbor_cell_ids.0,
                inward: -DVec3::from_array(face.normal),
                area: face.area,
                centroid: DVec3::from_array(face.centroid),
            });
            area += face.area;
        }
        Self { faces, area }
    }
}

/// Inject particles across the exterior boundary over one timestep,
/// maintaining the one-way thermal flux `n v_th / sqrt(2 pi)` per unit
/// area for every species. Returns the number injected.
///
/// The wall-normal speed is drawn from the flux-weighted half-Maxwellian by
/// inverse CDF; tangential components are Maxwellian. Each new particle is
/// advanced a uniform fraction of the step so arrivals spread over dt.
pub fn inject<R: Rng>(
    mesh: &Mesh,
    pop: &mut Population,
    boundary: &ExteriorBoundary,
    dt: f64,
    rng: &mut R,
) -> usize {
    let species: Vec<_> = pop.species.iter().cloned().enumerate().collect();
    let mut injected = 0;

    for (index, sp) in species {
        if sp.v_thermal <= 0.0 || sp.density <= 0.0 {
            continue;
        }
        let maxwellian =
            Normal::new(0.0, sp.v_thermal).expect("thermal speed must be positive and finite");
        let flux = sp.density * sp.v_thermal / SQRT_2PI;

        for face in &boundary.faces {
            let expected = flux * face.area * dt;
            let mut count = expected.floor() as usize;
            if rng.random::<f64>() < expected.fract() {
                count += 1;
            }

            for _ in 0..count {
                let vn = sp.v_thermal * (-2.0 * (1.0 - rng.random::<f64>()).ln()).sqrt();
                let vel = if mesh.slab {
                    let tangent = DVec3::new(-face.inward.y, face.inward.x, 0.0);
                    face.inward * vn + tangent * maxwellian.sample(rng)
                } else {
                    let t1 = face.inward.any_orthonormal_vector();
                    let t2 = face.inward.cross(t1);
                    face.inward * vn + t1 * maxwellian.sample(rng) + t2 * maxwellian.sample(rng)
                };

                let pos = face.centroid + vel * (rng.random::<f64>() * dt);
                let Some(cell) = mesh.locate_from(face.cell, pos) else {
                    // Re-crossed the wall within the same step.
                    continue;
                };
                pop.cells[cell].push(Particle {
                    pos,
                    vel,
                    q: sp.charge,
                    m: sp.mass,
                    species: index,
                });
                injected += 1;
            }
        }
    }
    injected
}
