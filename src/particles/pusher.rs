use crate::discretization::mesh::Mesh;
use crate::particles::population::{Particle, Population};
use glam::DVec3;

/// Particles that left the domain through a non-periodic wall.
#[derive(Clone, Copy, Debug, Default)]
pub struct Escaped {
    pub count: usize,
    pub charge: f64,
}

/// Advance velocities by the field interpolated at each particle and return
/// the kinetic energy, centered between the staggered velocity steps via
/// `1/2 m v_old . v_new`. The caller halves `dt` on the very first call to
/// start the leapfrog.
pub fn accel(pop: &mut Population, e: &[DVec3], dt: f64) -> f64 {
    let mut kinetic = 0.0;
    for (cell, bucket) in pop.cells.iter_mut().enumerate() {
        let ec = e[cell];
        for p in bucket.iter_mut() {
            let v_new = p.vel + ec * (p.q / p.m * dt);
            kinetic += 0.5 * p.m * p.vel.dot(v_new);
            p.vel = v_new;
        }
    }
    kinetic
}

/// Advance positions and restore the bucketing invariant. Each displaced
/// particle is rebucketed by a local walk from its old cell; particles
/// crossing a non-periodic wall are removed and counted.
pub fn move_particles(mesh: &Mesh, pop: &mut Population, dt: f64, periodic: bool) -> Escaped {
    let mut escaped = Escaped::default();
    let mut moved: Vec<(usize, Particle)> = Vec::new();

    for c in 0..pop.cells.len() {
        let bucket = &mut pop.cells[c];
        let mut i = 0;
        while i < bucket.len() {
            let mut pos = bucket[i].pos + bucket[i].vel * dt;
            if periodic {
                mesh.wrap(&mut pos);
            }
            match mesh.locate_from(c, pos) {
                Some(nc) if nc == c => {
                    bucket[i].pos = pos;
                    i += 1;
                }
                Some(nc) => {
                    let mut p = bucket.swap_remove(i);
                    p.pos = pos;
                    moved.push((nc, p));
                }
                None => {
                    debug_assert!(!periodic, "wrapped particle has no enclosing cell");
                    let p = bucket.swap_remove(i);
                    escaped.count += 1;
                    escaped.charge += p.q;
                }
            }
        }
    }

    for (nc, p) in moved {
        pop.cells[nc].push(p);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discretization::generator::{create_flat_3d_mesh, create_regular_2d_grid};

    fn test_mesh() -> Mesh {
        let points = create_regular_2d_grid([1.0, 1.0], 8, 8);
        create_flat_3d_mesh(&points, [1.0, 1.0], 0.1)
    }

    #[test]
    fn crossing_particles_change_bucket() {
        let mesh = test_mesh();
        let mut pop = Population::new(&mesh);

        let pos = mesh.generator(0);
        pop.cells[0].push(Particle {
            pos,
            vel: DVec3::new(1.0, 0.0, 0.0),
            q: -1.0,
            m: 1.0,
            species: 0,
        });

        // One cell spacing is 1/8; move two cells over.
        let escaped = move_particles(&mesh, &mut pop, 0.25, false);
        assert_eq!(escaped.count, 0);
        assert!(pop.cells[0].is_empty());

        let cell = pop
            .cells
            .iter()
            .position(|b| !b.is_empty())
            .expect("particle still in the domain");
        let p = pop.cells[cell][0];
        assert_eq!(mesh.locate_nearest(p.pos), Some(cell));
    }

    #[test]
    fn escaping_particle_is_removed_and_counted() {
        let mesh = test_mesh();
        let mut pop = Population::new(&mesh);

        pop.cells[0].push(Particle {
            pos: mesh.generator(0),
            vel: DVec3::new(-10.0, 0.0, 0.0),
            q: -1.0,
            m: 1.0,
            species: 0,
        });

        let escaped = move_particles(&mesh, &mut pop, 0.5, false);
        assert_eq!(escaped.count, 1);
        assert_eq!(escaped.charge, -1.0);
        assert_eq!(pop.num_particles(), 0);
    }

    #[test]
    fn periodic_walls_wrap_instead_of_removing() {
        let mesh = test_mesh();
        let mut pop = Population::new(&mesh);

        pop.cells[0].push(Particle {
            pos: mesh.generator(0),
            vel: DVec3::new(-10.0, 0.0, 0.0),
            q: -1.0,
            m: 1.0,
            species: 0,
        });

        let escaped = move_particles(&mesh, &mut pop, 0.5, true);
        assert_eq!(escaped.count, 0);
        assert_eq!(pop.num_particles(), 1);
    }
}
