mod discretization;
mod numerics;
mod objects;
mod particles;
mod physics;
mod processing;
mod simulation;

use crate::discretization::generator::{create_flat_3d_mesh, create_regular_2d_grid};
use crate::objects::object::Object;
use crate::particles::population::{Population, Species};
use crate::physics::poisson::Exterior;
use crate::processing::csv_writer;
use crate::processing::diagnostics::History;
use crate::simulation::Simulation;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::f64::consts::TAU;
use std::time::Instant;

// Normalized units: electron mass and charge magnitude are 1, as is the
// ambient electron thermal speed. Lengths are in Debye lengths.
const DOMAIN: [f64; 2] = [TAU, TAU];
const RESOLUTION: usize = 48;
const PROBE_RADIUS: f64 = 0.5;
const PARTICLES_PER_CELL: usize = 16;
const DT: f64 = 0.05;
const STEPS: usize = 500;
const ION_MASS_RATIO: f64 = 1836.0;
/// Collected current imposed on the probe by the external source.
const PROBE_CURRENT: f64 = 0.5;

fn main() {
    std::fs::create_dir_all("output/main").expect("Failed to create output directory");

    println!("Building {}x{} Voronoi mesh...", RESOLUTION, RESOLUTION);
    let points = create_regular_2d_grid(DOMAIN, RESOLUTION, RESOLUTION);
    let mesh = create_flat_3d_mesh(&points, DOMAIN, DOMAIN[0] / RESOLUTION as f64);

    let mut probe = Object::from_region(&mesh, 0, "probe", |p| {
        p.x * p.x + p.y * p.y <= PROBE_RADIUS * PROBE_RADIUS
    })
    .expect("probe region selects no cells");
    probe.current = PROBE_CURRENT;
    println!(
        "Probe covers {} cells with {} surface faces",
        probe.cells.len(),
        probe.boundary.len()
    );

    // Macro-particle weight for unit ambient density of each species.
    let num_macro = PARTICLES_PER_CELL * mesh.cells.len();
    let weight = mesh.total_volume() / num_macro as f64;

    let mut rng = StdRng::seed_from_u64(42);
    let mut population = Population::new(&mesh);
    population.add_species(
        &mesh,
        Species {
            name: "electron".into(),
            charge: -weight,
            mass: weight,
            v_thermal: 1.0,
            density: 0.0,
        },
        PARTICLES_PER_CELL,
        &mut rng,
    );
    population.add_species(
        &mesh,
        Species {
            name: "ion".into(),
            charge: weight,
            mass: weight * ION_MASS_RATIO,
            v_thermal: 1.0 / ION_MASS_RATIO.sqrt(),
            density: 0.0,
        },
        PARTICLES_PER_CELL,
        &mut rng,
    );
    println!(
        "Loaded {} macro-particles, KE = {:.4e}",
        population.num_particles(),
        processing::diagnostics::kinetic_energy(&population)
    );

    let mut sim = Simulation::new(
        mesh,
        population,
        vec![probe],
        Vec::new(),
        Vec::new(),
        Exterior::Dirichlet(0.0),
        DT,
        1337,
    )
    .expect("simulation setup failed");

    let mut history = History::new(sim.objects.len());
    let start = Instant::now();
    numerics::timing::reset_timing();

    for step in 0..STEPS {
        let report = sim.step().expect("field solve failed");
        history.record(sim.time, &sim.population, &report);

        if (step + 1) % 50 == 0 {
            println!(
                "step {:>4}/{}: N = {}, KE = {:.4e}, probe V = {:+.4e}, probe Q = {:+.4e}",
                step + 1,
                STEPS,
                sim.population.num_particles(),
                report.kinetic,
                report.potentials[0],
                report.charge[0],
            );
        }
    }

    numerics::timing::finalize_and_print(start.elapsed());

    history
        .write_to_file("output/main/history.csv")
        .expect("Failed to write history");
    println!("History saved to output/main/history.csv");

    save_potential(&sim);
    println!(
        "Final probe potential: {:+.6e} after {:.2}s",
        sim.objects[0].potential,
        start.elapsed().as_secs_f64()
    );
}

fn save_potential(sim: &Simulation) {
    let x: Vec<f64> = sim.mesh.cells.iter().map(|c| c.centroid[0]).collect();
    let y: Vec<f64> = sim.mesh.cells.iter().map(|c| c.centroid[1]).collect();
    let phi: Vec<f64> = sim.phi.iter().cloned().collect();

    csv_writer::write_csv("output/main/potential.csv", &["x", "y", "phi"], &[x, y, phi])
        .expect("Failed to write potential");
    println!("Potential saved to output/main/potential.csv");
}
