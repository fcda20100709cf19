use picfvm_rs::discretization::generator::{create_flat_3d_mesh, create_regular_2d_grid};
use picfvm_rs::discretization::mesh::Mesh;
use picfvm_rs::objects::object::Object;
use picfvm_rs::particles::population::{Population, Species};
use picfvm_rs::physics::poisson::Exterior;
use picfvm_rs::simulation::Simulation;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::f64::consts::TAU;

fn small_mesh(resolution: usize) -> Mesh {
    let width = [TAU, TAU];
    let points = create_regular_2d_grid(width, resolution, resolution);
    create_flat_3d_mesh(&points, width, width[0] / resolution as f64)
}

fn neutral_pair(mesh: &Mesh, per_cell: usize, seed: u64) -> Population {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut pop = Population::new(mesh);
    pop.add_species(
        mesh,
        Species {
            name: "electron".into(),
            charge: -0.01,
            mass: 0.01,
            v_thermal: 0.3,
            density: 0.0,
        },
        per_cell,
        &mut rng,
    );
    pop.add_species(
        mesh,
        Species {
            name: "ion".into(),
            charge: 0.01,
            mass: 1.0,
            v_thermal: 0.01,
            density: 0.0,
        },
        per_cell,
        &mut rng,
    );
    pop
}

#[test]
fn periodic_step_conserves_particles_and_charge() {
    let mesh = small_mesh(12);
    let pop = neutral_pair(&mesh, 4, 3);
    let count = pop.num_particles();
    let charge = pop.total_charge();

    let mut sim = Simulation::new(
        mesh,
        pop,
        Vec::new(),
        Vec::new(),
        Vec::new(),
        Exterior::Periodic,
        0.05,
        11,
    )
    .unwrap();
    assert!(!sim.injection);

    for _ in 0..5 {
        let report = sim.step().unwrap();
        assert_eq!(report.escaped.count, 0);
        assert_eq!(report.absorbed, 0);
        assert_eq!(report.injected, 0);
    }

    assert_eq!(sim.population.num_particles(), count);
    let drift = (sim.population.total_charge() - charge).abs();
    assert!(drift < 1e-12, "charge drifted by {drift}");
}

#[test]
fn objects_with_periodic_exterior_are_rejected() {
    let mesh = small_mesh(12);
    let probe = Object::from_region(&mesh, 0, "probe", |p| p.length_squared() <= 0.25).unwrap();
    let pop = Population::new(&mesh);

    let result = Simulation::new(
        mesh,
        pop,
        vec![probe],
        Vec::new(),
        Vec::new(),
        Exterior::Periodic,
        0.05,
        0,
    );
    assert!(result.is_err());
}

#[test]
fn closed_run_books_every_unit_of_charge() {
    let mesh = small_mesh(16);
    let pop = neutral_pair(&mesh, 4, 7);
    let initial_charge = pop.total_charge();

    let mut sim = Simulation::new(
        mesh,
        pop,
        vec![],
        Vec::new(),
        Vec::new(),
        Exterior::Dirichlet(0.0),
        0.1,
        23,
    )
    .unwrap();
    sim.injection = false;

    let mut escaped_charge = 0.0;
    for _ in 0..10 {
        let report = sim.step().unwrap();
        escaped_charge += report.escaped.charge;
    }

    let booked = sim.population.total_charge() + escaped_charge;
    assert!(
        (booked - initial_charge).abs() < 1e-12,
        "lost {:.3e} of charge",
        (booked - initial_charge).abs()
    );
}

#[test]
fn absorbed_charge_lands_on_the_probe() {
    let mesh = small_mesh(16);
    let pop = neutral_pair(&mesh, 6, 19);
    let probe = Object::from_region(&mesh, 0, "probe", |p| p.length_squared() <= 1.0).unwrap();

    let mut sim = Simulation::new(
        mesh,
        pop,
        vec![probe],
        Vec::new(),
        Vec::new(),
        Exterior::Dirichlet(0.0),
        0.1,
        29,
    )
    .unwrap();
    sim.injection = false;

    // Setup discards particles sampled inside the conductor uncredited.
    assert_eq!(sim.objects[0].charge, 0.0);
    assert!(sim.objects[0]
        .cells
        .iter()
        .all(|&c| sim.population.cells[c].is_empty()));
    let initial_charge = sim.population.total_charge();

    let mut escaped_charge = 0.0;
    let mut absorbed = 0;
    for _ in 0..10 {
        let report = sim.step().unwrap();
        escaped_charge += report.escaped.charge;
        absorbed += report.absorbed;
    }
    assert!(absorbed > 0, "no particle reached the probe in 10 steps");

    let booked = sim.population.total_charge() + sim.objects[0].charge + escaped_charge;
    assert!(
        (booked - initial_charge).abs() < 1e-12,
        "lost {:.3e} of charge",
        (booked - initial_charge).abs()
    );
}

#[test]
fn langmuir_style_step_reports_finite_diagnostics() {
    let mesh = small_mesh(16);
    let pop = neutral_pair(&mesh, 4, 31);
    let mut probe = Object::from_region(&mesh, 0, "probe", |p| p.length_squared() <= 0.36).unwrap();
    probe.current = 0.1;

    let mut sim = Simulation::new(
        mesh,
        pop,
        vec![probe],
        Vec::new(),
        Vec::new(),
        Exterior::Dirichlet(0.0),
        0.05,
        37,
    )
    .unwrap();
    assert!(sim.injection);
    assert_eq!(sim.objects[0].charge, 0.0);

    for _ in 0..5 {
        let report = sim.step().unwrap();
        assert!(report.kinetic.is_finite() && report.kinetic > 0.0);
        assert!(report.potential.is_finite());
        assert_eq!(report.current.len(), 1);
        assert!(report.current[0].is_finite());
        assert!(sim.objects[0].potential.is_finite());
    }
}
