use crate::discretization::mesh::Mesh;
use crate::numerics::linear::SolveError;
use crate::numerics::timing::{self, Stage};
use crate::objects::capacitance::CapacitanceMatrix;
use crate::objects::circuit::{self, Circuit};
use crate::objects::object::{self, Object};
use crate::objects::ConfigError;
use crate::particles::deposit;
use crate::particles::injection::{self, ExteriorBoundary};
use crate::particles::population::Population;
use crate::particles::pusher::{self, Escaped};
use crate::physics::poisson::{self, Exterior, FieldSolver};
use crate::processing::diagnostics;
use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Per-step diagnostics returned by [`Simulation::step`].
pub struct StepReport {
    /// Leapfrog-centered kinetic energy.
    pub kinetic: f64,
    /// Potential energy of the particles in the corrected field.
    pub potential: f64,
    pub escaped: Escaped,
    pub absorbed: usize,
    pub injected: usize,
    pub charge: Vec<f64>,
    pub potentials: Vec<f64>,
    /// Net charge collected per object over the step, divided by dt.
    pub current: Vec<f64>,
}

/// A configured electrostatic PIC run: static geometry and the per-step
/// pipeline over it.
///
/// The capacitance matrix and its derived circuit operators are computed
/// once at setup; every step then costs exactly two field solves, one
/// predictor with grounded conductors and one corrector at the
/// self-consistent object potentials.
pub struct Simulation {
    pub mesh: Mesh,
    pub population: Population,
    pub objects: Vec<Object>,
    circuits: Vec<Circuit>,
    solver: FieldSolver,
    capacitance: CapacitanceMatrix,
    dv_inv: Vec<f64>,
    boundary: ExteriorBoundary,
    exterior: Exterior,
    pub dt: f64,
    pub time: f64,
    steps: usize,
    rng: StdRng,
    /// Ambient injection through the exterior walls; disable for closed or
    /// fully periodic runs.
    pub injection: bool,
    /// Potential field from the latest corrector solve.
    pub phi: DVector<f64>,
}

impl Simulation {
    pub fn new(
        mesh: Mesh,
        mut population: Population,
        objects: Vec<Object>,
        circuits: Vec<Vec<usize>>,
        biases: Vec<Vec<f64>>,
        exterior: Exterior,
        dt: f64,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        object::check_overlap(&objects)?;
        if !objects.is_empty() && matches!(exterior, Exterior::Periodic) {
            return Err(ConfigError::NoReference);
        }

        // Uniform loading may sample positions inside a conductor; discard
        // those without crediting charge, so absorption only ever registers
        // particles that actually arrived at the surface.
        for obj in &objects {
            for &c in &obj.cells {
                population.cells[c].clear();
            }
        }

        let solver = FieldSolver::new(&mesh, exterior, &objects);
        let capacitance = CapacitanceMatrix::build(&mesh, &solver, &objects)?;
        let circuits = circuit::build_circuits(&capacitance.inverse, circuits, biases)?;

        let dv_inv = deposit::volume_inverse(&mesh);
        let boundary = ExteriorBoundary::new(&mesh);
        let phi = DVector::zeros(mesh.cells.len());
        let injection = !matches!(exterior, Exterior::Periodic);

        Ok(Self {
            mesh,
            population,
            objects,
            circuits,
            solver,
            capacitance,
            dv_inv,
            boundary,
            exterior,
            dt,
            time: 0.0,
            steps: 0,
            rng: StdRng::seed_from_u64(seed),
            injection,
            phi,
        })
    }

    /// Advance the system by one timestep.
    ///
    /// Stage order is load-bearing: charge is deposited from the positions
    /// the previous step left behind, the field is solved before any
    /// particle moves, and absorption runs before injection so a particle
    /// cannot be absorbed in the step it is born.
    pub fn step(&mut self) -> Result<StepReport, SolveError> {
        let charge_before: Vec<f64> = self.objects.iter().map(|o| o.charge).collect();

        object::reset_potentials(&mut self.objects);
        let rho = timing::record_stage(Stage::Deposit, || {
            deposit::distribute(&self.mesh, &self.population, &self.dv_inv)
        });

        // Predictor: all conductors grounded. The Gauss flux around each
        // object is its image charge, induced by the plasma alone.
        let potentials = vec![0.0; self.objects.len()];
        let phi = timing::record_stage(Stage::FieldSolve, || {
            self.solver.solve(&self.mesh, &rho, &potentials)
        })?;
        let images: Vec<f64> = self
            .objects
            .iter()
            .map(|obj| poisson::surface_flux(&self.mesh, &phi, obj))
            .collect();

        circuit::update_potentials(
            &mut self.objects,
            &self.circuits,
            &self.capacitance.inverse,
            &images,
        );

        // Corrector at the self-consistent object potentials.
        let potentials: Vec<f64> = self.objects.iter().map(|o| o.potential).collect();
        self.phi = timing::record_stage(Stage::FieldSolve, || {
            self.solver.solve(&self.mesh, &rho, &potentials)
        })?;

        let e = poisson::electric_field(&self.mesh, &self.phi, self.exterior);

        // Half-step the first acceleration to stagger velocities.
        let dt_accel = if self.steps == 0 { 0.5 * self.dt } else { self.dt };
        let kinetic = timing::record_stage(Stage::Push, || {
            pusher::accel(&mut self.population, &e, dt_accel)
        });
        let potential = diagnostics::potential_energy(&self.population, &self.phi);

        let periodic = matches!(self.exterior, Exterior::Periodic);
        let escaped = timing::record_stage(Stage::Push, || {
            pusher::move_particles(&self.mesh, &mut self.population, self.dt, periodic)
        });

        let absorbed = timing::record_stage(Stage::Relocate, || {
            self.population.relocate(&mut self.objects)
        });

        // Imposed collected current drains charge to the external circuit.
        for obj in self.objects.iter_mut() {
            obj.add_charge(-obj.current * self.dt);
        }

        let injected = if self.injection {
            timing::record_stage(Stage::Inject, || {
                injection::inject(
                    &self.mesh,
                    &mut self.population,
                    &self.boundary,
                    self.dt,
                    &mut self.rng,
                )
            })
        } else {
            0
        };

        self.steps += 1;
        self.time += self.dt;

        let current = self
            .objects
            .iter()
            .zip(charge_before)
            .map(|(obj, q0)| (obj.charge - q0) / self.dt)
            .collect();

        Ok(StepReport {
            kinetic,
            potential,
            escaped,
            absorbed,
            injected,
            charge: self.objects.iter().map(|o| o.charge).collect(),
            potentials: self.objects.iter().map(|o| o.potential).collect(),
            current,
        })
    }
}
