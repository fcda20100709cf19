use crate::particles::population::Population;
use crate::processing::csv_writer;
use crate::simulation::StepReport;
use nalgebra::DVector;
use std::io;
use std::path::Path;

/// Instantaneous kinetic energy `1/2 m v^2` summed over all particles.
///
/// During stepping prefer the leapfrog-centered value reported by the step;
/// this one is offset by half a step but needs no field.
pub fn kinetic_energy(pop: &Population) -> f64 {
    pop.cells
        .iter()
        .flatten()
        .map(|p| 0.5 * p.m * p.vel.length_squared())
        .sum()
}

/// Electrostatic potential energy `1/2 sum q phi`, evaluating the potential
/// at each particle's cell.
pub fn potential_energy(pop: &Population, phi: &DVector<f64>) -> f64 {
    let mut energy = 0.0;
    for (c, bucket) in pop.cells.iter().enumerate() {
        let cell_charge: f64 = bucket.iter().map(|p| p.q).sum();
        energy += 0.5 * cell_charge * phi[c];
    }
    energy
}

/// Per-step time series of the run diagnostics, accumulated in memory and
/// flushed to a single CSV at the end.
pub struct History {
    time: Vec<f64>,
    positives: Vec<f64>,
    negatives: Vec<f64>,
    kinetic: Vec<f64>,
    potential: Vec<f64>,
    escaped: Vec<f64>,
    injected: Vec<f64>,
    object_charge: Vec<Vec<f64>>,
    object_potential: Vec<Vec<f64>>,
    object_current: Vec<Vec<f64>>,
}

impl History {
    pub fn new(num_objects: usize) -> Self {
        Self {
            time: Vec::new(),
            positives: Vec::new(),
            negatives: Vec::new(),
            kinetic: Vec::new(),
            potential: Vec::new(),
            escaped: Vec::new(),
            injected: Vec::new(),
            object_charge: vec![Vec::new(); num_objects],
            object_potential: vec![Vec::new(); num_objects],
            object_current: vec![Vec::new(); num_objects],
        }
    }

    pub fn record(&mut self, time: f64, pop: &Population, report: &StepReport) {
        self.time.push(time);
        self.positives.push(pop.num_positives() as f64);
        self.negatives.push(pop.num_negatives() as f64);
        self.kinetic.push(report.kinetic);
        self.potential.push(report.potential);
        self.escaped.push(report.escaped.count as f64);
        self.injected.push(report.injected as f64);
        for i in 0..self.object_charge.len() {
            self.object_charge[i].push(report.charge[i]);
            self.object_potential[i].push(report.potentials[i]);
            self.object_current[i].push(report.current[i]);
        }
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut headers = vec![
            "t".to_string(),
            "n_positive".to_string(),
            "n_negative".to_string(),
            "kinetic_energy".to_string(),
            "potential_energy".to_string(),
            "escaped".to_string(),
            "injected".to_string(),
        ];
        let mut columns = vec![
            self.time.clone(),
            self.positives.clone(),
            self.negatives.clone(),
            self.kinetic.clone(),
            self.potential.clone(),
            self.escaped.clone(),
            self.injected.clone(),
        ];
        for i in 0..self.object_charge.len() {
            headers.push(format!("object{}_charge", i));
            headers.push(format!("object{}_potential", i));
            headers.push(format!("object{}_current", i));
            columns.push(self.object_charge[i].clone());
            columns.push(self.object_potential[i].clone());
            columns.push(self.object_current[i].clone());
        }

        let header_refs: Vec<&str> = headers.iter().map(|h| h.as_str()).collect();
        csv_writer::write_csv(path, &header_refs, &columns)
    }
}
