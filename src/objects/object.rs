use super::ConfigError;
use crate::discretization::mesh::Mesh;
use glam::DVec3;

/// A face on the surface of a conductor, between an interior (conductor)
/// cell and an exterior (plasma) cell.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceFace {
    pub face: usize,
    pub inner: usize,
    pub outer: usize,
}

/// An immersed conductor: a set of mesh cells held at a common potential,
/// accumulating charge from particle absorption, imposed current and
/// circuit redistribution.
pub struct Object {
    pub id: usize,
    pub name: String,
    /// Sorted cell indices covered by the conductor.
    pub cells: Vec<usize>,
    pub boundary: Vec<SurfaceFace>,
    pub charge: f64,
    pub potential: f64,
    /// Externally imposed collected current; `-current * dt` is added to the
    /// charge every step.
    pub current: f64,
}

impl Object {
    /// Build a conductor from a geometric region predicate evaluated at the
    /// cell generators.
    pub fn from_region(
        mesh: &Mesh,
        id: usize,
        name: impl Into<String>,
        region: impl Fn(DVec3) -> bool,
    ) -> Result<Self, ConfigError> {
        let mut inside = vec![false; mesh.cells.len()];
        let mut cells = Vec::new();
        for c in 0..mesh.cells.len() {
            if region(mesh.generator(c)) {
                inside[c] = true;
                cells.push(c);
            }
        }
        if cells.is_empty() {
            return Err(ConfigError::EmptyObject(id));
        }

        let mut boundary = Vec::new();
        for (f, face) in mesh.faces.iter().enumerate() {
            if let (k, Some(l)) = face.neighbor_cell_ids {
                match (inside[k], inside[l]) {
                    (true, false) => boundary.push(SurfaceFace {
                        face: f,
                        inner: k,
                        outer: l,
                    }),
                    (false, true) => boundary.push(SurfaceFace {
                        face: f,
                        inner: l,
                        outer: k,
                    }),
                    _ => {}
                }
            }
        }

        Ok(Self {
            id,
            name: name.into(),
            cells,
            boundary,
            charge: 0.0,
            potential: 0.0,
            current: 0.0,
        })
    }

    pub fn add_charge(&mut self, dq: f64) {
        self.charge += dq;
    }

    pub fn set_potential(&mut self, phi: f64) {
        self.potential = phi;
    }
}

/// Zero all object potentials ahead of the predictor solve.
pub fn reset_potentials(objects: &mut [Object]) {
    for obj in objects {
        obj.potential = 0.0;
    }
}

/// Two conductors covering the same cell is a degenerate geometry.
pub fn check_overlap(objects: &[Object]) -> Result<(), ConfigError> {
    for (i, a) in objects.iter().enumerate() {
        for b in objects.iter().skip(i + 1) {
            if a.cells.iter().any(|c| b.cells.binary_search(c).is_ok()) {
                return Err(ConfigError::OverlappingObjects(a.id, b.id));
            }
        }
    }
    Ok(())
}
