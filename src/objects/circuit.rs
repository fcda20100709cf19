use super::ConfigError;
use super::object::Object;
use nalgebra::{DMatrix, DVector};

/// A group of conductors sharing a floating reference, with fixed potential
/// offsets between members. Derived once from the inverse capacitance
/// matrix; evaluated cheaply every step.
pub struct Circuit {
    /// Object indices; offsets are relative to `members[0]`.
    pub members: Vec<usize>,
    /// Fixed potential offsets, one per member beyond the first.
    pub bias: Vec<f64>,
    /// Constant member-charge offset induced by the bias potentials.
    charge_shift: Vec<f64>,
    /// Maps the vector of per-circuit total charges to member charges.
    charge_map: DMatrix<f64>,
}

/// Assemble and invert the bias constraint system over all circuits.
///
/// With `D` the inverse capacitance matrix, the system maps the object
/// charge vector `q` to the stacked constraints: one row
/// `D[m_j,:] - D[m_0,:]` per bias offset (potential differences), then one
/// member-indicator row per circuit (total circuit charge). Its inverse
/// therefore maps `[bias offsets; circuit charges]` back to `q`.
pub fn bias_matrix(inv_cap: &DMatrix<f64>, groups: &[Vec<usize>]) -> Result<DMatrix<f64>, ConfigError> {
    let n = inv_cap.nrows();
    let num_groups = groups.len();
    let mut m = DMatrix::zeros(n, n);

    let mut s = 0;
    for (i, group) in groups.iter().enumerate() {
        let charge_row = n - num_groups + i;
        for &mj in group {
            m[(charge_row, mj)] = 1.0;
        }
        for j in 1..group.len() {
            for col in 0..n {
                m[(s, col)] = inv_cap[(group[j], col)] - inv_cap[(group[0], col)];
            }
            s += 1;
        }
    }
    debug_assert_eq!(s, n - num_groups);

    m.try_inverse().ok_or(ConfigError::SingularBias)
}

/// Build the circuits for a partition of the objects. Objects not named in
/// any group are wrapped as unbiased single-member circuits, which
/// degenerate to direct use of the inverse-capacitance diagonal.
pub fn build_circuits(
    inv_cap: &DMatrix<f64>,
    groups: Vec<Vec<usize>>,
    biases: Vec<Vec<f64>>,
) -> Result<Vec<Circuit>, ConfigError> {
    let n = inv_cap.nrows();

    let mut groups = groups;
    let mut biases = biases;
    let mut seen = vec![false; n];
    for (gi, group) in groups.iter().enumerate() {
        for &m in group {
            if m >= n {
                return Err(ConfigError::UnknownObject(m));
            }
            if seen[m] {
                return Err(ConfigError::SharedObject(m));
            }
            seen[m] = true;
        }
        if biases[gi].len() + 1 != group.len() {
            return Err(ConfigError::BiasCountMismatch {
                circuit: gi,
                members: group.len(),
                biases: biases[gi].len(),
            });
        }
    }
    for (m, covered) in seen.into_iter().enumerate() {
        if !covered {
            groups.push(vec![m]);
            biases.push(Vec::new());
        }
    }

    let inv_bias = bias_matrix(inv_cap, &groups)?;

    let num_bias = n - groups.len();
    let bias_flat: Vec<f64> = biases.iter().flatten().copied().collect();
    debug_assert_eq!(bias_flat.len(), num_bias);

    // Charge offset from the bias potentials alone.
    let mut shift_full = DVector::zeros(n);
    for r in 0..n {
        for (c, &b) in bias_flat.iter().enumerate() {
            shift_full[r] += inv_bias[(r, c)] * b;
        }
    }

    let circuits = groups
        .into_iter()
        .zip(biases)
        .map(|(members, bias)| {
            let charge_shift = members.iter().map(|&m| shift_full[m]).collect();
            let mut charge_map = DMatrix::zeros(members.len(), n - num_bias);
            for (r, &m) in members.iter().enumerate() {
                for c in 0..n - num_bias {
                    charge_map[(r, c)] = inv_bias[(m, num_bias + c)];
                }
            }
            Circuit {
                members,
                bias,
                charge_shift,
                charge_map,
            }
        })
        .collect();

    Ok(circuits)
}

impl Circuit {
    /// Net circuit charge: accumulated member charges less their image
    /// charges from the predictor solve.
    pub fn total_charge(&self, objects: &[Object], images: &[f64]) -> f64 {
        self.members
            .iter()
            .map(|&m| objects[m].charge - images[m])
            .sum()
    }
}

/// One corrector evaluation: redistribute circuit charge among members and
/// set every object's self-consistent potential for the next solve.
///
/// Writes `objects[m].charge` so that each circuit's charge sum is
/// conserved, and `objects[m].potential = (D (q - image))[m]`, which makes
/// the bias offsets hold exactly.
pub fn update_potentials(
    objects: &mut [Object],
    circuits: &[Circuit],
    inv_cap: &DMatrix<f64>,
    images: &[f64],
) {
    let n = objects.len();
    let totals = DVector::from_iterator(
        circuits.len(),
        circuits.iter().map(|c| c.total_charge(objects, images)),
    );

    let mut q_full = DVector::zeros(n);
    for circuit in circuits {
        #[cfg(debug_assertions)]
        let before: f64 = circuit.members.iter().map(|&m| objects[m].charge).sum();

        for (r, &m) in circuit.members.iter().enumerate() {
            let mut q = circuit.charge_shift[r];
            for c in 0..totals.len() {
                q += circuit.charge_map[(r, c)] * totals[c];
            }
            q_full[m] = q;
            objects[m].charge = q + images[m];
        }

        #[cfg(debug_assertions)]
        {
            let after: f64 = circuit.members.iter().map(|&m| objects[m].charge).sum();
            debug_assert!(
                (after - before).abs() <= 1e-9 * (1.0 + before.abs()),
                "circuit charge not conserved: {before} -> {after}"
            );
        }
    }

    let phi = inv_cap * &q_full;
    for (i, obj) in objects.iter_mut().enumerate() {
        obj.set_potential(phi[i]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn dummy_objects(charges: &[f64]) -> Vec<Object> {
        charges
            .iter()
            .enumerate()
            .map(|(id, &q)| Object {
                id,
                name: format!("obj{id}"),
                cells: Vec::new(),
                boundary: Vec::new(),
                charge: q,
                potential: 0.0,
                current: 0.0,
            })
            .collect()
    }

    #[test]
    fn biased_pair_holds_offset_and_conserves_charge() {
        // Any symmetric positive definite inverse capacitance will do.
        let inv_cap = DMatrix::from_row_slice(2, 2, &[2.0, 0.3, 0.3, 1.5]);
        let bias = 0.4;

        let circuits = build_circuits(&inv_cap, vec![vec![0, 1]], vec![vec![bias]]).unwrap();
        let mut objects = dummy_objects(&[1.7, -0.6]);
        let images = [0.05, -0.02];
        let total_before = objects[0].charge + objects[1].charge;

        update_potentials(&mut objects, &circuits, &inv_cap, &images);

        assert_relative_eq!(
            objects[1].potential - objects[0].potential,
            bias,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            objects[0].charge + objects[1].charge,
            total_before,
            epsilon = 1e-12
        );
    }

    #[test]
    fn single_object_degenerates_to_diagonal() {
        let d00 = 3.2;
        let inv_cap = DMatrix::from_row_slice(1, 1, &[d00]);
        let circuits = build_circuits(&inv_cap, Vec::new(), Vec::new()).unwrap();
        assert_eq!(circuits.len(), 1);

        let mut objects = dummy_objects(&[2.5]);
        update_potentials(&mut objects, &circuits, &inv_cap, &[0.0]);
        assert_relative_eq!(objects[0].potential, 2.5 * d00, epsilon = 1e-12);
    }

    #[test]
    fn potentials_are_assigned_by_position_not_id() {
        let inv_cap = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 5.0]);
        let circuits = build_circuits(&inv_cap, Vec::new(), Vec::new()).unwrap();

        let mut objects = dummy_objects(&[1.0, 1.0]);
        objects[0].id = 7;
        objects[1].id = 3;

        update_potentials(&mut objects, &circuits, &inv_cap, &[0.0, 0.0]);
        assert_relative_eq!(objects[0].potential, 2.0, epsilon = 1e-12);
        assert_relative_eq!(objects[1].potential, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn unknown_member_is_rejected() {
        let inv_cap = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 1.0]);
        let err = build_circuits(&inv_cap, vec![vec![0, 5]], vec![vec![0.0]]);
        assert!(matches!(err, Err(ConfigError::UnknownObject(5))));
    }
}
