use glam::DVec3;

/// The complete computational grid.
pub struct Mesh {
    pub cells: Vec<Cell>,
    pub faces: Vec<Face>,
    pub nodes: Vec<Node>,
    /// Lower corner of the bounding box.
    pub origin: [f64; 3],
    pub width: [f64; 3],
    /// Flat quasi-2D mesh: one cell thick in z, the z-cap faces are not walls.
    pub slab: bool,
}

/// A single control volume (a Voronoi cell).
pub struct Cell {
    pub id: usize,
    pub volume: f64,
    pub centroid: [f64; 3],
    pub face_ids: Vec<usize>,
    pub neighbor_ids: Vec<usize>,
}

/// An interface between two cells.
pub struct Face {
    pub area: f64,
    pub normal: [f64; 3],
    /// Tuple of (cell1_id, optional cell2_id). `None` indicates a boundary face.
    /// The normal points from the first cell towards the second (outward on the
    /// boundary).
    pub neighbor_cell_ids: (usize, Option<usize>),
    pub centroid: [f64; 3],
}

pub struct Node {
    pub position: [f64; 3],
}

impl Mesh {
    /// Generator point of a Voronoi cell. A point belongs to the cell whose
    /// generator it is nearest to.
    #[inline]
    pub fn generator(&self, cell: usize) -> DVec3 {
        DVec3::from_array(self.nodes[cell].position)
    }

    /// Whether a point lies inside the bounding box of the domain.
    pub fn contains(&self, p: DVec3) -> bool {
        (0..3).all(|i| {
            let x = p[i];
            x >= self.origin[i] && x <= self.origin[i] + self.width[i]
        })
    }

    /// Locate the cell containing `p` by walking the cell adjacency graph from
    /// `hint`, descending towards the nearest generator. For a Voronoi diagram
    /// this greedy walk cannot get stuck in a local minimum.
    pub fn locate_from(&self, hint: usize, p: DVec3) -> Option<usize> {
        if !self.contains(p) {
            return None;
        }
        let mut current = hint;
        let mut best = p.distance_squared(self.generator(current));
        loop {
            let mut moved = false;
            for &nb in &self.cells[current].neighbor_ids {
                let d = p.distance_squared(self.generator(nb));
                if d < best {
                    best = d;
                    current = nb;
                    moved = true;
                }
            }
            if !moved {
                return Some(current);
            }
        }
    }

    /// Brute-force point location; used for initial loading when no hint exists.
    pub fn locate_nearest(&self, p: DVec3) -> Option<usize> {
        if !self.contains(p) {
            return None;
        }
        self.cells
            .iter()
            .map(|c| (c.id, p.distance_squared(self.generator(c.id))))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// A boundary face is a wall when it can carry exterior boundary data.
    /// On slab meshes the z-cap faces only close the extruded direction.
    pub fn is_wall(&self, face: &Face) -> bool {
        face.neighbor_cell_ids.1.is_none() && (!self.slab || face.normal[2].abs() < 0.5)
    }

    /// Indices of all wall faces.
    pub fn wall_faces(&self) -> Vec<usize> {
        self.faces
            .iter()
            .enumerate()
            .filter(|(_, f)| self.is_wall(f))
            .map(|(i, _)| i)
            .collect()
    }

    /// Wrap a position back into the box along the periodic directions.
    pub fn wrap(&self, p: &mut DVec3) {
        let dims = if self.slab { 2 } else { 3 };
        for i in 0..dims {
            let lo = self.origin[i];
            let w = self.width[i];
            p[i] = lo + (p[i] - lo).rem_euclid(w);
        }
    }

    pub fn total_volume(&self) -> f64 {
        self.cells.iter().map(|c| c.volume).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discretization::generator::{create_flat_3d_mesh, create_regular_2d_grid};

    #[test]
    fn locate_agrees_with_nearest_generator() {
        let points = create_regular_2d_grid([1.0, 1.0], 8, 8);
        let mesh = create_flat_3d_mesh(&points, [1.0, 1.0], 0.1);

        let p = DVec3::new(0.31 - 0.5, -0.22, 0.0);
        let walked = mesh.locate_from(0, p).expect("point is inside the box");
        let nearest = mesh.locate_nearest(p).unwrap();
        assert_eq!(walked, nearest);

        assert!(mesh.locate_from(0, DVec3::new(2.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn wrap_keeps_points_inside() {
        let points = create_regular_2d_grid([1.0, 1.0], 4, 4);
        let mesh = create_flat_3d_mesh(&points, [1.0, 1.0], 0.1);

        let mut p = DVec3::new(0.7, -1.3, 0.0);
        mesh.wrap(&mut p);
        assert!(mesh.contains(p));
    }
}
