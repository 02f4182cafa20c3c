use crate::math::Vec3;
use crate::neighborhood::{Neighbor, NeighborProvider};

const MIN_HALF_EXTENT: f32 = 1.0e-3;
const MIN_CELL_SIZE: f32 = 1.0e-3;
const MAX_CELLS_PER_AXIS: usize = 64;
const INVALID_INDEX: usize = usize::MAX;

/// Uniform cell grid over the cube `[-half_extent, half_extent]^3`, rebuilt
/// from each tick's snapshot. Entries outside the cube fall into the edge
/// cells, so queries stay exact, only slower, for stragglers.
pub struct NeighborGrid {
    cell_size: f32,
    half_extent: f32,
    cells_per_axis: usize,
    head: Vec<usize>,
    next: Vec<usize>,
    entries: Vec<Neighbor>,
}

impl NeighborGrid {
    pub fn new(half_extent: f32, cell_size: f32) -> Self {
        let mut grid = Self {
            cell_size: MIN_CELL_SIZE,
            half_extent: MIN_HALF_EXTENT,
            cells_per_axis: 0,
            head: Vec::new(),
            next: Vec::new(),
            entries: Vec::new(),
        };

        grid.ensure_layout(half_extent, cell_size);
        grid
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn set_cell_size(&mut self, cell_size: f32) {
        self.ensure_layout(self.half_extent, cell_size);
    }

    pub fn set_half_extent(&mut self, half_extent: f32) {
        self.ensure_layout(half_extent, self.cell_size);
    }

    pub fn rebuild(&mut self, snapshot: &[Neighbor]) {
        self.head.fill(INVALID_INDEX);
        self.entries.clear();
        self.entries.extend_from_slice(snapshot);
        self.next.clear();
        self.next.resize(snapshot.len(), INVALID_INDEX);

        for (i, entry) in self.entries.iter().enumerate() {
            let cell = self.cell_index_for_position(entry.position);
            self.next[i] = self.head[cell];
            self.head[cell] = i;
        }
    }

    /// Visit every entry within `radius` of `position`, in no particular order.
    pub fn for_each_neighbor<F>(&self, position: Vec3, radius: f32, mut callback: F)
    where
        F: FnMut(&Neighbor),
    {
        if self.entries.is_empty() {
            return;
        }

        let radius = radius.max(0.0);
        let radius_sq = radius * radius;
        let last = self.cells_per_axis as isize - 1;
        // never wider than the grid itself, so the range bounds below cannot overflow
        let cell_radius = (radius / self.cell_size)
            .ceil()
            .min(self.cells_per_axis as f32) as isize;

        let base_x = self.cell_coord(position.x);
        let base_y = self.cell_coord(position.y);
        let base_z = self.cell_coord(position.z);

        for cell_z in (base_z - cell_radius).max(0)..=(base_z + cell_radius).min(last) {
            for cell_y in (base_y - cell_radius).max(0)..=(base_y + cell_radius).min(last) {
                for cell_x in (base_x - cell_radius).max(0)..=(base_x + cell_radius).min(last) {
                    let cell = self.flat_index(cell_x as usize, cell_y as usize, cell_z as usize);
                    self.scan_cell(cell, position, radius_sq, &mut callback);
                }
            }
        }
    }

    fn ensure_layout(&mut self, half_extent: f32, cell_size: f32) {
        let half_extent = if half_extent.is_finite() {
            half_extent.max(MIN_HALF_EXTENT)
        } else {
            MIN_HALF_EXTENT
        };
        let cell_size = if cell_size.is_finite() {
            cell_size.max(MIN_CELL_SIZE)
        } else {
            MIN_CELL_SIZE
        };

        let span = 2.0 * half_extent;
        let cells_per_axis = ((span / cell_size).ceil() as usize).clamp(1, MAX_CELLS_PER_AXIS);
        // never shrink cells below the requested size, or the scan misses hits
        let cell_size = cell_size.max(span / cells_per_axis as f32);

        if cells_per_axis == self.cells_per_axis
            && cell_size == self.cell_size
            && half_extent == self.half_extent
        {
            return;
        }

        self.cell_size = cell_size;
        self.half_extent = half_extent;
        if cells_per_axis != self.cells_per_axis {
            self.cells_per_axis = cells_per_axis;
            self.head = vec![INVALID_INDEX; cells_per_axis.pow(3)];
        }

        let snapshot = std::mem::take(&mut self.entries);
        self.rebuild(&snapshot);
    }

    fn cell_coord(&self, value: f32) -> isize {
        let offset = value + self.half_extent;
        ((offset / self.cell_size).floor() as isize).clamp(0, self.cells_per_axis as isize - 1)
    }

    fn flat_index(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.cells_per_axis + y) * self.cells_per_axis + x
    }

    fn cell_index_for_position(&self, position: Vec3) -> usize {
        self.flat_index(
            self.cell_coord(position.x) as usize,
            self.cell_coord(position.y) as usize,
            self.cell_coord(position.z) as usize,
        )
    }

    fn scan_cell<F>(&self, cell: usize, position: Vec3, radius_sq: f32, callback: &mut F)
    where
        F: FnMut(&Neighbor),
    {
        let mut candidate = self.head[cell];

        while candidate != INVALID_INDEX {
            let entry = &self.entries[candidate];
            if (entry.position - position).length_squared() <= radius_sq {
                callback(entry);
            }
            candidate = self.next[candidate];
        }
    }
}

impl NeighborProvider for NeighborGrid {
    fn query(&self, position: Vec3, max_radius: f32) -> Vec<Neighbor> {
        let mut found = Vec::new();
        self.for_each_neighbor(position, max_radius, |n| found.push(*n));
        found.sort_by_key(|n| n.id);
        found
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    use super::NeighborGrid;
    use crate::math::Vec3;
    use crate::neighborhood::{Neighbor, NeighborProvider};

    fn entries(points: &[(f32, f32, f32)]) -> Vec<Neighbor> {
        points
            .iter()
            .enumerate()
            .map(|(id, &(x, y, z))| Neighbor {
                id,
                position: Vec3::new(x, y, z),
                forward: Vec3::Z,
            })
            .collect()
    }

    fn ids(found: Vec<Neighbor>) -> Vec<usize> {
        found.into_iter().map(|n| n.id).collect()
    }

    #[test]
    fn finds_neighbors_in_known_layout() {
        let snapshot = entries(&[
            (1.0, 1.0, 0.0),
            (1.5, 1.2, 0.0),
            (8.0, 8.0, 8.0),
            (2.7, 1.1, 0.5),
        ]);
        let mut grid = NeighborGrid::new(10.0, 2.0);
        grid.rebuild(&snapshot);

        assert_eq!(ids(grid.query(snapshot[0].position, 2.0)), vec![0, 1, 3]);
        assert_eq!(ids(grid.query(snapshot[2].position, 2.0)), vec![2]);
        assert_eq!(grid.len(), 4);
    }

    #[test]
    fn checks_across_cell_boundaries() {
        let snapshot = entries(&[(1.9, 1.0, -0.1), (2.1, 1.0, 0.1), (5.0, 5.0, 5.0)]);
        let mut grid = NeighborGrid::new(10.0, 2.0);
        grid.rebuild(&snapshot);

        assert_eq!(ids(grid.query(snapshot[0].position, 0.5)), vec![0, 1]);
        assert_eq!(ids(grid.query(snapshot[1].position, 0.5)), vec![0, 1]);
    }

    #[test]
    fn stragglers_outside_the_cube_are_still_found() {
        let snapshot = entries(&[(30.0, 0.0, 0.0), (34.0, 0.0, 0.0), (9.0, 0.0, 0.0)]);
        let mut grid = NeighborGrid::new(10.0, 3.0);
        grid.rebuild(&snapshot);

        assert_eq!(ids(grid.query(Vec3::new(32.0, 0.0, 0.0), 3.0)), vec![0, 1]);
    }

    #[test]
    fn matches_brute_force_scan() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let points: Vec<(f32, f32, f32)> = (0..300)
            .map(|_| {
                (
                    rng.gen_range(-60.0..60.0),
                    rng.gen_range(-60.0..60.0),
                    rng.gen_range(-60.0..60.0),
                )
            })
            .collect();
        let snapshot = entries(&points);

        let mut grid = NeighborGrid::new(50.0, 9.0);
        grid.rebuild(&snapshot);

        for probe in snapshot.iter().take(40) {
            let expected = ids(snapshot[..].query(probe.position, 9.0));
            assert_eq!(ids(grid.query(probe.position, 9.0)), expected);
        }
    }

    #[test]
    fn unbounded_radius_returns_everything() {
        let snapshot = entries(&[(1.0, 1.0, 1.0), (-9.5, 8.0, 3.0), (40.0, -40.0, 0.0)]);
        let mut grid = NeighborGrid::new(10.0, 2.0);
        grid.rebuild(&snapshot);

        let everyone = vec![0, 1, 2];
        assert_eq!(ids(grid.query(Vec3::new(1.0, 1.0, 1.0), f32::INFINITY)), everyone);
        assert_eq!(ids(grid.query(Vec3::ZERO, f32::MAX)), everyone);
    }

    #[test]
    fn resizing_keeps_entries() {
        let snapshot = entries(&[(0.0, 0.0, 0.0), (4.0, 0.0, 0.0)]);
        let mut grid = NeighborGrid::new(10.0, 1.0);
        grid.rebuild(&snapshot);
        grid.set_cell_size(5.0);

        assert!(grid.cell_size() >= 5.0);
        assert_eq!(ids(grid.query(Vec3::ZERO, 5.0)), vec![0, 1]);
    }
}
