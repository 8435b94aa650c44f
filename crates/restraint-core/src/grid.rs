use rand::Rng;

/// Offsets for the eight grid directions, laid out around a cell `*` as:
///
/// ```text
///   7 2 4
///   0 * 1
///   5 3 6
/// ```
///
/// The first 2 entries form a 1-D neighborhood, the first 4 a von Neumann
/// neighborhood, the first 6 a hex-like one, and all 8 a Moore neighborhood.
pub const DIRECTIONS: [(i64, i64); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (1, -1),
    (-1, 1),
    (1, 1),
    (-1, -1),
];

/// Square grid of power-of-two side with flat-id addressing.
///
/// Ids map as `id = x + y * side`, so with a power-of-two side the x
/// coordinate is a mask and the y coordinate a shift.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridTopology {
    side: usize,
    mask: usize,
    log2_side: u32,
}

impl GridTopology {
    /// Topology for a `side x side` grid. `side` must be a power of two.
    pub fn new(side: usize) -> Self {
        assert!(side.is_power_of_two(), "grid side must be a power of two");
        Self {
            side,
            mask: side - 1,
            log2_side: side.trailing_zeros(),
        }
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn size(&self) -> usize {
        self.side * self.side
    }

    pub fn to_pos(&self, x: usize, y: usize) -> usize {
        x + y * self.side
    }

    pub fn x_of(&self, pos: usize) -> usize {
        pos & self.mask
    }

    pub fn y_of(&self, pos: usize) -> usize {
        pos >> self.log2_side
    }

    pub fn middle(&self) -> usize {
        self.to_pos(self.side / 2, self.side / 2)
    }

    /// The flat id one step from `pos` in direction `dir`, or `None` when
    /// the step leaves the grid.
    pub fn step(&self, pos: usize, dir: usize) -> Option<usize> {
        let (dx, dy) = DIRECTIONS[dir];
        let x = self.x_of(pos) as i64 + dx;
        let y = self.y_of(pos) as i64 + dy;
        if x < 0 || y < 0 || x >= self.side as i64 || y >= self.side as i64 {
            return None;
        }
        Some(self.to_pos(x as usize, y as usize))
    }

    /// Whether `neighbors` means "anywhere on the grid" rather than a bounded
    /// directional neighborhood.
    pub fn is_well_mixed(neighbors: usize) -> bool {
        neighbors == 0 || neighbors > 8
    }

    /// Draw a reproduction target for `pos`.
    ///
    /// Bounded neighborhoods redraw until the step stays on the grid.
    /// Well-mixed draws any site, the source itself included.
    pub fn random_neighbor<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        pos: usize,
        neighbors: usize,
    ) -> usize {
        if Self::is_well_mixed(neighbors) {
            return rng.random_range(0..self.size());
        }
        loop {
            let dir = rng.random_range(0..neighbors);
            if let Some(next) = self.step(pos, dir) {
                return next;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::create_rng;

    #[test]
    fn flat_id_round_trips_through_coordinates() {
        let grid = GridTopology::new(8);
        for pos in 0..grid.size() {
            assert_eq!(grid.to_pos(grid.x_of(pos), grid.y_of(pos)), pos);
        }
    }

    #[test]
    fn direction_table_matches_canonical_layout() {
        let grid = GridTopology::new(8);
        let pos = grid.to_pos(3, 3);
        let expected = [
            (2, 3), // 0: left
            (4, 3), // 1: right
            (3, 2), // 2: up
            (3, 4), // 3: down
            (4, 2), // 4: upper right
            (2, 4), // 5: lower left
            (4, 4), // 6: lower right
            (2, 2), // 7: upper left
        ];
        for (dir, &(x, y)) in expected.iter().enumerate() {
            assert_eq!(grid.step(pos, dir), Some(grid.to_pos(x, y)), "dir {dir}");
        }
    }

    #[test]
    fn step_off_the_grid_is_none() {
        let grid = GridTopology::new(4);
        let corner = grid.to_pos(0, 0);
        assert_eq!(grid.step(corner, 0), None); // left
        assert_eq!(grid.step(corner, 2), None); // up
        assert_eq!(grid.step(corner, 7), None); // upper left
        assert_eq!(grid.step(corner, 1), Some(grid.to_pos(1, 0)));
    }

    #[test]
    fn von_neumann_neighbors_are_orthogonally_adjacent() {
        let grid = GridTopology::new(8);
        let mut rng = create_rng(5);
        let pos = grid.to_pos(4, 4);
        for _ in 0..200 {
            let next = grid.random_neighbor(&mut rng, pos, 4);
            let dx = grid.x_of(next) as i64 - 4;
            let dy = grid.y_of(next) as i64 - 4;
            assert_eq!(dx.abs() + dy.abs(), 1, "got offset ({dx},{dy})");
        }
    }

    #[test]
    fn moore_neighbors_are_adjacent_but_never_self() {
        let grid = GridTopology::new(8);
        let mut rng = create_rng(6);
        let pos = grid.to_pos(4, 4);
        for _ in 0..200 {
            let next = grid.random_neighbor(&mut rng, pos, 8);
            let dx = grid.x_of(next) as i64 - 4;
            let dy = grid.y_of(next) as i64 - 4;
            assert_eq!(dx.abs().max(dy.abs()), 1, "got offset ({dx},{dy})");
        }
    }

    #[test]
    fn bounded_draws_from_a_corner_stay_on_grid() {
        let grid = GridTopology::new(4);
        let mut rng = create_rng(7);
        let corner = grid.to_pos(0, 0);
        for _ in 0..200 {
            let next = grid.random_neighbor(&mut rng, corner, 8);
            assert!(next < grid.size());
            assert_ne!(next, corner);
        }
    }

    #[test]
    fn well_mixed_covers_the_grid_and_may_return_self() {
        let grid = GridTopology::new(4);
        let mut rng = create_rng(8);
        let pos = grid.to_pos(1, 1);
        let mut seen = vec![false; grid.size()];
        for _ in 0..2000 {
            seen[grid.random_neighbor(&mut rng, pos, 0)] = true;
        }
        assert!(seen.iter().all(|&s| s), "all sites reachable, self included");
    }
}
