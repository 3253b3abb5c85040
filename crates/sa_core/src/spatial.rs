//! Uniform-grid spatial index.
//!
//! The battlefield bounding box is split into `N x N` chunks. Each entry is
//! stored in every chunk its bounding circle touches, so area and ray queries
//! only look at the chunks they cross. Entries spanning several chunks are
//! reported once per query thanks to a per-record search stamp.
//!
//! The grid is rebuilt from scratch every tick; it never tracks movement.

use std::cell::Cell;

use crate::math::{closest_on_segment, Vec2};
use crate::units::{Angle, Distance};

/// Smallest chunk edge, keeps degenerate bounds from dividing by zero.
const MIN_CHUNK_SIZE: f64 = 1e-3;

/// Axis-aligned rectangle in world cells.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    /// Lower-left corner.
    pub min: Vec2,
    /// Upper-right corner.
    pub max: Vec2,
}

impl Bounds {
    /// Box covering a circle.
    #[must_use]
    pub fn around(center: Vec2, radius: f64) -> Self {
        Self {
            min: Vec2::new(center.x - radius, center.y - radius),
            max: Vec2::new(center.x + radius, center.y + radius),
        }
    }

    /// Smallest box containing both.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            min: Vec2::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Vec2::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// Grow every edge by `margin`.
    #[must_use]
    pub fn expand(self, margin: f64) -> Self {
        Self {
            min: Vec2::new(self.min.x - margin, self.min.y - margin),
            max: Vec2::new(self.max.x + margin, self.max.y + margin),
        }
    }

    /// Horizontal extent.
    #[must_use]
    pub fn width(self) -> f64 {
        self.max.x - self.min.x
    }

    /// Vertical extent.
    #[must_use]
    pub fn height(self) -> f64 {
        self.max.y - self.min.y
    }
}

#[derive(Debug)]
struct Record<K> {
    key: K,
    center: Vec2,
    radius: f64,
    last_search: Cell<u64>,
}

/// Spatial index over keys with a bounding circle.
#[derive(Debug)]
pub struct UniformGrid<K> {
    side: usize,
    chunks: Vec<Vec<u32>>,
    records: Vec<Record<K>>,
    origin: Vec2,
    chunk_width: f64,
    chunk_height: f64,
    search_id: u64,
}

impl<K: Copy> UniformGrid<K> {
    /// Create an empty grid with `side * side` chunks.
    #[must_use]
    pub fn new(side: usize) -> Self {
        let side = side.max(1);
        Self {
            side,
            chunks: vec![Vec::new(); side * side],
            records: Vec::new(),
            origin: Vec2::ZERO,
            chunk_width: MIN_CHUNK_SIZE,
            chunk_height: MIN_CHUNK_SIZE,
            search_id: 0,
        }
    }

    /// Chunks per side.
    #[must_use]
    pub fn side(&self) -> usize {
        self.side
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the grid holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop all entries and re-fit the chunks to `bounds`.
    pub fn reset(&mut self, bounds: Bounds) {
        for chunk in &mut self.chunks {
            chunk.clear();
        }
        self.records.clear();
        self.origin = bounds.min;
        let side = self.side as f64;
        self.chunk_width = (bounds.width() / side).max(MIN_CHUNK_SIZE);
        self.chunk_height = (bounds.height() / side).max(MIN_CHUNK_SIZE);
    }

    /// Insert `key` with a bounding circle. Entries outside the bounds land in
    /// the border chunks.
    pub fn add(&mut self, key: K, center: Vec2, radius: Distance) {
        let radius = radius.as_cells().max(0.0);
        let index = u32::try_from(self.records.len()).unwrap_or(u32::MAX);
        let (min_x, min_y, max_x, max_y) = self.chunk_span(center, radius);
        for cx in min_x..=max_x {
            for cy in min_y..=max_y {
                self.chunks[cy * self.side + cx].push(index);
            }
        }
        self.records.push(Record {
            key,
            center,
            radius,
            last_search: Cell::new(0),
        });
    }

    /// Entries whose circle intersects the circle at `point`.
    pub fn query_radius(&mut self, point: Vec2, radius: Distance) -> impl Iterator<Item = K> + '_ {
        let radius = radius.as_cells().max(0.0);
        let stamp = self.next_search();
        let this: &Self = self;
        let (min_x, min_y, max_x, max_y) = this.chunk_span(point, radius);
        let side = this.side;
        (min_y..=max_y)
            .flat_map(move |cy| (min_x..=max_x).map(move |cx| cy * side + cx))
            .flat_map(move |chunk| this.chunks[chunk].iter())
            .filter_map(move |&index| {
                let record = &this.records[index as usize];
                let reach = radius + record.radius;
                (record.last_search.get() != stamp
                    && record.center.distance_squared(point) <= reach * reach)
                    .then(|| {
                        record.last_search.set(stamp);
                        record.key
                    })
            })
    }

    /// Entries whose circle contains `point`.
    pub fn query_point(&mut self, point: Vec2) -> impl Iterator<Item = K> + '_ {
        self.query_radius(point, Distance::ZERO)
    }

    /// Entries whose circle the segment from `origin` along `direction` for
    /// `length` passes through. Chunks are visited in ray order.
    pub fn query_ray(
        &mut self,
        origin: Vec2,
        direction: Angle,
        length: Distance,
    ) -> impl Iterator<Item = K> + '_ {
        let length = length.as_cells().max(0.0);
        let end = origin + Vec2::from_angle(direction) * length;
        let stamp = self.next_search();
        let this: &Self = self;
        let visited = this.ray_chunks(origin, end, length);
        visited
            .into_iter()
            .flat_map(move |chunk| this.chunks[chunk].iter())
            .filter_map(move |&index| {
                let record = &this.records[index as usize];
                if record.last_search.get() == stamp {
                    return None;
                }
                let (_, miss) = closest_on_segment(origin, end, record.center);
                (miss <= record.radius).then(|| {
                    record.last_search.set(stamp);
                    record.key
                })
            })
    }

    fn next_search(&mut self) -> u64 {
        self.search_id += 1;
        self.search_id
    }

    fn chunk_coord(&self, value: f64, origin: f64, size: f64) -> usize {
        let scaled = (value - origin) / size;
        if scaled.is_nan() || scaled <= 0.0 {
            0
        } else {
            (scaled as usize).min(self.side - 1)
        }
    }

    fn chunk_of(&self, point: Vec2) -> (usize, usize) {
        (
            self.chunk_coord(point.x, self.origin.x, self.chunk_width),
            self.chunk_coord(point.y, self.origin.y, self.chunk_height),
        )
    }

    fn chunk_span(&self, center: Vec2, radius: f64) -> (usize, usize, usize, usize) {
        let (min_x, min_y) = self.chunk_of(Vec2::new(center.x - radius, center.y - radius));
        let (max_x, max_y) = self.chunk_of(Vec2::new(center.x + radius, center.y + radius));
        (min_x, min_y, max_x, max_y)
    }

    /// Chunks crossed by a segment, stepping one chunk along the dominant
    /// axis at a time. When both coordinates change in one step the two
    /// corner chunks are visited as well, so no crossed chunk is skipped.
    fn ray_chunks(&self, origin: Vec2, end: Vec2, length: f64) -> Vec<usize> {
        let delta = end - origin;
        let step = if delta.x.abs() >= delta.y.abs() {
            if delta.x.abs() > 0.0 {
                self.chunk_width * length / delta.x.abs()
            } else {
                length
            }
        } else {
            self.chunk_height * length / delta.y.abs()
        };
        let step = step.max(MIN_CHUNK_SIZE);

        let mut visited: Vec<usize> = Vec::new();
        let mut seen = vec![false; self.side * self.side];
        let mut push = |chunk: (usize, usize), visited: &mut Vec<usize>| {
            let index = chunk.1 * self.side + chunk.0;
            if !seen[index] {
                seen[index] = true;
                visited.push(index);
            }
        };

        let mut previous: Option<(usize, usize)> = None;
        let mut travelled = 0.0_f64;
        loop {
            let t = travelled.min(length);
            let fraction = if length > 0.0 { t / length } else { 0.0 };
            let current = self.chunk_of(origin + delta * fraction);
            if let Some(prev) = previous {
                if prev.0 != current.0 && prev.1 != current.1 {
                    push((current.0, prev.1), &mut visited);
                    push((prev.0, current.1), &mut visited);
                }
            }
            push(current, &mut visited);
            previous = Some(current);
            if t >= length {
                break;
            }
            travelled += step;
        }
        visited
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::UnitExt;

    fn grid_100() -> UniformGrid<u32> {
        let mut grid = UniformGrid::new(10);
        grid.reset(Bounds {
            min: Vec2::ZERO,
            max: Vec2::new(100.0, 100.0),
        });
        grid
    }

    #[test]
    fn test_radius_query_finds_nearby_only() {
        let mut grid = grid_100();
        grid.add(1, Vec2::new(10.0, 10.0), 1.cells());
        grid.add(2, Vec2::new(90.0, 90.0), 1.cells());
        let found: Vec<u32> = grid.query_radius(Vec2::new(12.0, 10.0), 2.cells()).collect();
        assert_eq!(found, vec![1]);
    }

    #[test]
    fn test_large_entry_reported_once() {
        let mut grid = grid_100();
        grid.add(7, Vec2::new(50.0, 50.0), 30.cells());
        assert!(grid.len() == 1);
        let found: Vec<u32> = grid.query_radius(Vec2::new(50.0, 50.0), 40.cells()).collect();
        assert_eq!(found, vec![7]);
        // A second query sees it again.
        let again: Vec<u32> = grid.query_point(Vec2::new(45.0, 45.0)).collect();
        assert_eq!(again, vec![7]);
    }

    #[test]
    fn test_out_of_bounds_lands_in_border_chunk() {
        let mut grid = grid_100();
        grid.add(3, Vec2::new(-20.0, 150.0), 1.cells());
        let found: Vec<u32> = grid.query_point(Vec2::new(-20.0, 150.0)).collect();
        assert_eq!(found, vec![3]);
    }

    #[test]
    fn test_ray_query_hits_along_diagonal() {
        let mut grid = grid_100();
        grid.add(1, Vec2::new(30.0, 30.0), 1.cells());
        grid.add(2, Vec2::new(30.0, 70.0), 1.cells());
        grid.add(3, Vec2::new(80.0, 80.0), 1.cells());
        let found: Vec<u32> = grid
            .query_ray(Vec2::new(5.0, 5.0), Angle::degrees(45.0), 70.cells())
            .collect();
        assert_eq!(found, vec![1]);
    }

    #[test]
    fn test_ray_query_respects_length() {
        let mut grid = grid_100();
        grid.add(1, Vec2::new(60.0, 5.0), 1.cells());
        let short: Vec<u32> = grid
            .query_ray(Vec2::new(5.0, 5.0), Angle::ZERO, 20.cells())
            .collect();
        assert!(short.is_empty());
        let long: Vec<u32> = grid
            .query_ray(Vec2::new(5.0, 5.0), Angle::ZERO, 60.cells())
            .collect();
        assert_eq!(long, vec![1]);
    }

    #[test]
    fn test_ray_through_chunk_corner() {
        let mut grid = grid_100();
        // Sits in the corner chunk a steep diagonal only clips.
        grid.add(9, Vec2::new(20.5, 9.5), 1.cells());
        let found: Vec<u32> = grid
            .query_ray(Vec2::new(19.0, 8.0), Angle::degrees(45.0), 5.cells())
            .collect();
        assert_eq!(found, vec![9]);
    }

    #[test]
    fn test_ray_chunks_listed_once_in_order() {
        let grid = grid_100();
        let chunks = grid.ray_chunks(Vec2::new(0.5, 5.0), Vec2::new(99.5, 5.0), 99.0);
        assert_eq!(chunks, (0..10).collect::<Vec<usize>>());

        let diagonal = grid.ray_chunks(Vec2::new(0.5, 0.5), Vec2::new(99.5, 99.5), 140.0);
        let mut unique = diagonal.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), diagonal.len());
        assert_eq!(diagonal.first(), Some(&0));
        assert_eq!(diagonal.last(), Some(&99));
    }

    #[test]
    fn test_reset_clears_entries() {
        let mut grid = grid_100();
        grid.add(1, Vec2::new(10.0, 10.0), 1.cells());
        grid.reset(Bounds::around(Vec2::ZERO, 5.0));
        assert!(grid.is_empty());
        assert_eq!(grid.query_point(Vec2::new(10.0, 10.0)).count(), 0);
    }
}
