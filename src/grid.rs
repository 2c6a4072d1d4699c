//! A sparse 2D coordinate map with one occupant per cell.

use core::fmt;
use core::iter::FusedIterator;

use hashbrown::HashMap;

/// A map from integer `(x, y)` coordinates to at most one element per cell.
///
/// Storage is sparse; only occupied cells cost memory. Besides point lookup,
/// [`within_steps`](Grid::within_steps) enumerates the occupied cells of a
/// square Chebyshev neighborhood in row-major order.
///
/// # Examples
///
/// ```
/// use tagmap::Grid;
///
/// let mut g = Grid::new();
/// g.set(0, 0, "center");
/// g.set(1, 0, "east");
/// assert_eq!(g.get(0, 0), Some(&"center"));
/// assert_eq!(g.set(1, 0, "east2"), Some("east")); // one occupant per cell
/// assert_eq!(g.get(2, 2), None);
/// ```
pub struct Grid<T> {
    cells: HashMap<(i32, i32), T>,
}

impl<T> Grid<T> {
    /// Creates an empty grid.
    #[inline]
    pub fn new() -> Self {
        Self { cells: HashMap::new() }
    }

    /// Number of occupied cells.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if no cell is occupied.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Returns the element at `(x, y)`, if the cell is occupied.
    #[cfg_attr(feature = "inline-more", inline)]
    pub fn get(&self, x: i32, y: i32) -> Option<&T> {
        self.cells.get(&(x, y))
    }

    /// Returns a mutable reference to the element at `(x, y)`.
    #[cfg_attr(feature = "inline-more", inline)]
    pub fn get_mut(&mut self, x: i32, y: i32) -> Option<&mut T> {
        self.cells.get_mut(&(x, y))
    }

    /// Stores `element` at `(x, y)`, returning the displaced occupant.
    #[cfg_attr(feature = "inline-more", inline)]
    pub fn set(&mut self, x: i32, y: i32, element: T) -> Option<T> {
        self.cells.insert((x, y), element)
    }

    /// Vacates `(x, y)`, returning its occupant.
    #[cfg_attr(feature = "inline-more", inline)]
    pub fn remove(&mut self, x: i32, y: i32) -> Option<T> {
        self.cells.remove(&(x, y))
    }

    /// Vacates every cell.
    #[inline]
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Occupied cells of the square neighborhood of Chebyshev radius
    /// `steps` around `(x, y)`, in row-major order: `y` ascending in the
    /// outer loop, `x` ascending in the inner loop.
    ///
    /// With `skip_self`, the center cell itself is excluded. Coordinate
    /// arithmetic saturates at the `i32` boundary.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagmap::Grid;
    ///
    /// let mut g = Grid::new();
    /// g.set(0, -1, 'n');
    /// g.set(0, 0, 'c');
    /// g.set(1, 1, 's');
    /// g.set(9, 9, 'x'); // outside the neighborhood
    ///
    /// let near: String = g.within_steps(0, 0, 1, false).map(|(_, c)| c).collect();
    /// assert_eq!(near, "ncs"); // row-major: (0,-1), (0,0), (1,1)
    ///
    /// let near: String = g.within_steps(0, 0, 1, true).map(|(_, c)| c).collect();
    /// assert_eq!(near, "ns");
    /// ```
    pub fn within_steps(&self, x: i32, y: i32, steps: u32, skip_self: bool) -> Neighborhood<'_, T> {
        let r = steps.min(i32::MAX as u32) as i32;
        let x0 = x.saturating_sub(r);
        let y0 = y.saturating_sub(r);
        Neighborhood {
            cells: &self.cells,
            center: (x, y),
            x0,
            x1: x.saturating_add(r),
            y1: y.saturating_add(r),
            cursor: Some((x0, y0)),
            skip_center: skip_self,
        }
    }

    /// Iterates all occupied cells as `(&(x, y), &element)`, in arbitrary
    /// order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&(i32, i32), &T)> {
        self.cells.iter()
    }
}

/// Iterator over the occupied cells of a square neighborhood, row-major.
/// Returned by [`Grid::within_steps`].
#[derive(Debug)]
pub struct Neighborhood<'a, T> {
    cells: &'a HashMap<(i32, i32), T>,
    center: (i32, i32),
    x0: i32,
    x1: i32,
    y1: i32,
    cursor: Option<(i32, i32)>,
    skip_center: bool,
}

impl<'a, T> Iterator for Neighborhood<'a, T> {
    type Item = ((i32, i32), &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((x, y)) = self.cursor {
            self.cursor = if x < self.x1 {
                Some((x + 1, y))
            } else if y < self.y1 {
                Some((self.x0, y + 1))
            } else {
                None
            };
            if self.skip_center && (x, y) == self.center {
                continue;
            }
            if let Some(element) = self.cells.get(&(x, y)) {
                return Some(((x, y), element));
            }
        }
        None
    }
}

impl<T> FusedIterator for Neighborhood<'_, T> {}

impl<T> Default for Grid<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for Grid<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self { cells: self.cells.clone() }
    }
}

impl<T: fmt::Debug> fmt::Debug for Grid<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.cells.iter()).finish()
    }
}
