use crate::distance::DistanceMeasure;
use crate::error::Result;
use crate::loader::PatternLabels;
use crate::Matrix;
use ndarray::ArrayView1;
use std::cmp::Ordering;
use std::fmt;

/// Fixed-capacity binary max-heap ordered by a comparison function.
///
/// Once full, an insert only succeeds when the new item is strictly less
/// than the current maximum, which it then replaces. Feeding a stream
/// through it therefore keeps the `capacity` smallest items.
pub struct BoundedHeap<T, F>
where
    F: Fn(&T, &T) -> Ordering,
{
    items: Vec<T>,
    capacity: usize,
    compare: F,
}

impl<T, F> BoundedHeap<T, F>
where
    F: Fn(&T, &T) -> Ordering,
{
    pub fn new(capacity: usize, compare: F) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
            compare,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn peek(&self) -> Option<&T> {
        self.items.first()
    }

    /// Inserts `item`, returning whichever item did not fit (if any).
    pub fn insert_with_overflow(&mut self, item: T) -> Option<T> {
        if self.items.len() < self.capacity {
            self.items.push(item);
            self.sift_up(self.items.len() - 1);
            return None;
        }
        match self.items.first() {
            Some(top) if (self.compare)(&item, top) == Ordering::Less => {
                let evicted = std::mem::replace(&mut self.items[0], item);
                self.sift_down(0);
                Some(evicted)
            }
            _ => Some(item),
        }
    }

    /// Removes the greatest item.
    pub fn pop(&mut self) -> Option<T> {
        if self.items.is_empty() {
            return None;
        }
        let last = self.items.len() - 1;
        self.items.swap(0, last);
        let top = self.items.pop();
        if !self.items.is_empty() {
            self.sift_down(0);
        }
        top
    }

    /// Drains the heap greatest-first.
    pub fn into_descending_vec(mut self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.items.len());
        while let Some(item) = self.pop() {
            out.push(item);
        }
        out
    }

    fn sift_up(&mut self, mut child: usize) {
        while child > 0 {
            let parent = (child - 1) / 2;
            if (self.compare)(&self.items[child], &self.items[parent]) != Ordering::Greater {
                break;
            }
            self.items.swap(child, parent);
            child = parent;
        }
    }

    fn sift_down(&mut self, mut parent: usize) {
        let len = self.items.len();
        loop {
            let left = 2 * parent + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let mut largest = left;
            if right < len
                && (self.compare)(&self.items[right], &self.items[left]) == Ordering::Greater
            {
                largest = right;
            }
            if (self.compare)(&self.items[largest], &self.items[parent]) != Ordering::Greater {
                break;
            }
            self.items.swap(parent, largest);
            parent = largest;
        }
    }
}

/// A row reported close to a centroid.
#[derive(Clone, Debug, PartialEq)]
pub struct ClosestPoint {
    pub row: usize,
    pub label: String,
    pub distance: f64,
}

impl fmt::Display for ClosestPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.label, self.distance)
    }
}

/// Finds the rows of a matrix nearest to a given point.
pub struct TopKReporter<'a> {
    data: &'a Matrix,
    distance: &'a dyn DistanceMeasure,
}

impl<'a> TopKReporter<'a> {
    pub fn new(data: &'a Matrix, distance: &'a dyn DistanceMeasure) -> Self {
        Self { data, distance }
    }

    /// The `how_many` rows closest to `point` as `(row, distance)`, farthest first.
    pub fn closest_rows(&self, point: ArrayView1<f64>, how_many: usize) -> Vec<(usize, f64)> {
        let mut heap = BoundedHeap::new(how_many, |a: &(usize, f64), b: &(usize, f64)| {
            a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal)
        });
        for (row, values) in self.data.outer_iter().enumerate() {
            let distance = self.distance.distance(point, values);
            heap.insert_with_overflow((row, distance));
        }
        heap.into_descending_vec()
    }

    /// Like [`closest_rows`](Self::closest_rows) with each row's display label attached.
    pub fn closest_points(
        &self,
        point: ArrayView1<f64>,
        how_many: usize,
        labels: &PatternLabels,
    ) -> Result<Vec<ClosestPoint>> {
        self.closest_rows(point, how_many)
            .into_iter()
            .map(|(row, distance)| {
                Ok(ClosestPoint {
                    row,
                    label: labels.get(row)?.to_string(),
                    distance,
                })
            })
            .collect()
    }
}
