//! Snap points as weighted combinations of mesh samples
//!
//! A snap point is recorded as the stencil that produced it rather than as
//! a bare position. Evaluating the stencil on the coordinate fields gives
//! the position; evaluating it on any other field gives that field's value
//! at the same point.

use isomesh_core::FieldValue;
use smallvec::SmallVec;

/// A sample location the stencil draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Source {
    Cell(usize),
    /// Adapted neighbour-side value of a boundary face, indexed by
    /// `face - n_internal_faces`
    Boundary(usize),
    Point(usize),
}

/// Anything that can look up a field value for a [`Source`]
pub trait SourceValues<T> {
    fn value(&self, source: Source) -> T;
}

/// Weighted sum of sources
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stencil {
    terms: SmallVec<[(Source, f64); 8]>,
}

impl Stencil {
    pub fn single(source: Source) -> Self {
        let mut terms = SmallVec::new();
        terms.push((source, 1.0));
        Self { terms }
    }

    /// `(1 - t) a + t b`
    pub fn lerp(a: Source, b: Source, t: f64) -> Self {
        let mut terms = SmallVec::new();
        terms.push((a, 1.0 - t));
        terms.push((b, t));
        Self { terms }
    }

    /// Mean of `stencils`, `None` if there are none
    pub fn average<'a>(stencils: impl IntoIterator<Item = &'a Stencil>) -> Option<Stencil> {
        let mut sum = Stencil::default();
        let mut n = 0usize;
        for s in stencils {
            sum.terms.extend_from_slice(&s.terms);
            n += 1;
        }
        if n == 0 {
            return None;
        }
        let scale = 1.0 / n as f64;
        for (_, w) in sum.terms.iter_mut() {
            *w *= scale;
        }
        sum.coalesce();
        Some(sum)
    }

    /// Sort terms by source and merge repeated sources
    pub fn coalesce(&mut self) {
        self.terms.sort_by(|a, b| a.0.cmp(&b.0));
        let mut merged: SmallVec<[(Source, f64); 8]> = SmallVec::new();
        for &(source, w) in &self.terms {
            match merged.last_mut() {
                Some((last, acc)) if *last == source => *acc += w,
                _ => merged.push((source, w)),
            }
        }
        self.terms = merged;
    }

    pub fn terms(&self) -> &[(Source, f64)] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Sum of the weights; one for any stencil built by interpolation
    pub fn weight_sum(&self) -> f64 {
        self.terms.iter().map(|(_, w)| w).sum()
    }

    pub fn evaluate<T: FieldValue>(&self, values: &impl SourceValues<T>) -> T {
        self.terms
            .iter()
            .fold(T::zero(), |acc, &(source, w)| acc + values.value(source) * w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    struct Linear;

    impl SourceValues<f64> for Linear {
        fn value(&self, source: Source) -> f64 {
            match source {
                Source::Cell(i) => i as f64,
                Source::Boundary(i) => 100.0 + i as f64,
                Source::Point(i) => 1000.0 + i as f64,
            }
        }
    }

    #[test]
    fn test_lerp() {
        let s = Stencil::lerp(Source::Cell(2), Source::Point(0), 0.25);
        assert_relative_eq!(s.evaluate(&Linear), 0.75 * 2.0 + 0.25 * 1000.0);
        assert_relative_eq!(s.weight_sum(), 1.0);
    }

    #[test]
    fn test_average_coalesces_sources() {
        let a = Stencil::lerp(Source::Cell(0), Source::Point(1), 0.5);
        let b = Stencil::lerp(Source::Cell(0), Source::Boundary(3), 0.5);
        let avg = Stencil::average([&a, &b]).unwrap();

        assert_eq!(avg.terms().len(), 3);
        assert_eq!(avg.terms()[0], (Source::Cell(0), 0.5));
        assert_relative_eq!(avg.weight_sum(), 1.0);
        assert_relative_eq!(
            avg.evaluate(&Linear),
            0.5 * (a.evaluate(&Linear) + b.evaluate(&Linear)),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_average_of_nothing() {
        assert!(Stencil::average(std::iter::empty::<&Stencil>()).is_none());
    }
}
