//! Geometry that shape keys read from and write to.

use ckern_deform::Lattice;
use ckern_math::{DVec3, DVec4};
use ckern_spline::{ControlPoints, Curve};
use serde::{Deserialize, Serialize};

use crate::blend::{cp_key, ElementMode, ElementRange};
use crate::key::{KeyBlock, KeyOwner};

/// Geometry that can be flattened into key elements and written back.
pub trait KeyTarget {
    fn owner(&self) -> KeyOwner;

    fn element_count(&self) -> usize;

    /// Element layout; one plain range by default.
    fn element_ranges(&self) -> Vec<ElementRange> {
        vec![ElementRange::plain(0, self.element_count())]
    }

    /// Current state as `element_count * owner().element_size()` floats.
    fn read_elements(&self) -> Vec<f64>;

    /// Overwrite the geometry from a buffer laid out like [`Self::read_elements`].
    fn write_elements(&mut self, data: &[f64]);
}

/// Vertex positions of a mesh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshVerts {
    pub positions: Vec<DVec3>,
}

impl MeshVerts {
    pub fn new(positions: Vec<DVec3>) -> Self {
        Self { positions }
    }
}

fn read_positions(positions: impl Iterator<Item = DVec3>) -> Vec<f64> {
    positions.flat_map(|p| p.to_array()).collect()
}

impl KeyTarget for MeshVerts {
    fn owner(&self) -> KeyOwner {
        KeyOwner::Mesh
    }

    fn element_count(&self) -> usize {
        self.positions.len()
    }

    fn read_elements(&self) -> Vec<f64> {
        read_positions(self.positions.iter().copied())
    }

    fn write_elements(&mut self, data: &[f64]) {
        for (p, c) in self.positions.iter_mut().zip(data.chunks_exact(3)) {
            *p = DVec3::new(c[0], c[1], c[2]);
        }
    }
}

impl KeyTarget for Lattice {
    fn owner(&self) -> KeyOwner {
        KeyOwner::Lattice
    }

    fn element_count(&self) -> usize {
        self.points.len()
    }

    fn read_elements(&self) -> Vec<f64> {
        read_positions(self.points.iter().map(|p| p.position()))
    }

    fn write_elements(&mut self, data: &[f64]) {
        for (p, c) in self.points.iter_mut().zip(data.chunks_exact(3)) {
            p.vec.x = c[0];
            p.vec.y = c[1];
            p.vec.z = c[2];
        }
    }
}

/// Curves store BPoints as `[x, y, z, weight]` and Bezier triples as three
/// elements: `[left, 0]`, `[anchor, tilt]`, `[right, 0]`.
impl KeyTarget for Curve {
    fn owner(&self) -> KeyOwner {
        KeyOwner::Curve
    }

    fn element_count(&self) -> usize {
        self.nurbs
            .iter()
            .map(|nu| match &nu.control {
                ControlPoints::Bezier(triples) => 3 * triples.len(),
                ControlPoints::Poly(points) | ControlPoints::Nurbs(points) => points.len(),
            })
            .sum()
    }

    fn element_ranges(&self) -> Vec<ElementRange> {
        let mut start = 0;
        self.nurbs
            .iter()
            .map(|nu| {
                let (len, mode) = match &nu.control {
                    ControlPoints::Bezier(triples) => (3 * triples.len(), ElementMode::BezTriple),
                    ControlPoints::Poly(points) | ControlPoints::Nurbs(points) => {
                        (points.len(), ElementMode::Plain)
                    }
                };
                let range = ElementRange {
                    start,
                    end: start + len,
                    mode,
                };
                start += len;
                range
            })
            .collect()
    }

    fn read_elements(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.element_count() * 4);
        for nu in &self.nurbs {
            match &nu.control {
                ControlPoints::Bezier(triples) => {
                    for bt in triples {
                        out.extend(bt.vec[0].extend(0.0).to_array());
                        out.extend(bt.vec[1].extend(bt.tilt).to_array());
                        out.extend(bt.vec[2].extend(0.0).to_array());
                    }
                }
                ControlPoints::Poly(points) | ControlPoints::Nurbs(points) => {
                    for bp in points {
                        out.extend(bp.vec.to_array());
                    }
                }
            }
        }
        out
    }

    fn write_elements(&mut self, data: &[f64]) {
        let mut elems = data.chunks_exact(4);
        for nu in self.nurbs.iter_mut() {
            match &mut nu.control {
                ControlPoints::Bezier(triples) => {
                    for bt in triples.iter_mut() {
                        let (Some(l), Some(a), Some(r)) = (elems.next(), elems.next(), elems.next()) else {
                            return;
                        };
                        bt.vec[0] = DVec3::new(l[0], l[1], l[2]);
                        bt.vec[1] = DVec3::new(a[0], a[1], a[2]);
                        bt.vec[2] = DVec3::new(r[0], r[1], r[2]);
                        bt.tilt = a[3];
                    }
                }
                ControlPoints::Poly(points) | ControlPoints::Nurbs(points) => {
                    for bp in points.iter_mut() {
                        let Some(c) = elems.next() else {
                            return;
                        };
                        bp.vec = DVec4::new(c[0], c[1], c[2], c[3]);
                    }
                }
            }
        }
    }
}

impl KeyBlock {
    /// Capture the current state of `target` as a block.
    pub fn from_target<T: KeyTarget + ?Sized>(name: impl Into<String>, pos: f64, target: &T) -> Self {
        KeyBlock::new(name, pos, target.read_elements(), target.element_count())
    }
}

/// Write `block` into `target`, resampling when the element counts differ.
pub fn apply_block<T: KeyTarget + ?Sized>(block: &KeyBlock, target: &mut T) {
    let size = target.owner().element_size();
    let tot = target.element_count();
    let mut buf = target.read_elements();
    for range in target.element_ranges() {
        cp_key(range, tot, &mut buf, size, block);
    }
    target.write_elements(&buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ckern_spline::{BPoint, BezTriple, Nurb};

    fn mixed_curve() -> Curve {
        let mut bt = BezTriple::new(DVec3::new(1.0, 2.0, 3.0));
        bt.tilt = 0.5;
        Curve::new(vec![
            Nurb::bezier(vec![bt, BezTriple::new(DVec3::X)], false),
            Nurb::poly(vec![BPoint::weighted(DVec3::Y, 2.0), BPoint::new(DVec3::Z)], false),
        ])
    }

    #[test]
    fn test_curve_layout() {
        let curve = mixed_curve();
        assert_eq!(curve.element_count(), 8);
        let ranges = curve.element_ranges();
        assert_eq!(ranges[0].mode, ElementMode::BezTriple);
        assert_eq!((ranges[1].start, ranges[1].end), (6, 8));

        let data = curve.read_elements();
        assert_eq!(data.len(), 32);
        assert_eq!(&data[4..8], &[1.0, 2.0, 3.0, 0.5]);
        assert_eq!(&data[24..28], &[0.0, 1.0, 0.0, 2.0]);
    }

    #[test]
    fn test_block_round_trips_through_curve() {
        let curve = mixed_curve();
        let block = KeyBlock::from_target("Basis", 0.0, &curve);

        let mut edited = curve.clone();
        edited.nurbs[0].control.bezier_mut().unwrap()[0].tilt = 9.0;
        apply_block(&block, &mut edited);
        assert_eq!(edited, curve);
    }

    #[test]
    fn test_lattice_keeps_weights() {
        let mut lt = Lattice::new(2, 1, 1);
        lt.points[0].vec.w = 0.5;
        let block = KeyBlock::new("shift", 0.0, vec![5.0, 0.0, 0.0, 6.0, 0.0, 0.0], 2);
        apply_block(&block, &mut lt);
        assert_eq!(lt.points[0].position(), DVec3::new(5.0, 0.0, 0.0));
        assert_eq!(lt.points[0].weight(), 0.5);
    }
}
