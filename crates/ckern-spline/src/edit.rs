//! Edit session: a working copy of a curve's nurbs that bevel passes read
//! while it is open and that is written back on commit.

use ckern_core::{KernelError, Result};

use crate::handle::{self, HandleCode};
use crate::nurb::{Curve, Nurb, NurbKind};

/// Working copy of a curve's nurbs.
///
/// Consumed by [`EditSession::commit`] or [`EditSession::discard`], so a
/// closed session cannot be reused.
#[derive(Debug, Clone)]
pub struct EditSession {
    nurbs: Vec<Nurb>,
}

impl EditSession {
    pub fn begin(curve: &Curve) -> Self {
        Self {
            nurbs: curve.nurbs.clone(),
        }
    }

    pub fn nurbs(&self) -> &[Nurb] {
        &self.nurbs
    }

    pub fn nurbs_mut(&mut self) -> &mut Vec<Nurb> {
        &mut self.nurbs
    }

    pub fn nurb_mut(&mut self, index: usize) -> Result<&mut Nurb> {
        let count = self.nurbs.len();
        self.nurbs
            .get_mut(index)
            .ok_or_else(|| KernelError::NotFound(format!("nurb {index} of {count}")))
    }

    /// Apply a handle-type change to the selected handles of every Bezier nurb.
    pub fn set_handles(&mut self, code: HandleCode) {
        for nurb in self.bezier_nurbs() {
            handle::set_handles(nurb, code);
        }
    }

    /// Re-derive handle types from the selection, then recompute handles.
    pub fn test_handles(&mut self) {
        for nurb in self.bezier_nurbs() {
            handle::test_handles(nurb);
        }
    }

    pub fn switch_direction(&mut self, index: usize) -> Result<()> {
        self.nurb_mut(index)?.switch_direction();
        Ok(())
    }

    fn bezier_nurbs(&mut self) -> impl Iterator<Item = &mut Nurb> {
        self.nurbs.iter_mut().filter(|n| n.kind() == NurbKind::Bezier)
    }

    /// Write the edited nurbs back, regenerating knots whose length no
    /// longer fits the point count.
    pub fn commit(mut self, curve: &mut Curve) {
        for nurb in self.nurbs.iter_mut() {
            let stale = nurb.knots_u.as_ref().map(|k| k.len()) != Some(nurb.knots_u_len());
            if nurb.kind() == NurbKind::Nurbs && stale {
                nurb.make_knots();
            }
        }
        tracing::debug!(nurbs = self.nurbs.len(), "committed curve edit");
        curve.nurbs = self.nurbs;
    }

    pub fn discard(self) {}
}
