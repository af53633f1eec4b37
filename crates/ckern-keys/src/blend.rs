//! Shape key blending into a flat element buffer.
//!
//! The buffer holds `tot` live elements of `Key::element_size` floats each.
//! Blocks whose element count differs from `tot` are walked with a
//! fractional stride, so each live element reads the nearest earlier stored
//! one.

use ckern_core::{EvalSettings, KernelError, Result};

use crate::driver::{KeyDriver, StoredValues, VertexGroupSource};
use crate::key::{Key, KeyBlock, KeyMode};
use crate::select::{select_keys, KeySelection};
use crate::target::KeyTarget;

/// How elements of a range are grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementMode {
    /// One element per vertex or point.
    Plain,
    /// Three elements per Bezier triple, advanced together.
    BezTriple,
}

impl ElementMode {
    pub fn span(self) -> usize {
        match self {
            Self::Plain => 1,
            Self::BezTriple => 3,
        }
    }
}

/// A run of live elements sharing one [`ElementMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementRange {
    pub start: usize,
    pub end: usize,
    pub mode: ElementMode,
}

impl ElementRange {
    pub fn plain(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            mode: ElementMode::Plain,
        }
    }
}

/// Read position in a block.
struct BlockCursor<'a> {
    block: &'a KeyBlock,
    size: usize,
    index: usize,
    /// Stored elements per live element, when the counts differ.
    step: Option<f64>,
    acc: f64,
}

impl<'a> BlockCursor<'a> {
    fn new(block: &'a KeyBlock, size: usize, tot: usize) -> Self {
        let step = (block.totelem != tot && tot > 0).then(|| block.totelem as f64 / tot as f64);
        Self {
            block,
            size,
            index: 0,
            step,
            acc: 0.0,
        }
    }

    fn starting_at(block: &'a KeyBlock, size: usize, tot: usize, start: usize) -> Self {
        let mut cursor = Self::new(block, size, tot);
        match cursor.step {
            Some(step) => {
                cursor.acc = start as f64 * step;
                let whole = cursor.acc.floor();
                cursor.index = whole as usize;
                cursor.acc -= whole;
            }
            None => cursor.index = start,
        }
        cursor
    }

    /// Element `offset` past the cursor, clamped to the last stored one.
    fn element(&self, offset: usize) -> Option<&'a [f64]> {
        let last = self.block.totelem.checked_sub(1)?;
        self.block.element((self.index + offset).min(last), self.size)
    }

    fn advance(&mut self, span: usize) {
        match self.step {
            Some(step) => {
                self.acc += step;
                while self.acc >= 1.0 {
                    self.acc -= 1.0;
                    self.index += span;
                }
            }
            None => self.index += span,
        }
    }
}

fn slot(out: &mut [f64], index: usize, size: usize) -> Option<&mut [f64]> {
    out.get_mut(index * size..(index + 1) * size)
}

/// Copy `block` into `range` of `out`.
pub fn cp_key(range: ElementRange, tot: usize, out: &mut [f64], size: usize, block: &KeyBlock) {
    let end = range.end.min(tot);
    let span = range.mode.span();
    let mut cursor = BlockCursor::starting_at(block, size, tot, range.start);

    let mut a = range.start;
    while a < end {
        for e in 0..span.min(end - a) {
            if let (Some(src), Some(dst)) = (cursor.element(e), slot(out, a + e, size)) {
                dst.copy_from_slice(src);
            }
        }
        cursor.advance(span);
        a += span;
    }
}

/// Write the weighted sum of four blocks into `range` of `out`.
pub fn do_key(
    range: ElementRange,
    tot: usize,
    out: &mut [f64],
    size: usize,
    blocks: [&KeyBlock; 4],
    weights: [f64; 4],
) {
    let end = range.end.min(tot);
    let span = range.mode.span();
    let mut cursors = blocks.map(|b| BlockCursor::starting_at(b, size, tot, range.start));

    let mut a = range.start;
    while a < end {
        for e in 0..span.min(end - a) {
            let Some(dst) = slot(out, a + e, size) else {
                continue;
            };
            dst.fill(0.0);
            for (cursor, w) in cursors.iter().zip(weights) {
                if let Some(src) = cursor.element(e) {
                    for (d, s) in dst.iter_mut().zip(src) {
                        *d += w * s;
                    }
                }
            }
        }
        for cursor in cursors.iter_mut() {
            cursor.advance(span);
        }
        a += span;
    }
}

/// Copy the reference block into `range`, then add every live block's
/// offset from its base, scaled by its value and vertex group.
pub fn do_rel_key(
    range: ElementRange,
    tot: usize,
    out: &mut [f64],
    key: &Key,
    driver: &dyn KeyDriver,
    groups: Option<&dyn VertexGroupSource>,
) -> Result<()> {
    let size = key.element_size();
    let reference = key.reference_block()?;
    cp_key(range, tot, out, size, reference);

    let end = range.end.min(tot);
    let span = range.mode.span();
    for (id, block) in key.ordered() {
        if Some(id) == key.reference || block.mute {
            continue;
        }
        let value = driver.block_value(block);
        if value == 0.0 {
            continue;
        }
        let base = block
            .relative_to
            .and_then(|r| key.block(r))
            .unwrap_or(reference);
        let weights = block
            .vertex_group
            .as_deref()
            .and_then(|name| groups?.weights(name));

        let mut from = BlockCursor::starting_at(block, size, tot, range.start);
        let mut base_cursor = BlockCursor::starting_at(base, size, tot, range.start);
        let mut a = range.start;
        while a < end {
            let weight = match &weights {
                Some(w) => value * w.get(a).copied().unwrap_or(0.0),
                None => value,
            };
            if weight != 0.0 {
                for e in 0..span.min(end - a) {
                    let (Some(f), Some(r)) = (from.element(e), base_cursor.element(e)) else {
                        continue;
                    };
                    if let Some(dst) = slot(out, a + e, size) {
                        for ((d, f), r) in dst.iter_mut().zip(f).zip(r) {
                            *d += weight * (f - r);
                        }
                    }
                }
            }
            from.advance(span);
            base_cursor.advance(span);
            a += span;
        }
    }
    Ok(())
}

/// Evaluates a [`Key`] for a frame.
pub struct ShapeKeyBlender<'a> {
    key: &'a Key,
    settings: EvalSettings,
    driver: &'a dyn KeyDriver,
    groups: Option<&'a dyn VertexGroupSource>,
}

impl<'a> ShapeKeyBlender<'a> {
    pub fn new(key: &'a Key) -> Self {
        Self {
            key,
            settings: EvalSettings::default(),
            driver: &StoredValues,
            groups: None,
        }
    }

    pub fn with_settings(mut self, settings: &EvalSettings) -> Self {
        self.settings = *settings;
        self
    }

    pub fn with_driver(mut self, driver: &'a dyn KeyDriver) -> Self {
        self.driver = driver;
        self
    }

    pub fn with_vertex_groups(mut self, groups: &'a dyn VertexGroupSource) -> Self {
        self.groups = Some(groups);
        self
    }

    /// Blend the key at `frame` into `out`, whose layout is given by `ranges`.
    ///
    /// On error `out` is left untouched.
    pub fn blend(&self, frame: f64, out: &mut [f64], ranges: &[ElementRange]) -> Result<()> {
        let key = self.key;
        let size = key.element_size();
        let tot = ranges.iter().map(|r| r.end).max().unwrap_or(0);
        if out.len() < tot * size {
            return Err(KernelError::OutOfRange(format!(
                "buffer of {} floats for {} elements",
                out.len(),
                tot
            )));
        }
        key.reference_block()?;

        match key.mode {
            KeyMode::Relative => {
                for range in ranges {
                    do_rel_key(*range, tot, out, key, self.driver, self.groups)?;
                }
            }
            KeyMode::Absolute if key.slurph != 0 && tot > 0 => self.blend_slurph(frame, out, ranges, tot),
            KeyMode::Absolute => {
                let time = self.driver.key_time(frame);
                for range in ranges {
                    self.blend_absolute(time, *range, tot, out);
                }
            }
        }
        tracing::trace!(frame, elements = tot, "blended shape key");
        Ok(())
    }

    fn blend_absolute(&self, time: f64, range: ElementRange, tot: usize, out: &mut [f64]) {
        let key = self.key;
        let size = key.element_size();
        match select_keys(time, key) {
            Some(KeySelection::Copy(id)) => cp_key(range, tot, out, size, &key.blocks[id]),
            Some(KeySelection::Blend { keys, weights }) => {
                do_key(range, tot, out, size, keys.map(|id| &key.blocks[id]), weights)
            }
            None => {}
        }
    }

    /// Absolute blending where element `a` lags `a * slurph / tot` frames,
    /// evaluated in chunks of `slurph_step` elements.
    fn blend_slurph(&self, frame: f64, out: &mut [f64], ranges: &[ElementRange], tot: usize) {
        let step = self.settings.slurph_step(tot);
        let delta = self.key.slurph as f64 / tot as f64;
        for range in ranges {
            let span = range.mode.span();
            let chunk = step.div_ceil(span) * span;
            let mut a = range.start;
            while a < range.end {
                let end = (a + chunk).min(range.end);
                let time = self.driver.key_time(frame + a as f64 * delta);
                let part = ElementRange {
                    start: a,
                    end,
                    mode: range.mode,
                };
                self.blend_absolute(time, part, tot, out);
                a = end;
            }
        }
    }

    /// Blend into a target's elements and write them back.
    pub fn apply<T: KeyTarget + ?Sized>(&self, frame: f64, target: &mut T) -> Result<()> {
        if target.owner() != self.key.owner {
            return Err(KernelError::InvalidOperation(format!(
                "{:?} key applied to {:?} data",
                self.key.owner,
                target.owner()
            )));
        }
        let mut buf = target.read_elements();
        self.blend(frame, &mut buf, &target.element_ranges())?;
        target.write_elements(&buf);
        Ok(())
    }

    /// Like [`Self::apply`], logging and skipping on error.
    pub fn apply_or_skip<T: KeyTarget + ?Sized>(&self, frame: f64, target: &mut T) {
        if let Err(err) = self.apply(frame, target) {
            tracing::debug!(%err, "skipping shape key evaluation");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(values: &[f64]) -> KeyBlock {
        KeyBlock::new("b", 0.0, values.to_vec(), values.len() / 3)
    }

    #[test]
    fn test_copy_with_matching_counts() {
        let b = block(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let mut out = vec![0.0; 6];
        cp_key(ElementRange::plain(0, 2), 2, &mut out, 3, &b);
        assert_eq!(out, b.data);
    }

    #[test]
    fn test_double_block_takes_every_other_element() {
        let b = block(&[0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 3.0, 3.0, 3.0]);
        let mut out = vec![-1.0; 6];
        cp_key(ElementRange::plain(0, 2), 2, &mut out, 3, &b);
        assert_eq!(out, [0.0, 0.0, 0.0, 2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_short_block_repeats_elements() {
        let b = block(&[7.0, 7.0, 7.0]);
        let mut out = vec![0.0; 9];
        cp_key(ElementRange::plain(0, 3), 3, &mut out, 3, &b);
        assert!(out.iter().all(|v| *v == 7.0));
    }

    #[test]
    fn test_empty_block_leaves_output() {
        let b = KeyBlock::new("empty", 0.0, Vec::new(), 0);
        let mut out = vec![4.0; 3];
        cp_key(ElementRange::plain(0, 1), 1, &mut out, 3, &b);
        assert_eq!(out, [4.0; 3]);
    }

    #[test]
    fn test_offset_start_skips_stride() {
        let b = block(&[0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 3.0, 3.0, 3.0]);
        let mut out = vec![-1.0; 6];
        cp_key(ElementRange::plain(1, 2), 2, &mut out, 3, &b);
        assert_eq!(out, [-1.0, -1.0, -1.0, 2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_do_key_weights() {
        let a = block(&[0.0, 0.0, 0.0]);
        let b = block(&[2.0, 4.0, 6.0]);
        let mut out = vec![0.0; 3];
        do_key(ElementRange::plain(0, 1), 1, &mut out, 3, [&a, &a, &b, &b], [0.0, 0.5, 0.5, 0.0]);
        assert_eq!(out, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_beztriple_range_advances_by_three() {
        // Two triples stored, one live: the first triple is read whole.
        let data: Vec<f64> = (0..24).map(f64::from).collect();
        let b = KeyBlock::new("curve", 0.0, data, 6);
        let mut out = vec![0.0; 12];
        let range = ElementRange {
            start: 0,
            end: 3,
            mode: ElementMode::BezTriple,
        };
        cp_key(range, 3, &mut out, 4, &b);
        let expected: Vec<f64> = (0..12).map(f64::from).collect();
        assert_eq!(out, expected);
    }
}
