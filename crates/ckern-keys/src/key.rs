use ckern_core::{KernelError, Result, Validate};
use ckern_math::Interpolation;
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    pub struct KeyBlockId;
}

/// Kind of data a key animates. Fixes the element layout of its blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum KeyOwner {
    Mesh = 0,
    Lattice = 1,
    Curve = 2,
}

impl KeyOwner {
    /// Floats per element: xyz for meshes and lattices, xyz plus weight or
    /// tilt for curves.
    pub fn element_size(self) -> usize {
        match self {
            Self::Mesh | Self::Lattice => 3,
            Self::Curve => 4,
        }
    }

    /// Bytes per element in the persisted single-precision layout.
    pub fn element_bytes(self) -> usize {
        self.element_size() * std::mem::size_of::<f32>()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum KeyMode {
    /// Blocks are poses along a timeline, interpolated by position.
    #[default]
    Absolute = 0,
    /// Blocks are offsets from a base block, summed by their values.
    Relative = 1,
}

/// One stored shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyBlock {
    pub name: String,
    /// Position on the key timeline (absolute mode).
    pub pos: f64,
    pub interp: Interpolation,
    /// `totelem * element_size` floats.
    pub data: Vec<f64>,
    pub totelem: usize,
    /// Influence in relative mode.
    pub value: f64,
    /// Vertex group scaling the influence per element.
    pub vertex_group: Option<String>,
    /// Base block for relative mode; the reference block when unset.
    pub relative_to: Option<KeyBlockId>,
    pub mute: bool,
}

impl KeyBlock {
    pub fn new(name: impl Into<String>, pos: f64, data: Vec<f64>, totelem: usize) -> Self {
        Self {
            name: name.into(),
            pos,
            interp: Interpolation::Linear,
            data,
            totelem,
            value: 0.0,
            vertex_group: None,
            relative_to: None,
            mute: false,
        }
    }

    pub fn with_interp(mut self, interp: Interpolation) -> Self {
        self.interp = interp;
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    /// Floats of element `index`, if stored.
    pub fn element(&self, index: usize, element_size: usize) -> Option<&[f64]> {
        if index >= self.totelem {
            return None;
        }
        self.data.get(index * element_size..(index + 1) * element_size)
    }
}

/// A set of shape keys for one piece of geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Key {
    pub owner: KeyOwner,
    pub mode: KeyMode,
    pub blocks: SlotMap<KeyBlockId, KeyBlock>,
    /// Blocks sorted by `pos`.
    pub order: Vec<KeyBlockId>,
    /// Base shape; the first block added.
    pub reference: Option<KeyBlockId>,
    /// Frames over which the first to last element lag behind.
    pub slurph: i32,
    pub cyclic: bool,
}

impl Key {
    pub fn new(owner: KeyOwner, mode: KeyMode) -> Self {
        Self {
            owner,
            mode,
            blocks: SlotMap::with_key(),
            order: Vec::new(),
            reference: None,
            slurph: 0,
            cyclic: false,
        }
    }

    pub fn element_size(&self) -> usize {
        self.owner.element_size()
    }

    /// Insert `block` after every block at or before its position.
    /// The first block becomes the reference.
    pub fn add_block(&mut self, block: KeyBlock) -> KeyBlockId {
        let pos = block.pos;
        let id = self.blocks.insert(block);
        let at = self
            .order
            .iter()
            .position(|other| self.blocks[*other].pos > pos)
            .unwrap_or(self.order.len());
        self.order.insert(at, id);
        if self.reference.is_none() {
            self.reference = Some(id);
        }
        id
    }

    /// Remove a block. Losing the reference promotes the first remaining block.
    pub fn remove_block(&mut self, id: KeyBlockId) -> Result<KeyBlock> {
        let block = self
            .blocks
            .remove(id)
            .ok_or_else(|| KernelError::NotFound("key block".into()))?;
        self.order.retain(|other| *other != id);
        for other in self.blocks.values_mut() {
            if other.relative_to == Some(id) {
                other.relative_to = None;
            }
        }
        if self.reference == Some(id) {
            self.reference = self.order.first().copied();
        }
        Ok(block)
    }

    pub fn block(&self, id: KeyBlockId) -> Option<&KeyBlock> {
        self.blocks.get(id)
    }

    pub fn block_mut(&mut self, id: KeyBlockId) -> Option<&mut KeyBlock> {
        self.blocks.get_mut(id)
    }

    pub fn find(&self, name: &str) -> Option<KeyBlockId> {
        self.order.iter().copied().find(|id| self.blocks[*id].name == name)
    }

    /// Blocks sorted by position.
    pub fn ordered(&self) -> impl Iterator<Item = (KeyBlockId, &KeyBlock)> + '_ {
        self.order.iter().map(|id| (*id, &self.blocks[*id]))
    }

    pub fn reference_block(&self) -> Result<&KeyBlock> {
        self.reference
            .and_then(|id| self.blocks.get(id))
            .ok_or_else(|| KernelError::MissingResource("key has no reference block".into()))
    }
}

impl Validate for Key {
    fn validate(&self) -> Result<()> {
        self.reference_block()?;
        if self.order.len() != self.blocks.len() {
            return Err(KernelError::InvalidOperation(format!(
                "key orders {} of {} blocks",
                self.order.len(),
                self.blocks.len()
            )));
        }
        let size = self.element_size();
        for (_, block) in self.ordered() {
            if block.data.len() != block.totelem * size {
                return Err(KernelError::InvalidOperation(format!(
                    "block '{}' holds {} floats for {} elements",
                    block.name,
                    block.data.len(),
                    block.totelem
                )));
            }
        }
        Ok(())
    }
}
