//! Content-addressed pools of constant textures.
//!
//! Materials reference constant values (a roughness, a colour) through
//! solid-colour textures. Identical values share one pool entry. Pools keep
//! first-seen order because that order decides the on-disk indices.

use std::collections::HashMap;

/// The three constant pools, by float arity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TexturePool {
    /// 1 float per texel.
    Scalar,
    /// 2 floats per texel.
    Pair,
    /// 3 floats per texel.
    Triple,
}

/// Pool-local reference to an interned texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle {
    pub pool: TexturePool,
    pub index: u32,
}

/// Insertion-ordered set of N-float constants.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool<const N: usize> {
    values: Vec<[f32; N]>,
    lookup: HashMap<[u32; N], u32>,
}

impl<const N: usize> ConstantPool<N> {
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            lookup: HashMap::new(),
        }
    }

    /// Returns the index of `value`, appending it on first sight.
    pub fn intern(&mut self, value: [f32; N]) -> u32 {
        let next = self.values.len() as u32;
        let index = *self.lookup.entry(Self::key(value)).or_insert(next);
        if index == next {
            self.values.push(value);
        }
        index
    }

    pub fn values(&self) -> &[[f32; N]] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    // Bitwise identity, except that -0.0 and 0.0 are the same constant.
    fn key(value: [f32; N]) -> [u32; N] {
        value.map(|v| (v + 0.0).to_bits())
    }
}

/// Export-scoped interner for all three pools.
#[derive(Debug, Clone, Default)]
pub struct TextureInterner {
    scalars: ConstantPool<1>,
    pairs: ConstantPool<2>,
    triples: ConstantPool<3>,
}

impl TextureInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern_scalar(&mut self, value: f32) -> TextureHandle {
        TextureHandle {
            pool: TexturePool::Scalar,
            index: self.scalars.intern([value]),
        }
    }

    pub fn intern_pair(&mut self, value: [f32; 2]) -> TextureHandle {
        TextureHandle {
            pool: TexturePool::Pair,
            index: self.pairs.intern(value),
        }
    }

    pub fn intern_triple(&mut self, value: [f32; 3]) -> TextureHandle {
        TextureHandle {
            pool: TexturePool::Triple,
            index: self.triples.intern(value),
        }
    }

    pub fn scalars(&self) -> &ConstantPool<1> {
        &self.scalars
    }

    pub fn pairs(&self) -> &ConstantPool<2> {
        &self.pairs
    }

    pub fn triples(&self) -> &ConstantPool<3> {
        &self.triples
    }

    pub fn total_count(&self) -> usize {
        self.scalars.len() + self.pairs.len() + self.triples.len()
    }

    /// Index of `handle` in the concatenated scalar, pair, triple address space.
    ///
    /// Only stable once interning is finished, since pool sizes shift the
    /// offsets of later pools.
    pub fn global_index(&self, handle: TextureHandle) -> u32 {
        let offset = match handle.pool {
            TexturePool::Scalar => 0,
            TexturePool::Pair => self.scalars.len(),
            TexturePool::Triple => self.scalars.len() + self.pairs.len(),
        };
        offset as u32 + handle.index
    }
}
