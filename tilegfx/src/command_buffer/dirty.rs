// Copyright (c) 2024 The tilegfx developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Fixed-size dirty tracking.
//!
//! Every bind call marks the categories of state it affects. Before a draw, the draw path looks
//! at the marked categories to decide which hardware records must be re-emitted, and after the
//! draw the bits are cleared again (see
//! [`GraphicsState::clear_dirty_after_draw`](super::GraphicsState::clear_dirty_after_draw)).
//!
//! Two bitsets take part in this. [`DirtyBits<GraphicsDirty>`] belongs to the graphics state and
//! covers its own bindings. [`DirtyBits<DynamicState>`] belongs to the dynamic graphics state
//! and covers the dynamic pipeline state set by the application.

use crate::pipeline::DynamicState;
use std::{
    fmt::{Debug, Error as FmtError, Formatter},
    marker::PhantomData,
};

/// A closed enumeration that can index a [`DirtyBits`].
pub trait DirtyIndex: Copy + 'static {
    /// Every value of the enumeration, in index order. Must not hold more than 64 values.
    const ALL: &'static [Self];

    /// Returns the bit position of `self`.
    fn index(self) -> usize;
}

/// A set of dirty categories, one bit per value of `T`.
pub struct DirtyBits<T> {
    bits: u64,
    _marker: PhantomData<T>,
}

impl<T: DirtyIndex> DirtyBits<T> {
    const MASK: u64 = {
        assert!(T::ALL.len() <= 64);

        if T::ALL.len() == 64 {
            u64::MAX
        } else {
            (1u64 << T::ALL.len()) - 1
        }
    };

    /// Returns a bitset with no category marked.
    #[inline]
    pub const fn empty() -> Self {
        DirtyBits {
            bits: 0,
            _marker: PhantomData,
        }
    }

    /// Returns a bitset with every category marked.
    #[inline]
    pub const fn all() -> Self {
        DirtyBits {
            bits: Self::MASK,
            _marker: PhantomData,
        }
    }

    /// Returns whether `category` is marked.
    #[inline]
    pub fn test(&self, category: T) -> bool {
        self.bits & (1 << category.index()) != 0
    }

    /// Returns whether any of `categories` is marked.
    #[inline]
    pub fn test_any(&self, categories: &[T]) -> bool {
        categories.iter().any(|&category| self.test(category))
    }

    /// Marks `category`.
    #[inline]
    pub fn set(&mut self, category: T) {
        self.bits |= 1 << category.index();
    }

    /// Unmarks `category`.
    #[inline]
    pub fn clear(&mut self, category: T) {
        self.bits &= !(1 << category.index());
    }

    /// Unmarks every category.
    #[inline]
    pub fn clear_all(&mut self) {
        self.bits = 0;
    }

    /// Marks every category.
    #[inline]
    pub fn set_all(&mut self) {
        self.bits = Self::MASK;
    }

    /// Returns whether no category is marked.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Iterates over the marked categories, in index order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        T::ALL.iter().copied().filter(|&category| self.test(category))
    }
}

impl<T> Clone for DirtyBits<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for DirtyBits<T> {}

impl<T> PartialEq for DirtyBits<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

impl<T> Eq for DirtyBits<T> {}

impl<T: DirtyIndex> Default for DirtyBits<T> {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: DirtyIndex + Debug> Debug for DirtyBits<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// The categories of graphics state tracked by [`GraphicsState`](super::GraphicsState).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GraphicsDirty {
    /// The vertex shader binding.
    VertexShader,
    /// The fragment shader binding, or anything that changes whether it runs.
    FragmentShader,
    /// The vertex buffer bindings.
    VertexBuffers,
    /// The index buffer binding.
    IndexBuffer,
    /// The descriptor sets or their layout.
    DescriptorState,
    /// Fixed-function state consumed by the renderer state descriptor.
    RenderState,
    /// The push uniform block, including system values.
    PushUniforms,
}

impl DirtyIndex for GraphicsDirty {
    const ALL: &'static [Self] = &[
        GraphicsDirty::VertexShader,
        GraphicsDirty::FragmentShader,
        GraphicsDirty::VertexBuffers,
        GraphicsDirty::IndexBuffer,
        GraphicsDirty::DescriptorState,
        GraphicsDirty::RenderState,
        GraphicsDirty::PushUniforms,
    ];

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

/// Dynamic states that can change whether the fragment shader has to run, without the fragment
/// shader binding itself changing.
pub const FS_USER_DYNAMIC_STATES: [DynamicState; 5] = [
    DynamicState::RasterizerDiscardEnable,
    DynamicState::ColorAttachmentCount,
    DynamicState::ColorWriteEnable,
    DynamicState::ColorWriteMask,
    DynamicState::AlphaToCoverageEnable,
];

/// Returns whether the users of the fragment shader must be refreshed.
///
/// Not running the fragment shader affects other records (varying linking, the fragment shader
/// pointer of the draw), so anything that may flip the result of
/// [`fs_required`](super::fs_required) makes them dirty, not only a new fragment shader binding.
/// Test [`GraphicsDirty::FragmentShader`] directly if only the binding matters.
#[inline]
pub fn fs_user_dirty(
    gfx_dirty: &DirtyBits<GraphicsDirty>,
    dyn_dirty: &DirtyBits<DynamicState>,
) -> bool {
    gfx_dirty.test(GraphicsDirty::FragmentShader) || dyn_dirty.test_any(&FS_USER_DYNAMIC_STATES)
}

#[cfg(test)]
mod tests {
    use super::{fs_user_dirty, DirtyBits, DirtyIndex, GraphicsDirty, FS_USER_DYNAMIC_STATES};
    use crate::pipeline::DynamicState;

    #[test]
    fn set_test_clear() {
        let mut dirty = DirtyBits::<GraphicsDirty>::empty();
        assert!(dirty.is_empty());

        dirty.set(GraphicsDirty::IndexBuffer);
        dirty.set(GraphicsDirty::PushUniforms);
        assert!(dirty.test(GraphicsDirty::IndexBuffer));
        assert!(!dirty.test(GraphicsDirty::VertexBuffers));
        assert_eq!(
            dirty.iter().collect::<Vec<_>>(),
            [GraphicsDirty::IndexBuffer, GraphicsDirty::PushUniforms],
        );

        dirty.clear(GraphicsDirty::IndexBuffer);
        assert!(!dirty.test(GraphicsDirty::IndexBuffer));

        dirty.clear_all();
        assert!(dirty.is_empty());
    }

    #[test]
    fn set_all_covers_every_category_and_nothing_else() {
        let mut dirty = DirtyBits::<GraphicsDirty>::empty();
        dirty.set_all();

        assert_eq!(dirty, DirtyBits::all());
        assert_eq!(dirty.iter().count(), GraphicsDirty::ALL.len());
        assert!(GraphicsDirty::ALL.iter().all(|&c| dirty.test(c)));
    }

    #[test]
    fn indices_are_dense() {
        for (i, category) in GraphicsDirty::ALL.iter().enumerate() {
            assert_eq!(category.index(), i);
        }
        for (i, category) in DynamicState::ALL.iter().enumerate() {
            assert_eq!(category.index(), i);
        }
    }

    #[test]
    fn fs_user_dirty_from_graphics_bitset() {
        let mut gfx = DirtyBits::empty();
        let dyn_dirty = DirtyBits::empty();
        assert!(!fs_user_dirty(&gfx, &dyn_dirty));

        gfx.set(GraphicsDirty::VertexShader);
        assert!(!fs_user_dirty(&gfx, &dyn_dirty));

        gfx.set(GraphicsDirty::FragmentShader);
        assert!(fs_user_dirty(&gfx, &dyn_dirty));
    }

    #[test]
    fn fs_user_dirty_from_dynamic_bitset() {
        let gfx = DirtyBits::empty();

        for state in FS_USER_DYNAMIC_STATES {
            let mut dyn_dirty = DirtyBits::empty();
            dyn_dirty.set(state);
            assert!(fs_user_dirty(&gfx, &dyn_dirty), "{:?}", state);
        }

        let mut dyn_dirty = DirtyBits::empty();
        dyn_dirty.set(DynamicState::Viewport);
        dyn_dirty.set(DynamicState::BlendConstants);
        dyn_dirty.set(DynamicState::VertexInput);
        assert!(!fs_user_dirty(&gfx, &dyn_dirty));
    }
}
