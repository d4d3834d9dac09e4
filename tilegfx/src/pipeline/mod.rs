// Copyright (c) 2024 The tilegfx developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Pipeline state that can be set dynamically while recording.
//!
//! All the sub-modules of this module correspond to the various steps of the graphics pipeline
//! whose state the draw path has to look at.

use crate::command_buffer::DirtyIndex;

pub mod graphics;

/// A category of dynamic graphics state, used to index the dirty bitset of
/// [`DynamicGraphicsState`](crate::command_buffer::DynamicGraphicsState).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DynamicState {
    RasterizerDiscardEnable,
    /// The number of color attachments covered by the color blend state. This has no Vulkan
    /// equivalent: it changes when a render pass is started.
    ColorAttachmentCount,
    ColorWriteEnable,
    ColorWriteMask,
    ColorBlendEnable,
    AlphaToCoverageEnable,
    BlendConstants,
    VertexInput,
    SampleLocations,
    Viewport,
    Scissor,
    LineWidth,
    DepthBias,
}

impl DirtyIndex for DynamicState {
    const ALL: &'static [Self] = &[
        DynamicState::RasterizerDiscardEnable,
        DynamicState::ColorAttachmentCount,
        DynamicState::ColorWriteEnable,
        DynamicState::ColorWriteMask,
        DynamicState::ColorBlendEnable,
        DynamicState::AlphaToCoverageEnable,
        DynamicState::BlendConstants,
        DynamicState::VertexInput,
        DynamicState::SampleLocations,
        DynamicState::Viewport,
        DynamicState::Scissor,
        DynamicState::LineWidth,
        DynamicState::DepthBias,
    ];

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}
