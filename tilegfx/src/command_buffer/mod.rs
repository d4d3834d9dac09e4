// Copyright (c) 2024 The tilegfx developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Graphics state of a command buffer being recorded.
//!
//! The command encoder for tile-based GPUs re-emits GPU records (shader descriptors, attribute
//! tables, renderer state, push uniforms) lazily: each bind call only marks what it touched in a
//! [`DirtyBits`] set, and right before a draw the encoder asks the [`GraphicsState`] what needs
//! to be rebuilt.
//!
//! Two dirty sets take part in that decision. [`GraphicsDirty`] is owned by the
//! [`GraphicsState`] and covers bindings. The dynamic pipeline state keeps its own
//! [`DirtyBits<DynamicState>`](crate::pipeline::DynamicState) inside [`DynamicGraphicsState`].
//! Both are cleared together after each draw by
//! [`clear_dirty_after_draw`](GraphicsState::clear_dirty_after_draw).
//!
//! # Fragment shader elision
//!
//! When a draw writes neither color, depth nor stencil and has no side effects, the fragment
//! shader is not run at all. [`fs_required`] makes that decision and the result is cached in the
//! state until something that can change it is dirtied again.

pub use self::{
    arch::{
        Arch, CommandStream, CsDrawRecords, CsFramebufferResources, FramebufferResources,
        GpuAllocation, JmDrawRecords, JmFragmentRecords, JmFramebufferResources,
        JmVertexRecords, JobManager, ShaderLink, TargetArch,
    },
    dirty::{fs_user_dirty, DirtyBits, DirtyIndex, GraphicsDirty, FS_USER_DYNAMIC_STATES},
    draw::{DrawInfo, DrawPlan},
    dynamic_state::DynamicGraphicsState,
    fragment::{cached_fs_required, fs_required},
    render_pass::{
        AttachmentClear, AttachmentMask, AttachmentResolve, ClearValue, ColorAttachment,
        DepthStencilAttachment, DepthStencilTarget, FramebufferInfo, LoadOp, RenderArea,
        RenderTarget, RenderingAttachmentInfo, RenderingAttachmentResolve,
        RenderingAttachmentResolveInfo, RenderingFlags, RenderingInfo, RenderingState,
        ResolveMode, ResolveSink, StoreOp,
    },
    state::{FragmentStage, GraphicsState, IndexBufferBinding, VertexBufferBinding, VertexStage},
    sysvals::GraphicsSysvals,
    tiler::{select_tiler_hierarchy_mask, MIN_BIN_SIZE},
};

mod arch;
mod dirty;
mod draw;
mod dynamic_state;
mod fragment;
mod render_pass;
mod state;
mod sysvals;
mod tiler;

/// Maximum number of vertex buffers that can be bound at once.
pub const MAX_VERTEX_BUFFERS: usize = 16;

/// Maximum number of color attachments of a render pass.
pub const MAX_COLOR_ATTACHMENTS: usize = 8;
