// Copyright (c) 2024 The tilegfx developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Hardware generation specific state.
//!
//! The older job-manager GPUs and the newer command-stream GPUs need different records to be
//! kept around between draws. Which generation a build targets is fixed, so rather than tagging
//! the state at runtime, [`GraphicsState`](super::GraphicsState) is generic over an [`Arch`] and
//! each generation supplies its own record types.

use super::MAX_COLOR_ATTACHMENTS;
use crate::{
    image::{BufferObjectHandle, ImageView},
    DeviceAddress, DeviceSize,
};
use smallvec::SmallVec;
use std::fmt::Debug;

/// A hardware generation.
pub trait Arch: Copy + Debug + Default + 'static {
    /// Name used in log messages.
    const NAME: &'static str;

    /// Alignment in pixels of the render area below which the border of the attachments has to
    /// be preloaded.
    const META_TILE_SIZE: u32;

    /// Per render pass resources tied to the framebuffer.
    type FramebufferResources: FramebufferResources;

    /// Records derived from the vertex shader and vertex buffers.
    type VertexStageRecords: Clone + Debug + Default;

    /// Records derived from the fragment shader.
    type FragmentStageRecords: Clone + Debug + Default;

    /// Records shared by the whole draw.
    type DrawRecords: Clone + Debug + Default;

    /// Called when the vertex buffers are rebound.
    fn invalidate_vertex_buffers(vs: &mut Self::VertexStageRecords);

    /// Called when the vertex shader is rebound.
    fn invalidate_vertex_shader(vs: &mut Self::VertexStageRecords, draw: &mut Self::DrawRecords);

    /// Called when the fragment shader is rebound, or when whether it runs changed.
    fn invalidate_fragment_shader(
        fs: &mut Self::FragmentStageRecords,
        draw: &mut Self::DrawRecords,
    );
}

/// Framebuffer resources of a hardware generation.
pub trait FramebufferResources: Clone + Debug + Default {
    /// Resets the resources for a new render pass drawing to `views`.
    fn init<'a>(&mut self, views: impl IntoIterator<Item = &'a ImageView>);
}

/// Job-manager GPUs, where draws are chains of jobs built on the CPU.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JobManager;

/// Command-stream GPUs, where draws are recorded in a command stream executed by a firmware
/// front-end.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommandStream;

/// The hardware generation selected for this build.
#[cfg(feature = "job-manager")]
pub type TargetArch = JobManager;

/// The hardware generation selected for this build.
#[cfg(not(feature = "job-manager"))]
pub type TargetArch = CommandStream;

/// Framebuffer resources of job-manager GPUs.
#[derive(Clone, Debug, Default)]
pub struct JmFramebufferResources {
    /// Per color attachment, whether its transaction-elimination checksums are valid.
    pub crc_valid: [bool; MAX_COLOR_ATTACHMENTS],

    /// The buffer objects backing the attachments. Each object appears once.
    pub bos: SmallVec<[BufferObjectHandle; MAX_COLOR_ATTACHMENTS + 2]>,
}

impl FramebufferResources for JmFramebufferResources {
    fn init<'a>(&mut self, views: impl IntoIterator<Item = &'a ImageView>) {
        self.crc_valid = [false; MAX_COLOR_ATTACHMENTS];
        self.bos.clear();

        for view in views {
            let bo = view.buffer_object();

            if !self.bos.contains(&bo) {
                self.bos.push(bo);
            }
        }
    }
}

/// Varying layout agreed on by the bound vertex and fragment shaders.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShaderLink {
    /// GPU address of the vertex shader varying descriptors.
    pub vs_varyings: DeviceAddress,

    /// GPU address of the fragment shader varying descriptors.
    pub fs_varyings: DeviceAddress,

    /// Stride in bytes of one vertex in the varying buffer.
    pub stride: u32,
}

impl ShaderLink {
    /// Returns whether the link has been computed for the current shaders.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.vs_varyings != 0
    }
}

/// Vertex stage records of job-manager GPUs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JmVertexRecords {
    /// GPU address of the attribute descriptors.
    pub attribs: DeviceAddress,

    /// GPU address of the attribute buffer descriptors.
    pub attrib_bufs: DeviceAddress,
}

/// Fragment stage records of job-manager GPUs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JmFragmentRecords {
    /// GPU address of the renderer state descriptor.
    pub rsd: DeviceAddress,
}

/// Per draw records of job-manager GPUs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JmDrawRecords {
    /// Varying linkage between the vertex and the fragment shader.
    pub link: ShaderLink,

    /// GPU address of the viewport descriptor.
    pub vpd: DeviceAddress,
}

impl Arch for JobManager {
    const NAME: &'static str = "job-manager";
    const META_TILE_SIZE: u32 = 32;

    type FramebufferResources = JmFramebufferResources;
    type VertexStageRecords = JmVertexRecords;
    type FragmentStageRecords = JmFragmentRecords;
    type DrawRecords = JmDrawRecords;

    #[inline]
    fn invalidate_vertex_buffers(vs: &mut JmVertexRecords) {
        vs.attrib_bufs = 0;
    }

    #[inline]
    fn invalidate_vertex_shader(vs: &mut JmVertexRecords, draw: &mut JmDrawRecords) {
        vs.attribs = 0;
        vs.attrib_bufs = 0;
        draw.link = ShaderLink::default();
    }

    #[inline]
    fn invalidate_fragment_shader(fs: &mut JmFragmentRecords, draw: &mut JmDrawRecords) {
        fs.rsd = 0;
        draw.link = ShaderLink::default();
    }
}

/// A GPU allocation made by the external allocator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GpuAllocation {
    /// GPU address of the allocation.
    pub gpu: DeviceAddress,

    /// Size of the allocation in bytes.
    pub size: DeviceSize,
}

/// Framebuffer resources of command-stream GPUs.
#[derive(Clone, Debug, Default)]
pub struct CsFramebufferResources {
    /// The framebuffer descriptors, one per layer, once allocated.
    pub fbds: Option<GpuAllocation>,

    /// GPU address of the tiler context, once allocated.
    pub tiler: DeviceAddress,
}

impl FramebufferResources for CsFramebufferResources {
    #[inline]
    fn init<'a>(&mut self, _views: impl IntoIterator<Item = &'a ImageView>) {
        self.fbds = None;
        self.tiler = 0;
    }
}

/// Per draw records of command-stream GPUs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CsDrawRecords {
    /// GPU address of the thread storage descriptor.
    pub tsd: DeviceAddress,
}

impl Arch for CommandStream {
    const NAME: &'static str = "command-stream";
    const META_TILE_SIZE: u32 = 32;

    type FramebufferResources = CsFramebufferResources;
    type VertexStageRecords = ();
    type FragmentStageRecords = ();
    type DrawRecords = CsDrawRecords;

    #[inline]
    fn invalidate_vertex_buffers(_vs: &mut ()) {}

    #[inline]
    fn invalidate_vertex_shader(_vs: &mut (), _draw: &mut CsDrawRecords) {}

    #[inline]
    fn invalidate_fragment_shader(_fs: &mut (), _draw: &mut CsDrawRecords) {}
}

#[cfg(test)]
mod tests {
    use super::{FramebufferResources, JmFramebufferResources};
    use crate::image::{BufferObjectHandle, ImageView, ImageViewCreateInfo};

    #[test]
    fn jm_bo_table_is_deduplicated() {
        let view = |bo| {
            ImageView::new(ImageViewCreateInfo {
                buffer_object: BufferObjectHandle(bo),
                ..Default::default()
            })
        };
        let views = [view(1), view(2), view(1), view(3)];

        let mut resources = JmFramebufferResources::default();
        resources.crc_valid[2] = true;
        resources.init(views.iter().map(|v| &**v));

        assert_eq!(
            resources.bos.as_slice(),
            &[BufferObjectHandle(1), BufferObjectHandle(2), BufferObjectHandle(3)],
        );
        assert!(resources.crc_valid.iter().all(|&valid| !valid));
    }
}
