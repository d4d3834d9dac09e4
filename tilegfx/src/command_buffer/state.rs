// Copyright (c) 2024 The tilegfx developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

use super::{
    fs_user_dirty, select_tiler_hierarchy_mask, Arch, AttachmentClear, DirtyBits,
    DynamicGraphicsState, GraphicsDirty, GraphicsSysvals, RenderingFlags, RenderingInfo,
    RenderingState, ResolveSink, TargetArch, MAX_VERTEX_BUFFERS,
};
use crate::{
    buffer::{Buffer, IndexType},
    descriptor_set::{DescriptorSetHandle, DescriptorState, ShaderDescState},
    device::TilerFeatures,
    pipeline::{
        graphics::{
            color_blend::BlendInfo, multisample::SampleLocationsState,
            vertex_input::VertexInputState,
        },
        DynamicState,
    },
    shader::{Shader, ShaderStage},
    DeviceAddress, DeviceSize, ValidationError,
};
use smallvec::SmallVec;
use std::sync::Arc;

/// A vertex buffer binding, as the attribute buffer descriptors see it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VertexBufferBinding {
    /// GPU address of the first byte of the binding.
    pub address: DeviceAddress,

    /// Number of bytes from `address` to the end of the buffer.
    pub size: DeviceSize,
}

/// The bound index buffer.
#[derive(Clone, Debug)]
pub struct IndexBufferBinding {
    pub buffer: Arc<Buffer>,
    pub offset: DeviceSize,
    pub index_type: IndexType,
}

impl IndexBufferBinding {
    /// Returns the GPU address of the index at `first_index`.
    #[inline]
    pub fn index_address(&self, first_index: u32) -> DeviceAddress {
        self.buffer
            .gpu_ptr(self.offset + first_index as DeviceSize * self.index_type.size() as DeviceSize)
    }
}

/// Vertex stage bindings.
#[derive(Clone, Debug, Default)]
pub struct VertexStage<A: Arch> {
    shader: Option<Arc<Shader>>,

    /// Descriptor tables of the stage.
    pub desc: ShaderDescState,

    /// Hardware records of the stage.
    pub records: A::VertexStageRecords,
}

impl<A: Arch> VertexStage<A> {
    /// Returns the bound vertex shader.
    #[inline]
    pub fn shader(&self) -> Option<&Arc<Shader>> {
        self.shader.as_ref()
    }
}

/// Fragment stage bindings.
#[derive(Clone, Debug, Default)]
pub struct FragmentStage<A: Arch> {
    pub(super) shader: Option<Arc<Shader>>,
    pub(super) required: bool,

    /// Descriptor tables of the stage.
    pub desc: ShaderDescState,

    /// Hardware records of the stage.
    pub records: A::FragmentStageRecords,
}

impl<A: Arch> FragmentStage<A> {
    /// Returns the bound fragment shader, whether or not it runs.
    #[inline]
    pub fn shader(&self) -> Option<&Arc<Shader>> {
        self.shader.as_ref()
    }

    /// Returns whether the bound fragment shader had to run the last time this was computed.
    #[inline]
    pub fn required(&self) -> bool {
        self.required
    }
}

#[derive(Clone, Copy, Debug)]
struct VertexBuffers {
    bufs: [VertexBufferBinding; MAX_VERTEX_BUFFERS],
    count: u32,
}

/// Graphics bindings of a command buffer, and what changed since the last draw.
///
/// One `GraphicsState` is created per command buffer and lives as long as the recording. The
/// `A` parameter picks the hardware generation, which decides the shape of the records kept in
/// [`VertexStage`], [`FragmentStage`] and the per-draw records.
#[derive(Debug)]
pub struct GraphicsState<A: Arch = TargetArch> {
    pub(super) desc_state: DescriptorState,
    pub(super) vertex_input: VertexInputState,
    pub(super) sample_locations: SampleLocationsState,
    pub(super) sysvals: GraphicsSysvals,
    pub(super) vs: VertexStage<A>,
    pub(super) fs: FragmentStage<A>,
    vb: VertexBuffers,
    pub(super) ib: Option<IndexBufferBinding>,
    blend: BlendInfo,
    render: RenderingState<A>,
    push_uniforms: DeviceAddress,
    pub(super) draw_records: A::DrawRecords,
    pub(super) dirty: DirtyBits<GraphicsDirty>,
}

impl<A: Arch> Default for GraphicsState<A> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Arch> GraphicsState<A> {
    /// Returns the state of a freshly started command buffer: nothing bound, and everything dirty
    /// so that the first draw emits all of its records.
    pub fn new() -> Self {
        GraphicsState {
            desc_state: DescriptorState::default(),
            vertex_input: VertexInputState::default(),
            sample_locations: SampleLocationsState::default(),
            sysvals: GraphicsSysvals::default(),
            vs: VertexStage::default(),
            fs: FragmentStage::default(),
            vb: VertexBuffers {
                bufs: [VertexBufferBinding::default(); MAX_VERTEX_BUFFERS],
                count: 0,
            },
            ib: None,
            blend: BlendInfo::default(),
            render: RenderingState::default(),
            push_uniforms: 0,
            draw_records: A::DrawRecords::default(),
            dirty: DirtyBits::all(),
        }
    }

    #[inline]
    pub fn descriptor_state(&self) -> &DescriptorState {
        &self.desc_state
    }

    /// Returns the vertex input state captured at the last draw.
    #[inline]
    pub fn vertex_input(&self) -> &VertexInputState {
        &self.vertex_input
    }

    /// Returns the sample locations captured at the last draw.
    #[inline]
    pub fn sample_locations(&self) -> &SampleLocationsState {
        &self.sample_locations
    }

    /// Returns the system values computed at the last draw.
    #[inline]
    pub fn sysvals(&self) -> &GraphicsSysvals {
        &self.sysvals
    }

    #[inline]
    pub fn vertex_stage(&self) -> &VertexStage<A> {
        &self.vs
    }

    /// Gives the encoder access to the vertex stage records it builds.
    #[inline]
    pub fn vertex_stage_mut(&mut self) -> &mut VertexStage<A> {
        &mut self.vs
    }

    #[inline]
    pub fn fragment_stage(&self) -> &FragmentStage<A> {
        &self.fs
    }

    /// Gives the encoder access to the fragment stage records it builds.
    #[inline]
    pub fn fragment_stage_mut(&mut self) -> &mut FragmentStage<A> {
        &mut self.fs
    }

    /// Returns the bound vertex buffers, up to the highest bound slot.
    #[inline]
    pub fn vertex_buffers(&self) -> &[VertexBufferBinding] {
        &self.vb.bufs[..self.vb.count as usize]
    }

    #[inline]
    pub fn index_buffer(&self) -> Option<&IndexBufferBinding> {
        self.ib.as_ref()
    }

    #[inline]
    pub fn blend_info(&self) -> &BlendInfo {
        &self.blend
    }

    #[inline]
    pub fn rendering(&self) -> &RenderingState<A> {
        &self.render
    }

    /// Gives the encoder access to the framebuffer resources it allocates.
    #[inline]
    pub fn rendering_mut(&mut self) -> &mut RenderingState<A> {
        &mut self.render
    }

    /// Returns the GPU address of the push uniform block of the last draw.
    #[inline]
    pub fn push_uniforms(&self) -> DeviceAddress {
        self.push_uniforms
    }

    /// Records where the encoder uploaded the push uniform block.
    #[inline]
    pub fn set_push_uniforms(&mut self, address: DeviceAddress) {
        self.push_uniforms = address;
    }

    #[inline]
    pub fn draw_records(&self) -> &A::DrawRecords {
        &self.draw_records
    }

    /// Gives the encoder access to the per-draw records it builds.
    #[inline]
    pub fn draw_records_mut(&mut self) -> &mut A::DrawRecords {
        &mut self.draw_records
    }

    /// Returns whether `category` changed since the last draw.
    #[inline]
    pub fn is_dirty(&self, category: GraphicsDirty) -> bool {
        self.dirty.test(category)
    }

    /// Marks `category` as changed.
    #[inline]
    pub fn set_dirty(&mut self, category: GraphicsDirty) {
        self.dirty.set(category);
    }

    /// Returns whether the records that depend on the fragment shader, or on whether it runs,
    /// must be rebuilt.
    #[inline]
    pub fn is_fs_user_dirty(&self, dyn_state: &DynamicGraphicsState) -> bool {
        fs_user_dirty(&self.dirty, dyn_state.dirty())
    }

    /// Returns the fragment shader the current draw runs, or `None` if it can be skipped.
    ///
    /// This reads the requirement cached by [`prepare_draw`](Self::prepare_draw). Debug builds
    /// check that the cached value is still correct for `dyn_state`.
    #[inline]
    pub fn effective_fragment_shader(
        &self,
        dyn_state: &DynamicGraphicsState,
    ) -> Option<&Arc<Shader>> {
        let fs = self.fs.shader.as_ref();
        let required =
            super::cached_fs_required(fs.map(|shader| shader.info()), dyn_state, self.fs.required);

        if required {
            fs
        } else {
            None
        }
    }

    /// Clears the dirty state after a draw has been emitted.
    ///
    /// Both the graphics and the dynamic dirty bits are cleared, along with the descriptor state.
    /// If a fragment shader is bound but was skipped for this draw, [`GraphicsDirty::FragmentShader`]
    /// stays set: the records emitted for this draw don't reference the shader, so the next draw
    /// that needs it must rebuild them.
    pub fn clear_dirty_after_draw(&mut self, dyn_state: &mut DynamicGraphicsState) {
        let set_fs_dirty = match (
            self.fs.shader.as_ref(),
            self.effective_fragment_shader(dyn_state),
        ) {
            (Some(bound), Some(effective)) => !Arc::ptr_eq(bound, effective),
            (None, None) => false,
            _ => true,
        };

        self.dirty.clear_all();
        dyn_state.clear_dirty();
        self.desc_state.clear_all_dirty();

        if set_fs_dirty {
            log::trace!("{}: fragment shader skipped, keeping it dirty", A::NAME);
            self.dirty.set(GraphicsDirty::FragmentShader);
        }
    }

    /// Returns the tiler hierarchy levels to enable for the current framebuffer.
    #[inline]
    pub fn tiler_hierarchy_mask(&self, tiler_features: &TilerFeatures) -> u32 {
        select_tiler_hierarchy_mask(
            self.render.fb.width,
            self.render.fb.height,
            tiler_features.max_levels,
        )
    }

    /// Starts a render pass.
    ///
    /// Returns the clears that the caller must perform explicitly at the start of the render
    /// pass, because the attachments they apply to are preloaded.
    pub fn begin_rendering(
        &mut self,
        render_info: &RenderingInfo,
        dyn_state: &mut DynamicGraphicsState,
    ) -> Result<SmallVec<[AttachmentClear; 4]>, Box<ValidationError>> {
        self.render
            .initialize(render_info)
            .map_err(|err| err.add_context("render_info"))?;

        let clears = if render_info.flags.intersects(RenderingFlags::RESUMING) {
            self.render.force_preload(render_info)
        } else {
            self.render.preload_border(render_info)
        };

        self.dirty.set(GraphicsDirty::RenderState);
        dyn_state.set_dirty(DynamicState::ColorAttachmentCount);

        Ok(clears)
    }

    /// Ends the current render pass, handing its resolves to `sink` unless the render pass is
    /// suspended.
    pub fn end_rendering(&mut self, sink: &mut impl ResolveSink) {
        if self.render.flags.intersects(RenderingFlags::SUSPENDING) {
            log::debug!("{}: render pass suspended, resolves deferred", A::NAME);
        } else {
            self.render.resolve_attachments(sink);
            log::debug!("{}: end rendering", A::NAME);
        }
    }

    /// Binds vertex buffers starting at slot `first_binding`. Each element of `buffers` is a
    /// buffer and the byte offset of the binding in it.
    pub fn bind_vertex_buffers(
        &mut self,
        first_binding: u32,
        buffers: &[(Arc<Buffer>, DeviceSize)],
    ) -> Result<&mut Self, Box<ValidationError>> {
        self.validate_bind_vertex_buffers(first_binding, buffers)?;

        unsafe { Ok(self.bind_vertex_buffers_unchecked(first_binding, buffers)) }
    }

    fn validate_bind_vertex_buffers(
        &self,
        first_binding: u32,
        buffers: &[(Arc<Buffer>, DeviceSize)],
    ) -> Result<(), Box<ValidationError>> {
        if first_binding as usize + buffers.len() > MAX_VERTEX_BUFFERS {
            return Err(Box::new(ValidationError {
                problem: format!(
                    "`first_binding` + the number of elements of `buffers` is greater than {}",
                    MAX_VERTEX_BUFFERS,
                )
                .into(),
                vuids: &["VUID-vkCmdBindVertexBuffers-firstBinding-00624"],
                ..Default::default()
            }));
        }

        for (index, (buffer, offset)) in buffers.iter().enumerate() {
            if *offset >= buffer.size() {
                return Err(Box::new(ValidationError {
                    context: format!("buffers[{}]", index).into(),
                    problem: "the offset is not less than the size of the buffer".into(),
                    vuids: &["VUID-vkCmdBindVertexBuffers-pOffsets-00626"],
                }));
            }
        }

        Ok(())
    }

    pub unsafe fn bind_vertex_buffers_unchecked(
        &mut self,
        first_binding: u32,
        buffers: &[(Arc<Buffer>, DeviceSize)],
    ) -> &mut Self {
        let first = first_binding as usize;

        for (slot, (buffer, offset)) in self.vb.bufs[first..].iter_mut().zip(buffers) {
            *slot = VertexBufferBinding {
                address: buffer.gpu_ptr(*offset),
                size: buffer.remaining(*offset),
            };
        }

        self.vb.count = self.vb.count.max((first + buffers.len()) as u32);
        self.dirty.set(GraphicsDirty::VertexBuffers);
        A::invalidate_vertex_buffers(&mut self.vs.records);

        self
    }

    /// Binds an index buffer.
    pub fn bind_index_buffer(
        &mut self,
        buffer: Arc<Buffer>,
        offset: DeviceSize,
        index_type: IndexType,
    ) -> Result<&mut Self, Box<ValidationError>> {
        self.validate_bind_index_buffer(&buffer, offset, index_type)?;

        unsafe { Ok(self.bind_index_buffer_unchecked(buffer, offset, index_type)) }
    }

    fn validate_bind_index_buffer(
        &self,
        buffer: &Buffer,
        offset: DeviceSize,
        index_type: IndexType,
    ) -> Result<(), Box<ValidationError>> {
        if offset >= buffer.size() {
            return Err(Box::new(ValidationError {
                context: "offset".into(),
                problem: "is not less than the size of the buffer".into(),
                vuids: &["VUID-vkCmdBindIndexBuffer-offset-08782"],
            }));
        }

        if offset % index_type.size() as DeviceSize != 0 {
            return Err(Box::new(ValidationError {
                context: "offset".into(),
                problem: "is not a multiple of the size of `index_type`".into(),
                vuids: &["VUID-vkCmdBindIndexBuffer-offset-08783"],
            }));
        }

        Ok(())
    }

    pub unsafe fn bind_index_buffer_unchecked(
        &mut self,
        buffer: Arc<Buffer>,
        offset: DeviceSize,
        index_type: IndexType,
    ) -> &mut Self {
        self.ib = Some(IndexBufferBinding {
            buffer,
            offset,
            index_type,
        });
        self.dirty.set(GraphicsDirty::IndexBuffer);

        self
    }

    /// Binds shaders to graphics stages. A `None` shader unbinds the stage.
    ///
    /// Rebinding the shader that is already bound to a stage does nothing.
    pub fn bind_shaders(
        &mut self,
        shaders: &[(ShaderStage, Option<Arc<Shader>>)],
    ) -> Result<&mut Self, Box<ValidationError>> {
        self.validate_bind_shaders(shaders)?;

        unsafe { Ok(self.bind_shaders_unchecked(shaders)) }
    }

    fn validate_bind_shaders(
        &self,
        shaders: &[(ShaderStage, Option<Arc<Shader>>)],
    ) -> Result<(), Box<ValidationError>> {
        for (index, (stage, shader)) in shaders.iter().enumerate() {
            if let Some(shader) = shader {
                if shader.stage() != *stage {
                    return Err(Box::new(ValidationError {
                        context: format!("shaders[{}]", index).into(),
                        problem: format!(
                            "the shader was compiled for the {:?} stage, but is bound to the {:?} \
                            stage",
                            shader.stage(),
                            stage,
                        )
                        .into(),
                        vuids: &["VUID-vkCmdBindShadersEXT-pShaders-08469"],
                    }));
                }
            }
        }

        Ok(())
    }

    pub unsafe fn bind_shaders_unchecked(
        &mut self,
        shaders: &[(ShaderStage, Option<Arc<Shader>>)],
    ) -> &mut Self {
        fn same(a: Option<&Arc<Shader>>, b: Option<&Arc<Shader>>) -> bool {
            match (a, b) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
        }

        for (stage, shader) in shaders {
            match stage {
                ShaderStage::Vertex => {
                    if !same(self.vs.shader.as_ref(), shader.as_ref()) {
                        self.vs.shader = shader.clone();
                        self.dirty.set(GraphicsDirty::VertexShader);
                        A::invalidate_vertex_shader(&mut self.vs.records, &mut self.draw_records);
                    }
                }
                ShaderStage::Fragment => {
                    if !same(self.fs.shader.as_ref(), shader.as_ref()) {
                        self.fs.shader = shader.clone();
                        self.dirty.set(GraphicsDirty::FragmentShader);
                        A::invalidate_fragment_shader(
                            &mut self.fs.records,
                            &mut self.draw_records,
                        );
                    }
                }
            }
        }

        self
    }

    /// Binds a descriptor set at index `set`.
    pub fn bind_descriptor_set(
        &mut self,
        set: u32,
        handle: DescriptorSetHandle,
    ) -> Result<&mut Self, Box<ValidationError>> {
        self.desc_state.bind_set(set, handle)?;
        self.dirty.set(GraphicsDirty::DescriptorState);

        Ok(self)
    }

    /// Updates the push constants at byte `offset`.
    pub fn push_constants(
        &mut self,
        offset: u32,
        data: &[u8],
    ) -> Result<&mut Self, Box<ValidationError>> {
        self.desc_state.push_constants(offset, data)?;
        self.dirty.set(GraphicsDirty::PushUniforms);

        Ok(self)
    }

    /// Records the summary of the blend descriptors built for the current blend state.
    #[inline]
    pub fn set_blend_info(&mut self, blend: BlendInfo) -> &mut Self {
        self.blend = blend;
        self.dirty.set(GraphicsDirty::RenderState);

        self
    }
}
