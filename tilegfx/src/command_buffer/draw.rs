// Copyright (c) 2024 The tilegfx developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Per-draw preparation.
//!
//! The draw driver calls [`GraphicsState::prepare_draw`] before encoding a draw, emits the
//! records listed in the returned [`DrawPlan`], then calls [`GraphicsState::finish_draw`].

use super::{
    fs_required, Arch, DirtyBits, DynamicGraphicsState, GraphicsDirty, GraphicsState,
    GraphicsSysvals,
};
use crate::{
    device::TilerFeatures, pipeline::DynamicState, shader::Shader, DeviceAddress, NonExhaustive,
    ValidationError,
};
use std::sync::Arc;

/// Parameters of a draw.
#[derive(Clone, Debug)]
pub struct DrawInfo {
    /// The number of vertices to draw, or of indices for indexed draws.
    ///
    /// The default value is `0`.
    pub vertex_count: u32,

    /// The number of instances to draw.
    ///
    /// The default value is `1`.
    pub instance_count: u32,

    /// The first vertex of non-indexed draws.
    ///
    /// The default value is `0`.
    pub first_vertex: u32,

    /// The first instance.
    ///
    /// The default value is `0`.
    pub first_instance: u32,

    /// Whether vertices are fetched through the bound index buffer.
    ///
    /// The default value is `false`.
    pub indexed: bool,

    /// The first index of indexed draws.
    ///
    /// The default value is `0`.
    pub first_index: u32,

    /// The value added to each index of indexed draws.
    ///
    /// The default value is `0`.
    pub vertex_offset: i32,

    /// The layer rendered to.
    ///
    /// The default value is `0`.
    pub layer_id: u32,

    pub _ne: NonExhaustive,
}

impl Default for DrawInfo {
    #[inline]
    fn default() -> Self {
        Self {
            vertex_count: 0,
            instance_count: 1,
            first_vertex: 0,
            first_instance: 0,
            indexed: false,
            first_index: 0,
            vertex_offset: 0,
            layer_id: 0,
            _ne: NonExhaustive(()),
        }
    }
}

/// What the encoder has to emit for a draw.
#[derive(Clone, Debug)]
pub struct DrawPlan {
    /// The fragment shader to run, or `None` if the draw skips the fragment stage.
    pub fragment_shader: Option<Arc<Shader>>,

    /// The graphics state categories whose records must be rebuilt.
    pub dirty: DirtyBits<GraphicsDirty>,

    /// Whether the records depending on the fragment shader, or on whether it runs, must be
    /// rebuilt.
    pub fs_user_dirty: bool,

    /// The tiler hierarchy levels to enable.
    pub tiler_hierarchy_mask: u32,

    /// For indexed draws, the size in bytes of one index.
    pub index_size: Option<u8>,

    /// For indexed draws, the GPU address of the first index.
    pub index_address: Option<DeviceAddress>,
}

impl<A: Arch> GraphicsState<A> {
    /// Brings the state up to date for a draw and returns what must be emitted for it.
    ///
    /// Returns `Ok(None)` if the draw has no vertices or no instances; nothing needs to be
    /// emitted, and the dirty state is kept for the next draw.
    pub fn prepare_draw(
        &mut self,
        dyn_state: &mut DynamicGraphicsState,
        draw_info: &DrawInfo,
        tiler_features: &TilerFeatures,
    ) -> Result<Option<DrawPlan>, Box<ValidationError>> {
        if draw_info.indexed && self.ib.is_none() {
            return Err(Box::new(ValidationError {
                context: "draw_info.indexed".into(),
                problem: "is `true`, but no index buffer is bound".into(),
                vuids: &["VUID-vkCmdDrawIndexed-None-07312"],
            }));
        }

        if draw_info.vertex_count == 0 || draw_info.instance_count == 0 {
            return Ok(None);
        }

        let fs_user_dirty = self.is_fs_user_dirty(dyn_state);

        if fs_user_dirty {
            let required = fs_required(
                self.fs.shader().map(|shader| shader.info()),
                dyn_state,
            );

            if required != self.fs.required {
                log::trace!(
                    "{}: fragment shader {}",
                    A::NAME,
                    if required { "enabled" } else { "elided" },
                );
                A::invalidate_fragment_shader(&mut self.fs.records, &mut self.draw_records);
            }

            self.fs.required = required;
        }

        if dyn_state.is_dirty(DynamicState::VertexInput) {
            self.vertex_input = dyn_state.vertex_input().clone();
            A::invalidate_vertex_buffers(&mut self.vs.records);
        }

        if dyn_state.is_dirty(DynamicState::SampleLocations) {
            self.sample_locations = dyn_state.sample_locations().clone();
        }

        let sysvals = GraphicsSysvals::new(dyn_state, draw_info);

        if sysvals != self.sysvals {
            self.sysvals = sysvals;
            self.dirty.set(GraphicsDirty::PushUniforms);
        }

        let (index_size, index_address) = match (&self.ib, draw_info.indexed) {
            (Some(ib), true) => (
                Some(ib.index_type.size()),
                Some(ib.index_address(draw_info.first_index)),
            ),
            _ => (None, None),
        };

        Ok(Some(DrawPlan {
            fragment_shader: self.effective_fragment_shader(dyn_state).cloned(),
            dirty: self.dirty,
            fs_user_dirty,
            tiler_hierarchy_mask: self.tiler_hierarchy_mask(tiler_features),
            index_size,
            index_address,
        }))
    }

    /// Clears the dirty state once the draw prepared by `prepare_draw` has been emitted.
    #[inline]
    pub fn finish_draw(&mut self, dyn_state: &mut DynamicGraphicsState) {
        self.clear_dirty_after_draw(dyn_state);
    }
}

#[cfg(test)]
mod tests {
    use super::DrawInfo;
    use crate::{
        buffer::IndexType,
        command_buffer::{
            CommandStream, DirtyIndex, DynamicGraphicsState, GraphicsDirty, GraphicsState,
            JmVertexRecords, JobManager,
        },
        device::TilerFeatures,
        pipeline::graphics::vertex_input::{
            VertexInputBindingDescription, VertexInputRate, VertexInputState,
        },
        shader::ShaderStage,
    };

    #[test]
    fn first_draw_emits_everything() {
        let mut state = GraphicsState::<CommandStream>::new();
        let mut dyn_state = DynamicGraphicsState::new();
        dyn_state.set_color_attachment_count(1).unwrap();
        state
            .bind_shaders(&[
                (ShaderStage::Vertex, Some(vertex_shader!())),
                (ShaderStage::Fragment, Some(fragment_shader!())),
            ])
            .unwrap();

        let plan = state
            .prepare_draw(
                &mut dyn_state,
                &DrawInfo {
                    vertex_count: 3,
                    ..Default::default()
                },
                &TilerFeatures::default(),
            )
            .unwrap()
            .unwrap();

        assert!(plan.fs_user_dirty);
        assert_eq!(plan.fragment_shader.as_ref().map(|fs| fs.code()), Some(0x20000));
        assert!(GraphicsDirty::ALL.iter().all(|&c| plan.dirty.test(c)));
        assert_eq!(plan.index_size, None);

        state.finish_draw(&mut dyn_state);

        let plan = state
            .prepare_draw(
                &mut dyn_state,
                &DrawInfo {
                    vertex_count: 3,
                    ..Default::default()
                },
                &TilerFeatures::default(),
            )
            .unwrap()
            .unwrap();

        assert!(!plan.fs_user_dirty);
        assert!(plan.dirty.is_empty());
    }

    #[test]
    fn empty_draws_are_dropped() {
        let mut state = GraphicsState::<CommandStream>::new();
        let mut dyn_state = DynamicGraphicsState::new();

        let plan = state
            .prepare_draw(
                &mut dyn_state,
                &DrawInfo {
                    vertex_count: 3,
                    instance_count: 0,
                    ..Default::default()
                },
                &TilerFeatures::default(),
            )
            .unwrap();

        assert!(plan.is_none());
        assert!(state.is_dirty(GraphicsDirty::VertexShader));
    }

    #[test]
    fn indexed_draw_needs_index_buffer() {
        let mut state = GraphicsState::<JobManager>::new();
        let mut dyn_state = DynamicGraphicsState::new();
        let draw_info = DrawInfo {
            vertex_count: 6,
            indexed: true,
            first_index: 2,
            ..Default::default()
        };

        assert!(state
            .prepare_draw(&mut dyn_state, &draw_info, &TilerFeatures::default())
            .is_err());

        let buffer = buffer!(64);
        state
            .bind_index_buffer(buffer.clone(), 8, IndexType::U16)
            .unwrap();

        let plan = state
            .prepare_draw(&mut dyn_state, &draw_info, &TilerFeatures::default())
            .unwrap()
            .unwrap();

        assert_eq!(plan.index_size, Some(2));
        assert_eq!(plan.index_address, Some(buffer.gpu_ptr(12)));
    }

    #[test]
    fn sysvals_change_dirties_push_uniforms() {
        let mut state = GraphicsState::<CommandStream>::new();
        let mut dyn_state = DynamicGraphicsState::new();
        let draw = |first_instance| DrawInfo {
            vertex_count: 3,
            first_instance,
            ..Default::default()
        };

        state
            .prepare_draw(&mut dyn_state, &draw(0), &TilerFeatures::default())
            .unwrap();
        state.finish_draw(&mut dyn_state);

        let plan = state
            .prepare_draw(&mut dyn_state, &draw(0), &TilerFeatures::default())
            .unwrap()
            .unwrap();
        assert!(!plan.dirty.test(GraphicsDirty::PushUniforms));
        state.finish_draw(&mut dyn_state);

        let plan = state
            .prepare_draw(&mut dyn_state, &draw(5), &TilerFeatures::default())
            .unwrap()
            .unwrap();
        assert!(plan.dirty.test(GraphicsDirty::PushUniforms));
        assert_eq!(state.sysvals().base_instance, 5);
    }

    #[test]
    fn vertex_input_is_captured() {
        let mut state = GraphicsState::<JobManager>::new();
        let mut dyn_state = DynamicGraphicsState::new();
        let vertex_input = VertexInputState::new().binding(
            0,
            VertexInputBindingDescription {
                stride: 16,
                input_rate: VertexInputRate::Vertex,
            },
        );

        state.vertex_stage_mut().records.attrib_bufs = 0x8000;
        dyn_state.set_vertex_input(vertex_input.clone());

        state
            .prepare_draw(
                &mut dyn_state,
                &DrawInfo {
                    vertex_count: 3,
                    ..Default::default()
                },
                &TilerFeatures::default(),
            )
            .unwrap();

        assert_eq!(state.vertex_input(), &vertex_input);
        assert_eq!(state.vertex_stage().records, JmVertexRecords::default());
    }
}
