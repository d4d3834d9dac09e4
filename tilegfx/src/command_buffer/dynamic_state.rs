// Copyright (c) 2024 The tilegfx developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Dynamic graphics pipeline state.
//!
//! This is the state the application sets with the `vkCmdSet*` family of commands, or that the
//! bound pipeline sets on its behalf. Values are validated by the layer feeding this struct; here
//! they are only stored, and every setter marks its [`DynamicState`] category dirty when the
//! value actually changes.

use super::{DirtyBits, MAX_COLOR_ATTACHMENTS};
use crate::{
    pipeline::{
        graphics::{
            color_blend::{ColorBlendState, ColorComponents},
            multisample::SampleLocationsState,
            vertex_input::VertexInputState,
            viewport::Viewport,
        },
        DynamicState,
    },
    ValidationError,
};

/// Current values and dirty bits of the dynamic graphics state.
#[derive(Clone, Debug, Default)]
pub struct DynamicGraphicsState {
    rasterizer_discard_enable: bool,
    color_blend: ColorBlendState,
    alpha_to_coverage_enable: bool,
    vertex_input: VertexInputState,
    sample_locations: SampleLocationsState,
    viewport: Viewport,
    dirty: DirtyBits<DynamicState>,
}

macro_rules! set_dyn_value {
    ($self:ident, $state:ident, $field:expr, $value:expr) => {
        if $field != $value {
            $field = $value;
            $self.dirty.set(DynamicState::$state);
        }
    };
}

impl DynamicGraphicsState {
    /// Returns a state with default values and every category dirty, as it is at the start of a
    /// command buffer.
    #[inline]
    pub fn new() -> Self {
        DynamicGraphicsState {
            dirty: DirtyBits::all(),
            ..Default::default()
        }
    }

    /// Returns the dirty bits.
    #[inline]
    pub fn dirty(&self) -> &DirtyBits<DynamicState> {
        &self.dirty
    }

    /// Returns whether `state` changed since the last call to `clear_dirty`.
    #[inline]
    pub fn is_dirty(&self, state: DynamicState) -> bool {
        self.dirty.test(state)
    }

    /// Clears every dirty bit.
    #[inline]
    pub fn clear_dirty(&mut self) {
        self.dirty.clear_all();
    }

    /// Marks `state` dirty without changing its value.
    #[inline]
    pub fn set_dirty(&mut self, state: DynamicState) {
        self.dirty.set(state);
    }

    /// Marks every category dirty, e.g. after executing a secondary command buffer.
    #[inline]
    pub fn set_all_dirty(&mut self) {
        self.dirty.set_all();
    }

    #[inline]
    pub fn rasterizer_discard_enable(&self) -> bool {
        self.rasterizer_discard_enable
    }

    #[inline]
    pub fn color_blend(&self) -> &ColorBlendState {
        &self.color_blend
    }

    #[inline]
    pub fn alpha_to_coverage_enable(&self) -> bool {
        self.alpha_to_coverage_enable
    }

    #[inline]
    pub fn vertex_input(&self) -> &VertexInputState {
        &self.vertex_input
    }

    #[inline]
    pub fn sample_locations(&self) -> &SampleLocationsState {
        &self.sample_locations
    }

    #[inline]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn set_rasterizer_discard_enable(&mut self, enable: bool) {
        set_dyn_value!(self, RasterizerDiscardEnable, self.rasterizer_discard_enable, enable);
    }

    /// Sets the number of color attachments the blend state applies to.
    pub fn set_color_attachment_count(
        &mut self,
        count: u32,
    ) -> Result<(), Box<ValidationError>> {
        if count as usize > MAX_COLOR_ATTACHMENTS {
            return Err(Box::new(ValidationError {
                context: "count".into(),
                problem: format!(
                    "is greater than the maximum of {} color attachments",
                    MAX_COLOR_ATTACHMENTS,
                )
                .into(),
                ..Default::default()
            }));
        }

        set_dyn_value!(self, ColorAttachmentCount, self.color_blend.attachment_count, count);

        Ok(())
    }

    /// Sets the color write enables. Element `i` applies to attachment `i`; attachments past the
    /// end of `enables` are disabled.
    pub fn set_color_write_enable(&mut self, enables: &[bool]) -> Result<(), Box<ValidationError>> {
        if enables.len() > MAX_COLOR_ATTACHMENTS {
            return Err(Box::new(ValidationError {
                context: "enables".into(),
                problem: "has more elements than there are color attachments".into(),
                vuids: &["VUID-vkCmdSetColorWriteEnableEXT-attachmentCount-06656"],
            }));
        }

        let mask = enables
            .iter()
            .enumerate()
            .fold(0u8, |mask, (i, &enable)| mask | (u8::from(enable) << i));
        set_dyn_value!(self, ColorWriteEnable, self.color_blend.color_write_enables, mask);

        Ok(())
    }

    /// Sets the write masks of attachments `first_attachment..first_attachment + masks.len()`.
    pub fn set_color_write_mask(
        &mut self,
        first_attachment: u32,
        masks: &[ColorComponents],
    ) -> Result<(), Box<ValidationError>> {
        let first = first_attachment as usize;

        if first + masks.len() > MAX_COLOR_ATTACHMENTS {
            return Err(Box::new(ValidationError {
                context: "first_attachment + masks.len()".into(),
                problem: "is greater than the number of color attachments".into(),
                ..Default::default()
            }));
        }

        for (attachment, &mask) in self.color_blend.attachments[first..].iter_mut().zip(masks) {
            set_dyn_value!(self, ColorWriteMask, attachment.write_mask, mask);
        }

        Ok(())
    }

    /// Sets the blend enables of attachments
    /// `first_attachment..first_attachment + enables.len()`.
    pub fn set_color_blend_enable(
        &mut self,
        first_attachment: u32,
        enables: &[bool],
    ) -> Result<(), Box<ValidationError>> {
        let first = first_attachment as usize;

        if first + enables.len() > MAX_COLOR_ATTACHMENTS {
            return Err(Box::new(ValidationError {
                context: "first_attachment + enables.len()".into(),
                problem: "is greater than the number of color attachments".into(),
                ..Default::default()
            }));
        }

        for (attachment, &enable) in self.color_blend.attachments[first..].iter_mut().zip(enables)
        {
            set_dyn_value!(self, ColorBlendEnable, attachment.blend_enable, enable);
        }

        Ok(())
    }

    pub fn set_alpha_to_coverage_enable(&mut self, enable: bool) {
        set_dyn_value!(self, AlphaToCoverageEnable, self.alpha_to_coverage_enable, enable);
    }

    pub fn set_blend_constants(&mut self, constants: [f32; 4]) {
        set_dyn_value!(self, BlendConstants, self.color_blend.blend_constants, constants);
    }

    pub fn set_vertex_input(&mut self, vertex_input: VertexInputState) {
        set_dyn_value!(self, VertexInput, self.vertex_input, vertex_input);
    }

    pub fn set_sample_locations(&mut self, sample_locations: SampleLocationsState) {
        set_dyn_value!(self, SampleLocations, self.sample_locations, sample_locations);
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        set_dyn_value!(self, Viewport, self.viewport, viewport);
    }
}

#[cfg(test)]
mod tests {
    use super::DynamicGraphicsState;
    use crate::pipeline::{graphics::color_blend::ColorComponents, DynamicState};

    #[test]
    fn starts_all_dirty() {
        let state = DynamicGraphicsState::new();
        assert!(state.is_dirty(DynamicState::RasterizerDiscardEnable));
        assert!(state.is_dirty(DynamicState::SampleLocations));
    }

    #[test]
    fn unchanged_value_stays_clean() {
        let mut state = DynamicGraphicsState::new();
        state.clear_dirty();

        state.set_rasterizer_discard_enable(false);
        state.set_alpha_to_coverage_enable(false);
        assert!(state.dirty().is_empty());

        state.set_alpha_to_coverage_enable(true);
        assert!(state.is_dirty(DynamicState::AlphaToCoverageEnable));
        assert!(!state.is_dirty(DynamicState::RasterizerDiscardEnable));
    }

    #[test]
    fn color_write_enable_packs_bits() {
        let mut state = DynamicGraphicsState::new();
        state.clear_dirty();

        state.set_color_write_enable(&[true, false, true]).unwrap();
        assert_eq!(state.color_blend().color_write_enables, 0b101);
        assert!(state.is_dirty(DynamicState::ColorWriteEnable));

        assert!(state.set_color_write_enable(&[true; 9]).is_err());
    }

    #[test]
    fn color_write_mask_range() {
        let mut state = DynamicGraphicsState::new();
        state.clear_dirty();

        state
            .set_color_write_mask(6, &[ColorComponents::R, ColorComponents::empty()])
            .unwrap();
        assert_eq!(state.color_blend().attachments[6].write_mask, ColorComponents::R);
        assert!(state.color_blend().attachments[7].write_mask.is_empty());
        assert!(state.is_dirty(DynamicState::ColorWriteMask));

        assert!(state
            .set_color_write_mask(7, &[ColorComponents::R, ColorComponents::G])
            .is_err());
    }

    #[test]
    fn color_blend_enable_range() {
        let mut state = DynamicGraphicsState::new();
        state.clear_dirty();

        state.set_color_blend_enable(1, &[true, false]).unwrap();
        assert!(state.color_blend().attachments[1].blend_enable);
        assert!(!state.color_blend().attachments[2].blend_enable);
        assert!(state.is_dirty(DynamicState::ColorBlendEnable));
        assert!(!state.is_dirty(DynamicState::ColorWriteMask));

        state.clear_dirty();
        state.set_color_blend_enable(1, &[true]).unwrap();
        assert!(state.dirty().is_empty());

        assert!(state.set_color_blend_enable(8, &[true]).is_err());
    }

    #[test]
    fn set_all_dirty_keeps_values() {
        let mut state = DynamicGraphicsState::new();
        state.set_rasterizer_discard_enable(true);
        state.clear_dirty();

        state.set_all_dirty();
        assert!(state.is_dirty(DynamicState::RasterizerDiscardEnable));
        assert!(state.is_dirty(DynamicState::DepthBias));
        assert!(state.rasterizer_discard_enable());
    }

    #[test]
    fn attachment_count_limit() {
        let mut state = DynamicGraphicsState::new();
        state.clear_dirty();

        state.set_color_attachment_count(8).unwrap();
        assert!(state.is_dirty(DynamicState::ColorAttachmentCount));
        assert!(state.set_color_attachment_count(9).is_err());
    }
}
