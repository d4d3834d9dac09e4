// Copyright (c) 2024 The tilegfx developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Configures how the color output of the fragment shader is written to the attachments.

use crate::{command_buffer::MAX_COLOR_ATTACHMENTS, macros::vulkan_bitflags};

vulkan_bitflags! {
    /// A mask specifying color components that can be written to a framebuffer attachment.
    ColorComponents = ColorComponentFlags(u32);

    /// The red component.
    R = R,

    /// The green component.
    G = G,

    /// The blue component.
    B = B,

    /// The alpha component.
    A = A,
}

/// The blend and output state of one color attachment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorBlendAttachmentState {
    /// Whether blending is enabled for this attachment.
    pub blend_enable: bool,

    /// Which components of the attachment are written.
    pub write_mask: ColorComponents,
}

impl Default for ColorBlendAttachmentState {
    #[inline]
    fn default() -> Self {
        Self {
            blend_enable: false,
            write_mask: ColorComponents::all(),
        }
    }
}

/// The color blend state as it is set dynamically.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorBlendState {
    /// The number of color attachments whose entries below are meaningful.
    pub attachment_count: u32,

    /// Bit `i` enables color writes to attachment `i`.
    pub color_write_enables: u8,

    /// Per-attachment state.
    pub attachments: [ColorBlendAttachmentState; MAX_COLOR_ATTACHMENTS],

    /// The constant color used by the constant blend factors.
    pub blend_constants: [f32; 4],
}

impl ColorBlendState {
    /// Returns whether attachment `index` has both its color-write-enable bit set and a
    /// non-empty write mask. Indices at or past `attachment_count` are never written.
    #[inline]
    pub fn writes_attachment(&self, index: u32) -> bool {
        index < self.attachment_count
            && (index as usize) < MAX_COLOR_ATTACHMENTS
            && self.color_write_enables & (1 << index) != 0
            && !self.attachments[index as usize].write_mask.is_empty()
    }
}

impl Default for ColorBlendState {
    #[inline]
    fn default() -> Self {
        Self {
            attachment_count: 0,
            color_write_enables: u8::MAX,
            attachments: [ColorBlendAttachmentState::default(); MAX_COLOR_ATTACHMENTS],
            blend_constants: [0.0; 4],
        }
    }
}

/// Summary of the blend configuration, produced when blend descriptors are built.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlendInfo {
    /// At least one attachment reads back the destination color.
    pub any_dest_read: bool,

    /// At least one attachment needs a blend shader because the fixed-function blender can't
    /// express its equation.
    pub needs_shader: bool,

    /// A blend shader reads the blend constants.
    pub shader_loads_blend_const: bool,
}

#[cfg(test)]
mod tests {
    use super::{ColorBlendState, ColorComponents};

    #[test]
    fn write_needs_enable_bit_and_mask() {
        let mut cb = ColorBlendState {
            attachment_count: 2,
            color_write_enables: 0b01,
            ..Default::default()
        };
        assert!(cb.writes_attachment(0));
        assert!(!cb.writes_attachment(1));

        cb.attachments[0].write_mask = ColorComponents::empty();
        assert!(!cb.writes_attachment(0));
    }

    #[test]
    fn attachments_past_count_are_ignored() {
        let cb = ColorBlendState {
            attachment_count: 1,
            ..Default::default()
        };
        assert!(cb.writes_attachment(0));
        assert!(!cb.writes_attachment(1));
        assert!(!cb.writes_attachment(9));
    }
}
