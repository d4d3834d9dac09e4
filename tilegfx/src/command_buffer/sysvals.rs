// Copyright (c) 2024 The tilegfx developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! System values handed to shaders through the push uniform block.

use super::{DrawInfo, DynamicGraphicsState};
use bytemuck::{Pod, Zeroable};

/// Values that shaders read from the push uniform block but that aren't push constants.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Zeroable, Pod)]
pub struct GraphicsSysvals {
    /// The constant color used by blend shaders.
    pub blend_constants: [f32; 4],

    /// Scale applied to normalized device coordinates.
    pub viewport_scale: [f32; 3],

    /// Offset added to scaled normalized device coordinates.
    pub viewport_offset: [f32; 3],

    /// The base vertex of the draw, as seen by the vertex shader.
    ///
    /// Non-indexed draws store the bits of their unsigned first vertex, so values past
    /// `i32::MAX` read back negative.
    pub first_vertex: i32,

    /// The first instance of the draw.
    pub base_instance: u32,

    /// The offset the hardware adds to each index. Zero for non-indexed draws, where the vertex
    /// ids already start at `first_vertex`.
    pub raw_vertex_offset: i32,

    /// The layer rendered to.
    pub layer_id: u32,
}

impl GraphicsSysvals {
    /// Computes the system values of a draw.
    pub fn new(dyn_state: &DynamicGraphicsState, draw_info: &DrawInfo) -> Self {
        let viewport = dyn_state.viewport();
        let (first_vertex, raw_vertex_offset) = if draw_info.indexed {
            (draw_info.vertex_offset, draw_info.vertex_offset)
        } else {
            (bytemuck::cast(draw_info.first_vertex), 0)
        };

        GraphicsSysvals {
            blend_constants: dyn_state.color_blend().blend_constants,
            viewport_scale: viewport.scale(),
            viewport_offset: viewport.translate(),
            first_vertex,
            base_instance: draw_info.first_instance,
            raw_vertex_offset,
            layer_id: draw_info.layer_id,
        }
    }

    /// Returns the values as they are laid out in the push uniform block.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

#[cfg(test)]
mod tests {
    use super::GraphicsSysvals;
    use crate::{
        command_buffer::{DrawInfo, DynamicGraphicsState},
        pipeline::graphics::viewport::Viewport,
    };

    #[test]
    fn layout_is_packed() {
        assert_eq!(std::mem::size_of::<GraphicsSysvals>(), 56);

        let sysvals = GraphicsSysvals {
            layer_id: 3,
            ..Default::default()
        };
        assert_eq!(&sysvals.as_bytes()[52..], &3u32.to_ne_bytes());
    }

    #[test]
    fn indexed_draws_use_vertex_offset() {
        let mut dyn_state = DynamicGraphicsState::new();
        dyn_state.set_blend_constants([0.25, 0.5, 0.75, 1.0]);
        dyn_state.set_viewport(Viewport {
            offset: [0.0, 0.0],
            extent: [200.0, 100.0],
            depth_range: [0.0, 1.0],
        });

        let indexed = GraphicsSysvals::new(
            &dyn_state,
            &DrawInfo {
                vertex_count: 6,
                indexed: true,
                first_vertex: 7,
                vertex_offset: -4,
                first_instance: 2,
                ..Default::default()
            },
        );
        assert_eq!(indexed.first_vertex, -4);
        assert_eq!(indexed.raw_vertex_offset, -4);
        assert_eq!(indexed.base_instance, 2);
        assert_eq!(indexed.blend_constants, [0.25, 0.5, 0.75, 1.0]);
        assert_eq!(indexed.viewport_scale, [100.0, 50.0, 1.0]);

        let direct = GraphicsSysvals::new(
            &dyn_state,
            &DrawInfo {
                vertex_count: 6,
                first_vertex: 7,
                ..Default::default()
            },
        );
        assert_eq!(direct.first_vertex, 7);
        assert_eq!(direct.raw_vertex_offset, 0);
    }

    #[test]
    fn large_first_vertex_keeps_its_bits() {
        let dyn_state = DynamicGraphicsState::new();

        for (first_vertex, expected) in [(u32::MAX, -1), (0x8000_0000, i32::MIN)] {
            let sysvals = GraphicsSysvals::new(
                &dyn_state,
                &DrawInfo {
                    vertex_count: 3,
                    first_vertex,
                    ..Default::default()
                },
            );
            assert_eq!(sysvals.first_vertex, expected);
            assert_eq!(&sysvals.as_bytes()[40..44], &first_vertex.to_ne_bytes());
        }
    }
}
