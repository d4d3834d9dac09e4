// Copyright (c) 2024 The tilegfx developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! The viewport transform.

/// The area of the framebuffer that clip coordinates are mapped to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    /// Coordinates in pixels of the top-left hand corner of the viewport.
    pub offset: [f32; 2],

    /// Dimensions in pixels of the viewport.
    pub extent: [f32; 2],

    /// Minimum and maximum values of the depth.
    pub depth_range: [f32; 2],
}

impl Viewport {
    /// Returns the scale applied to normalized device coordinates.
    #[inline]
    pub fn scale(&self) -> [f32; 3] {
        [
            0.5 * self.extent[0],
            0.5 * self.extent[1],
            self.depth_range[1] - self.depth_range[0],
        ]
    }

    /// Returns the offset added after scaling normalized device coordinates.
    #[inline]
    pub fn translate(&self) -> [f32; 3] {
        [
            self.offset[0] + 0.5 * self.extent[0],
            self.offset[1] + 0.5 * self.extent[1],
            self.depth_range[0],
        ]
    }
}

impl Default for Viewport {
    #[inline]
    fn default() -> Self {
        Self {
            offset: [0.0; 2],
            extent: [1.0; 2],
            depth_range: [0.0, 1.0],
        }
    }
}

impl From<Viewport> for ash::vk::Viewport {
    #[inline]
    fn from(val: Viewport) -> Self {
        ash::vk::Viewport {
            x: val.offset[0],
            y: val.offset[1],
            width: val.extent[0],
            height: val.extent[1],
            min_depth: val.depth_range[0],
            max_depth: val.depth_range[1],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Viewport;

    #[test]
    fn transform_maps_ndc_corners() {
        let viewport = Viewport {
            offset: [10.0, 20.0],
            extent: [100.0, 50.0],
            depth_range: [0.25, 0.75],
        };
        let scale = viewport.scale();
        let translate = viewport.translate();

        assert_eq!(-1.0 * scale[0] + translate[0], 10.0);
        assert_eq!(1.0 * scale[1] + translate[1], 70.0);
        assert_eq!(1.0 * scale[2] + translate[2], 0.75);
    }

    #[test]
    fn converts_to_vk() {
        let vk: ash::vk::Viewport = Viewport {
            offset: [10.0, 20.0],
            extent: [100.0, 50.0],
            depth_range: [0.25, 0.75],
        }
        .into();

        assert_eq!((vk.x, vk.y, vk.width, vk.height), (10.0, 20.0, 100.0, 50.0));
        assert_eq!((vk.min_depth, vk.max_depth), (0.25, 0.75));
    }
}
