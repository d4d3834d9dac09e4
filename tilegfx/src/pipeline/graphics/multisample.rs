// Copyright (c) 2024 The tilegfx developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Multisampling state that can be set dynamically.

use crate::image::SampleCount;
use smallvec::SmallVec;

/// Custom sample locations.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleLocationsState {
    /// Whether custom sample locations are used at all. When `false`, the standard locations are
    /// used and the remaining fields are ignored.
    pub enable: bool,

    /// The number of samples per pixel the locations are given for.
    pub per_pixel: SampleCount,

    /// The size of the pixel grid the locations repeat over.
    pub grid_size: [u32; 2],

    /// Sample positions, in the `[0, 1)` range of a pixel.
    pub locations: SmallVec<[[f32; 2]; 16]>,
}

impl Default for SampleLocationsState {
    #[inline]
    fn default() -> Self {
        Self {
            enable: false,
            per_pixel: SampleCount::Sample1,
            grid_size: [1, 1],
            locations: SmallVec::new(),
        }
    }
}
