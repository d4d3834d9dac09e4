// Copyright (c) 2024 The tilegfx developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Physical device capabilities consulted while recording.

use crate::NonExhaustive;

/// Properties of the tiler unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TilerFeatures {
    /// Maximum number of binning hierarchy levels that can be enabled at once.
    ///
    /// The default value is `8`.
    pub max_levels: u32,

    pub _ne: NonExhaustive,
}

impl Default for TilerFeatures {
    #[inline]
    fn default() -> Self {
        Self {
            max_levels: 8,
            _ne: NonExhaustive(()),
        }
    }
}

/// The subset of a physical device that the state tracker queries.
#[derive(Clone, Debug)]
pub struct PhysicalDevice {
    gpu_id: u32,
    tiler_features: TilerFeatures,
}

impl PhysicalDevice {
    /// Describes a physical device with the product id `gpu_id` and the given tiler.
    #[inline]
    pub fn new(gpu_id: u32, tiler_features: TilerFeatures) -> Self {
        PhysicalDevice {
            gpu_id,
            tiler_features,
        }
    }

    /// Returns the GPU product id.
    #[inline]
    pub fn gpu_id(&self) -> u32 {
        self.gpu_id
    }

    /// Returns the properties of the tiler.
    #[inline]
    pub fn tiler_features(&self) -> &TilerFeatures {
        &self.tiler_features
    }
}
