// Copyright (c) 2024 The tilegfx developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Image views used as render attachments.
//!
//! Image and memory lifetime are managed outside of this crate. An [`ImageView`] only records the
//! properties the state tracker needs: the format, the sample count, the size of the viewed mip
//! level and the kernel buffer object that backs the image.

use crate::{
    format::{Format, ImageAspects},
    macros::vulkan_enum,
    NonExhaustive,
};
use std::sync::Arc;

vulkan_enum! {
    /// The number of samples per texel of an image.
    SampleCount impl {
        /// Returns the number of samples as an integer.
        #[inline]
        pub const fn count(self) -> u32 {
            self as u32
        }
    }
    = SampleCountFlags(u32);

    /// 1 sample per texel.
    Sample1 = TYPE_1,

    /// 2 samples per texel.
    Sample2 = TYPE_2,

    /// 4 samples per texel.
    Sample4 = TYPE_4,

    /// 8 samples per texel.
    Sample8 = TYPE_8,

    /// 16 samples per texel.
    Sample16 = TYPE_16,
}

impl Default for SampleCount {
    #[inline]
    fn default() -> Self {
        SampleCount::Sample1
    }
}

/// Handle of a kernel buffer object backing an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferObjectHandle(pub u32);

/// Parameters to create a new `ImageView`.
#[derive(Clone, Debug)]
pub struct ImageViewCreateInfo {
    /// The format of the view.
    ///
    /// The default value is [`Format::R8G8B8A8_UNORM`].
    pub format: Format,

    /// The number of samples of the underlying image.
    ///
    /// The default value is [`SampleCount::Sample1`].
    pub samples: SampleCount,

    /// The extent of mip level 0 of the underlying image.
    ///
    /// The default value is `[1, 1]`.
    pub extent: [u32; 2],

    /// The first mip level of the view.
    ///
    /// The default value is `0`.
    pub base_mip_level: u32,

    /// The number of array layers covered by the view.
    ///
    /// The default value is `1`.
    pub array_layers: u32,

    /// The buffer object holding the image memory.
    ///
    /// The default value is `BufferObjectHandle(0)`.
    pub buffer_object: BufferObjectHandle,

    pub _ne: NonExhaustive,
}

impl Default for ImageViewCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            format: Format::R8G8B8A8_UNORM,
            samples: SampleCount::Sample1,
            extent: [1, 1],
            base_mip_level: 0,
            array_layers: 1,
            buffer_object: BufferObjectHandle(0),
            _ne: NonExhaustive(()),
        }
    }
}

/// A view of an image that can be bound as a color, depth or stencil attachment.
#[derive(Debug)]
pub struct ImageView {
    format: Format,
    samples: SampleCount,
    extent: [u32; 2],
    base_mip_level: u32,
    array_layers: u32,
    buffer_object: BufferObjectHandle,
}

impl ImageView {
    /// Creates a new `ImageView`.
    pub fn new(create_info: ImageViewCreateInfo) -> Arc<ImageView> {
        let ImageViewCreateInfo {
            format,
            samples,
            extent,
            base_mip_level,
            array_layers,
            buffer_object,
            _ne: _,
        } = create_info;

        Arc::new(ImageView {
            format,
            samples,
            extent,
            base_mip_level,
            array_layers,
            buffer_object,
        })
    }

    /// Returns the format of the view.
    #[inline]
    pub fn format(&self) -> Format {
        self.format
    }

    /// Returns the aspects of the view's format.
    #[inline]
    pub fn aspects(&self) -> ImageAspects {
        self.format.aspects()
    }

    /// Returns the sample count of the underlying image.
    #[inline]
    pub fn samples(&self) -> SampleCount {
        self.samples
    }

    /// Returns the extent of the viewed mip level.
    #[inline]
    pub fn mip_extent(&self) -> [u32; 2] {
        self.extent
            .map(|dim| (dim >> self.base_mip_level.min(31)).max(1))
    }

    /// Returns the number of array layers covered by the view.
    #[inline]
    pub fn array_layers(&self) -> u32 {
        self.array_layers
    }

    /// Returns the buffer object backing the image.
    #[inline]
    pub fn buffer_object(&self) -> BufferObjectHandle {
        self.buffer_object
    }
}

#[cfg(test)]
mod tests {
    use super::{ImageView, ImageViewCreateInfo, SampleCount};

    #[test]
    fn mip_extent_never_reaches_zero() {
        let view = ImageView::new(ImageViewCreateInfo {
            extent: [640, 3],
            base_mip_level: 2,
            ..Default::default()
        });

        assert_eq!(view.mip_extent(), [160, 1]);
    }

    #[test]
    fn sample_count_matches_raw_bits() {
        assert_eq!(SampleCount::Sample4.count(), 4);
        assert_eq!(
            ash::vk::SampleCountFlags::from(SampleCount::Sample16),
            ash::vk::SampleCountFlags::TYPE_16,
        );
    }
}
