// Copyright (c) 2024 The tilegfx developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Formats of render attachments and vertex attributes.
//!
//! The tracker never interprets texel data; it only needs to know which aspects a format carries
//! so that depth and stencil attachments can be told apart.

use crate::macros::{vulkan_bitflags, vulkan_enum};

vulkan_enum! {
    /// The format of an attachment or a vertex attribute.
    Format impl {
        /// Returns the aspects that this format contains.
        #[inline]
        pub fn aspects(self) -> ImageAspects {
            match self {
                Format::D16_UNORM | Format::X8_D24_UNORM_PACK32 | Format::D32_SFLOAT => {
                    ImageAspects::DEPTH
                }
                Format::S8_UINT => ImageAspects::STENCIL,
                Format::D24_UNORM_S8_UINT | Format::D32_SFLOAT_S8_UINT => {
                    ImageAspects::DEPTH | ImageAspects::STENCIL
                }
                _ => ImageAspects::COLOR,
            }
        }

        /// Returns whether the format has a color aspect.
        #[inline]
        pub fn is_color(self) -> bool {
            self.aspects().intersects(ImageAspects::COLOR)
        }
    }
    = Format(i32);

    R8_UNORM = R8_UNORM,
    R8G8_UNORM = R8G8_UNORM,
    R5G6B5_UNORM_PACK16 = R5G6B5_UNORM_PACK16,
    R8G8B8A8_UNORM = R8G8B8A8_UNORM,
    R8G8B8A8_SRGB = R8G8B8A8_SRGB,
    B8G8R8A8_UNORM = B8G8R8A8_UNORM,
    B8G8R8A8_SRGB = B8G8R8A8_SRGB,
    A2B10G10R10_UNORM_PACK32 = A2B10G10R10_UNORM_PACK32,
    R16G16B16A16_SFLOAT = R16G16B16A16_SFLOAT,
    R32_UINT = R32_UINT,
    R32G32_SFLOAT = R32G32_SFLOAT,
    R32G32B32_SFLOAT = R32G32B32_SFLOAT,
    R32G32B32A32_SFLOAT = R32G32B32A32_SFLOAT,
    D16_UNORM = D16_UNORM,
    X8_D24_UNORM_PACK32 = X8_D24_UNORM_PACK32,
    D32_SFLOAT = D32_SFLOAT,
    S8_UINT = S8_UINT,
    D24_UNORM_S8_UINT = D24_UNORM_S8_UINT,
    D32_SFLOAT_S8_UINT = D32_SFLOAT_S8_UINT,
}

vulkan_bitflags! {
    /// An individual data type within an image.
    ImageAspects = ImageAspectFlags(u32);

    /// The color aspect of an image.
    COLOR = COLOR,

    /// The depth aspect of an image.
    DEPTH = DEPTH,

    /// The stencil aspect of an image.
    STENCIL = STENCIL,
}

#[cfg(test)]
mod tests {
    use super::{Format, ImageAspects};

    #[test]
    fn combined_depth_stencil_has_both_aspects() {
        let aspects = Format::D24_UNORM_S8_UINT.aspects();
        assert!(aspects.contains(ImageAspects::DEPTH | ImageAspects::STENCIL));
        assert!(!aspects.intersects(ImageAspects::COLOR));
    }

    #[test]
    fn raw_round_trip() {
        let raw: ash::vk::Format = Format::B8G8R8A8_SRGB.into();
        assert_eq!(raw, ash::vk::Format::B8G8R8A8_SRGB);
        assert_eq!(Format::try_from(ash::vk::Format::R8_SNORM), Err(()));
    }
}
