// Copyright (c) 2024 The tilegfx developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Buffers bound as vertex or index sources.
//!
//! Buffer memory is allocated and kept resident by the caller. The tracker only reads the GPU
//! address and size of a buffer when it is bound.

use crate::{macros::vulkan_enum, DeviceAddress, DeviceSize};
use std::sync::Arc;

/// A buffer that has been bound to GPU memory.
#[derive(Debug)]
pub struct Buffer {
    device_address: DeviceAddress,
    size: DeviceSize,
}

impl Buffer {
    /// Wraps a buffer living at `device_address` with a size of `size` bytes.
    #[inline]
    pub fn new(device_address: DeviceAddress, size: DeviceSize) -> Arc<Buffer> {
        Arc::new(Buffer {
            device_address,
            size,
        })
    }

    /// Returns the GPU address of the start of the buffer.
    #[inline]
    pub fn device_address(&self) -> DeviceAddress {
        self.device_address
    }

    /// Returns the size of the buffer in bytes.
    #[inline]
    pub fn size(&self) -> DeviceSize {
        self.size
    }

    /// Returns the GPU address of the byte at `offset`.
    #[inline]
    pub fn gpu_ptr(&self, offset: DeviceSize) -> DeviceAddress {
        self.device_address + offset
    }

    /// Returns the number of bytes available from `offset` until the end of the buffer.
    #[inline]
    pub fn remaining(&self, offset: DeviceSize) -> DeviceSize {
        self.size.saturating_sub(offset)
    }
}

vulkan_enum! {
    /// The type of the indices in an index buffer.
    IndexType impl {
        /// Returns the size in bytes of one index of this type.
        #[inline]
        pub const fn size(self) -> u8 {
            match self {
                IndexType::U8 => 1,
                IndexType::U16 => 2,
                IndexType::U32 => 4,
            }
        }
    }
    = IndexType(i32);

    /// Indices are 8-bit unsigned integers.
    U8 = UINT8_EXT,

    /// Indices are 16-bit unsigned integers.
    U16 = UINT16,

    /// Indices are 32-bit unsigned integers.
    U32 = UINT32,
}

#[cfg(test)]
mod tests {
    use super::{Buffer, IndexType};

    #[test]
    fn remaining_saturates_past_the_end() {
        let buffer = Buffer::new(0x1000, 256);
        assert_eq!(buffer.gpu_ptr(16), 0x1010);
        assert_eq!(buffer.remaining(16), 240);
        assert_eq!(buffer.remaining(512), 0);
    }

    #[test]
    fn index_sizes() {
        assert_eq!(IndexType::U8.size(), 1);
        assert_eq!(IndexType::U16.size(), 2);
        assert_eq!(IndexType::U32.size(), 4);
    }
}
