// Copyright (c) 2024 The tilegfx developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Descriptor binding state shared by the graphics stages.
//!
//! Descriptor sets are allocated and written outside of this crate. The draw path only needs to
//! know which sets are bound and which bindings changed since the descriptor tables were last
//! emitted; that is tracked here, independently of the graphics dirty bitset.

use crate::{DeviceAddress, ValidationError};

/// Maximum number of descriptor sets that can be bound at once.
pub const MAX_SETS: usize = 16;

/// Size in bytes of the push constant block.
pub const MAX_PUSH_CONSTANTS_SIZE: usize = 128;

/// A descriptor set resident in GPU memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DescriptorSetHandle {
    /// GPU address of the descriptors.
    pub descriptors: DeviceAddress,

    /// Number of descriptors in the set.
    pub descriptor_count: u32,
}

/// Bound descriptor sets and push constants.
#[derive(Clone, Debug)]
pub struct DescriptorState {
    sets: [Option<DescriptorSetHandle>; MAX_SETS],
    dirty_sets: u32,
    push_constants: [u8; MAX_PUSH_CONSTANTS_SIZE],
    push_constants_dirty: bool,
}

impl Default for DescriptorState {
    #[inline]
    fn default() -> Self {
        Self {
            sets: [None; MAX_SETS],
            dirty_sets: 0,
            push_constants: [0; MAX_PUSH_CONSTANTS_SIZE],
            push_constants_dirty: false,
        }
    }
}

impl DescriptorState {
    /// Returns the set bound at index `set`.
    #[inline]
    pub fn set(&self, set: u32) -> Option<&DescriptorSetHandle> {
        self.sets.get(set as usize).and_then(Option::as_ref)
    }

    /// Binds `handle` at index `set`.
    pub fn bind_set(
        &mut self,
        set: u32,
        handle: DescriptorSetHandle,
    ) -> Result<(), Box<ValidationError>> {
        if set as usize >= MAX_SETS {
            return Err(Box::new(ValidationError {
                context: "set".into(),
                problem: format!("is not less than the maximum of {} descriptor sets", MAX_SETS)
                    .into(),
                vuids: &["VUID-vkCmdBindDescriptorSets-firstSet-00360"],
            }));
        }

        self.sets[set as usize] = Some(handle);
        self.dirty_sets |= 1 << set;

        Ok(())
    }

    /// Writes `data` into the push constant block at byte `offset`.
    pub fn push_constants(&mut self, offset: u32, data: &[u8]) -> Result<(), Box<ValidationError>> {
        let start = offset as usize;
        let end = start + data.len();

        if start % 4 != 0 || data.len() % 4 != 0 {
            return Err(Box::new(ValidationError {
                context: "offset".into(),
                problem: "the offset or the size of the data is not a multiple of 4".into(),
                vuids: &[
                    "VUID-vkCmdPushConstants-offset-00368",
                    "VUID-vkCmdPushConstants-size-00369",
                ],
            }));
        }

        if end > MAX_PUSH_CONSTANTS_SIZE {
            return Err(Box::new(ValidationError {
                context: "data".into(),
                problem: format!(
                    "writes past the end of the {}-byte push constant block",
                    MAX_PUSH_CONSTANTS_SIZE,
                )
                .into(),
                vuids: &["VUID-vkCmdPushConstants-size-00371"],
            }));
        }

        self.push_constants[start..end].copy_from_slice(data);
        self.push_constants_dirty = true;

        Ok(())
    }

    /// Returns the contents of the push constant block.
    #[inline]
    pub fn push_constant_data(&self) -> &[u8; MAX_PUSH_CONSTANTS_SIZE] {
        &self.push_constants
    }

    /// Returns the mask of sets rebound since the last call to `clear_all_dirty`.
    #[inline]
    pub fn dirty_sets(&self) -> u32 {
        self.dirty_sets
    }

    /// Returns whether the push constants changed since the last call to `clear_all_dirty`.
    #[inline]
    pub fn push_constants_dirty(&self) -> bool {
        self.push_constants_dirty
    }

    /// Returns whether anything changed since the last call to `clear_all_dirty`.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty_sets != 0 || self.push_constants_dirty
    }

    /// Forgets about all changes.
    #[inline]
    pub fn clear_all_dirty(&mut self) {
        self.dirty_sets = 0;
        self.push_constants_dirty = false;
    }
}

/// Descriptor tables emitted for one shader stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShaderDescState {
    /// GPU address of the resource table.
    pub res_table: DeviceAddress,

    /// GPU address of the driver-internal descriptor set.
    pub driver_set: DeviceAddress,

    /// Size in bytes of the driver-internal descriptor set.
    pub driver_set_size: u32,
}

#[cfg(test)]
mod tests {
    use super::{DescriptorSetHandle, DescriptorState, MAX_SETS};

    const SET: DescriptorSetHandle = DescriptorSetHandle {
        descriptors: 0x8000,
        descriptor_count: 4,
    };

    #[test]
    fn bind_marks_set_dirty_until_cleared() {
        let mut state = DescriptorState::default();
        state.bind_set(3, SET).unwrap();

        assert_eq!(state.dirty_sets(), 1 << 3);
        assert_eq!(state.set(3), Some(&SET));

        state.clear_all_dirty();
        assert!(!state.is_dirty());
        assert_eq!(state.set(3), Some(&SET));
    }

    #[test]
    fn bind_out_of_range() {
        let mut state = DescriptorState::default();
        assert!(state.bind_set(MAX_SETS as u32, SET).is_err());
        assert!(!state.is_dirty());
    }

    #[test]
    fn push_constants_bounds_and_alignment() {
        let mut state = DescriptorState::default();
        assert!(state.push_constants(2, &[0; 4]).is_err());
        assert!(state.push_constants(124, &[0; 8]).is_err());

        state.push_constants(4, &[1, 2, 3, 4]).unwrap();
        assert!(state.push_constants_dirty());
        assert_eq!(&state.push_constant_data()[4..8], &[1, 2, 3, 4]);
    }
}
