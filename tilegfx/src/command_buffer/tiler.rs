// Copyright (c) 2024 The tilegfx developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Sizing of the tiler's binning hierarchy.
//!
//! The tiler sorts primitives into bins at several levels of coarseness. Level 0 uses bins of
//! 16x16 pixels, and each level above doubles the bin size. A level is enabled by setting its bit
//! in the hierarchy mask.

/// Size in pixels of the bins of hierarchy level 0.
pub const MIN_BIN_SIZE: u32 = 16;

/// Returns the hierarchy mask to use for a framebuffer of `width` x `height` pixels on a tiler
/// supporting `max_levels` levels at once.
///
/// The level whose single bin covers the whole framebuffer is always enabled. When the
/// framebuffer needs more levels than the hardware provides, the finest levels are dropped. This
/// is suboptimal for small primitives, since they may be walked for tiles they don't cover, but
/// the draw pattern is unknown at this point.
pub fn select_tiler_hierarchy_mask(width: u32, height: u32, max_levels: u32) -> u32 {
    let max_dim = width.max(height);
    let tiles = max_dim.div_ceil(MIN_BIN_SIZE);
    let needed_levels = u32::BITS - tiles.leading_zeros();

    let mut hierarchy_mask = if max_levels >= u32::BITS {
        u32::MAX
    } else {
        (1 << max_levels) - 1
    };

    if needed_levels > max_levels {
        hierarchy_mask <<= needed_levels - max_levels;
    }

    hierarchy_mask
}

#[cfg(test)]
mod tests {
    use super::select_tiler_hierarchy_mask;

    #[test]
    fn fits_without_shift() {
        // 16 tiles across, 5 levels needed.
        assert_eq!(select_tiler_hierarchy_mask(256, 256, 8), 0xFF);
    }

    #[test]
    fn drops_finest_level() {
        // 256 tiles across, 9 levels needed.
        assert_eq!(select_tiler_hierarchy_mask(4096, 4096, 8), 0x1FE);
    }

    #[test]
    fn uses_larger_dimension() {
        assert_eq!(
            select_tiler_hierarchy_mask(4096, 16, 8),
            select_tiler_hierarchy_mask(16, 4096, 8),
        );
        // 512 tiles, 10 levels needed, 2 dropped.
        assert_eq!(select_tiler_hierarchy_mask(8192, 1, 8), 0x3FC);
    }

    #[test]
    fn partial_tiles_round_up() {
        // 17 pixels is 2 tiles: 2 levels needed.
        assert_eq!(select_tiler_hierarchy_mask(17, 1, 1), 0b10);
        assert_eq!(select_tiler_hierarchy_mask(16, 1, 1), 0b1);
    }

    #[test]
    fn coarsest_level_always_enabled() {
        for max_levels in 1..=12 {
            for dim in [1u32, 15, 16, 100, 1000, 4096, 16384, 65535] {
                let needed = 32 - dim.div_ceil(16).leading_zeros();
                let mask = select_tiler_hierarchy_mask(dim, dim, max_levels);

                assert_eq!(mask.count_ones(), max_levels);
                assert_ne!(mask & (1 << (needed.max(max_levels) - 1)), 0);
            }
        }
    }

    #[test]
    fn degenerate_inputs() {
        assert_eq!(select_tiler_hierarchy_mask(0, 0, 8), 0xFF);
        assert_eq!(select_tiler_hierarchy_mask(4096, 4096, 0), 0);
        assert_eq!(select_tiler_hierarchy_mask(1, 1, 32), u32::MAX);
    }
}
