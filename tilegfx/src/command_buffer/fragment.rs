// Copyright (c) 2024 The tilegfx developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Deciding whether the fragment shader has to run.
//!
//! Skipping the fragment stage saves the whole per-fragment shader invocation, but it is only
//! allowed when nothing the shader does can be observed. Each of the checks below corresponds to
//! one way the results can be observed.

use super::DynamicGraphicsState;
use crate::shader::ShaderInfo;

/// Returns whether the fragment shader `fs` must run for a draw made with `dyn_state`.
pub fn fs_required(fs: Option<&ShaderInfo>, dyn_state: &DynamicGraphicsState) -> bool {
    let fs_info = match fs {
        Some(info) if !dyn_state.rasterizer_discard_enable() => &info.fs,
        _ => return false,
    };

    // If we generally have side effects.
    if fs_info.side_effects {
        return true;
    }

    // If color is written we need to execute.
    let cb = dyn_state.color_blend();
    if (0..cb.attachment_count).any(|i| cb.writes_attachment(i)) {
        return true;
    }

    // With alpha-to-coverage, the computed alpha decides which samples survive, so depth and
    // stencil updates depend on the shader even with no color attachment.
    if dyn_state.alpha_to_coverage_enable() {
        return true;
    }

    // TODO: also predicate this on depth and stencil writes being enabled.
    fs_info.writes_depth || fs_info.writes_stencil
}

/// Returns `cached`, after checking in debug builds that it is still what `fs_required` would
/// return.
///
/// A mismatch means that some state affecting the decision was changed without marking the
/// fragment shader users dirty.
#[inline]
pub fn cached_fs_required(
    fs: Option<&ShaderInfo>,
    dyn_state: &DynamicGraphicsState,
    cached: bool,
) -> bool {
    debug_assert_eq!(
        fs_required(fs, dyn_state),
        cached,
        "cached fragment shader requirement is stale",
    );

    cached
}
