// Copyright (c) 2024 The tilegfx developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Compiled shaders, as seen by the draw path.
//!
//! Compilation happens elsewhere; what reaches the state tracker is the GPU address of the
//! binary and the metadata the compiler extracted from it.

use crate::{DeviceAddress, NonExhaustive};
use std::sync::Arc;

/// The graphics stage a shader is compiled for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Metadata reported by the compiler for a fragment shader.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FragmentShaderInfo {
    /// The shader has side effects beyond its color, depth and stencil outputs: storage writes,
    /// atomics, or discarding fragments in a way that affects other state.
    pub side_effects: bool,

    /// The shader writes to the fragment depth.
    pub writes_depth: bool,

    /// The shader writes to the fragment stencil reference.
    pub writes_stencil: bool,
}

/// Compiler metadata of a shader.
#[derive(Clone, Debug)]
pub struct ShaderInfo {
    /// The stage the shader was compiled for.
    ///
    /// The default value is [`ShaderStage::Vertex`].
    pub stage: ShaderStage,

    /// Fragment-specific information. Ignored for other stages.
    ///
    /// The default value is all `false`.
    pub fs: FragmentShaderInfo,

    pub _ne: NonExhaustive,
}

impl Default for ShaderInfo {
    #[inline]
    fn default() -> Self {
        Self {
            stage: ShaderStage::Vertex,
            fs: FragmentShaderInfo::default(),
            _ne: NonExhaustive(()),
        }
    }
}

/// A shader binary resident in GPU memory.
#[derive(Debug)]
pub struct Shader {
    code: DeviceAddress,
    info: ShaderInfo,
}

impl Shader {
    /// Wraps a compiled shader whose code lives at `code`.
    #[inline]
    pub fn new(code: DeviceAddress, info: ShaderInfo) -> Arc<Shader> {
        Arc::new(Shader { code, info })
    }

    /// Returns the GPU address of the shader code.
    #[inline]
    pub fn code(&self) -> DeviceAddress {
        self.code
    }

    /// Returns the compiler metadata.
    #[inline]
    pub fn info(&self) -> &ShaderInfo {
        &self.info
    }

    /// Returns the stage the shader was compiled for.
    #[inline]
    pub fn stage(&self) -> ShaderStage {
        self.info.stage
    }
}
