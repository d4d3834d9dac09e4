// Copyright (c) 2024 The tilegfx developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Per-draw graphics state tracking for command buffer builders targeting tile-based GPUs.
//!
//! # Brief summary
//!
//! - A [`GraphicsState`](crate::command_buffer::GraphicsState) is created once per command
//!   buffer. It holds everything the draw path needs to know about the currently bound shaders,
//!   vertex and index buffers, blend state and render attachments.
//!
//! - At the start of a render pass, the render-pass driver calls
//!   [`begin_rendering`](crate::command_buffer::GraphicsState::begin_rendering), which fills the
//!   [`RenderingState`](crate::command_buffer::RenderingState) and decides which attachments
//!   need their previous contents preloaded into the tile buffers.
//!
//! - Every bind call marks one or more categories of the graphics dirty bitset. Before a draw,
//!   [`prepare_draw`](crate::command_buffer::GraphicsState::prepare_draw) works out which
//!   hardware records must be re-emitted, whether the fragment shader needs to run at all, and
//!   which tiler hierarchy levels to enable for the current framebuffer.
//!
//! - After the draw, [`finish_draw`](crate::command_buffer::GraphicsState::finish_draw) clears
//!   the dirty state, keeping the fragment shader dirty if the draw skipped it so that the next
//!   draw which does need it re-emits the records pointing at it.
//!
//! The layout of some records differs between hardware generations. This is selected at build
//! time through the [`Arch`](crate::command_buffer::Arch) type parameter, with
//! [`TargetArch`](crate::command_buffer::TargetArch) naming the generation picked by the
//! `job-manager` cargo feature.

pub use ash::vk::{DeviceAddress, DeviceSize};
use std::{
    borrow::Cow,
    error::Error,
    fmt::{Debug, Display, Error as FmtError, Formatter},
};

mod macros;
pub mod buffer;
pub mod command_buffer;
pub mod descriptor_set;
pub mod device;
pub mod format;
pub mod image;
pub mod pipeline;
pub mod shader;

/// A helper type for non-exhaustive structs.
///
/// This type cannot be constructed outside tilegfx. Structures with a field of this type can only
/// be constructed by calling a constructor function or `Default::default()`. The effect is similar
/// to the standard Rust `#[non_exhaustive]` attribute, except that it does not prevent update
/// syntax from being used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)] // add traits as needed
pub struct NonExhaustive(pub(crate) ());

/// The arguments or other context of a call to a tilegfx function were not valid.
#[derive(Clone, Default)]
pub struct ValidationError {
    /// The context in which the problem exists (e.g. a specific parameter).
    pub context: Cow<'static, str>,

    /// A description of the problem.
    pub problem: Cow<'static, str>,

    /// Identifiers of the Vulkan valid usage rules that the problem corresponds to, if any.
    pub vuids: &'static [&'static str],
}

impl ValidationError {
    fn prepend_context(&mut self, prefix: &str) {
        if self.context.is_empty() {
            self.context = prefix.to_owned().into();
        } else {
            self.context = format!("{}.{}", prefix, self.context).into();
        }
    }

    pub(crate) fn add_context(mut self: Box<Self>, context: impl Into<Cow<'static, str>>) -> Box<Self> {
        self.prepend_context(&context.into());
        self
    }
}

impl Debug for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        if self.context.is_empty() {
            write!(f, "{}", self.problem)?;
        } else {
            write!(f, "{}: {}", self.context, self.problem)?;
        }

        if !self.vuids.is_empty() {
            write!(f, "\n\nVulkan VUIDs:")?;

            for vuid in self.vuids {
                write!(f, "\n    {}", vuid)?;
            }
        }

        Ok(())
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        if self.context.is_empty() {
            write!(f, "{}", self.problem)
        } else {
            write!(f, "{}: {}", self.context, self.problem)
        }
    }
}

impl Error for ValidationError {}
