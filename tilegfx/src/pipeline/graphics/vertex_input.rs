// Copyright (c) 2024 The tilegfx developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Configures how data from vertex buffers is read into vertex shader input locations.

use crate::format::Format;
use smallvec::SmallVec;

/// How the vertex source in a vertex buffer should be iterated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexInputRate {
    /// Each element of the source corresponds to a vertex.
    Vertex,

    /// Each element of the source corresponds to an instance.
    ///
    /// `divisor` indicates how many consecutive instances will use the same instance buffer data.
    Instance { divisor: u32 },
}

/// Describes a single vertex buffer binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexInputBindingDescription {
    /// The number of bytes from the start of one element in the vertex buffer to the next.
    pub stride: u32,

    /// How often the vertex input should advance to the next element.
    pub input_rate: VertexInputRate,
}

/// Describes a single vertex attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexInputAttributeDescription {
    /// The vertex buffer binding number that this attribute should take its data from.
    pub binding: u32,

    /// The size and type of the vertex data.
    pub format: Format,

    /// Number of bytes between the start of a vertex buffer element and the location of the
    /// attribute.
    pub offset: u32,
}

/// Snapshot of the vertex input layout.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VertexInputState {
    /// `(binding, description)` pairs, sorted by binding.
    pub bindings: SmallVec<[(u32, VertexInputBindingDescription); 4]>,

    /// `(location, description)` pairs, sorted by location.
    pub attributes: SmallVec<[(u32, VertexInputAttributeDescription); 8]>,
}

impl VertexInputState {
    /// Constructs a `VertexInputState` with no bindings or attributes.
    #[inline]
    pub fn new() -> VertexInputState {
        VertexInputState::default()
    }

    /// Adds a single binding, replacing any previous description of the same binding.
    pub fn binding(mut self, binding: u32, description: VertexInputBindingDescription) -> Self {
        match self.bindings.binary_search_by_key(&binding, |&(b, _)| b) {
            Ok(i) => self.bindings[i].1 = description,
            Err(i) => self.bindings.insert(i, (binding, description)),
        }
        self
    }

    /// Adds a single attribute, replacing any previous description of the same location.
    pub fn attribute(
        mut self,
        location: u32,
        description: VertexInputAttributeDescription,
    ) -> Self {
        match self.attributes.binary_search_by_key(&location, |&(l, _)| l) {
            Ok(i) => self.attributes[i].1 = description,
            Err(i) => self.attributes.insert(i, (location, description)),
        }
        self
    }

    /// Returns the description of `binding`, if any.
    #[inline]
    pub fn binding_description(&self, binding: u32) -> Option<&VertexInputBindingDescription> {
        self.bindings
            .binary_search_by_key(&binding, |&(b, _)| b)
            .ok()
            .map(|i| &self.bindings[i].1)
    }
}
