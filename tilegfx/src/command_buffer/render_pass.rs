// Copyright (c) 2024 The tilegfx developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Render attachments of the current render pass.
//!
//! At the start of a render pass, [`RenderingState::initialize`] records which attachments are
//! bound and builds the [`FramebufferInfo`] the tiler and the fragment jobs are configured from.
//! Tile-based GPUs load attachment contents into the tile buffers only when asked to, so the
//! render-pass driver then decides which attachments must be preloaded
//! ([`force_preload`](RenderingState::force_preload),
//! [`preload_border`](RenderingState::preload_border)). At the end of the render pass,
//! [`resolve_attachments`](RenderingState::resolve_attachments) hands the multisample resolves
//! to the command encoder.

use super::{Arch, FramebufferResources, MAX_COLOR_ATTACHMENTS};
use crate::{
    format::{Format, ImageAspects},
    image::{ImageView, SampleCount},
    macros::{vulkan_bitflags, vulkan_enum},
    NonExhaustive, ValidationError,
};
use smallvec::SmallVec;
use std::{
    fmt::{Debug, Error as FmtError, Formatter},
    sync::Arc,
};

vulkan_bitflags! {
    /// Flags specifying how a render pass instance relates to others.
    RenderingFlags = RenderingFlags(u32);

    /// The contents of the render pass are recorded in secondary command buffers.
    CONTENTS_SECONDARY_COMMAND_BUFFERS = CONTENTS_SECONDARY_COMMAND_BUFFERS,

    /// The render pass will be resumed by a later render pass instance.
    SUSPENDING = SUSPENDING,

    /// The render pass resumes an earlier, suspended, render pass instance.
    RESUMING = RESUMING,
}

vulkan_enum! {
    /// Describes what the implementation should do with an attachment at the start of rendering.
    LoadOp = AttachmentLoadOp(i32);

    /// The content of the attachment will be loaded from memory.
    Load = LOAD,

    /// The content of the attachment will be filled by the implementation with a uniform value
    /// that you must provide when you start rendering.
    Clear = CLEAR,

    /// The attachment will have undefined content.
    DontCare = DONT_CARE,
}

vulkan_enum! {
    /// Describes what the implementation should do with an attachment after all the subpasses
    /// have completed.
    StoreOp = AttachmentStoreOp(i32);

    /// The attachment will be stored.
    Store = STORE,

    /// What happens is implementation-specific. The content of the attachment is undefined
    /// afterwards.
    DontCare = DONT_CARE,
}

vulkan_enum! {
    /// Possible resolve modes for attachments.
    ResolveMode = ResolveModeFlags(u32);

    /// The value of the first sample is used.
    SampleZero = SAMPLE_ZERO,

    /// The average value of all samples is used.
    Average = AVERAGE,

    /// The minimum value of all samples is used.
    Min = MIN,

    /// The maximum value of all samples is used.
    Max = MAX,
}

/// The value an attachment is cleared to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClearValue {
    /// Value for floating-point and normalized color attachments.
    Float([f32; 4]),

    /// Value for signed integer color attachments.
    Int([i32; 4]),

    /// Value for unsigned integer color attachments.
    Uint([u32; 4]),

    /// Value for depth and stencil attachments.
    DepthStencil { depth: f32, stencil: u32 },
}

/// Set of attachments bound to a render pass.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AttachmentMask(u16);

impl AttachmentMask {
    /// The depth attachment.
    pub const DEPTH: Self = Self(1 << MAX_COLOR_ATTACHMENTS);

    /// The stencil attachment.
    pub const STENCIL: Self = Self(1 << (MAX_COLOR_ATTACHMENTS + 1));

    #[inline]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Returns the mask holding color attachment `index`.
    #[inline]
    pub const fn color(index: usize) -> Self {
        debug_assert!(index < MAX_COLOR_ATTACHMENTS);
        Self(1 << index)
    }

    /// Returns the mask holding every color attachment.
    #[inline]
    pub const fn all_colors() -> Self {
        Self((1 << MAX_COLOR_ATTACHMENTS) - 1)
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl std::ops::BitOr for AttachmentMask {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl Debug for AttachmentMask {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        let mut list = f.debug_list();

        for i in 0..MAX_COLOR_ATTACHMENTS {
            if self.intersects(Self::color(i)) {
                list.entry(&format_args!("COLOR{}", i));
            }
        }

        if self.intersects(Self::DEPTH) {
            list.entry(&format_args!("DEPTH"));
        }

        if self.intersects(Self::STENCIL) {
            list.entry(&format_args!("STENCIL"));
        }

        list.finish()
    }
}

/// Parameters to begin rendering.
#[derive(Clone, Debug)]
pub struct RenderingInfo {
    /// How this render pass instance relates to others.
    ///
    /// The default value is empty.
    pub flags: RenderingFlags,

    /// The offset from the top left corner of the attachments that will be rendered to.
    ///
    /// The default value is `[0, 0]`.
    pub render_area_offset: [u32; 2],

    /// The size of the area that will be rendered to.
    ///
    /// If one of the elements is set to 0, it is calculated from the framebuffer size to be the
    /// largest allowed.
    ///
    /// The default value is `[0, 0]`.
    pub render_area_extent: [u32; 2],

    /// The number of layers of the attachments that will be rendered to.
    ///
    /// If set to 0, the number of layers is the smallest number of array layers of the
    /// attachment views, or 1 if there are none.
    ///
    /// The default value is `0`.
    pub layer_count: u32,

    /// The color attachments to use for rendering. At most
    /// [`MAX_COLOR_ATTACHMENTS`](super::MAX_COLOR_ATTACHMENTS) elements.
    ///
    /// The default value is empty.
    pub color_attachments: Vec<Option<RenderingAttachmentInfo>>,

    /// The depth attachment to use for rendering.
    ///
    /// The default value is `None`.
    pub depth_attachment: Option<RenderingAttachmentInfo>,

    /// The stencil attachment to use for rendering. It may use a different view than the depth
    /// attachment.
    ///
    /// The default value is `None`.
    pub stencil_attachment: Option<RenderingAttachmentInfo>,

    pub _ne: NonExhaustive,
}

impl Default for RenderingInfo {
    #[inline]
    fn default() -> Self {
        Self {
            flags: RenderingFlags::empty(),
            render_area_offset: [0, 0],
            render_area_extent: [0, 0],
            layer_count: 0,
            color_attachments: Vec::new(),
            depth_attachment: None,
            stencil_attachment: None,
            _ne: NonExhaustive(()),
        }
    }
}

impl RenderingInfo {
    pub(crate) fn validate(&self) -> Result<(), Box<ValidationError>> {
        if self.color_attachments.len() > MAX_COLOR_ATTACHMENTS {
            return Err(Box::new(ValidationError {
                context: "color_attachments".into(),
                problem: format!(
                    "the number of elements is greater than {}",
                    MAX_COLOR_ATTACHMENTS,
                )
                .into(),
                vuids: &["VUID-VkRenderingInfo-colorAttachmentCount-06106"],
            }));
        }

        for (index, attachment_info) in self
            .color_attachments
            .iter()
            .enumerate()
            .filter_map(|(i, a)| a.as_ref().map(|a| (i, a)))
        {
            attachment_info
                .validate()
                .map_err(|err| err.add_context(format!("color_attachments[{}]", index)))?;
        }

        if let Some(attachment_info) = &self.depth_attachment {
            attachment_info
                .validate()
                .map_err(|err| err.add_context("depth_attachment"))?;
        }

        if let Some(attachment_info) = &self.stencil_attachment {
            attachment_info
                .validate()
                .map_err(|err| err.add_context("stencil_attachment"))?;
        }

        Ok(())
    }
}

/// Parameters to specify properties of an attachment.
#[derive(Clone, Debug)]
pub struct RenderingAttachmentInfo {
    /// The image view to use as the attachment.
    ///
    /// There is no default value.
    pub image_view: Arc<ImageView>,

    /// The resolve operation that should be performed at the end of rendering.
    ///
    /// The default value is `None`.
    pub resolve_info: Option<RenderingAttachmentResolveInfo>,

    /// What the implementation should do with the attachment at the start of rendering.
    ///
    /// The default value is [`LoadOp::DontCare`].
    pub load_op: LoadOp,

    /// What the implementation should do with the attachment at the end of rendering.
    ///
    /// The default value is [`StoreOp::DontCare`].
    pub store_op: StoreOp,

    /// If `load_op` is [`LoadOp::Clear`], specifies the clear value that should be used for the
    /// attachment.
    ///
    /// If `load_op` is something else, provide `None`.
    ///
    /// The default value is `None`.
    pub clear_value: Option<ClearValue>,

    pub _ne: NonExhaustive,
}

impl RenderingAttachmentInfo {
    /// Returns a `RenderingAttachmentInfo` with the specified `image_view`.
    #[inline]
    pub fn image_view(image_view: Arc<ImageView>) -> Self {
        Self {
            image_view,
            resolve_info: None,
            load_op: LoadOp::DontCare,
            store_op: StoreOp::DontCare,
            clear_value: None,
            _ne: NonExhaustive(()),
        }
    }

    fn validate(&self) -> Result<(), Box<ValidationError>> {
        match (self.load_op, self.clear_value) {
            (LoadOp::Clear, None) => Err(Box::new(ValidationError {
                problem: "`load_op` is `LoadOp::Clear`, but `clear_value` is `None`".into(),
                ..Default::default()
            })),
            (LoadOp::Load | LoadOp::DontCare, Some(_)) => Err(Box::new(ValidationError {
                problem: "`load_op` is not `LoadOp::Clear`, but `clear_value` is `Some`".into(),
                ..Default::default()
            })),
            _ => Ok(()),
        }
    }
}

/// Parameters to specify the resolve behavior of an attachment.
#[derive(Clone, Debug)]
pub struct RenderingAttachmentResolveInfo {
    /// How the resolve operation should be performed.
    ///
    /// The default value is [`ResolveMode::Average`].
    pub mode: ResolveMode,

    /// The image view that the result of the resolve operation should be written to.
    ///
    /// There is no default value.
    pub image_view: Arc<ImageView>,
}

impl RenderingAttachmentResolveInfo {
    /// Returns a `RenderingAttachmentResolveInfo` with the specified `image_view`.
    #[inline]
    pub fn image_view(image_view: Arc<ImageView>) -> Self {
        Self {
            mode: ResolveMode::Average,
            image_view,
        }
    }
}

/// A pending resolve of a bound attachment.
#[derive(Clone, Debug)]
pub struct RenderingAttachmentResolve {
    /// How the samples are combined.
    pub mode: ResolveMode,

    /// The single-sample view receiving the result.
    pub dst_view: Arc<ImageView>,
}

impl From<&RenderingAttachmentResolveInfo> for RenderingAttachmentResolve {
    #[inline]
    fn from(info: &RenderingAttachmentResolveInfo) -> Self {
        RenderingAttachmentResolve {
            mode: info.mode,
            dst_view: info.image_view.clone(),
        }
    }
}

/// A bound color attachment.
#[derive(Clone, Debug)]
pub struct ColorAttachment {
    pub view: Arc<ImageView>,
    pub format: Format,
    pub samples: SampleCount,
    pub resolve: Option<RenderingAttachmentResolve>,
}

/// A bound depth or stencil attachment.
#[derive(Clone, Debug)]
pub struct DepthStencilAttachment {
    pub view: Arc<ImageView>,
    pub format: Format,
    pub resolve: Option<RenderingAttachmentResolve>,
}

/// Inclusive pixel bounds of the render area.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderArea {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl RenderArea {
    /// Returns whether the render area starts and ends on the edges of `tile_size`-sized tiles,
    /// or on the edges of the framebuffer.
    pub fn is_aligned(&self, tile_size: u32, width: u32, height: u32) -> bool {
        (self.min_x | self.min_y) % tile_size == 0
            && (self.max_x + 1 == width || self.max_x % tile_size == tile_size - 1)
            && (self.max_y + 1 == height || self.max_y % tile_size == tile_size - 1)
    }
}

/// Tile buffer configuration of one color render target.
#[derive(Clone, Debug, Default)]
pub struct RenderTarget {
    pub view: Option<Arc<ImageView>>,
    /// Cleared to `clear_value` at the start of each tile.
    pub clear: bool,
    pub clear_value: Option<ClearValue>,
    /// Loaded from memory at the start of each tile.
    pub preload: bool,
    /// Not written back at the end of each tile.
    pub discard: bool,
}

/// Tile buffer configuration of the depth and stencil targets.
#[derive(Clone, Debug, Default)]
pub struct DepthStencilTarget {
    /// The depth or combined depth/stencil view.
    pub view_zs: Option<Arc<ImageView>>,
    /// A separate stencil-only view.
    pub view_s: Option<Arc<ImageView>>,
    pub clear_z: bool,
    pub clear_s: bool,
    pub clear_depth: f32,
    pub clear_stencil: u32,
    pub preload_z: bool,
    pub preload_s: bool,
    pub discard_z: bool,
    pub discard_s: bool,
}

/// The consolidated framebuffer description the tiler and fragment jobs are built from.
#[derive(Clone, Debug)]
pub struct FramebufferInfo {
    pub width: u32,
    pub height: u32,
    pub extent: RenderArea,
    pub nr_samples: u32,
    pub rt_count: u32,
    pub rts: [RenderTarget; MAX_COLOR_ATTACHMENTS],
    pub zs: DepthStencilTarget,
}

impl Default for FramebufferInfo {
    #[inline]
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            extent: RenderArea::default(),
            nr_samples: 1,
            rt_count: 0,
            rts: Default::default(),
            zs: DepthStencilTarget::default(),
        }
    }
}

/// A clear that was pending in the tile buffer configuration and must now be performed
/// explicitly, because the attachment is preloaded instead.
#[derive(Clone, Debug, PartialEq)]
pub struct AttachmentClear {
    /// The aspects to clear.
    pub aspects: ImageAspects,

    /// For color clears, the index of the color attachment.
    pub color_attachment: u32,

    /// The value to clear to.
    pub clear_value: ClearValue,

    /// The area to clear.
    pub area: RenderArea,

    /// The number of layers to clear.
    pub layer_count: u32,
}

/// A resolve to perform at the end of a render pass.
#[derive(Clone, Debug)]
pub struct AttachmentResolve {
    /// The multisample attachment.
    pub src_view: Arc<ImageView>,

    /// The view receiving the result.
    pub dst_view: Arc<ImageView>,

    /// How the samples are combined.
    pub mode: ResolveMode,

    /// The aspect being resolved.
    pub aspects: ImageAspects,

    /// The area to resolve.
    pub area: RenderArea,

    /// The number of layers to resolve.
    pub layer_count: u32,
}

/// Receives the resolves of a render pass, usually to encode them as meta draws or blits.
pub trait ResolveSink {
    fn resolve(&mut self, resolve: AttachmentResolve);
}

impl ResolveSink for Vec<AttachmentResolve> {
    #[inline]
    fn resolve(&mut self, resolve: AttachmentResolve) {
        self.push(resolve);
    }
}

/// The attachments of the current render pass.
pub struct RenderingState<A: Arch> {
    pub flags: RenderingFlags,
    pub layer_count: u32,
    pub bound_attachments: AttachmentMask,
    pub color_attachments: [Option<ColorAttachment>; MAX_COLOR_ATTACHMENTS],
    pub depth_attachment: Option<DepthStencilAttachment>,
    pub stencil_attachment: Option<DepthStencilAttachment>,
    pub fb: FramebufferInfo,
    pub resources: A::FramebufferResources,
}

impl<A: Arch> Default for RenderingState<A> {
    #[inline]
    fn default() -> Self {
        Self {
            flags: RenderingFlags::empty(),
            layer_count: 0,
            bound_attachments: AttachmentMask::empty(),
            color_attachments: Default::default(),
            depth_attachment: None,
            stencil_attachment: None,
            fb: FramebufferInfo::default(),
            resources: Default::default(),
        }
    }
}

impl<A: Arch> Debug for RenderingState<A> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.debug_struct("RenderingState")
            .field("flags", &self.flags)
            .field("layer_count", &self.layer_count)
            .field("bound_attachments", &self.bound_attachments)
            .field("color_attachments", &self.color_attachments)
            .field("depth_attachment", &self.depth_attachment)
            .field("stencil_attachment", &self.stencil_attachment)
            .field("fb", &self.fb)
            .field("resources", &self.resources)
            .finish()
    }
}

impl<A: Arch> RenderingState<A> {
    /// Replaces the state with the attachments of a new render pass.
    pub fn initialize(&mut self, render_info: &RenderingInfo) -> Result<(), Box<ValidationError>> {
        render_info.validate()?;

        *self = Self::default();
        self.flags = render_info.flags;

        let fb = &mut self.fb;
        fb.rt_count = render_info.color_attachments.len() as u32;

        for (index, attachment_info) in render_info.color_attachments.iter().enumerate() {
            let Some(attachment_info) = attachment_info else {
                continue;
            };
            let view = &attachment_info.image_view;

            self.bound_attachments.insert(AttachmentMask::color(index));

            self.color_attachments[index] = Some(ColorAttachment {
                view: view.clone(),
                format: view.format(),
                samples: view.samples(),
                resolve: attachment_info.resolve_info.as_ref().map(Into::into),
            });

            let rt = &mut fb.rts[index];
            rt.view = Some(view.clone());
            rt.clear = attachment_info.load_op == LoadOp::Clear;
            rt.clear_value = attachment_info.clear_value;
            rt.preload = attachment_info.load_op == LoadOp::Load;
            rt.discard = attachment_info.store_op != StoreOp::Store;
        }

        if let Some(attachment_info) = &render_info.depth_attachment {
            let view = &attachment_info.image_view;

            self.bound_attachments.insert(AttachmentMask::DEPTH);

            self.depth_attachment = Some(DepthStencilAttachment {
                view: view.clone(),
                format: view.format(),
                resolve: attachment_info.resolve_info.as_ref().map(Into::into),
            });

            fb.zs.view_zs = Some(view.clone());
            fb.zs.preload_z = attachment_info.load_op == LoadOp::Load;
            fb.zs.discard_z = attachment_info.store_op != StoreOp::Store;

            if let Some(ClearValue::DepthStencil { depth, .. }) = attachment_info.clear_value {
                fb.zs.clear_z = true;
                fb.zs.clear_depth = depth;
            }
        }

        if let Some(attachment_info) = &render_info.stencil_attachment {
            let view = &attachment_info.image_view;

            self.bound_attachments.insert(AttachmentMask::STENCIL);

            self.stencil_attachment = Some(DepthStencilAttachment {
                view: view.clone(),
                format: view.format(),
                resolve: attachment_info.resolve_info.as_ref().map(Into::into),
            });

            // A combined depth/stencil view lives in the depth/stencil target, unless a different
            // view already holds depth. Anything else gets the separate stencil target.
            let shares_depth_view = fb
                .zs
                .view_zs
                .as_ref()
                .is_some_and(|view_zs| Arc::ptr_eq(view_zs, view));

            if fb.zs.view_zs.is_none() && view.aspects().contains(ImageAspects::DEPTH) {
                fb.zs.view_zs = Some(view.clone());
            } else if !shares_depth_view {
                fb.zs.view_s = Some(view.clone());
            }

            fb.zs.preload_s = attachment_info.load_op == LoadOp::Load;
            fb.zs.discard_s = attachment_info.store_op != StoreOp::Store;

            if let Some(ClearValue::DepthStencil { stencil, .. }) = attachment_info.clear_value {
                fb.zs.clear_s = true;
                fb.zs.clear_stencil = stencil;
            }
        }

        let views = self
            .color_attachments
            .iter()
            .flatten()
            .map(|attachment| &*attachment.view)
            .chain(self.depth_attachment.iter().map(|a| &*a.view))
            .chain(self.stencil_attachment.iter().map(|a| &*a.view));
        let mut min_layers = None;

        for view in views.clone() {
            let [width, height] = view.mip_extent();
            fb.width = fb.width.max(width);
            fb.height = fb.height.max(height);
            fb.nr_samples = fb.nr_samples.max(view.samples().count());
            min_layers = Some(min_layers.map_or(view.array_layers(), |min: u32| {
                min.min(view.array_layers())
            }));
        }

        self.resources.init(views);

        let [offset_x, offset_y] = render_info.render_area_offset;
        let [extent_w, extent_h] = render_info.render_area_extent;

        if self.bound_attachments.is_empty() {
            fb.width = offset_x.saturating_add(extent_w);
            fb.height = offset_y.saturating_add(extent_h);
        }

        let extent_w = if extent_w == 0 {
            fb.width.saturating_sub(offset_x)
        } else {
            extent_w
        };
        let extent_h = if extent_h == 0 {
            fb.height.saturating_sub(offset_y)
        } else {
            extent_h
        };

        fb.extent = RenderArea {
            min_x: offset_x,
            min_y: offset_y,
            max_x: offset_x.saturating_add(extent_w).saturating_sub(1),
            max_y: offset_y.saturating_add(extent_h).saturating_sub(1),
        };

        self.layer_count = match render_info.layer_count {
            0 => min_layers.unwrap_or(1),
            layer_count => layer_count,
        };

        log::debug!(
            "{}: begin rendering {}x{} ({} samples, {} layers), attachments {:?}",
            A::NAME,
            self.fb.width,
            self.fb.height,
            self.fb.nr_samples,
            self.layer_count,
            self.bound_attachments,
        );

        Ok(())
    }

    /// Makes every bound attachment load its previous contents at the start of each tile.
    ///
    /// A clear that was to be done by the tile buffer initialization would now be overwritten by
    /// the preload, so it is removed from the framebuffer description and returned; the caller
    /// must perform it explicitly after the render pass starts.
    pub fn force_preload(
        &mut self,
        render_info: &RenderingInfo,
    ) -> SmallVec<[AttachmentClear; 4]> {
        let mut clears = SmallVec::new();
        let area = self.fb.extent;
        let layer_count = self.layer_count;

        for (index, (attachment_info, rt)) in render_info
            .color_attachments
            .iter()
            .zip(&mut self.fb.rts)
            .enumerate()
        {
            let Some(attachment_info) = attachment_info else {
                continue;
            };

            rt.preload = true;

            if rt.clear {
                rt.clear = false;
                clears.push(AttachmentClear {
                    aspects: ImageAspects::COLOR,
                    color_attachment: index as u32,
                    clear_value: attachment_info.clear_value.unwrap_or(ClearValue::Float([0.0; 4])),
                    area,
                    layer_count,
                });
            }
        }

        let zs = &mut self.fb.zs;

        if let Some(attachment_info) = &render_info.depth_attachment {
            zs.preload_z = true;

            if zs.clear_z {
                zs.clear_z = false;
                clears.push(AttachmentClear {
                    aspects: ImageAspects::DEPTH,
                    color_attachment: 0,
                    clear_value: attachment_info.clear_value.unwrap_or(ClearValue::DepthStencil {
                        depth: zs.clear_depth,
                        stencil: 0,
                    }),
                    area,
                    layer_count,
                });
            }
        }

        if let Some(attachment_info) = &render_info.stencil_attachment {
            zs.preload_s = true;

            if zs.clear_s {
                zs.clear_s = false;
                clears.push(AttachmentClear {
                    aspects: ImageAspects::STENCIL,
                    color_attachment: 0,
                    clear_value: attachment_info.clear_value.unwrap_or(ClearValue::DepthStencil {
                        depth: 0.0,
                        stencil: zs.clear_stencil,
                    }),
                    area,
                    layer_count,
                });
            }
        }

        log::trace!(
            "{}: forced preload of {:?}, {} clear(s) moved out of the tile setup",
            A::NAME,
            self.bound_attachments,
            clears.len(),
        );

        clears
    }

    /// Preloads the attachments if the render area doesn't cover whole tiles.
    ///
    /// Tiles are written back entirely, so pixels outside the render area but inside a tile it
    /// touches would otherwise be overwritten with garbage.
    pub fn preload_border(
        &mut self,
        render_info: &RenderingInfo,
    ) -> SmallVec<[AttachmentClear; 4]> {
        if self
            .fb
            .extent
            .is_aligned(A::META_TILE_SIZE, self.fb.width, self.fb.height)
        {
            return SmallVec::new();
        }

        log::trace!(
            "{}: render area {:?} is not aligned to {} pixel tiles",
            A::NAME,
            self.fb.extent,
            A::META_TILE_SIZE,
        );

        self.force_preload(render_info)
    }

    /// Hands every pending resolve to `sink`.
    ///
    /// The pending resolves are consumed, so calling this again before the next `initialize`
    /// does nothing.
    pub fn resolve_attachments(&mut self, sink: &mut impl ResolveSink) {
        let area = self.fb.extent;
        let layer_count = self.layer_count;
        let mut emit = |src_view: &Arc<ImageView>,
                        resolve: Option<RenderingAttachmentResolve>,
                        aspects: ImageAspects| {
            if let Some(RenderingAttachmentResolve { mode, dst_view }) = resolve {
                log::trace!("{}: resolving {:?} attachment ({:?})", A::NAME, aspects, mode);

                sink.resolve(AttachmentResolve {
                    src_view: src_view.clone(),
                    dst_view,
                    mode,
                    aspects,
                    area,
                    layer_count,
                });
            }
        };

        for attachment in self.color_attachments.iter_mut().flatten() {
            emit(&attachment.view, attachment.resolve.take(), ImageAspects::COLOR);
        }

        if let Some(attachment) = &mut self.depth_attachment {
            emit(&attachment.view, attachment.resolve.take(), ImageAspects::DEPTH);
        }

        if let Some(attachment) = &mut self.stencil_attachment {
            emit(&attachment.view, attachment.resolve.take(), ImageAspects::STENCIL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AttachmentMask, ClearValue, LoadOp, RenderArea, RenderingAttachmentInfo,
        RenderingAttachmentResolveInfo, RenderingInfo, RenderingState, ResolveMode, StoreOp,
    };
    use crate::{
        command_buffer::{CommandStream, JobManager},
        format::ImageAspects,
        image::BufferObjectHandle,
    };

    fn render_info_with_area(offset: [u32; 2], extent: [u32; 2]) -> RenderingInfo {
        RenderingInfo {
            render_area_offset: offset,
            render_area_extent: extent,
            color_attachments: vec![Some(RenderingAttachmentInfo {
                load_op: LoadOp::Clear,
                store_op: StoreOp::Store,
                clear_value: Some(ClearValue::Float([0.0, 0.0, 0.0, 1.0])),
                ..RenderingAttachmentInfo::image_view(attachment_view!(
                    R8G8B8A8_UNORM,
                    [256, 256]
                ))
            })],
            ..Default::default()
        }
    }

    #[test]
    fn initialize_builds_framebuffer() {
        let mut render = RenderingState::<JobManager>::default();
        let render_info = RenderingInfo {
            render_area_offset: [16, 8],
            render_area_extent: [64, 32],
            color_attachments: vec![
                Some(RenderingAttachmentInfo {
                    load_op: LoadOp::Load,
                    store_op: StoreOp::Store,
                    ..RenderingAttachmentInfo::image_view(attachment_view!(
                        R8G8B8A8_UNORM,
                        [320, 240],
                        Sample4,
                        7
                    ))
                }),
                None,
                Some(RenderingAttachmentInfo::image_view(attachment_view!(
                    R16G16B16A16_SFLOAT,
                    [640, 120],
                    Sample4,
                    8
                ))),
            ],
            depth_attachment: Some(RenderingAttachmentInfo {
                load_op: LoadOp::Clear,
                store_op: StoreOp::Store,
                clear_value: Some(ClearValue::DepthStencil {
                    depth: 1.0,
                    stencil: 0,
                }),
                ..RenderingAttachmentInfo::image_view(attachment_view!(
                    D32_SFLOAT,
                    [640, 240],
                    Sample4,
                    7
                ))
            }),
            ..Default::default()
        };

        render.initialize(&render_info).unwrap();

        let fb = &render.fb;
        assert_eq!((fb.width, fb.height), (640, 240));
        assert_eq!(fb.nr_samples, 4);
        assert_eq!(fb.rt_count, 3);
        assert_eq!(
            fb.extent,
            RenderArea {
                min_x: 16,
                min_y: 8,
                max_x: 79,
                max_y: 39,
            },
        );
        assert!(fb.rts[0].preload && !fb.rts[0].clear && !fb.rts[0].discard);
        assert!(fb.rts[1].view.is_none());
        assert!(fb.rts[2].discard && !fb.rts[2].preload);
        assert!(fb.zs.clear_z);
        assert_eq!(fb.zs.clear_depth, 1.0);
        assert!(!fb.zs.discard_z);

        assert_eq!(
            render.bound_attachments,
            AttachmentMask::color(0) | AttachmentMask::color(2) | AttachmentMask::DEPTH,
        );
        assert_eq!(render.layer_count, 1);
        assert_eq!(
            render.resources.bos.as_slice(),
            &[BufferObjectHandle(7), BufferObjectHandle(8)],
        );
    }

    #[test]
    fn no_attachments_uses_render_area() {
        let mut render = RenderingState::<CommandStream>::default();
        let render_info = RenderingInfo {
            render_area_offset: [10, 20],
            render_area_extent: [100, 50],
            layer_count: 2,
            ..Default::default()
        };

        render.initialize(&render_info).unwrap();

        assert_eq!((render.fb.width, render.fb.height), (110, 70));
        assert!(render.bound_attachments.is_empty());
        assert_eq!(render.layer_count, 2);
        assert_eq!(render.fb.nr_samples, 1);
    }

    #[test]
    fn combined_depth_stencil_shares_the_target() {
        let mut render = RenderingState::<CommandStream>::default();
        let view = attachment_view!(D24_UNORM_S8_UINT, [64, 64]);
        let render_info = RenderingInfo {
            depth_attachment: Some(RenderingAttachmentInfo::image_view(view.clone())),
            stencil_attachment: Some(RenderingAttachmentInfo {
                load_op: LoadOp::Load,
                ..RenderingAttachmentInfo::image_view(view.clone())
            }),
            ..Default::default()
        };

        render.initialize(&render_info).unwrap();

        assert!(std::sync::Arc::ptr_eq(render.fb.zs.view_zs.as_ref().unwrap(), &view));
        assert!(render.fb.zs.view_s.is_none());
        assert!(render.fb.zs.preload_s && !render.fb.zs.preload_z);

        let stencil = attachment_view!(S8_UINT, [64, 64]);
        let render_info = RenderingInfo {
            stencil_attachment: Some(RenderingAttachmentInfo::image_view(stencil.clone())),
            ..Default::default()
        };

        render.initialize(&render_info).unwrap();

        assert!(render.fb.zs.view_zs.is_none());
        assert!(std::sync::Arc::ptr_eq(render.fb.zs.view_s.as_ref().unwrap(), &stencil));
        assert_eq!(render.bound_attachments, AttachmentMask::STENCIL);
    }

    #[test]
    fn distinct_combined_depth_stencil_views() {
        let mut render = RenderingState::<JobManager>::default();
        let depth = attachment_view!(D24_UNORM_S8_UINT, [64, 64], Sample1, 3);
        let stencil = attachment_view!(D24_UNORM_S8_UINT, [64, 64], Sample1, 4);
        let render_info = RenderingInfo {
            depth_attachment: Some(RenderingAttachmentInfo::image_view(depth.clone())),
            stencil_attachment: Some(RenderingAttachmentInfo {
                load_op: LoadOp::Load,
                ..RenderingAttachmentInfo::image_view(stencil.clone())
            }),
            ..Default::default()
        };

        render.initialize(&render_info).unwrap();

        assert!(std::sync::Arc::ptr_eq(render.fb.zs.view_zs.as_ref().unwrap(), &depth));
        assert!(std::sync::Arc::ptr_eq(render.fb.zs.view_s.as_ref().unwrap(), &stencil));
        assert!(render.fb.zs.preload_s && !render.fb.zs.preload_z);
        assert_eq!(
            render.resources.bos.as_slice(),
            &[BufferObjectHandle(3), BufferObjectHandle(4)],
        );
    }

    #[test]
    fn render_area_past_u32_range_saturates() {
        let mut render = RenderingState::<CommandStream>::default();
        let render_info = RenderingInfo {
            render_area_offset: [u32::MAX - 4, 0],
            render_area_extent: [16, u32::MAX],
            ..Default::default()
        };

        render.initialize(&render_info).unwrap();

        assert_eq!((render.fb.width, render.fb.height), (u32::MAX, u32::MAX));
        assert_eq!(
            render.fb.extent,
            RenderArea {
                min_x: u32::MAX - 4,
                min_y: 0,
                max_x: u32::MAX - 1,
                max_y: u32::MAX - 1,
            },
        );
    }

    #[test]
    fn invalid_render_info() {
        let mut render = RenderingState::<CommandStream>::default();

        let too_many = RenderingInfo {
            color_attachments: vec![None; 9],
            ..Default::default()
        };
        assert!(render.initialize(&too_many).is_err());

        let missing_clear_value = RenderingInfo {
            color_attachments: vec![Some(RenderingAttachmentInfo {
                load_op: LoadOp::Clear,
                ..RenderingAttachmentInfo::image_view(attachment_view!(R8_UNORM, [8, 8]))
            })],
            ..Default::default()
        };
        let err = render.initialize(&missing_clear_value).unwrap_err();
        assert_eq!(err.context, "color_attachments[0]");
    }

    #[test]
    fn force_preload_moves_clears_out() {
        let mut render = RenderingState::<JobManager>::default();
        let render_info = render_info_with_area([0, 0], [0, 0]);
        render.initialize(&render_info).unwrap();
        assert!(render.fb.rts[0].clear);

        let clears = render.force_preload(&render_info);

        assert_eq!(clears.len(), 1);
        assert_eq!(clears[0].aspects, ImageAspects::COLOR);
        assert_eq!(clears[0].color_attachment, 0);
        assert_eq!(clears[0].clear_value, ClearValue::Float([0.0, 0.0, 0.0, 1.0]));
        assert_eq!(clears[0].area.max_x, 255);
        assert!(render.fb.rts[0].preload);
        assert!(!render.fb.rts[0].clear);

        assert!(render.force_preload(&render_info).is_empty());
    }

    #[test]
    fn preload_border_only_when_unaligned() {
        let cases = [
            ([0, 0], [0, 0], false),
            ([32, 32], [64, 64], false),
            // Ends on the framebuffer edge.
            ([32, 0], [224, 256], false),
            ([8, 0], [64, 64], true),
            ([32, 32], [60, 64], true),
            ([0, 0], [256, 100], true),
        ];

        for (offset, extent, preloads) in cases {
            let mut render = RenderingState::<CommandStream>::default();
            let render_info = render_info_with_area(offset, extent);
            render.initialize(&render_info).unwrap();

            let clears = render.preload_border(&render_info);

            assert_eq!(render.fb.rts[0].preload, preloads, "{:?} {:?}", offset, extent);
            assert_eq!(clears.len(), preloads as usize);
        }
    }

    #[test]
    fn resolves_are_consumed() {
        let mut render = RenderingState::<CommandStream>::default();
        let color_dst = attachment_view!(R8G8B8A8_UNORM, [32, 32]);
        let depth_dst = attachment_view!(D32_SFLOAT, [32, 32]);
        let render_info = RenderingInfo {
            color_attachments: vec![
                Some(RenderingAttachmentInfo {
                    resolve_info: Some(RenderingAttachmentResolveInfo::image_view(
                        color_dst.clone(),
                    )),
                    ..RenderingAttachmentInfo::image_view(attachment_view!(
                        R8G8B8A8_UNORM,
                        [32, 32],
                        Sample4
                    ))
                }),
                Some(RenderingAttachmentInfo::image_view(attachment_view!(
                    R8G8B8A8_UNORM,
                    [32, 32],
                    Sample4
                ))),
            ],
            depth_attachment: Some(RenderingAttachmentInfo {
                resolve_info: Some(RenderingAttachmentResolveInfo {
                    mode: ResolveMode::SampleZero,
                    image_view: depth_dst.clone(),
                }),
                ..RenderingAttachmentInfo::image_view(attachment_view!(
                    D32_SFLOAT,
                    [32, 32],
                    Sample4
                ))
            }),
            ..Default::default()
        };

        render.initialize(&render_info).unwrap();

        let mut resolves = Vec::new();
        render.resolve_attachments(&mut resolves);

        assert_eq!(resolves.len(), 2);
        assert_eq!(resolves[0].aspects, ImageAspects::COLOR);
        assert_eq!(resolves[0].mode, ResolveMode::Average);
        assert!(std::sync::Arc::ptr_eq(&resolves[0].dst_view, &color_dst));
        assert_eq!(resolves[1].aspects, ImageAspects::DEPTH);
        assert_eq!(resolves[1].mode, ResolveMode::SampleZero);
        assert!(std::sync::Arc::ptr_eq(&resolves[1].dst_view, &depth_dst));

        render.resolve_attachments(&mut resolves);
        assert_eq!(resolves.len(), 2);
    }
}
