//! Software renderer for tile-based 2D stages with 3D floor, sky, and quad effects.
//!
//! All drawing happens into an RGB565 [`framebuffer::FrameBuffer`] owned by [`RenderState`];
//! indexed pixels are resolved through per-line [`palette::PaletteBanks`].

mod api;
pub mod blit;
pub mod deform;
pub mod framebuffer;
pub mod ink;
pub mod layer;
pub mod layers;
pub mod palette;
pub mod scene3d;
pub mod sheet;
pub mod tiles;
pub mod trig;

pub use api::{DRAW_SLOT_COUNT, RenderResult, RenderState, RenderStateError, STAGE_LAYER_COUNT};
pub use retrogfx_config::{InkEffect, RenderConfig};
