//! Renderer configuration shared between the renderer core and frontends

use bincode::{Decode, Encode};
use retrogfx_common::frontend::FrameSize;
use retrogfx_proc_macros::{EnumAll, EnumDisplay, EnumFromStr};
use std::fmt::{Display, Formatter};
use thiserror::Error;

pub const DEFAULT_LINE_SIZE: u32 = 424;
pub const DEFAULT_SCREEN_HEIGHT: u32 = 240;

// Largest screen accepted by RenderConfig::validate
pub const MAX_LINE_SIZE: u32 = 1024;
pub const MAX_SCREEN_HEIGHT: u32 = 512;

pub const DEFAULT_PROJECTION_X: i32 = 136;
pub const DEFAULT_PROJECTION_Y: i32 = 160;

pub const DEFAULT_TILE_LAYER_MID_POINT: u8 = 3;

pub const DEFAULT_FOG_THRESHOLD: i32 = 0x8000;

pub const DEFAULT_FLOOR_HORIZON_OFFSET: u32 = 12;

/// Per-pixel compositing function used when a source pixel lands on the framebuffer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode, EnumDisplay, EnumFromStr, EnumAll,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "clap", derive(retrogfx_proc_macros::CustomValueEnum))]
pub enum InkEffect {
    #[default]
    None,
    Blend,
    Alpha,
    Add,
    Sub,
    Tint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct RenderConfig {
    /// Framebuffer width in pixels
    #[cfg_attr(feature = "clap", arg(long, default_value_t = DEFAULT_LINE_SIZE))]
    pub line_size: u32,
    /// Framebuffer height in pixels
    #[cfg_attr(feature = "clap", arg(long, default_value_t = DEFAULT_SCREEN_HEIGHT))]
    pub screen_height: u32,
    /// Horizontal perspective scale used when projecting 3D faces
    #[cfg_attr(feature = "clap", arg(long, default_value_t = DEFAULT_PROJECTION_X))]
    pub projection_x: i32,
    /// Vertical perspective scale used when projecting 3D faces
    #[cfg_attr(feature = "clap", arg(long, default_value_t = DEFAULT_PROJECTION_Y))]
    pub projection_y: i32,
    /// Draw slots at or above this index draw high-plane tiles, slots below draw low-plane tiles
    #[cfg_attr(feature = "clap", arg(long, default_value_t = DEFAULT_TILE_LAYER_MID_POINT))]
    pub tile_layer_mid_point: u8,
    /// Face depth at which fog starts to apply to fog-faded faces
    #[cfg_attr(feature = "clap", arg(long, default_value_t = DEFAULT_FOG_THRESHOLD))]
    pub fog_threshold: i32,
    /// Rows below the vertical screen center where floor and sky projection begins
    #[cfg_attr(feature = "clap", arg(long, default_value_t = DEFAULT_FLOOR_HORIZON_OFFSET))]
    pub floor_horizon_offset: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            line_size: DEFAULT_LINE_SIZE,
            screen_height: DEFAULT_SCREEN_HEIGHT,
            projection_x: DEFAULT_PROJECTION_X,
            projection_y: DEFAULT_PROJECTION_Y,
            tile_layer_mid_point: DEFAULT_TILE_LAYER_MID_POINT,
            fog_threshold: DEFAULT_FOG_THRESHOLD,
            floor_horizon_offset: DEFAULT_FLOOR_HORIZON_OFFSET,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Line size must be between 16 and {MAX_LINE_SIZE}, was {0}")]
    InvalidLineSize(u32),
    #[error("Screen height must be between 16 and {MAX_SCREEN_HEIGHT}, was {0}")]
    InvalidScreenHeight(u32),
    #[error("Floor horizon offset {offset} places the horizon below a {height}-line screen")]
    InvalidHorizonOffset { offset: u32, height: u32 },
}

impl RenderConfig {
    /// # Errors
    ///
    /// Returns an error if the screen dimensions are zero, too small to hold a tile, or larger
    /// than the renderer's fixed line buffers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(16..=MAX_LINE_SIZE).contains(&self.line_size) {
            return Err(ConfigError::InvalidLineSize(self.line_size));
        }

        if !(16..=MAX_SCREEN_HEIGHT).contains(&self.screen_height) {
            return Err(ConfigError::InvalidScreenHeight(self.screen_height));
        }

        if self.screen_height / 2 + self.floor_horizon_offset >= self.screen_height {
            return Err(ConfigError::InvalidHorizonOffset {
                offset: self.floor_horizon_offset,
                height: self.screen_height,
            });
        }

        Ok(())
    }

    #[must_use]
    pub fn frame_size(&self) -> FrameSize {
        FrameSize { width: self.line_size, height: self.screen_height }
    }

    #[must_use]
    pub fn center_x(&self) -> i32 {
        (self.line_size / 2) as i32
    }

    #[must_use]
    pub fn center_y(&self) -> i32 {
        (self.screen_height / 2) as i32
    }

    #[must_use]
    pub fn horizon_line(&self) -> u32 {
        self.screen_height / 2 + self.floor_horizon_offset
    }
}

impl Display for RenderConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "line_size: {}", self.line_size)?;
        writeln!(f, "screen_height: {}", self.screen_height)?;
        writeln!(f, "projection: ({}, {})", self.projection_x, self.projection_y)?;
        writeln!(f, "tile_layer_mid_point: {}", self.tile_layer_mid_point)?;
        writeln!(f, "fog_threshold: {:#X}", self.fog_threshold)?;
        write!(f, "floor_horizon_offset: {}", self.floor_horizon_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn default_config_is_valid() {
        let config = RenderConfig::default();
        assert_eq!(Ok(()), config.validate());
        assert_eq!(FrameSize { width: 424, height: 240 }, config.frame_size());
        assert_eq!(212, config.center_x());
        assert_eq!(132, config.horizon_line());
    }

    #[test]
    fn ink_effect_from_str() {
        for ink in InkEffect::ALL {
            assert_eq!(Ok(ink), ink.to_string().to_lowercase().parse::<InkEffect>());
        }
        assert!("overlay".parse::<InkEffect>().is_err());
    }

    #[test]
    fn rejects_bad_dimensions() {
        let config = RenderConfig { line_size: 0, ..RenderConfig::default() };
        assert_eq!(Err(ConfigError::InvalidLineSize(0)), config.validate());

        let config = RenderConfig { screen_height: 4096, ..RenderConfig::default() };
        assert_eq!(Err(ConfigError::InvalidScreenHeight(4096)), config.validate());

        let config = RenderConfig { floor_horizon_offset: 120, ..RenderConfig::default() };
        assert_eq!(
            Err(ConfigError::InvalidHorizonOffset { offset: 120, height: 240 }),
            config.validate()
        );
    }
}
