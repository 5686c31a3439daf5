//! Frame geometry and per-frame transfer size.

use crate::error::ConfigError;
use crate::transfer::MAX_TRANSFER_COUNT;

/// Pixel layout of one frame as it arrives on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameGeometry {
    width: u16,
    height: u16,
    bytes_per_pixel: u8,
}

impl FrameGeometry {
    /// HM01B0 monochrome, 324x244 at one byte per pixel.
    pub const HM01B0: FrameGeometry = FrameGeometry {
        width: 324,
        height: 244,
        bytes_per_pixel: 1,
    };

    /// OV5640 QVGA in RGB565.
    pub const OV5640_QVGA_RGB565: FrameGeometry = FrameGeometry {
        width: 320,
        height: 240,
        bytes_per_pixel: 2,
    };

    /// Frames needing more words than one transfer can count are rejected,
    /// which also keeps [`byte_len`](Self::byte_len) within `u32`.
    pub fn new(width: u16, height: u16, bytes_per_pixel: u8) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::EmptyGeometry);
        }
        if !(1..=4).contains(&bytes_per_pixel) {
            return Err(ConfigError::BytesPerPixel(bytes_per_pixel));
        }
        // 65535 * 65535 * 4 bytes is still below 2^32 words.
        let bytes = width as u64 * height as u64 * bytes_per_pixel as u64;
        let words = bytes.div_ceil(4) as u32;
        if words > MAX_TRANSFER_COUNT {
            return Err(ConfigError::TransferTooLong { words });
        }
        Ok(Self {
            width,
            height,
            bytes_per_pixel,
        })
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn bytes_per_pixel(&self) -> u8 {
        self.bytes_per_pixel
    }

    /// Bytes in one frame.
    pub fn byte_len(&self) -> u32 {
        self.width as u32 * self.height as u32 * self.bytes_per_pixel as u32
    }

    /// 32-bit words transferred per frame, rounded up to a whole word.
    pub fn word_count(&self) -> u32 {
        self.byte_len().div_ceil(4)
    }
}

/// Geometry plus the byte order the transfer engine should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameFormat {
    pub geometry: FrameGeometry,
    /// Reverse bytes within each 32-bit word so the first sampled byte lands
    /// at the lowest address.
    pub byte_swap: bool,
}

impl FrameFormat {
    pub const HM01B0: FrameFormat = FrameFormat {
        geometry: FrameGeometry::HM01B0,
        byte_swap: true,
    };

    pub const OV5640_QVGA_RGB565: FrameFormat = FrameFormat {
        geometry: FrameGeometry::OV5640_QVGA_RGB565,
        byte_swap: false,
    };

    pub fn new(geometry: FrameGeometry, byte_swap: bool) -> Self {
        Self {
            geometry,
            byte_swap,
        }
    }
}
