// Pixel format contract for a Surface's backing buffers.
//
// Values are fixed by the wire layout (§6 EXTERNAL INTERFACES): clients
// and the server agree on a format code out of band, with no header
// inside the shared-memory buffer itself.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb888 = 0x0F,
    Argb8888 = 0x10,
    Xrgb8888 = 0x11,
    Rgb565 = 0x12,
    Rgb565A8 = 0x14,
}

/// Sentinel format values used in LayoutParams.mFormat that are not
/// themselves pixel layouts.
pub const FORMAT_OPAQUE: i32 = -1;
pub const FORMAT_TRANSPARENT: i32 = -2;

impl Default for PixelFormat {
    fn default() -> Self {
        PixelFormat::Argb8888
    }
}

impl PixelFormat {
    pub fn from_i32(val: i32) -> Option<Self> {
        match val {
            0x0F => Some(Self::Rgb888),
            0x10 => Some(Self::Argb8888),
            0x11 => Some(Self::Xrgb8888),
            0x12 => Some(Self::Rgb565),
            0x14 => Some(Self::Rgb565A8),
            _ => None,
        }
    }

    /// Bytes occupied by one pixel in this format.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb888 => 3,
            PixelFormat::Argb8888 | PixelFormat::Xrgb8888 => 4,
            PixelFormat::Rgb565 => 2,
            // 16bpp color plane plus an 8bpp alpha plane, packed back to back.
            PixelFormat::Rgb565A8 => 3,
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, PixelFormat::Argb8888 | PixelFormat::Rgb565A8)
    }
}
