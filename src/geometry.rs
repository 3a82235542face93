//! Sampling geometry for packed color+alpha frames.
//!
//! A packed frame holds two equally sized sub-frames: one carrying color, the
//! other carrying alpha as a grayscale image. The orientation says how the
//! frame is split (left/right or top/bottom), the side says which half holds
//! color. Everything here is pure; callers re-derive when the packing or the
//! surface size changes.

/// How the two sub-frames are laid out inside the packed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    /// Left and right halves.
    #[default]
    Landscape,
    /// Top and bottom halves.
    Portrait,
}

/// Which half of the packed frame holds the color sub-frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Side {
    /// Color on the left (landscape) or top (portrait).
    #[default]
    Front,
    /// Color on the right (landscape) or bottom (portrait).
    Back,
}

impl Orientation {
    /// Unknown names fall back to landscape.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "portrait" => Orientation::Portrait,
            _ => Orientation::Landscape,
        }
    }
}

impl Side {
    /// Unknown names fall back to front.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "back" => Side::Back,
            _ => Side::Front,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Side::Front => Side::Back,
            Side::Back => Side::Front,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PackingConvention {
    pub orientation: Orientation,
    pub side: Side,
}

impl PackingConvention {
    pub fn new(orientation: Orientation, side: Side) -> Self {
        Self { orientation, side }
    }
}

/// Floats per vertex: position, color texcoord, alpha texcoord.
pub const FLOATS_PER_VERTEX: usize = 6;
pub const QUAD_VERTEX_COUNT: usize = 4;
pub const POSITION_OFFSET: usize = 0;
pub const COLOR_COORD_OFFSET: usize = 2;
pub const ALPHA_COORD_OFFSET: usize = 4;

pub type QuadVertices = [f32; FLOATS_PER_VERTEX * QUAD_VERTEX_COUNT];

/// Clip-space corners in triangle-strip order: top-left, top-right,
/// bottom-left, bottom-right.
const QUAD_POSITIONS: [f32; 8] = [-1.0, 1.0, 1.0, 1.0, -1.0, -1.0, 1.0, -1.0];

/// Texture coordinates of one half of the packed frame, in the same corner
/// order as `QUAD_POSITIONS`. The texture is uploaded Y-flipped, so v=1 is the
/// top row of the video.
fn half_texcoords(orientation: Orientation, side: Side) -> [f32; 8] {
    match (orientation, side) {
        (Orientation::Landscape, Side::Front) => [0.0, 1.0, 0.5, 1.0, 0.0, 0.0, 0.5, 0.0],
        (Orientation::Landscape, Side::Back) => [0.5, 1.0, 1.0, 1.0, 0.5, 0.0, 1.0, 0.0],
        (Orientation::Portrait, Side::Front) => [0.0, 1.0, 1.0, 1.0, 0.0, 0.5, 1.0, 0.5],
        (Orientation::Portrait, Side::Back) => [0.0, 0.5, 1.0, 0.5, 0.0, 0.0, 1.0, 0.0],
    }
}

/// Interleaved vertex data for a full-viewport quad.
///
/// Each of the four vertices is `[x, y, color_u, color_v, alpha_u, alpha_v]`.
pub fn compute_vertex_coords(packing: PackingConvention) -> QuadVertices {
    let color = half_texcoords(packing.orientation, packing.side);
    let alpha = half_texcoords(packing.orientation, packing.side.opposite());

    let mut coords = [0.0; FLOATS_PER_VERTEX * QUAD_VERTEX_COUNT];
    for (vertex, chunk) in coords.chunks_exact_mut(FLOATS_PER_VERTEX).enumerate() {
        let src = vertex * 2..vertex * 2 + 2;
        chunk[POSITION_OFFSET..POSITION_OFFSET + 2].copy_from_slice(&QUAD_POSITIONS[src.clone()]);
        chunk[COLOR_COORD_OFFSET..COLOR_COORD_OFFSET + 2].copy_from_slice(&color[src.clone()]);
        chunk[ALPHA_COORD_OFFSET..ALPHA_COORD_OFFSET + 2].copy_from_slice(&alpha[src]);
    }
    coords
}

/// Axis-aligned pixel rectangle inside the offscreen buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ImageRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn intersects(&self, other: &ImageRect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRegions {
    pub color: ImageRect,
    pub alpha: ImageRect,
}

/// Size of the offscreen buffer that holds a packed frame scaled so each
/// sub-frame matches a `width`x`height` surface.
pub fn offscreen_size(orientation: Orientation, width: u32, height: u32) -> (u32, u32) {
    match orientation {
        Orientation::Landscape => (width * 2, height),
        Orientation::Portrait => (width, height * 2),
    }
}

/// Color and alpha regions inside the offscreen buffer for a surface of
/// `width`x`height` pixels.
pub fn compute_image_regions(packing: PackingConvention, width: u32, height: u32) -> ImageRegions {
    let first = ImageRect::new(0, 0, width, height);
    let second = match packing.orientation {
        Orientation::Landscape => ImageRect::new(width, 0, width, height),
        Orientation::Portrait => ImageRect::new(0, height, width, height),
    };
    match packing.side {
        Side::Front => ImageRegions {
            color: first,
            alpha: second,
        },
        Side::Back => ImageRegions {
            color: second,
            alpha: first,
        },
    }
}
