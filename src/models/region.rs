use serde::Serialize;
use std::fmt;

/// One of the five fixed inspection zones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionName {
    /// Center square
    Base,
    /// Band above the base square
    Top,
    /// Band right of the base square
    Right,
    /// Band below the base square
    Bottom,
    /// Band left of the base square
    Left,
}

/// Whether a region is the center square or one of the border bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    /// The center square; only dark and bright detection apply
    Base,
    /// A border band; edge straightness is also checked
    Side,
}

impl RegionName {
    /// All regions in reporting order
    pub const ALL: [RegionName; 5] = [
        RegionName::Base,
        RegionName::Top,
        RegionName::Right,
        RegionName::Bottom,
        RegionName::Left,
    ];

    /// Region kind
    pub fn kind(self) -> RegionKind {
        match self {
            RegionName::Base => RegionKind::Base,
            _ => RegionKind::Side,
        }
    }

    /// Lowercase identifier used in view names and reports
    pub fn as_str(self) -> &'static str {
        match self {
            RegionName::Base => "base",
            RegionName::Top => "top",
            RegionName::Right => "right",
            RegionName::Bottom => "bottom",
            RegionName::Left => "left",
        }
    }

    /// Position in [`RegionName::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for RegionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Axis-aligned box in source image coordinates, `x2`/`y2` exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BoundingBox {
    /// Left edge (inclusive)
    pub x1: u32,
    /// Top edge (inclusive)
    pub y1: u32,
    /// Right edge (exclusive)
    pub x2: u32,
    /// Bottom edge (exclusive)
    pub y2: u32,
}

impl BoundingBox {
    /// Create a box; inverted coordinates collapse to zero extent
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self {
            x1,
            y1,
            x2: x2.max(x1),
            y2: y2.max(y1),
        }
    }

    /// Horizontal extent in pixels
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    /// Vertical extent in pixels
    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    /// Pixel count
    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// True when either side has zero length
    pub fn is_empty(&self) -> bool {
        self.area() == 0
    }

    /// True if the interiors intersect (shared edges do not count)
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.x1 < other.x2 && other.x1 < self.x2 && self.y1 < other.y2 && other.y1 < self.y2
    }
}

/// A named zone of an image with its extracted grayscale pixels
#[derive(Debug, Clone)]
pub struct Region {
    /// Which of the five zones this is
    pub name: RegionName,
    /// Placement in the source image
    pub bbox: BoundingBox,
    /// Row-major grayscale samples, `None` when the box has no area
    pub pixels: Option<Vec<u8>>,
}

impl Region {
    /// Base or side
    pub fn kind(&self) -> RegionKind {
        self.name.kind()
    }

    /// Width of the pixel buffer
    pub fn width(&self) -> usize {
        self.bbox.width() as usize
    }

    /// Height of the pixel buffer
    pub fn height(&self) -> usize {
        self.bbox.height() as usize
    }

    /// True when the box had no area and no pixels were extracted
    pub fn is_missing(&self) -> bool {
        self.pixels.is_none()
    }
}
