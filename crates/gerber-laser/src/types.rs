use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

/// A 2-D point in millimetres.
pub type Point = [f64; 2];

/// A closed ring of vertices. The last vertex connects back to the first.
pub type Contour = Vec<Point>;

/// A filled shape: outer contour first, holes after it.
pub type Shape = Vec<Contour>;

/// Round a float to N decimal places.
pub fn round_f64(v: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    let rounded = (v * factor).round() / factor;
    // Avoid emitting "-0" in path data
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

// ─── Bounding Box ────────────────────────────────────────────────────

/// Axis-aligned extents of everything a layer emitted.
///
/// Starts out empty; an empty box reports (and serializes as) the zero box
/// `{x: 0, y: 0, width: 0, height: 0}`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub minx: f64,
    pub miny: f64,
    pub maxx: f64,
    pub maxy: f64,
}

impl Default for BBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl BBox {
    pub fn empty() -> Self {
        Self {
            minx: f64::INFINITY,
            miny: f64::INFINITY,
            maxx: f64::NEG_INFINITY,
            maxy: f64::NEG_INFINITY,
        }
    }

    /// Build a box from an origin and a size.
    pub fn from_rect(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            minx: x,
            miny: y,
            maxx: x + width,
            maxy: y + height,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.minx <= self.maxx && self.miny <= self.maxy)
    }

    pub fn expand_point(&mut self, x: f64, y: f64) {
        self.minx = self.minx.min(x);
        self.miny = self.miny.min(y);
        self.maxx = self.maxx.max(x);
        self.maxy = self.maxy.max(y);
    }

    pub fn expand_bbox(&mut self, other: &BBox) {
        if other.is_empty() {
            return;
        }
        self.expand_point(other.minx, other.miny);
        self.expand_point(other.maxx, other.maxy);
    }

    pub fn x(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.minx
        }
    }

    pub fn y(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.miny
        }
    }

    pub fn width(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.maxx - self.minx
        }
    }

    pub fn height(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.maxy - self.miny
        }
    }

    /// X coordinate of the vertical axis through the middle of the box.
    pub fn center_x(&self) -> f64 {
        self.x() + self.width() / 2.0
    }

    /// Grow the box by `pad` on every side.
    pub fn padded(&self, pad: f64) -> BBox {
        if self.is_empty() {
            return *self;
        }
        BBox {
            minx: self.minx - pad,
            miny: self.miny - pad,
            maxx: self.maxx + pad,
            maxy: self.maxy + pad,
        }
    }

    /// The four corners, counter-clockwise from the lower-left.
    pub fn corners(&self) -> Contour {
        vec![
            [self.minx, self.miny],
            [self.maxx, self.miny],
            [self.maxx, self.maxy],
            [self.minx, self.maxy],
        ]
    }
}

impl Serialize for BBox {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let mut st = s.serialize_struct("BBox", 4)?;
        st.serialize_field("x", &round_f64(self.x(), 6))?;
        st.serialize_field("y", &round_f64(self.y(), 6))?;
        st.serialize_field("width", &round_f64(self.width(), 6))?;
        st.serialize_field("height", &round_f64(self.height(), 6))?;
        st.end()
    }
}

/// Expand a box over every vertex of a shape set.
pub fn shapes_bbox(shapes: &[Shape]) -> BBox {
    let mut bbox = BBox::empty();
    for contour in shapes.iter().flatten() {
        for pt in contour {
            bbox.expand_point(pt[0], pt[1]);
        }
    }
    bbox
}

// ─── Layer output ────────────────────────────────────────────────────

/// Final geometry of one layer, ready for preview or laser export.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LayerGeometry {
    /// Path data in the `M`/`L`/`A`/`Z` command grammar, millimetres.
    pub path: String,
    pub bbox: BBox,
    /// True when `path` holds clearance (plate minus copper) geometry.
    pub inverted: bool,
}

impl LayerGeometry {
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }
}
