use crate::math::mercator::lon_lat_to_mercator;

/// Axis-aligned 2D bounding box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb2 {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Aabb2 {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Aabb2 { min, max }
    }

    /// An inverted box that any `extend` call replaces.
    pub fn empty() -> Self {
        Aabb2 {
            min: [f64::INFINITY; 2],
            max: [f64::NEG_INFINITY; 2],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min[0] > self.max[0] || self.min[1] > self.max[1]
    }

    pub fn extend(&mut self, p: [f64; 2]) {
        self.min[0] = self.min[0].min(p[0]);
        self.min[1] = self.min[1].min(p[1]);
        self.max[0] = self.max[0].max(p[0]);
        self.max[1] = self.max[1].max(p[1]);
    }

    pub fn union(&self, other: &Aabb2) -> Aabb2 {
        let mut out = *self;
        if !other.is_empty() {
            out.extend(other.min);
            out.extend(other.max);
        }
        out
    }

    pub fn contains(&self, p: [f64; 2]) -> bool {
        p[0] >= self.min[0] && p[0] <= self.max[0] && p[1] >= self.min[1] && p[1] <= self.max[1]
    }

    pub fn center(&self) -> [f64; 2] {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
        ]
    }
}

impl Default for Aabb2 {
    fn default() -> Self {
        Self::empty()
    }
}

/// Poland in longitude/latitude degrees.
pub const POLAND_BOUNDS: Aabb2 = Aabb2 {
    min: [14.0, 48.2],
    max: [24.9, 55.6],
};

/// [`POLAND_BOUNDS`] projected to Web Mercator meters.
pub fn poland_extent_mercator() -> Aabb2 {
    Aabb2::new(
        lon_lat_to_mercator(POLAND_BOUNDS.min[0], POLAND_BOUNDS.min[1]),
        lon_lat_to_mercator(POLAND_BOUNDS.max[0], POLAND_BOUNDS.max[1]),
    )
}
