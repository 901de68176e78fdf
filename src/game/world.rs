//! World query boundary - ground and ceiling probing
//!
//! The authority never walks collision geometry itself; it asks the world
//! two questions per avatar per tick: "is there ground under the feet?" and
//! "is there ceiling just above the head?". [`WorldQuery`] is that boundary,
//! [`StaticWorld`] is an axis-aligned-box implementation of it for tests and
//! headless sessions.

use serde::{Deserialize, Serialize};

/// A vector in 3D space, y is up
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Collision category filter for world probes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionMask(pub u32);

impl CollisionMask {
    pub const GROUND: CollisionMask = CollisionMask(1);
    pub const CEILING: CollisionMask = CollisionMask(1 << 1);
    pub const ALL: CollisionMask = CollisionMask(u32::MAX);

    pub fn intersects(self, other: CollisionMask) -> bool {
        self.0 & other.0 != 0
    }
}

/// Synchronous geometric queries against the world the authority owns
///
/// Implementations must be cheap and non-blocking; these run inside the
/// simulation tick.
pub trait WorldQuery: Send + Sync {
    /// Does a sphere at `center` overlap any geometry in `mask`?
    fn probe_sphere(&self, center: Vec3, radius: f32, mask: CollisionMask) -> bool;

    /// Does an upward ray from `origin` of length `distance` hit geometry in `mask`?
    fn raycast_up(&self, origin: Vec3, distance: f32, mask: CollisionMask) -> bool;
}

/// Axis-aligned box, `min` and `max` are opposite corners
#[derive(Debug, Clone, Copy)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Sphere-box overlap via the closest point on the box to the center
    fn overlaps_sphere(&self, center: Vec3, radius: f32) -> bool {
        let cx = center.x.clamp(self.min.x, self.max.x);
        let cy = center.y.clamp(self.min.y, self.max.y);
        let cz = center.z.clamp(self.min.z, self.max.z);

        let dx = center.x - cx;
        let dy = center.y - cy;
        let dz = center.z - cz;

        dx * dx + dy * dy + dz * dz <= radius * radius
    }

    /// Vertical segment from `origin` upward by `distance` against the box
    fn hit_by_vertical_ray(&self, origin: Vec3, distance: f32) -> bool {
        let inside_footprint = origin.x >= self.min.x
            && origin.x <= self.max.x
            && origin.z >= self.min.z
            && origin.z <= self.max.z;

        inside_footprint && origin.y <= self.max.y && origin.y + distance >= self.min.y
    }
}

/// Static collision geometry: a flat list of category-tagged boxes
pub struct StaticWorld {
    surfaces: Vec<(Aabb, CollisionMask)>,
}

impl StaticWorld {
    pub fn new() -> Self {
        Self {
            surfaces: Vec::new(),
        }
    }

    pub fn add(&mut self, aabb: Aabb, mask: CollisionMask) {
        self.surfaces.push((aabb, mask));
    }

    /// A square ground slab centered on the origin with its top at `top_y`
    pub fn with_floor(half_extent: f32, top_y: f32) -> Self {
        let mut world = Self::new();
        world.add(
            Aabb::new(
                Vec3::new(-half_extent, top_y - 1.0, -half_extent),
                Vec3::new(half_extent, top_y, half_extent),
            ),
            CollisionMask::GROUND,
        );
        world
    }
}

impl Default for StaticWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldQuery for StaticWorld {
    fn probe_sphere(&self, center: Vec3, radius: f32, mask: CollisionMask) -> bool {
        self.surfaces
            .iter()
            .any(|(aabb, m)| m.intersects(mask) && aabb.overlaps_sphere(center, radius))
    }

    fn raycast_up(&self, origin: Vec3, distance: f32, mask: CollisionMask) -> bool {
        self.surfaces
            .iter()
            .any(|(aabb, m)| m.intersects(mask) && aabb.hit_by_vertical_ray(origin, distance))
    }
}

/// Probe anchors for one avatar body
///
/// Positions are feet-relative: the foot anchor sits slightly above the feet
/// so the ground sphere straddles the contact plane, the head anchor sits at
/// head height and is the origin of the ceiling ray.
#[derive(Debug, Clone, Copy)]
pub struct BodyProbes {
    foot_offset: f32,
    head_offset: f32,
    ground_radius: f32,
    ceiling_distance: f32,
}

impl BodyProbes {
    pub fn new(
        foot_offset: f32,
        head_offset: f32,
        ground_radius: f32,
        ceiling_distance: f32,
    ) -> Result<Self, ProbeError> {
        for (name, value) in [
            ("foot_offset", foot_offset),
            ("head_offset", head_offset),
            ("ground_radius", ground_radius),
            ("ceiling_distance", ceiling_distance),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ProbeError::NonPositive { name, value });
            }
        }
        if head_offset <= foot_offset {
            return Err(ProbeError::AnchorOrder {
                foot: foot_offset,
                head: head_offset,
            });
        }

        Ok(Self {
            foot_offset,
            head_offset,
            ground_radius,
            ceiling_distance,
        })
    }

    /// Sample ground contact beneath an avatar standing at `feet`
    pub fn ground_contact(&self, feet: Vec3, world: &dyn WorldQuery) -> bool {
        let anchor = Vec3::new(feet.x, feet.y + self.foot_offset, feet.z);
        world.probe_sphere(anchor, self.ground_radius, CollisionMask::GROUND)
    }

    /// Sample ceiling contact above an avatar standing at `feet`
    pub fn ceiling_contact(&self, feet: Vec3, world: &dyn WorldQuery) -> bool {
        let anchor = Vec3::new(feet.x, feet.y + self.head_offset, feet.z);
        world.raycast_up(anchor, self.ceiling_distance, CollisionMask::CEILING)
    }
}

/// Probe configuration errors, fatal at initialization
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Probe {name} must be finite and positive, got {value}")]
    NonPositive { name: &'static str, value: f32 },

    #[error("Head anchor ({head}) must sit above foot anchor ({foot})")]
    AnchorOrder { foot: f32, head: f32 },
}
