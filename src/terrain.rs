//! Terrain height query. Consulted only when placing rigs and debris; the
//! physical ground is the slab owned by [`crate::physics::PhysicsWorld`].

pub trait TerrainHeight {
    fn height_at(&self, x: f32, z: f32) -> f32;
}

/// Level ground at a fixed height, matching the physics slab at 0.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlatTerrain {
    pub height: f32,
}

impl TerrainHeight for FlatTerrain {
    fn height_at(&self, _x: f32, _z: f32) -> f32 {
        self.height
    }
}

impl<F> TerrainHeight for F
where
    F: Fn(f32, f32) -> f32,
{
    fn height_at(&self, x: f32, z: f32) -> f32 {
        self(x, z)
    }
}
