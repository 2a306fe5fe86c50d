use serde::{Deserialize, Serialize};

/// Edge length of a land cell in blocks (as a shift).
pub const CHUNK_SHIFT: u32 = 4;

/// A point in a world, used for faction homes and position lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub world: String,
    pub dimension: i32,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub yaw: f32,
    #[serde(default)]
    pub pitch: f32,
}

impl Location {
    pub fn new(world: impl Into<String>, dimension: i32, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: world.into(),
            dimension,
            x,
            y,
            z,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    /// Chunk coordinates `(x, z)` of the cell containing this location.
    pub fn chunk(&self) -> (i32, i32) {
        (
            (self.x.floor() as i32) >> CHUNK_SHIFT,
            (self.z.floor() as i32) >> CHUNK_SHIFT,
        )
    }
}
