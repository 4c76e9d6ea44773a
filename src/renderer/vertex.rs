const R: [f32; 3] = [1.0, 0.0, 0.0];
const G: [f32; 3] = [0.0, 1.0, 0.0];
const B: [f32; 3] = [0.0, 0.0, 1.0];

pub const VERTEX_COUNT: u32 = 6;

/// Two triangles covering clip space.
#[rustfmt::skip]
pub const POSITIONS: [[f32; 3]; VERTEX_COUNT as usize] = [
    [-1.0, -1.0, 0.0],
    [ 1.0, -1.0, 0.0],
    [ 1.0,  1.0, 0.0],
    [-1.0, -1.0, 0.0],
    [ 1.0,  1.0, 0.0],
    [-1.0,  1.0, 0.0],
];

/// Paired with `POSITIONS` by index.
pub const COLORS: [[f32; 3]; VERTEX_COUNT as usize] = [B, G, R, B, R, G];
