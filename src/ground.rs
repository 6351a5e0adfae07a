use crate::types::Vertex;

/// Half-width of the square ground plane
pub const GROUND_EXTENT: f32 = 1000.0;
/// Distance between neighbouring grid lines
pub const GRID_SPACING: f32 = 100.0;
/// Grid lines on each side of the origin, per axis
pub const GRID_HALF_COUNT: i32 = 10;

const PLANE_Z: f32 = -1.0;
const GRID_Z: f32 = 0.0;

/// Display (sRGB) colours
pub const PLANE_COLOR: [f32; 4] = [0.2, 0.6, 0.2, 1.0];
pub const GRID_COLOR: [f32; 4] = [0.3, 0.7, 0.3, 1.0];

/// Static ground geometry: a solid plane just below z = 0 and grid lines on top
#[derive(Debug, Clone)]
pub struct GroundMesh {
    pub plane: [Vertex; 6],
    pub lines: Vec<Vertex>,
}

impl GroundMesh {
    pub fn new() -> Self {
        let e = GROUND_EXTENT;
        let corner = |x: f32, y: f32| Vertex::colored([x, y, PLANE_Z], PLANE_COLOR);
        let plane = [
            corner(-e, -e),
            corner(e, -e),
            corner(e, e),
            corner(-e, -e),
            corner(e, e),
            corner(-e, e),
        ];

        let lines = (-GRID_HALF_COUNT..=GRID_HALF_COUNT)
            .flat_map(|i| {
                let offset = i as f32 * GRID_SPACING;
                [
                    Vertex::colored([offset, -e, GRID_Z], GRID_COLOR),
                    Vertex::colored([offset, e, GRID_Z], GRID_COLOR),
                    Vertex::colored([-e, offset, GRID_Z], GRID_COLOR),
                    Vertex::colored([e, offset, GRID_Z], GRID_COLOR),
                ]
            })
            .collect();

        Self { plane, lines }
    }
}

impl Default for GroundMesh {
    fn default() -> Self {
        Self::new()
    }
}
