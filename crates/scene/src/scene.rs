//! The per-category position lists rendered each frame.

use glam::Vec3;

/// Object kinds, each drawn with one instanced call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectCategory {
    Triangle,
    Square,
    Star,
}

impl ObjectCategory {
    /// Draw order. Transform buffers are laid out in this order too.
    pub const ALL: [ObjectCategory; 3] = [
        ObjectCategory::Triangle,
        ObjectCategory::Square,
        ObjectCategory::Star,
    ];

    pub fn index(self) -> usize {
        match self {
            ObjectCategory::Triangle => 0,
            ObjectCategory::Square => 1,
            ObjectCategory::Star => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ObjectCategory::Triangle => "triangle",
            ObjectCategory::Square => "square",
            ObjectCategory::Star => "star",
        }
    }
}

/// World positions per category.
///
/// The renderer only borrows a `Scene` for the duration of a frame; the
/// owner must not mutate it while workers are rendering from it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub triangles: Vec<Vec3>,
    pub squares: Vec<Vec3>,
    pub stars: Vec<Vec3>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Three columns, one per category, spaced 0.2 apart along Y.
    pub fn demo() -> Self {
        let column = |x: f32| -> Vec<Vec3> {
            (0..10)
                .map(|i| Vec3::new(x, -1.0 + 0.2 * i as f32, 0.0))
                .collect()
        };
        Self {
            triangles: column(-0.3),
            squares: column(0.0),
            stars: column(0.3),
        }
    }

    pub fn positions(&self, category: ObjectCategory) -> &[Vec3] {
        match category {
            ObjectCategory::Triangle => &self.triangles,
            ObjectCategory::Square => &self.squares,
            ObjectCategory::Star => &self.stars,
        }
    }

    pub fn positions_mut(&mut self, category: ObjectCategory) -> &mut Vec<Vec3> {
        match category {
            ObjectCategory::Triangle => &mut self.triangles,
            ObjectCategory::Square => &mut self.squares,
            ObjectCategory::Star => &mut self.stars,
        }
    }

    pub fn instance_count(&self) -> usize {
        ObjectCategory::ALL
            .iter()
            .map(|&c| self.positions(c).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.instance_count() == 0
    }
}
