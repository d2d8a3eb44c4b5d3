//! Transform layout and draw-call recording.
//!
//! Categories are laid out in [`ObjectCategory::ALL`] order, so each one's
//! instances occupy a contiguous range of the transform buffer starting at the
//! running total of the categories before it. The recorder issues exactly one
//! instanced draw per category with the same `first_instance`.

use ringframe_resources::{MeshMenagerie, MeshRange};
use ringframe_scene::{ObjectCategory, Scene};

use crate::backend::CommandRecorder;
use crate::error::RenderResult;
use crate::ubo::InstanceTransform;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryInstances {
    pub category: ObjectCategory,
    pub first_instance: u32,
    pub count: u32,
}

/// The transforms of one frame plus where each category's run starts.
#[derive(Debug, Clone)]
pub struct InstanceLayout {
    transforms: Vec<InstanceTransform>,
    ranges: [CategoryInstances; 3],
    clamped: Vec<ObjectCategory>,
}

impl InstanceLayout {
    /// Lays out `scene` into at most `capacity` transforms.
    ///
    /// When the scene does not fit, later categories lose instances first
    /// and are listed in [`InstanceLayout::clamped`].
    pub fn build(scene: &Scene, capacity: usize) -> Self {
        let mut transforms = Vec::with_capacity(scene.instance_count().min(capacity));
        let mut clamped = Vec::new();

        let ranges = ObjectCategory::ALL.map(|category| {
            let positions = scene.positions(category);
            let room = capacity - transforms.len();
            let taken = positions.len().min(room);
            if taken < positions.len() {
                clamped.push(category);
            }

            let first_instance = transforms.len() as u32;
            transforms.extend(positions[..taken].iter().map(|&p| InstanceTransform::at(p)));
            CategoryInstances {
                category,
                first_instance,
                count: taken as u32,
            }
        });

        Self {
            transforms,
            ranges,
            clamped,
        }
    }

    pub fn transforms(&self) -> &[InstanceTransform] {
        &self.transforms
    }

    pub fn ranges(&self) -> &[CategoryInstances; 3] {
        &self.ranges
    }

    pub fn clamped(&self) -> &[ObjectCategory] {
        &self.clamped
    }

    pub fn instance_count(&self) -> usize {
        self.transforms.len()
    }
}

/// Records a frame's command stream. Holds only immutable mesh ranges.
#[derive(Debug, Clone)]
pub struct DrawRecorder {
    meshes: [MeshRange; 3],
}

impl DrawRecorder {
    pub fn new(meshes: &MeshMenagerie) -> RenderResult<Self> {
        Ok(Self {
            meshes: [
                meshes.range(ObjectCategory::Triangle)?,
                meshes.range(ObjectCategory::Square)?,
                meshes.range(ObjectCategory::Star)?,
            ],
        })
    }

    pub fn mesh(&self, category: ObjectCategory) -> MeshRange {
        self.meshes[category.index()]
    }

    pub fn record<R: CommandRecorder>(
        &self,
        recorder: &mut R,
        target: &R::Target,
        layout: &InstanceLayout,
    ) -> RenderResult<()> {
        recorder.begin_pass(target)?;
        recorder.bind_pipeline();
        recorder.bind_frame_data();
        recorder.bind_geometry();

        for run in layout.ranges() {
            recorder.bind_category(run.category);
            recorder.draw_instanced(self.mesh(run.category), run.count, run.first_instance);
        }

        recorder.end_pass()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[derive(Debug, PartialEq)]
    enum Cmd {
        Begin(u32),
        Pipeline,
        FrameData,
        Geometry,
        Category(ObjectCategory),
        Draw(u32, u32, u32),
        End,
    }

    #[derive(Default)]
    struct Log(Vec<Cmd>);

    impl CommandRecorder for Log {
        type Target = u32;

        fn begin_pass(&mut self, target: &u32) -> RenderResult<()> {
            self.0.push(Cmd::Begin(*target));
            Ok(())
        }
        fn bind_pipeline(&mut self) {
            self.0.push(Cmd::Pipeline);
        }
        fn bind_frame_data(&mut self) {
            self.0.push(Cmd::FrameData);
        }
        fn bind_geometry(&mut self) {
            self.0.push(Cmd::Geometry);
        }
        fn bind_category(&mut self, category: ObjectCategory) {
            self.0.push(Cmd::Category(category));
        }
        fn draw_instanced(&mut self, mesh: MeshRange, count: u32, first: u32) {
            self.0.push(Cmd::Draw(mesh.index_count, count, first));
        }
        fn end_pass(&mut self) -> RenderResult<()> {
            self.0.push(Cmd::End);
            Ok(())
        }
    }

    fn scene(triangles: usize, squares: usize, stars: usize) -> Scene {
        let mut scene = Scene::new();
        scene.triangles = vec![Vec3::X; triangles];
        scene.squares = vec![Vec3::Y; squares];
        scene.stars = vec![Vec3::Z; stars];
        scene
    }

    #[test]
    fn test_layout_offsets_follow_category_order() {
        let layout = InstanceLayout::build(&scene(2, 3, 4), 100);
        let starts: Vec<_> = layout.ranges().iter().map(|r| (r.first_instance, r.count)).collect();
        assert_eq!(starts, vec![(0, 2), (2, 3), (5, 4)]);
        assert_eq!(layout.instance_count(), 9);
        assert!(layout.clamped().is_empty());

        assert_eq!(layout.transforms()[1], InstanceTransform::at(Vec3::X));
        assert_eq!(layout.transforms()[2], InstanceTransform::at(Vec3::Y));
        assert_eq!(layout.transforms()[8], InstanceTransform::at(Vec3::Z));
    }

    #[test]
    fn test_layout_clamps_later_categories_first() {
        let layout = InstanceLayout::build(&scene(2, 3, 4), 4);
        let counts: Vec<_> = layout.ranges().iter().map(|r| r.count).collect();
        assert_eq!(counts, vec![2, 2, 0]);
        assert_eq!(
            layout.clamped(),
            &[ObjectCategory::Square, ObjectCategory::Star]
        );
        assert_eq!(layout.instance_count(), 4);
    }

    #[test]
    fn test_record_emits_one_draw_per_category() {
        let meshes = MeshMenagerie::builtin().unwrap();
        let recorder = DrawRecorder::new(&meshes).unwrap();
        let layout = InstanceLayout::build(&scene(1, 0, 2), 16);

        let mut log = Log::default();
        recorder.record(&mut log, &7, &layout).unwrap();

        assert_eq!(
            log.0,
            vec![
                Cmd::Begin(7),
                Cmd::Pipeline,
                Cmd::FrameData,
                Cmd::Geometry,
                Cmd::Category(ObjectCategory::Triangle),
                Cmd::Draw(3, 1, 0),
                Cmd::Category(ObjectCategory::Square),
                Cmd::Draw(6, 0, 1),
                Cmd::Category(ObjectCategory::Star),
                Cmd::Draw(24, 2, 1),
                Cmd::End,
            ]
        );
    }

    #[test]
    fn test_empty_scene_still_records_pass() {
        let meshes = MeshMenagerie::builtin().unwrap();
        let recorder = DrawRecorder::new(&meshes).unwrap();
        let layout = InstanceLayout::build(&Scene::new(), 16);

        let mut log = Log::default();
        recorder.record(&mut log, &0, &layout).unwrap();
        let draws = log.0.iter().filter(|c| matches!(c, Cmd::Draw(_, 0, 0))).count();
        assert_eq!(draws, 3);
        assert_eq!(log.0.last(), Some(&Cmd::End));
    }
}
