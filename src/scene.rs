//! Scene assembly and the per-frame tick.
//!
//! A [`Scene`] owns every group: its build-once dataset, its morph
//! controller, and for ornaments a reused instance buffer. One call to
//! [`Scene::tick`] per rendered frame reads the [`MorphSwitch`] once, advances
//! every controller, and re-evaluates every ornament instance. The result is
//! handed to the render layer with [`Scene::submit`].
//!
//! ```ignore
//! let switch = MorphSwitch::new(config.initial_state);
//! let mut scene = Scene::seeded(config);
//! loop {
//!     let (elapsed, delta) = time.update();
//!     scene.tick(delta, elapsed, &switch);
//!     scene.submit(&mut gpu);
//! }
//! ```

use crate::config::SceneConfig;
use crate::dataset::{
    build_dust, build_foliage, build_ornaments, build_stars, Dataset, DustRecord, OrnamentRecord,
    ParticleRecord, ShapeType,
};
use crate::distribution::RandomSource;
use crate::evaluate::{evaluate_ornament, FoliageStyle};
use crate::gpu::layout::OrnamentInstance;
use crate::gpu::FrameSink;
use crate::morph::{MorphController, MorphState, MorphSwitch};
use rand::rngs::SmallRng;
use rand::SeedableRng;

/// Scalars pushed to the render layer once per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    /// Elapsed scene time in seconds.
    pub time: f32,
    /// Target read from the switch this frame.
    pub state: MorphState,
    /// Raw foliage progress. The foliage shader eases it itself.
    pub foliage_progress: f32,
    pub foliage_blend: f32,
    pub sphere_blend: f32,
    pub box_blend: f32,
}

impl FrameUniforms {
    fn settled(state: MorphState) -> Self {
        let t = state.target();
        Self {
            time: 0.0,
            state,
            foliage_progress: t,
            foliage_blend: t,
            sphere_blend: t,
            box_blend: t,
        }
    }
}

/// The 14 000-point foliage cloud. Evaluated on the GPU.
#[derive(Debug)]
pub struct FoliageGroup {
    dataset: Option<Dataset<ParticleRecord>>,
    controller: MorphController,
    style: FoliageStyle,
}

impl FoliageGroup {
    pub fn records(&self) -> Option<&[ParticleRecord]> {
        self.dataset.as_deref()
    }

    pub fn controller(&self) -> &MorphController {
        &self.controller
    }

    pub fn style(&self) -> &FoliageStyle {
        &self.style
    }
}

/// One ornament shape. Evaluated on the host into instance transforms.
#[derive(Debug)]
pub struct OrnamentGroup {
    shape: ShapeType,
    dataset: Option<Dataset<OrnamentRecord>>,
    controller: MorphController,
    instances: Vec<OrnamentInstance>,
    reported_missing: bool,
}

impl OrnamentGroup {
    fn new(shape: ShapeType, dataset: Option<Dataset<OrnamentRecord>>, controller: MorphController) -> Self {
        let capacity = dataset.as_ref().map_or(0, |d| d.len());
        Self {
            shape,
            dataset,
            controller,
            instances: Vec::with_capacity(capacity),
            reported_missing: false,
        }
    }

    /// Re-evaluate every instance into the scratch buffer.
    ///
    /// The buffer keeps its capacity across frames, so steady-state frames do
    /// not allocate.
    fn evaluate(&mut self, blend: f32, time: f32, float_amplitude: f32) {
        self.instances.clear();
        let Some(dataset) = &self.dataset else {
            if !self.reported_missing {
                log::debug!("{:?} ornaments have no dataset, skipping", self.shape);
                self.reported_missing = true;
            }
            return;
        };
        self.instances.extend(
            dataset
                .iter()
                .map(|r| OrnamentInstance::from(evaluate_ornament(r, blend, time, float_amplitude))),
        );
    }

    pub fn shape(&self) -> ShapeType {
        self.shape
    }

    pub fn records(&self) -> Option<&[OrnamentRecord]> {
        self.dataset.as_deref()
    }

    pub fn controller(&self) -> &MorphController {
        &self.controller
    }

    /// Instances evaluated by the last [`Scene::tick`].
    pub fn instances(&self) -> &[OrnamentInstance] {
        &self.instances
    }
}

/// Every group of the scene plus the last evaluated frame.
#[derive(Debug)]
pub struct Scene {
    config: SceneConfig,
    foliage: FoliageGroup,
    spheres: OrnamentGroup,
    boxes: OrnamentGroup,
    dust: Option<Dataset<DustRecord>>,
    stars: Option<Dataset<ParticleRecord>>,
    frame: FrameUniforms,
}

impl Scene {
    /// Build every dataset once from `rng`.
    ///
    /// Datasets are drawn in a fixed order (foliage, spheres, boxes, dust,
    /// stars) so a seeded generator reproduces the whole scene.
    pub fn build<R: RandomSource + ?Sized>(config: SceneConfig, rng: &mut R) -> Self {
        let foliage = build_foliage(config.foliage.count, &config.tree, config.scatter_radius, rng);
        let spheres = build_ornaments(
            ShapeType::Sphere,
            &config.spheres,
            &config.tree,
            config.scatter_radius,
            rng,
        );
        let boxes = build_ornaments(
            ShapeType::Box,
            &config.boxes,
            &config.tree,
            config.scatter_radius,
            rng,
        );
        let dust = build_dust(&config.dust, rng);
        let stars = build_stars(&config.stars, rng);

        Self::assemble(config, Some(foliage), Some(spheres), Some(boxes), Some(dust), Some(stars))
    }

    /// Build with [`SceneConfig::seed`], or an OS-seeded generator when unset.
    pub fn seeded(config: SceneConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => {
                log::info!("building scene with seed {seed}");
                SmallRng::seed_from_u64(seed)
            }
            None => SmallRng::from_entropy(),
        };
        Self::build(config, &mut rng)
    }

    /// Scene whose groups have no datasets yet. Every frame is empty.
    pub fn unbuilt(config: SceneConfig) -> Self {
        Self::assemble(config, None, None, None, None, None)
    }

    fn assemble(
        config: SceneConfig,
        foliage: Option<Dataset<ParticleRecord>>,
        spheres: Option<Dataset<OrnamentRecord>>,
        boxes: Option<Dataset<OrnamentRecord>>,
        dust: Option<Dataset<DustRecord>>,
        stars: Option<Dataset<ParticleRecord>>,
    ) -> Self {
        let initial = config.initial_state;
        Self {
            foliage: FoliageGroup {
                dataset: foliage,
                controller: MorphController::new(initial, config.foliage.damping),
                style: FoliageStyle::new(&config.foliage, config.float_amplitude),
            },
            spheres: OrnamentGroup::new(
                ShapeType::Sphere,
                spheres,
                MorphController::new(initial, config.spheres.damping),
            ),
            boxes: OrnamentGroup::new(
                ShapeType::Box,
                boxes,
                MorphController::new(initial, config.boxes.damping),
            ),
            dust,
            stars,
            frame: FrameUniforms::settled(initial),
            config,
        }
    }

    /// Advance one frame.
    ///
    /// Reads `switch` exactly once, so every group chases the same target
    /// within a frame.
    pub fn tick(&mut self, dt: f32, time: f32, switch: &MorphSwitch) -> FrameUniforms {
        let state = switch.get();
        let amplitude = self.config.float_amplitude;

        let foliage_blend = self.foliage.controller.advance(dt, state);
        let sphere_blend = self.spheres.controller.advance(dt, state);
        let box_blend = self.boxes.controller.advance(dt, state);

        self.spheres.evaluate(sphere_blend, time, amplitude);
        self.boxes.evaluate(box_blend, time, amplitude);

        self.frame = FrameUniforms {
            time,
            state,
            foliage_progress: self.foliage.controller.progress(),
            foliage_blend,
            sphere_blend,
            box_blend,
        };
        self.frame
    }

    /// Hand the last evaluated frame to the render layer.
    ///
    /// Ornament groups without a dataset upload nothing.
    pub fn submit<S: FrameSink + ?Sized>(&self, sink: &mut S) {
        sink.upload_uniforms(&self.frame);
        for group in [&self.spheres, &self.boxes] {
            if group.dataset.is_some() {
                sink.upload_instances(group.shape, &group.instances);
            }
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Frame produced by the last [`tick`](Self::tick).
    pub fn frame(&self) -> &FrameUniforms {
        &self.frame
    }

    pub fn foliage(&self) -> &FoliageGroup {
        &self.foliage
    }

    pub fn ornaments(&self, shape: ShapeType) -> &OrnamentGroup {
        match shape {
            ShapeType::Sphere => &self.spheres,
            ShapeType::Box => &self.boxes,
        }
    }

    pub fn dust(&self) -> Option<&[DustRecord]> {
        self.dust.as_deref()
    }

    pub fn stars(&self) -> Option<&[ParticleRecord]> {
        self.stars.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;

    fn small_config() -> SceneConfig {
        let mut config = SceneConfig::default();
        config.foliage.count = 500;
        config.spheres.count = 40;
        config.boxes.count = 20;
        config.dust.count = 30;
        config.stars.count = 50;
        config
    }

    #[test]
    fn test_build_respects_counts() {
        let mut rng = SmallRng::seed_from_u64(3);
        let scene = Scene::build(small_config(), &mut rng);
        assert_eq!(scene.foliage().records().map(<[_]>::len), Some(500));
        assert_eq!(scene.ornaments(ShapeType::Sphere).records().map(<[_]>::len), Some(40));
        assert_eq!(scene.ornaments(ShapeType::Box).records().map(<[_]>::len), Some(20));
        assert_eq!(scene.dust().map(<[_]>::len), Some(30));
        assert_eq!(scene.stars().map(<[_]>::len), Some(50));
    }

    #[test]
    fn test_tick_fills_instances_without_growing() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut scene = Scene::build(small_config(), &mut rng);
        let switch = MorphSwitch::new(MorphState::Scattered);

        scene.tick(1.0 / 60.0, 0.0, &switch);
        let capacity = scene.spheres.instances.capacity();
        for i in 1..120 {
            scene.tick(1.0 / 60.0, i as f32 / 60.0, &switch);
        }
        assert_eq!(scene.ornaments(ShapeType::Sphere).instances().len(), 40);
        assert_eq!(scene.spheres.instances.capacity(), capacity);
    }

    #[test]
    fn test_initial_state_does_not_snap() {
        let mut config = small_config();
        config.initial_state = MorphState::Formed;
        let mut rng = SmallRng::seed_from_u64(3);
        let mut scene = Scene::build(config, &mut rng);
        let switch = MorphSwitch::new(MorphState::Formed);

        let frame = scene.tick(1.0 / 60.0, 0.0, &switch);
        assert_eq!(frame.foliage_progress, 1.0);
        assert_eq!(frame.sphere_blend, 1.0);
        assert_eq!(frame.box_blend, 1.0);
    }

    #[test]
    fn test_groups_converge_at_their_own_rate() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut scene = Scene::build(small_config(), &mut rng);
        let switch = MorphSwitch::new(MorphState::Formed);

        let frame = scene.tick(0.1, 0.1, &switch);
        assert!(frame.sphere_blend > frame.foliage_blend);
        assert!(frame.foliage_blend > frame.box_blend);
    }
}
