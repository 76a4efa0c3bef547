//! Collision system demo
//!
//! Drives the asynchronous collision system through a small asteroid field:
//! - Ships and rocks drifting inside a bounded world, bouncing off its walls
//! - Collision queries issued every frame and picked up a frame later
//! - Nearest-ground lookups against a floor slab
//! - Stats, profile data and a world dump at the end
//!
//! Pass a `.toml` or `.ron` collision config path as the first argument to
//! override the defaults.

use collision_engine::prelude::*;
use std::f32::consts::TAU;

const WORLD_HALF_SIZE: f32 = 60.0;
const ARENA_HALF_SIZE: f32 = 40.0;
const FLOOR_HEIGHT: f32 = -30.0;
const NUM_BODIES: usize = 24;
const FRAMES: u32 = 240;
const FRAME_TIME: f32 = 1.0 / 60.0;
const BODY_SPEED: f32 = 12.0;

// User flags
const GROUND_FLAG: u64 = 1 << 0;
const BODY_FLAG: u64 = 1 << 1;

struct Body {
    shape_id: ShapeId,
    position: Vec3,
    velocity: Vec3,
    /// Collision query issued last frame, if not yet answered
    contacts: TaskId,
}

struct CollisionDemo {
    system: CollisionSystem,
    errors: ErrorLog,
    bodies: Vec<Body>,
    floor: ShapeId,
    collisions_resolved: usize,
}

impl CollisionDemo {
    fn new(config: CollisionConfig) -> Result<Self, CollisionError> {
        let errors = ErrorLog::new();
        let mut system = CollisionSystem::new(config, errors.clone());
        system.initialize(Aabb::from_center_extents(Vec3::zeros(), Vec3::repeat(WORLD_HALF_SIZE)))?;

        let floor = system.try_add_shape(
            Shape::cuboid(Vec3::new(ARENA_HALF_SIZE, 1.0, ARENA_HALF_SIZE))
                .with_position(Vec3::new(0.0, FLOOR_HEIGHT - 1.0, 0.0))
                .with_user_flags(GROUND_FLAG),
            AddFlags::empty(),
        )?;

        let mut bodies = Vec::with_capacity(NUM_BODIES);
        for i in 0..NUM_BODIES {
            let angle = TAU * i as f32 / NUM_BODIES as f32;
            let position = Vec3::new(angle.cos(), (angle * 3.0).sin() * 0.5, angle.sin()) * 20.0;
            let velocity = Vec3::new(-angle.sin(), 0.3 * angle.cos(), angle.cos()) * BODY_SPEED;
            let shape = match i % 3 {
                0 => Shape::sphere(1.5),
                1 => Shape::cuboid(Vec3::new(1.0, 1.5, 2.0)),
                _ => Shape::capsule(Vec3::new(0.0, -1.0, 0.0), Vec3::new(0.0, 1.0, 0.0), 0.75),
            };
            let shape_id = system.try_add_shape(
                shape.with_position(position).with_user_flags(BODY_FLAG),
                AddFlags::empty(),
            )?;
            bodies.push(Body {
                shape_id,
                position,
                velocity,
                contacts: TaskId::NONE,
            });
        }
        log::info!("Spawned {} bodies above floor {}", bodies.len(), floor);

        Ok(Self {
            system,
            errors,
            bodies,
            floor,
            collisions_resolved: 0,
        })
    }

    fn run(&mut self) {
        for frame in 0..FRAMES {
            self.resolve_contacts();
            self.integrate();
            if frame % 60 == 0 {
                self.sample_ground(frame);
            }
        }
        self.system.flush_all_tasks();
        self.resolve_contacts();
        log::info!("Resolved {} collisions over {FRAMES} frames", self.collisions_resolved);
    }

    /// Pick up last frame's collision results without blocking
    fn resolve_contacts(&mut self) {
        for body in &mut self.bodies {
            if body.contacts.is_none() {
                continue;
            }
            match self.system.task_state(body.contacts) {
                Some(TaskState::Pending) => continue,
                Some(TaskState::Completed) => {
                    if let Some(result) = self.system.obtain_result::<CollisionQueryResult>(body.contacts) {
                        if let Some(worst) = result.most_egregious_collision() {
                            body.position += worst.separation_delta;
                            if let Some(normal) = worst.separation_delta.try_normalize(1.0e-6) {
                                body.velocity -= normal * 2.0 * body.velocity.dot(&normal);
                            }
                            self.collisions_resolved += 1;
                        }
                    }
                }
                _ => {}
            }
            body.contacts = TaskId::NONE;
        }
    }

    fn integrate(&mut self) {
        for body in &mut self.bodies {
            body.position += body.velocity * FRAME_TIME;
            for axis in 0..3 {
                let limit = if axis == 1 { ARENA_HALF_SIZE * 0.5 } else { ARENA_HALF_SIZE };
                if body.position[axis].abs() > limit {
                    body.position[axis] = body.position[axis].clamp(-limit, limit);
                    body.velocity[axis] = -body.velocity[axis];
                }
            }
            self.system
                .set_object_to_world(body.shape_id, RigidTransform::from_translation(body.position));
            if body.contacts.is_none() {
                body.contacts = self.system.make_query(Query::Collision {
                    shape_id: body.shape_id,
                    user_flags_mask: BODY_FLAG,
                });
            }
        }
    }

    fn sample_ground(&self, frame: u32) {
        let Some(body) = self.bodies.first() else {
            return;
        };
        let task = self.system.make_query(Query::NearestGround {
            point: body.position,
            max_distance: 2.0 * WORLD_HALF_SIZE,
            user_flags_mask: GROUND_FLAG,
        });
        self.system.flush_all_tasks();
        match self.system.obtain_result::<NearestGroundResult>(task) {
            Some(ground) if ground.found() => {
                log::info!(
                    "Frame {frame}: {} is {:.2} above {}",
                    body.shape_id,
                    ground.distance,
                    ground.shape_id
                );
                debug_assert_eq!(ground.shape_id, self.floor);
            }
            _ => log::info!("Frame {frame}: no ground below {}", body.shape_id),
        }
    }

    fn report(&self) {
        let stats = self.system.make_query(Query::Stats);
        let profile = self.system.make_query(Query::ProfileStats);
        let lines = self.system.make_query(Query::DebugRender {
            draw_flags: DrawFlags::SHAPES | DrawFlags::AABB_TREE,
        });
        self.system.flush_all_tasks();

        if let Some(stats) = self.system.obtain_result::<StatsResult>(stats) {
            println!("{stats}");
        }
        if let Some(profile) = self.system.obtain_result::<ProfileStatsResult>(profile) {
            println!("{profile}");
        }
        if let Some(lines) = self.system.obtain_result::<DebugRenderResult>(lines) {
            println!("Debug render: {} lines", lines.lines.len());
        }
    }

    fn dump(&self) {
        let path = std::env::temp_dir().join("collision_demo.csys");
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                log::warn!("Could not remove old dump {}: {e}", path.display());
            }
        }
        let task = self.system.dump_to_file(&path);
        self.system.flush_all_tasks();
        match self.system.obtain_result::<FileResult>(task) {
            Some(result) if result.success => {
                println!("Dumped {} shapes to {}", result.shape_count, path.display());
            }
            Some(result) => println!("Dump failed: {}", result.error.unwrap_or_default()),
            None => println!("Dump did not complete"),
        }
    }

    fn shutdown(mut self) {
        self.system.shutdown();
        let messages = self.errors.all_error_messages();
        if messages.is_empty() {
            log::info!("No collision errors recorded");
        }
        for message in messages {
            log::warn!("Collision error: {message}");
        }
    }
}

fn load_config() -> CollisionConfig {
    let Some(path) = std::env::args().nth(1) else {
        return CollisionConfig::default();
    };
    match CollisionConfig::load_from_file(&path) {
        Ok(config) => {
            log::info!("Loaded collision config from {path}");
            config
        }
        Err(e) => {
            log::warn!("Failed to load {path}: {e}; using defaults");
            CollisionConfig::default()
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    println!("=== Collision System Demo ===");
    println!("{NUM_BODIES} bodies, {FRAMES} frames");
    println!();

    let mut demo = CollisionDemo::new(load_config())?;
    demo.run();
    demo.report();
    demo.dump();
    demo.shutdown();
    Ok(())
}
