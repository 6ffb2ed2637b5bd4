//! Headless swarm demo
//!
//! Runs a small particle swarm through the scheduler without a renderer.
//! Particles drift inside a box, some expire after a random lifetime, and a
//! census component stops the engine once enough simulated time has passed.
//!
//! Usage: `swarm_demo [config.toml|config.ron] [--particles N]`

use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, info, warn};
use pyg_engine::config::ConfigError;
use pyg_engine::foundation::logging;
use pyg_engine::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DEFAULT_PARTICLES: usize = 24;
const RNG_SEED: u64 = 0x5eed;

#[derive(thiserror::Error, Debug)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error("invalid argument: {0}")]
    Argument(String),
}

/// Results gathered by components while the swarm runs
#[derive(Debug, Default)]
struct Summary {
    expired: usize,
    destroyed: usize,
    bounces: u64,
    farthest: f32,
}

type SharedSummary = Rc<RefCell<Summary>>;

/// Integrates `position` by `velocity` and bounces off the box edges
#[derive(Clone)]
struct Mover {
    summary: SharedSummary,
}

impl Component for Mover {
    fn declare_properties(&self, properties: &mut PropertyBag) {
        properties.declare("position", Vec2::zeros(), false);
        properties.declare("velocity", Vec2::new(1.0, 0.0), true);
        properties.declare("half_extent", 10.0f32, true);
    }

    fn fixed_update(&mut self, ctx: &mut ComponentContext<'_>, dt: f64) {
        let props = ctx.properties();
        let mut position = props.get_as::<Vec2>("position").unwrap_or_else(Vec2::zeros);
        let mut velocity = props.get_as::<Vec2>("velocity").unwrap_or_else(Vec2::zeros);
        let extent = props.get_as::<f32>("half_extent").unwrap_or(10.0);

        position += velocity * seconds(dt);

        for axis in 0..2 {
            if position[axis].abs() > extent {
                position[axis] = position[axis].clamp(-extent, extent);
                velocity[axis] = -velocity[axis];
                self.summary.borrow_mut().bounces += 1;
            }
        }

        let owner = ctx.owner();
        let props = ctx.properties_mut();
        for (name, value) in [("position", position), ("velocity", velocity)] {
            if let Err(e) = props.set(name, value) {
                warn!("{} could not store {}: {}", owner, name, e);
            }
        }
    }

    fn on_destroy(&mut self, ctx: &mut ComponentContext<'_>) {
        let distance = ctx
            .properties()
            .get_as::<Vec2>("position")
            .map_or(0.0, |p| p.norm());

        let mut summary = self.summary.borrow_mut();
        summary.destroyed += 1;
        summary.farthest = summary.farthest.max(distance);
    }
}

/// Destroys its owner after `seconds` of simulated time
#[derive(Clone)]
struct Lifetime {
    remaining: f64,
    summary: SharedSummary,
}

impl Component for Lifetime {
    fn declare_properties(&self, properties: &mut PropertyBag) {
        properties.declare("seconds", seconds(self.remaining), true);
    }

    fn start(&mut self, ctx: &mut ComponentContext<'_>) {
        self.remaining = f64::from(ctx.properties().get_as::<f32>("seconds").unwrap_or(0.0));
    }

    fn update(&mut self, ctx: &mut ComponentContext<'_>, dt: f64) {
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            debug!("{} expired at t={:.2}", ctx.owner(), ctx.time().sim_time);
            self.summary.borrow_mut().expired += 1;
            ctx.destroy_owner();
        }
    }
}

/// Logs progress and stops the engine after `duration` simulated seconds
#[derive(Clone)]
struct Census {
    report_interval: f64,
    next_report: f64,
}

impl Component for Census {
    fn declare_properties(&self, properties: &mut PropertyBag) {
        properties.declare("duration", 10.0f32, true);
    }

    fn update(&mut self, ctx: &mut ComponentContext<'_>, _dt: f64) {
        let time = *ctx.time();
        if time.sim_time >= self.next_report {
            self.next_report += self.report_interval;
            info!(
                "frame {} sim {:.2}s fixed ticks {} alpha {:.3}",
                time.frame, time.sim_time, time.fixed_tick, time.alpha
            );
        }

        let duration = ctx.properties().get_as::<f32>("duration").unwrap_or(0.0);
        if time.sim_time >= f64::from(duration) {
            info!("{} reached {:.2}s of simulated time", ctx.name(), time.sim_time);
            ctx.request_stop();
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn seconds(value: f64) -> f32 {
    value as f32
}

fn parse_args() -> Result<(Option<String>, usize), AppError> {
    let mut config_path = None;
    let mut particles = DEFAULT_PARTICLES;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--particles" {
            let value = args.next().ok_or_else(|| AppError::Argument("--particles needs a value".to_string()))?;
            particles = value
                .parse()
                .map_err(|_| AppError::Argument(format!("'{value}' is not a particle count")))?;
        } else if arg.starts_with("--") {
            return Err(AppError::Argument(format!("unknown flag '{arg}'")));
        } else {
            config_path = Some(arg);
        }
    }

    Ok((config_path, particles))
}

fn load_config(path: Option<&str>) -> Result<EngineConfig, AppError> {
    let config = match path {
        Some(path) => EngineConfig::load_from_file(path)?,
        None => EngineConfig::new().with_time_scale(8.0),
    };

    Ok(config.with_headless(true))
}

fn build_swarm(scene: &mut Scene, particles: usize, summary: &SharedSummary) -> Result<ObjectId, AppError> {
    let mut rng = StdRng::seed_from_u64(RNG_SEED);

    let swarm = scene.spawn_root("swarm")?;
    scene.attach(swarm, "census", Census { report_interval: 1.0, next_report: 1.0 })?;

    let template = scene.spawn("particle")?;
    scene.attach(template, "mover", Mover { summary: Rc::clone(summary) })?;

    let mut members = vec![template];
    for _ in 1..particles {
        members.push(scene.clone_object(template)?);
    }

    for (index, particle) in members.into_iter().enumerate() {
        scene.set_name(particle, format!("particle-{index}"))?;
        scene.add_child(swarm, particle)?;

        if let Some(mover) = scene.find_component::<Mover>(particle)? {
            let velocity = Vec2::new(rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0));
            scene.set_property(mover, "velocity", velocity)?;
        }

        if rng.gen_bool(0.25) {
            let lifetime = Lifetime { remaining: rng.gen_range(1.0..6.0), summary: Rc::clone(summary) };
            scene.attach(particle, "lifetime", lifetime)?;
        }
    }

    Ok(swarm)
}

fn main() -> Result<(), AppError> {
    let (config_path, particles) = parse_args()?;
    let config = load_config(config_path.as_deref())?;

    logging::init_with_level(&config.log_level);
    info!("Starting swarm demo with {} particles", particles);

    let mut engine = Engine::new(config)?;
    let summary = SharedSummary::default();

    let swarm = build_swarm(engine.scene_mut(), particles, &summary)?;
    info!(
        "Scene ready: {} objects, {} components",
        engine.scene().object_count(),
        engine.scene().component_count()
    );

    if log::log_enabled!(log::Level::Debug) {
        match engine.scene().snapshot(swarm).map(|snapshot| snapshot.to_ron()) {
            Ok(Ok(text)) => debug!("Initial scene:\n{}", text),
            Ok(Err(e)) => warn!("Could not render scene snapshot: {}", e),
            Err(e) => warn!("Could not capture scene snapshot: {}", e),
        }
    }

    engine.start()?;

    let time = *engine.frame_time();
    let summary = summary.borrow();
    info!(
        "Swarm finished after {} frames ({:.2}s simulated, {} fixed ticks)",
        time.frame, time.sim_time, time.fixed_tick
    );
    info!(
        "{} particles expired, {} destroyed in total, {} bounces, farthest {:.2} from origin",
        summary.expired, summary.destroyed, summary.bounces, summary.farthest
    );

    Ok(())
}
