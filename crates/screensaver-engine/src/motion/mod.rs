//! Per-frame box motion inside the viewport.

mod integrator;

pub use integrator::{
    BoundaryPolicy, MotionConfig, MotionIntegrator, ReflectMode, StepOutcome, apply_hard_reset,
    apply_reflect, integrate,
};
