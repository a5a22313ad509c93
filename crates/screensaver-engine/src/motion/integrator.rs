use glam::{Vec2, Vec3};

/// How a reflect threshold changes the direction.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum ReflectMode {
    /// Flip the sign on every frame the position is past the threshold.
    ///
    /// A box that overshoots far enough to still be outside after one step
    /// flips again and jitters at the edge.
    #[default]
    Toggle,
    /// Point the component back toward the inside.
    Inward,
}

/// Thresholds applied to the box position each frame (NDC).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BoundaryPolicy {
    /// Outside this box the position snaps back to the origin.
    pub reset_min: Vec2,
    pub reset_max: Vec2,

    /// Crossing these bounds reverses the matching direction component.
    /// The top edge is lower than the others.
    pub reflect_min: Vec2,
    pub reflect_max: Vec2,

    pub reflect_mode: ReflectMode,
}

impl Default for BoundaryPolicy {
    fn default() -> Self {
        Self {
            reset_min: Vec2::splat(-1.0),
            reset_max: Vec2::splat(1.0),
            reflect_min: Vec2::new(-0.8, -0.8),
            reflect_max: Vec2::new(0.8, 0.75),
            reflect_mode: ReflectMode::Toggle,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MotionConfig {
    /// NDC units per second along each axis of `direction`.
    pub base_speed: f32,
    pub direction: Vec2,
    pub start: Vec3,
    pub policy: BoundaryPolicy,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            base_speed: 0.5,
            direction: Vec2::new(1.0, 1.0),
            start: Vec3::ZERO,
            policy: BoundaryPolicy::default(),
        }
    }
}

/// Which boundary rules fired during a step.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct StepOutcome {
    pub reset: bool,
    pub reflected_x: bool,
    pub reflected_y: bool,
}

impl StepOutcome {
    pub fn any(&self) -> bool {
        self.reset || self.reflected_x || self.reflected_y
    }
}

/// Position and direction of the box.
#[derive(Debug, Clone)]
pub struct MotionIntegrator {
    position: Vec3,
    direction: Vec2,
    base_speed: f32,
    policy: BoundaryPolicy,
}

impl MotionIntegrator {
    pub fn new(config: MotionConfig) -> Self {
        Self {
            position: Vec3::new(config.start.x, config.start.y, 0.0),
            direction: config.direction,
            base_speed: config.base_speed,
            policy: config.policy,
        }
    }

    /// Advances by `dt` seconds: hard reset, then reflect, then move.
    ///
    /// Reset and reflect may both fire in one step.
    pub fn step(&mut self, dt: f32) -> StepOutcome {
        let speed = self.base_speed * dt;

        let reset = apply_hard_reset(&mut self.position, &self.policy);
        let (reflected_x, reflected_y) =
            apply_reflect(self.position, &mut self.direction, &self.policy);
        integrate(&mut self.position, self.direction, speed);

        let outcome = StepOutcome {
            reset,
            reflected_x,
            reflected_y,
        };
        if outcome.reset {
            log::debug!("box left the viewport; reset to origin");
        }
        outcome
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = Vec3::new(position.x, position.y, 0.0);
    }

    pub fn direction(&self) -> Vec2 {
        self.direction
    }

    pub fn base_speed(&self) -> f32 {
        self.base_speed
    }

    pub fn policy(&self) -> &BoundaryPolicy {
        &self.policy
    }
}

/// Snaps `position` to the origin when it is outside the reset bounds.
/// The direction is left alone.
pub fn apply_hard_reset(position: &mut Vec3, policy: &BoundaryPolicy) -> bool {
    let p = position.truncate();
    let outside = p.x > policy.reset_max.x
        || p.x < policy.reset_min.x
        || p.y > policy.reset_max.y
        || p.y < policy.reset_min.y;
    if outside {
        *position = Vec3::ZERO;
    }
    outside
}

/// Reverses direction components whose axis is past a reflect threshold.
pub fn apply_reflect(position: Vec3, direction: &mut Vec2, policy: &BoundaryPolicy) -> (bool, bool) {
    let mode = policy.reflect_mode;
    let x = reflect_axis(position.x, &mut direction.x, policy.reflect_min.x, policy.reflect_max.x, mode);
    let y = reflect_axis(position.y, &mut direction.y, policy.reflect_min.y, policy.reflect_max.y, mode);
    (x, y)
}

fn reflect_axis(p: f32, d: &mut f32, min: f32, max: f32, mode: ReflectMode) -> bool {
    if p <= max && p >= min {
        return false;
    }
    match mode {
        ReflectMode::Toggle => *d = -*d,
        ReflectMode::Inward => *d = if p > max { -d.abs() } else { d.abs() },
    }
    true
}

/// `position += direction * speed`; z stays 0.
pub fn integrate(position: &mut Vec3, direction: Vec2, speed: f32) {
    *position += (direction * speed).extend(0.0);
}
