/// Constants for one spring-driven property.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringParams {
    pub stiffness: f32,
    pub damping: f32,
    pub mass: f32,
}

impl SpringParams {
    pub const fn new(stiffness: f32, damping: f32, mass: f32) -> Self {
        SpringParams { stiffness, damping, mass }
    }
}

/// Per-property constants for a slot's animated channels. Position, scale
/// and rotation respond differently, so each carries its own tuple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringTuning {
    pub position: SpringParams,
    pub scale: SpringParams,
    pub rotation: SpringParams,
}

impl Default for SpringTuning {
    fn default() -> Self {
        SpringTuning {
            position: SpringParams::new(170.0, 26.0, 1.0),
            scale: SpringParams::new(200.0, 20.0, 1.0),
            rotation: SpringParams::new(120.0, 14.0, 1.0),
        }
    }
}

/// Below this distance and speed the spring snaps to its target, so a
/// settled value does not jitter forever.
const SETTLE_EPSILON: f32 = 0.001;

/// Damped second-order integrator for one scalar value.
#[derive(Debug, Clone, Copy)]
pub struct Spring {
    current: f32,
    target: f32,
    velocity: f32,
    params: SpringParams,
}

impl Spring {
    pub fn new(value: f32, params: SpringParams) -> Self {
        Spring {
            current: value,
            target: value,
            velocity: 0.0,
            params,
        }
    }

    /// Snap to a value with no transition.
    pub fn set(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.velocity = 0.0;
    }

    /// Move the target; `current` eases toward it on subsequent updates.
    pub fn retarget(&mut self, target: f32) {
        self.target = target;
    }

    /// Inject a velocity impulse.
    pub fn nudge(&mut self, delta_velocity: f32) {
        self.velocity += delta_velocity;
    }

    /// Semi-implicit Euler step. `dt` must arrive pre-clamped; the spring
    /// does not clamp it itself.
    pub fn update(&mut self, dt: f32) -> f32 {
        let force = -self.params.stiffness * (self.current - self.target)
            - self.params.damping * self.velocity;
        let acceleration = force / self.params.mass;
        self.velocity += acceleration * dt;
        self.current += self.velocity * dt;
        if (self.current - self.target).abs() < SETTLE_EPSILON
            && self.velocity.abs() < SETTLE_EPSILON
        {
            self.current = self.target;
            self.velocity = 0.0;
        }
        self.current
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn is_settled(&self) -> bool {
        self.current == self.target && self.velocity == 0.0
    }
}
