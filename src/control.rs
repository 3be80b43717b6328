use pid_controller::P;

/// Proportional position controller.
///
/// The output is `-kp * (setpoint - position)`. The negative sign matches the
/// rig's motor wiring, where a reverse drive moves the encoder count up.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClosedLoopController {
    /// The position to drive toward (in encoder counts).
    pub setpoint: f64,

    pub p: P<f64>,
}

impl ClosedLoopController {
    pub fn new(kp: f64, setpoint: f64) -> Self {
        let mut p = P::default();
        p.kp = kp;
        Self { setpoint, p }
    }

    pub fn set_setpoint(&mut self, setpoint: f64) {
        self.setpoint = setpoint;
    }

    pub fn set_gain(&mut self, kp: f64) {
        self.p.kp = kp;
    }

    /// The proportional gain.
    pub fn kp(&self) -> f64 {
        self.p.kp
    }

    /// Calculate the actuator command for the current position.
    pub fn run(&self, position: f64) -> f64 {
        -self.p.control(self.setpoint, position)
    }
}
