use core::fmt;
use embedded_time::{clock, ConversionError};

/// An error raised while running the turret tasks.
#[derive(Debug)]
pub enum Error {
    /// The scheduler clock could not be sampled.
    Clock(clock::Error),

    /// A clock instant could not be converted to milliseconds.
    Time(ConversionError),

    /// A digital or PWM line rejected a write.
    Pin,

    /// The thermal camera failed to deliver a frame.
    Camera,

    /// A frame buffer did not match its declared dimensions.
    FrameSize { expected: usize, actual: usize },
}

impl From<clock::Error> for Error {
    fn from(clock_error: clock::Error) -> Self {
        Error::Clock(clock_error)
    }
}

impl From<ConversionError> for Error {
    fn from(time_error: ConversionError) -> Self {
        Error::Time(time_error)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Clock(e) => write!(f, "clock error: {:?}", e),
            Error::Time(e) => write!(f, "time conversion error: {:?}", e),
            Error::Pin => f.write_str("pin write failed"),
            Error::Camera => f.write_str("thermal capture failed"),
            Error::FrameSize { expected, actual } => {
                write!(f, "frame holds {} samples, expected {}", actual, expected)
            }
        }
    }
}
