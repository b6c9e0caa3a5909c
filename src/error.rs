use std::{
    error::Error,
    fmt::{Display, Formatter},
};

/// An error with a static message.
#[derive(Debug, Clone, Copy)]
pub struct TrackPfError {
    pub msg: &'static str,
}

impl Display for TrackPfError {
    fn fmt(&self, f: &mut Formatter) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.msg)
    }
}

impl Error for TrackPfError {}

/// Grids that must share one shape to be analyzed together did not.
#[derive(Debug, Clone, Copy)]
pub struct CoRegistrationError {
    /// The shape of the first grid in the bundle, rows by columns.
    pub expected: (usize, usize),
    /// The offending shape.
    pub actual: (usize, usize),
}

impl Display for CoRegistrationError {
    fn fmt(&self, f: &mut Formatter) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "grids are not co-registered: expected {} x {} but found {} x {}",
            self.expected.0, self.expected.1, self.actual.0, self.actual.1
        )
    }
}

impl Error for CoRegistrationError {}
