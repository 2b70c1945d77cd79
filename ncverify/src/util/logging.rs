//! Logging support

use log::{debug, error, info, warn};

/// Enum that describes level associated with a log message
#[derive(Debug, Eq, PartialEq)]
pub enum PeLogLevels {
    /// Common error logging level
    PeError,
    /// Common info logging level
    PeInfo,
    /// Common warn logging level
    PeWarn,
    /// Common debug logging level
    PeDebug,
}

/// `log_message` forwards a message to the `log` facade at the given level. Output goes wherever
/// the application installed a logger.
pub fn log_message(level: &PeLogLevels, message: &str) {
    if &PeLogLevels::PeError == level {
        error!("{}", message);
    } else if &PeLogLevels::PeWarn == level {
        warn!("{}", message);
    } else if &PeLogLevels::PeInfo == level {
        info!("{}", message);
    } else {
        debug!("{}", message);
    }
}
