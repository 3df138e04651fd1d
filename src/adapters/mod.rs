//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements    | Connects to                      |
//! |---------------|---------------|----------------------------------|
//! | `gpio`        | DeviceBackend | any `embedded-hal` digital pins  |
//! | `cdev`        | (opens gpio)  | Linux GPIO character device      |
//! | `simulated`   | DeviceBackend | reservoir level estimates        |
//! | `log_sink`    | EventSink     | `log` facade                     |
//! | `config_file` | ConfigPort    | JSON file on disk                |

#[cfg(feature = "rpi")]
pub mod cdev;
pub mod config_file;
pub mod gpio;
pub mod log_sink;
pub mod simulated;
