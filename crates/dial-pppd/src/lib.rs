mod backend;
mod classify;
mod command;
mod config;
mod link;
mod paths;
mod prerequisites;
mod process;
mod session;

pub use backend::PppdBackend;
pub use classify::{Rule, RuleClassifier, classify_file};
pub use command::{CommandError, Privilege};
pub use config::{DEFAULT_MTU, DEFAULT_PLUGIN, DEFAULT_SYSFS_NET, PppdConfig};
pub use link::IpLink;
pub use paths::SessionLogs;
pub use prerequisites::{PrerequisiteError, check_prerequisites};
pub use session::{DialSession, WaitOutcome};
