mod init;
mod span;

pub use init::init_logger;
pub use span::{lookup_span, warn_if_slow};
