pub(crate) mod clock;
pub(crate) mod hash;
pub(crate) mod logging;
pub(crate) mod process;

#[cfg(test)]
pub(crate) use clock::ManualClock;
pub(crate) use clock::{Clock, SystemClock};
pub(crate) use hash::{sha256_hex, short_digest, snippet};
pub(crate) use logging::init_logging;
pub(crate) use process::process_group_id;
