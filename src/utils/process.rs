/// OS process-group id of the current process.
///
/// Hooks and the statusline spawned by the same host share a group, so the
/// statusline key includes it to keep concurrent unrelated runs apart.
#[cfg(unix)]
pub(crate) fn process_group_id() -> Option<u32> {
    // SAFETY: getpgrp takes no arguments and cannot fail.
    let pgid = unsafe { libc::getpgrp() };
    u32::try_from(pgid).ok()
}

#[cfg(not(unix))]
pub(crate) fn process_group_id() -> Option<u32> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn process_group_is_stable_within_process() {
        assert!(process_group_id().is_some());
        assert_eq!(process_group_id(), process_group_id());
    }
}
