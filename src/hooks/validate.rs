//! Out-of-band validation results written for later hooks to act on

use crate::cache::{PendingValidation, SessionCaches};
use crate::utils::sha256_hex;

/// Store `record` tied to the user message it was produced under, so a newer
/// instruction makes it stale.
pub(crate) fn record_validation(
    caches: &SessionCaches,
    user_message: Option<&str>,
    mut record: PendingValidation,
) {
    record.user_message_hash = user_message.map(sha256_hex);
    tracing::debug!(
        tool = %record.tool_name,
        file = %record.file_path,
        status = %record.status,
        "recording validation result"
    );
    caches.pending.write_pending_validation(record);
}
