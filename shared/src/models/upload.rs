//! Upload ticket model

use serde::{Deserialize, Serialize};

/// Opaque upload ticket issued by the attachment store
///
/// The caller uploads the file to `upload_url`; `filename` is the key the
/// file will land under and is indexed to the owning record in advance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadTicket {
    pub filename: String,
    pub upload_url: String,
}
