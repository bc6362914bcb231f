mod fingerprint;
mod metadata;
mod proxy;
mod snapshot;

pub use self::fingerprint::PackFingerprint;
pub use self::metadata::{IndexMetadata, SCHEMA_VERSION};
pub use self::snapshot::Snapshot;
