mod entry;
mod size;

pub use self::entry::{ExtractionResult, IndexEntry, PackRef, SystemFields};
pub use self::size::Size;

fn sanitize(s: impl AsRef<str>) -> String {
    s.as_ref().trim().to_lowercase().replace('/', "").replace('-', "").replace('_', "").replace(' ', "")
}
