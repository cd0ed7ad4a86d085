/*!
The save/load contract shared by every codec module.

Each module exposes free `save`/`load` functions and a type implementing
[`Persist`]. The trait pins the shape those functions must have: `save` takes
the data first and the path second, `load` takes the path first, and `load`
returns exactly the type `save` accepts. A module that drifts from that shape
stops compiling instead of failing at runtime.
*/

use crate::{FilePath, Result};

/// A codec that can persist one kind of value
///
/// `SaveOptions`/`LoadOptions` carry the codec's own knobs. Both default to
/// the codec's standard behaviour so `P::SaveOptions::default()` is always a
/// valid argument.
pub trait Persist {
    /// The in-memory value this codec reads and writes
    type Data;
    /// Codec-specific save options
    type SaveOptions: Default;
    /// Codec-specific load options
    type LoadOptions: Default;

    /// Write `data` to `filepath`
    fn save(&self, data: &Self::Data, filepath: &FilePath, options: Self::SaveOptions) -> Result<()>;

    /// Read a value back from `filepath`
    fn load(&self, filepath: &FilePath, options: Self::LoadOptions) -> Result<Self::Data>;
}

/// Save with default options
pub fn save_default<P: Persist>(codec: &P, data: &P::Data, filepath: &FilePath) -> Result<()> {
    codec.save(data, filepath, P::SaveOptions::default())
}

/// Load with default options
pub fn load_default<P: Persist>(codec: &P, filepath: &FilePath) -> Result<P::Data> {
    codec.load(filepath, P::LoadOptions::default())
}
