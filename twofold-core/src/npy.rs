/*!
N-dimensional arrays in the NumPy `.npy` format.

The given path is used as-is: no `.npy` extension is appended when it is
missing. Element type and dimensionality are checked against the file header
on load.
*/

use crate::protocol::Persist;
use crate::storage::WriteMode;
use crate::{FilePath, IntoFilePath, Result, TwofoldError};
use ndarray::{Array, ArrayBase, Data, Dimension};
use ndarray_npy::{ReadNpyExt, ReadableElement, WritableElement, WriteNpyExt};
use std::marker::PhantomData;
use tracing::debug;

pub fn save<A, S, D>(data: &ArrayBase<S, D>, filepath: impl IntoFilePath) -> Result<()>
where
    A: WritableElement,
    S: Data<Elem = A>,
    D: Dimension,
{
    let filepath = filepath.into_file_path()?;
    debug!(path = %filepath, shape = ?data.shape(), "Saving npy array");
    let mut handle = filepath.create(WriteMode::Write)?;
    data.write_npy(&mut handle)
        .map_err(|e| TwofoldError::encode(format!("Failed to write npy array: {e}")))?;
    handle.commit()
}

pub fn load<A, D>(filepath: impl IntoFilePath) -> Result<Array<A, D>>
where
    A: ReadableElement,
    D: Dimension,
{
    let filepath = filepath.into_file_path()?;
    let handle = filepath.open()?;
    Array::<A, D>::read_npy(handle)
        .map_err(|e| TwofoldError::encode(format!("Failed to read npy array from {filepath}: {e}")))
}

/// `.npy` codec for owned arrays of element `A` and dimension `D`
#[derive(Debug)]
pub struct Npy<A, D> {
    _marker: PhantomData<fn() -> (A, D)>,
}

impl<A, D> Npy<A, D> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<A, D> Default for Npy<A, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, D> Persist for Npy<A, D>
where
    A: ReadableElement + WritableElement,
    D: Dimension,
{
    type Data = Array<A, D>;
    type SaveOptions = ();
    type LoadOptions = ();

    fn save(&self, data: &Array<A, D>, filepath: &FilePath, _options: ()) -> Result<()> {
        save(data, filepath)
    }

    fn load(&self, filepath: &FilePath, _options: ()) -> Result<Array<A, D>> {
        load(filepath)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1, Array3, ArrayD, Ix3};
    use tempfile::TempDir;

    #[test]
    fn test_three_dimensional_roundtrip_without_extension() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data");
        let array = array![[[1i64, 2, 3], [4, 5, 6]]];

        save(&array, path.as_path()).unwrap();
        assert!(path.exists());
        assert!(!temp_dir.path().join("data.npy").exists());

        let loaded: Array3<i64> = load(path.as_path()).unwrap();
        assert_eq!(loaded, array);
    }

    #[test]
    fn test_one_dimensional_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.npy");
        let array = array![1.5f64, -2.0, 3.25];

        save(&array, path.as_path()).unwrap();
        let loaded: Array1<f64> = load(path.as_path()).unwrap();
        assert_eq!(loaded, array);
    }

    #[test]
    fn test_dynamic_dimension_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("grid.npy");
        save(&array![[1u8, 2], [3, 4], [5, 6]], path.as_path()).unwrap();

        let loaded: ArrayD<u8> = load(path.as_path()).unwrap();
        assert_eq!(loaded.shape(), &[3, 2]);
    }

    #[test]
    fn test_header_mismatch_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ints.npy");
        save(&array![1i64, 2, 3], path.as_path()).unwrap();

        assert!(matches!(load::<f64, ndarray::Ix1>(path.as_path()), Err(TwofoldError::Encode(_))));
        assert!(matches!(load::<i64, Ix3>(path.as_path()), Err(TwofoldError::Encode(_))));
    }

    #[test]
    fn test_codec_on_memory_path() {
        let path = FilePath::parse("memory://npy-tests/values.npy").unwrap();
        let codec = Npy::<i32, ndarray::Ix2>::new();
        let array = array![[1, 2], [3, 4]];

        codec.save(&array, &path, ()).unwrap();
        assert_eq!(codec.load(&path, ()).unwrap(), array);
        path.delete().unwrap();
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        match load::<i64, Ix3>(temp_dir.path().join("absent.npy").as_path()) {
            Err(TwofoldError::Io(err)) => assert_eq!(err.kind(), std::io::ErrorKind::NotFound),
            other => panic!("Expected not-found error, got {other:?}"),
        }
    }
}
