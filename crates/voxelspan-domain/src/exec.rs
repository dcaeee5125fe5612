//! Per-partition execution, sequential or on the rayon pool.

use rayon::prelude::*;

use voxelspan_core::backend::SetIdx;
use voxelspan_core::data_set::DataSet;
use voxelspan_core::error::Result;

/// Run `f` once per partition and collect the results in partition order.
pub(crate) fn map_partitions<T, F>(count: usize, parallel: bool, f: F) -> DataSet<T>
where
    T: Send,
    F: Fn(SetIdx) -> T + Sync + Send,
{
    if parallel {
        DataSet::from_vec((0..count).into_par_iter().map(|i| f(SetIdx(i))).collect())
    } else {
        DataSet::from_fn(count, f)
    }
}

/// Fallible variant of [`map_partitions`]; the first error wins.
pub(crate) fn try_map_partitions<T, F>(count: usize, parallel: bool, f: F) -> Result<DataSet<T>>
where
    T: Send,
    F: Fn(SetIdx) -> Result<T> + Sync + Send,
{
    let results: Result<Vec<T>> = if parallel {
        (0..count).into_par_iter().map(|i| f(SetIdx(i))).collect()
    } else {
        (0..count).map(|i| f(SetIdx(i))).collect()
    };
    results.map(DataSet::from_vec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxelspan_core::error::VoxelSpanError;

    #[test]
    fn test_parallel_matches_sequential() {
        let seq = map_partitions(16, false, |p| p.idx() * p.idx());
        let par = map_partitions(16, true, |p| p.idx() * p.idx());
        assert_eq!(seq, par);
    }

    #[test]
    fn test_try_map_error() {
        let result = try_map_partitions(4, true, |p| {
            if p.idx() == 2 {
                Err(VoxelSpanError::InvalidDeviceCount { count: 0 })
            } else {
                Ok(p.idx())
            }
        });
        assert!(result.is_err());
    }
}
