use crate::StrError;
use russell_tensor::Mandel;
use std::ops::Range;

/// Defines the kind of an internal (evolving) variable
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VariableKind {
    /// Scalar variable with one component (e.g., size of the yield surface)
    Scalar,

    /// Second-order symmetric tensor stored with Mandel components (e.g., backstress)
    Tensor,
}

/// Describes how the internal variables are concatenated into the vector of internal values Z
///
/// The layout is fixed when the model is composed. Each variable occupies a
/// contiguous range of Z: one component for scalars and the number of Mandel
/// components for tensors.
#[derive(Clone, Debug)]
pub struct InternalLayout {
    /// Symmetric Mandel representation of the tensor variables
    mandel: Mandel,

    /// Kind of each variable
    kinds: Vec<VariableKind>,

    /// Offset of each variable in Z
    offsets: Vec<usize>,

    /// Total number of components of Z
    dim: usize,
}

/// Holds the positions of the backstress and yield-surface size in Z
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackstressAndSize {
    /// Offset of the backstress tensor α, if any
    pub alpha: Option<usize>,

    /// Offset of the scalar size k
    pub k: usize,
}

impl InternalLayout {
    /// Allocates a new instance
    pub fn new(mandel: Mandel, kinds: &[VariableKind]) -> Self {
        let n_comp = mandel.dim();
        let mut offsets = Vec::with_capacity(kinds.len());
        let mut dim = 0;
        for kind in kinds {
            offsets.push(dim);
            dim += match kind {
                VariableKind::Scalar => 1,
                VariableKind::Tensor => n_comp,
            };
        }
        InternalLayout {
            mandel,
            kinds: kinds.to_vec(),
            offsets,
            dim,
        }
    }

    /// Returns the Mandel representation of tensor variables
    pub fn mandel(&self) -> Mandel {
        self.mandel
    }

    /// Returns the number of variables
    pub fn n_variables(&self) -> usize {
        self.kinds.len()
    }

    /// Returns the total number of components of Z
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Returns the kind of the i-th variable
    pub fn kind(&self, i: usize) -> VariableKind {
        self.kinds[i]
    }

    /// Returns the range of components of the i-th variable
    pub fn range(&self, i: usize) -> Range<usize> {
        let start = self.offsets[i];
        let size = match self.kinds[i] {
            VariableKind::Scalar => 1,
            VariableKind::Tensor => self.mandel.dim(),
        };
        start..(start + size)
    }

    /// Resolves the layouts `[tensor α, scalar k]` or `[scalar k]`
    pub fn backstress_and_size(&self) -> Result<BackstressAndSize, StrError> {
        match self.kinds.as_slice() {
            [VariableKind::Scalar] => Ok(BackstressAndSize {
                alpha: None,
                k: self.offsets[0],
            }),
            [VariableKind::Tensor, VariableKind::Scalar] => Ok(BackstressAndSize {
                alpha: Some(self.offsets[0]),
                k: self.offsets[1],
            }),
            _ => Err("internal layout must be [tensor α, scalar k] or [scalar k]"),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{BackstressAndSize, InternalLayout, VariableKind};
    use russell_tensor::Mandel;

    #[test]
    fn new_works() {
        let layout = InternalLayout::new(Mandel::Symmetric, &[VariableKind::Tensor, VariableKind::Scalar]);
        assert_eq!(layout.n_variables(), 2);
        assert_eq!(layout.dim(), 7);
        assert_eq!(layout.range(0), 0..6);
        assert_eq!(layout.range(1), 6..7);
        assert_eq!(layout.kind(0), VariableKind::Tensor);
        assert_eq!(layout.mandel(), Mandel::Symmetric);

        let layout = InternalLayout::new(Mandel::Symmetric2D, &[VariableKind::Tensor, VariableKind::Scalar]);
        assert_eq!(layout.dim(), 5);
        assert_eq!(layout.range(1), 4..5);
    }

    #[test]
    fn backstress_and_size_works() {
        let layout = InternalLayout::new(Mandel::Symmetric, &[VariableKind::Scalar]);
        assert_eq!(
            layout.backstress_and_size(),
            Ok(BackstressAndSize { alpha: None, k: 0 })
        );
        let layout = InternalLayout::new(Mandel::Symmetric2D, &[VariableKind::Tensor, VariableKind::Scalar]);
        assert_eq!(
            layout.backstress_and_size(),
            Ok(BackstressAndSize { alpha: Some(0), k: 4 })
        );
        let layout = InternalLayout::new(Mandel::Symmetric, &[VariableKind::Scalar, VariableKind::Tensor]);
        assert_eq!(
            layout.backstress_and_size().err(),
            Some("internal layout must be [tensor α, scalar k] or [scalar k]")
        );
        let layout = InternalLayout::new(Mandel::Symmetric, &[]);
        assert_eq!(layout.dim(), 0);
        assert!(layout.backstress_and_size().is_err());
    }
}
