//! Tensor API.
//!
//! Tensors are what pose networks hand back after inference. A tensor is a dense N-dimensional
//! array of `f32` values, stored in row-major order (the last axis is contiguous in memory).
//!
//! Heatmap networks typically produce a rank-3 tensor of shape `[K, W, H]`: one `W×H` confidence
//! grid per keypoint class `K`. The element at `(k, i, j)` then lives at flattened offset
//! `k*(W*H) + i*H + j`, which is what [`Tensor::as_raw_data`] exposes.

use std::fmt;

use ndarray::{ArrayBase, Data, Dimension};
use thiserror::Error;
use tinyvec::TinyVec;

/// Error returned by [`Tensor::from_vec`] when the data does not fit the requested shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("tensor of shape {shape:?} needs {expected} elements, got {actual}")]
    Length {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },
    #[error("tensor of shape {shape:?} has more elements than can be addressed")]
    Overflow { shape: Vec<usize> },
}

#[derive(Clone, PartialEq, Eq)]
struct Layout {
    shape: TinyVec<[usize; 4]>,
    strides: TinyVec<[usize; 4]>,
}

impl Layout {
    #[track_caller]
    fn from_shape(shape: &[usize]) -> Self {
        match Self::checked_from_shape(shape) {
            Some(layout) => layout,
            None => panic!("tensor shape {shape:?} overflows `usize`"),
        }
    }

    /// Computes the row-major strides of `shape`, or returns `None` if they overflow.
    fn checked_from_shape(shape: &[usize]) -> Option<Self> {
        let mut strides = TinyVec::from(shape);
        let mut stride: usize = 1;
        for (out, &size) in strides.iter_mut().zip(shape).rev() {
            *out = stride;
            stride = stride.checked_mul(size)?;
        }

        Some(Self {
            shape: TinyVec::from(shape),
            strides,
        })
    }

    fn elements(&self) -> usize {
        self.shape.iter().product()
    }

    fn remove_prefix(&self, num: usize) -> Layout {
        assert!(num <= self.shape.len());
        Layout {
            shape: TinyVec::from(&self.shape[num..]),
            strides: TinyVec::from(&self.strides[num..]),
        }
    }
}

/// Steps `index` to the next position in row-major order. Returns `false` after the last one.
fn advance(shape: &[usize], index: &mut [usize]) -> bool {
    for axis in (0..shape.len()).rev() {
        index[axis] += 1;
        if index[axis] < shape[axis] {
            return true;
        }
        index[axis] = 0;
    }
    false
}

fn visit_indices<I: AsMut<[usize]>>(shape: &[usize], mut index: I, mut f: impl FnMut(&I)) {
    if shape.contains(&0) {
        return;
    }
    loop {
        f(&index);
        if !advance(shape, index.as_mut()) {
            return;
        }
    }
}

/// A dynamically shaped tensor of `f32` values.
///
/// # Construction
///
/// Tensors are built with one of the `from_*` constructors, or converted from an [`ndarray`]
/// array. [`Tensor::from_vec`] is the non-panicking choice for data coming out of an inference
/// backend, where a mismatched shape is a runtime condition rather than a bug.
///
/// # Data Access
///
/// [`Tensor::get`] reads single elements without panicking. [`Tensor::index`] borrows a
/// [`TensorView`] of a suffix of the dimensions, and [`Tensor::as_raw_data`] exposes the
/// flattened storage.
#[derive(Clone)]
pub struct Tensor {
    layout: Layout,
    data: Box<[f32]>,
}

/// A borrowed view into a [`Tensor`].
#[derive(Clone)]
pub struct TensorView<'a> {
    layout: Layout,
    data: &'a [f32],
}

impl Tensor {
    /// Creates an `N`-dimensional tensor of the given shape by calling `f` for each element.
    ///
    /// `f` is invoked with successive indices, starting with `[0, ..., 0, 0]`, then
    /// `[0, ..., 0, 1]` and so on.
    pub fn from_array_shape_fn<const N: usize, F: FnMut([usize; N]) -> f32>(
        shape: [usize; N],
        mut f: F,
    ) -> Self {
        let layout = Layout::from_shape(&shape);
        let mut data = Vec::with_capacity(layout.elements());
        visit_indices(&shape, [0; N], |index| data.push(f(*index)));
        Self {
            layout,
            data: data.into_boxed_slice(),
        }
    }

    /// Creates a tensor with a dynamic number of dimensions.
    pub fn from_dyn_shape_fn<F: FnMut(&[usize]) -> f32>(shape: &[usize], mut f: F) -> Self {
        let layout = Layout::from_shape(shape);
        let mut data = Vec::with_capacity(layout.elements());
        visit_indices(shape, vec![0; shape.len()], |index| data.push(f(index.as_slice())));
        Self {
            layout,
            data: data.into_boxed_slice(),
        }
    }

    /// Creates a tensor of the given shape by pulling elements from an iterator.
    ///
    /// # Panics
    ///
    /// `iter` must yield exactly as many elements as `shape` describes, otherwise this method will
    /// panic. Use [`Tensor::from_vec`] when the element count is not known to be correct.
    #[track_caller]
    pub fn from_iter<I: IntoIterator<Item = f32>>(shape: &[usize], iter: I) -> Self {
        let layout = Layout::from_shape(shape);
        let data: Box<_> = iter.into_iter().collect();
        assert_eq!(
            data.len(),
            layout.elements(),
            "element count does not match tensor shape {:?}",
            shape
        );
        Self { layout, data }
    }

    /// Creates a tensor from flattened row-major `data`.
    ///
    /// Returns an error if `data` does not hold exactly as many elements as `shape` describes, or
    /// if `shape` is too large to be addressed at all.
    pub fn from_vec(shape: &[usize], data: Vec<f32>) -> Result<Self, ShapeError> {
        let Some(layout) = Layout::checked_from_shape(shape) else {
            return Err(ShapeError::Overflow {
                shape: shape.to_vec(),
            });
        };
        if data.len() != layout.elements() {
            return Err(ShapeError::Length {
                shape: shape.to_vec(),
                expected: layout.elements(),
                actual: data.len(),
            });
        }
        Ok(Self {
            layout,
            data: data.into_boxed_slice(),
        })
    }

    /// Returns the shape of this tensor.
    ///
    /// A tensor's shape is the number of entries in each dimension.
    pub fn shape(&self) -> &[usize] {
        &self.layout.shape
    }

    /// Returns the number of dimensions of this tensor.
    pub fn rank(&self) -> usize {
        self.shape().len()
    }

    /// Returns all elements in row-major order.
    pub fn as_raw_data(&self) -> &[f32] {
        &self.data
    }

    /// Returns the element at `index`, or `None` if `index` does not address an element.
    ///
    /// `index` must name every dimension of the tensor.
    pub fn get(&self, index: &[usize]) -> Option<f32> {
        if index.len() != self.rank() {
            return None;
        }
        let mut offset = 0;
        for ((&i, &len), &stride) in index
            .iter()
            .zip(self.shape())
            .zip(self.layout.strides.iter())
        {
            if i >= len {
                return None;
            }
            offset += i * stride;
        }
        self.data.get(offset).copied()
    }

    /// Borrows the whole tensor as a [`TensorView`].
    pub fn view(&self) -> TensorView<'_> {
        TensorView {
            layout: self.layout.clone(),
            data: &self.data,
        }
    }

    /// Indexes a prefix of the tensor's dimensions with `indices`.
    ///
    /// Indexing a tensor of shape `[14, 46, 46]` with `[k]` yields the `[46, 46]` heatmap of
    /// class `k`; indexing it with all three indices yields a view of shape `[]`.
    ///
    /// # Panics
    ///
    /// This method will panic if `indices` has more entries than `self` has dimensions, or if any
    /// index is out of bounds.
    #[track_caller]
    pub fn index<const N: usize>(&self, indices: [usize; N]) -> TensorView<'_> {
        self.view().index(indices)
    }

    /// Iterates over the outermost dimension of this tensor.
    ///
    /// # Panics
    ///
    /// `self` must have at least one dimension, otherwise this method will panic.
    #[track_caller]
    pub fn iter(&self) -> impl Iterator<Item = TensorView<'_>> {
        assert!(
            self.rank() > 0,
            "attempted to iterate over 0-dimensional tensor"
        );
        (0..self.shape()[0]).map(move |index| self.index([index]))
    }
}

impl<'d> TensorView<'d> {
    /// Returns the shape of this tensor view.
    pub fn shape(&self) -> &[usize] {
        &self.layout.shape
    }

    /// Returns the number of dimensions of this view.
    pub fn rank(&self) -> usize {
        self.shape().len()
    }

    /// Indexes a prefix of the view's dimensions with `indices`.
    ///
    /// # Panics
    ///
    /// This method will panic if `indices` has more entries than `self` has dimensions, or if any
    /// index is out of bounds.
    #[track_caller]
    pub fn index<const N: usize>(&self, indices: [usize; N]) -> TensorView<'d> {
        assert!(
            N <= self.rank(),
            "attempted to index tensor view of shape {:?} with {:?}",
            self.shape(),
            indices
        );
        let mut data = self.data;
        for ((&len, &stride), &index) in self
            .layout
            .shape
            .iter()
            .zip(self.layout.strides.iter())
            .zip(&indices)
        {
            assert!(
                index < len,
                "attempted to index tensor view of shape {:?} with {:?}",
                self.shape(),
                indices
            );
            data = &data[index * stride..(index + 1) * stride];
        }
        TensorView {
            layout: self.layout.remove_prefix(N),
            data,
        }
    }

    /// Iterates over the outermost dimension of this view.
    ///
    /// # Panics
    ///
    /// `self` must have at least one dimension, otherwise this method will panic.
    #[track_caller]
    pub fn iter(&self) -> impl Iterator<Item = TensorView<'d>> + '_ {
        assert!(
            self.rank() > 0,
            "attempted to iterate over 0-dimensional tensor view"
        );
        (0..self.shape()[0]).map(move |index| self.index([index]))
    }

    /// Returns the values stored in a 1-dimensional view as a slice.
    ///
    /// # Panics
    ///
    /// `self` must have exactly 1 dimension, otherwise this method panics.
    #[track_caller]
    pub fn as_slice(&self) -> &'d [f32] {
        assert_eq!(
            self.rank(),
            1,
            "attempted to access tensor view of shape {:?} as slice",
            self.shape()
        );
        self.data
    }

    /// Returns the value stored in a 0-dimensional view.
    ///
    /// # Panics
    ///
    /// `self` must have exactly 0 dimensions, otherwise this method will panic.
    #[track_caller]
    pub fn as_singular(&self) -> f32 {
        assert_eq!(
            self.rank(),
            0,
            "attempted to access view of shape {:?} as singular element",
            self.shape(),
        );
        self.data[0]
    }
}

impl From<f32> for Tensor {
    fn from(value: f32) -> Self {
        Tensor::from_array_shape_fn([], |[]| value)
    }
}

/// Copies an [`ndarray`] array in logical (row-major) order, whatever its memory layout.
impl<S: Data<Elem = f32>, D: Dimension> From<&ArrayBase<S, D>> for Tensor {
    fn from(array: &ArrayBase<S, D>) -> Self {
        Tensor::from_iter(array.shape(), array.iter().copied())
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape())
            .finish()
    }
}

impl fmt::Debug for TensorView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TensorView")
            .field("shape", &self.shape())
            .finish()
    }
}
