//! Homogeneous-coordinate helpers for extrinsic and intrinsic matrices.
//!
//! Calibration files provide rigid transforms as 3x4 `[R | t]` blocks and
//! camera matrices as 3x3 blocks. Everything downstream works on their 4x4
//! homogeneous form, obtained by padding with zeros and a trailing 1.

use nalgebra::{
    DMatrix, Dim, Matrix, Matrix3, Matrix3x4, Matrix3xX, Matrix4, RawStorage, SMatrix, Vector3,
    Vector4,
};

pub mod axis;

pub use axis::{find_axis_map, map_dimension, Axis, AxisValues, DimensionAxes, Dimensions};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MatrixError {
    #[error("Matrix of shape {rows}x{cols} is not valid here")]
    InvalidShape { rows: usize, cols: usize },
    #[error("Matrix singularity detected")]
    SingularMatrix,
    #[error("Transform does not map source axes onto distinct destination axes: {0}")]
    DegenerateAxisMapping(String),
}

/// Pads a matrix of at most 4x4 to homogeneous form.
///
/// Missing rows and columns are filled with zeros and the bottom-right element
/// is set to 1. A matrix that is already 4x4 is returned unchanged.
///
/// # Errors
///
/// [`MatrixError::InvalidShape`] if `matrix` has more than 4 rows or columns.
pub fn to_homogeneous<R, C, S>(matrix: &Matrix<f64, R, C, S>) -> Result<Matrix4<f64>, MatrixError>
where
    R: Dim,
    C: Dim,
    S: RawStorage<f64, R, C>,
{
    let (rows, cols) = matrix.shape();
    if rows > 4 || cols > 4 {
        return Err(MatrixError::InvalidShape { rows, cols });
    }

    let mut homogeneous = Matrix4::zeros();
    for i in 0..rows {
        for j in 0..cols {
            homogeneous[(i, j)] = matrix[(i, j)];
        }
    }
    if (rows, cols) != (4, 4) {
        homogeneous[(3, 3)] = 1.0;
    }

    Ok(homogeneous)
}

/// Inverts `matrix` in homogeneous form and returns the full 4x4 inverse.
///
/// # Errors
///
/// * [`MatrixError::InvalidShape`] from [`to_homogeneous`].
/// * [`MatrixError::SingularMatrix`] if the padded matrix has no inverse.
pub fn invert_homogeneous<R, C, S>(matrix: &Matrix<f64, R, C, S>) -> Result<Matrix4<f64>, MatrixError>
where
    R: Dim,
    C: Dim,
    S: RawStorage<f64, R, C>,
{
    to_homogeneous(matrix)?
        .try_inverse()
        .ok_or(MatrixError::SingularMatrix)
}

/// Inverts `matrix` in homogeneous form and drops the `[0, 0, 0, 1]` row.
pub fn invert<R, C, S>(matrix: &Matrix<f64, R, C, S>) -> Result<Matrix3x4<f64>, MatrixError>
where
    R: Dim,
    C: Dim,
    S: RawStorage<f64, R, C>,
{
    Ok(truncate(&invert_homogeneous(matrix)?))
}

/// Top three rows of a homogeneous transform.
pub fn truncate(homogeneous: &Matrix4<f64>) -> Matrix3x4<f64> {
    homogeneous.fixed_rows::<3>(0).into_owned()
}

/// `[K | 0]`: a 3x3 camera matrix padded with a zero translation column.
pub fn pad_to_projection(intrinsic: &Matrix3<f64>) -> Matrix3x4<f64> {
    let mut projection = Matrix3x4::zeros();
    projection.fixed_view_mut::<3, 3>(0, 0).copy_from(intrinsic);
    projection
}

/// Converts a dynamically sized matrix into a fixed `R x C` one.
///
/// # Errors
///
/// [`MatrixError::InvalidShape`] unless `matrix` is exactly `R x C`.
pub fn to_fixed<const R: usize, const C: usize>(
    matrix: &DMatrix<f64>,
) -> Result<SMatrix<f64, R, C>, MatrixError> {
    let (rows, cols) = matrix.shape();
    if (rows, cols) != (R, C) {
        return Err(MatrixError::InvalidShape { rows, cols });
    }
    Ok(matrix.fixed_view::<R, C>(0, 0).into_owned())
}

/// Applies `transform` to every column of `points`.
///
/// Each point is augmented with a homogeneous 1, multiplied by the padded
/// transform and renormalised by the resulting homogeneous coordinate.
pub fn transform_points<R, C, S>(
    points: &Matrix3xX<f64>,
    transform: &Matrix<f64, R, C, S>,
) -> Result<Matrix3xX<f64>, MatrixError>
where
    R: Dim,
    C: Dim,
    S: RawStorage<f64, R, C>,
{
    let homogeneous = to_homogeneous(transform)?;
    let mut transformed = Matrix3xX::zeros(points.ncols());

    for (idx, point) in points.column_iter().enumerate() {
        let moved = apply(&homogeneous, &Vector3::new(point[0], point[1], point[2]));
        transformed.set_column(idx, &moved);
    }

    Ok(transformed)
}

/// Single-point form of [`transform_points`].
pub fn transform_point<R, C, S>(
    point: &Vector3<f64>,
    transform: &Matrix<f64, R, C, S>,
) -> Result<Vector3<f64>, MatrixError>
where
    R: Dim,
    C: Dim,
    S: RawStorage<f64, R, C>,
{
    Ok(apply(&to_homogeneous(transform)?, point))
}

fn apply(homogeneous: &Matrix4<f64>, point: &Vector3<f64>) -> Vector3<f64> {
    let moved = homogeneous * Vector4::new(point.x, point.y, point.z, 1.0);
    moved.xyz() / moved.w
}
