//! Kabsch 刚性拟合
//!
//! 求使 `target ≈ R * source + t` 的最小二乘旋转 `R` 与平移 `t`。
//! 计算在 f64 下进行（`rapier3d::na`），结果转回 glam 类型。

use glam::{Quat, Vec3};
use rapier3d::na::{Matrix3, Rotation3, UnitQuaternion, Vector3};
use thiserror::Error;

/// 散布矩阵第二特征值低于该值视为共线
const COLLINEAR_EPSILON: f64 = 1e-10;

/// 刚性拟合错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("point sets must have equal length: {source_len} vs {target_len}")]
    LengthMismatch { source_len: usize, target_len: usize },

    #[error("at least 3 correspondences are required, got {0}")]
    TooFewPoints(usize),

    #[error("correspondence points are collinear or coincident")]
    Degenerate,

    #[error("SVD did not converge")]
    SvdFailed,
}

/// 刚性变换
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    pub rotation: Quat,
    pub translation: Vec3,
}

impl RigidTransform {
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation * point + self.translation
    }
}

/// 计算把 `source` 对齐到 `target` 的最优刚性变换
pub fn fit_rigid(source: &[Vec3], target: &[Vec3]) -> Result<RigidTransform, FitError> {
    if source.len() != target.len() {
        return Err(FitError::LengthMismatch {
            source_len: source.len(),
            target_len: target.len(),
        });
    }
    if source.len() < 3 {
        return Err(FitError::TooFewPoints(source.len()));
    }

    // 固定步内调用，全程只用栈上的定长矩阵
    let source_centroid = centroid(source);
    let target_centroid = centroid(target);

    let mut scatter = Matrix3::zeros();
    let mut h = Matrix3::zeros();
    for (s, t) in source.iter().zip(target) {
        let s = to_na(s) - source_centroid;
        let t = to_na(t) - target_centroid;
        scatter += s * s.transpose();
        h += s * t.transpose();
    }

    if is_collinear(&scatter) {
        return Err(FitError::Degenerate);
    }

    let svd = h.svd(true, true);
    let u = svd.u.ok_or(FitError::SvdFailed)?;
    let v_t = svd.v_t.ok_or(FitError::SvdFailed)?;

    // R = V * U^T，行列式为负时翻转 V 的最后一列消除反射
    let mut v = v_t.transpose();
    let mut rotation_matrix = v * u.transpose();
    if rotation_matrix.determinant() < 0.0 {
        for i in 0..3 {
            v[(i, 2)] = -v[(i, 2)];
        }
        rotation_matrix = v * u.transpose();
    }

    let rotation =
        UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(rotation_matrix));
    let translation = target_centroid - rotation * source_centroid;

    let q = rotation.quaternion();
    let rotation = Quat::from_xyzw(q.i as f32, q.j as f32, q.k as f32, q.w as f32).normalize();
    if !rotation.is_finite() || !translation.iter().all(|c| c.is_finite()) {
        return Err(FitError::SvdFailed);
    }

    Ok(RigidTransform {
        rotation,
        translation: Vec3::new(
            translation.x as f32,
            translation.y as f32,
            translation.z as f32,
        ),
    })
}

/// 拟合后的均方根残差
pub fn rms_error(transform: &RigidTransform, source: &[Vec3], target: &[Vec3]) -> f32 {
    if source.is_empty() {
        return 0.0;
    }
    let sum: f32 = source
        .iter()
        .zip(target)
        .map(|(s, t)| transform.transform_point(*s).distance_squared(*t))
        .sum();
    (sum / source.len() as f32).sqrt()
}

fn to_na(v: &Vec3) -> Vector3<f64> {
    Vector3::new(v.x as f64, v.y as f64, v.z as f64)
}

fn centroid(points: &[Vec3]) -> Vector3<f64> {
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc: Vector3<f64>, p| acc + to_na(p));
    sum / points.len() as f64
}

fn is_collinear(scatter: &Matrix3<f64>) -> bool {
    let values = scatter.symmetric_eigenvalues();
    let mut eigenvalues = [values[0], values[1], values[2]];
    eigenvalues.sort_by(|a, b| b.total_cmp(a));
    !(eigenvalues[1] >= COLLINEAR_EPSILON)
}
