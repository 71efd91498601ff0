use nalgebra::{Matrix3, Rotation3, Vector3};

/// Builds a rotation matrix from ZYZ intrinsic Euler angles in radians,
/// following RELION's convention (`rot` about z, `tilt` about the new y,
/// `psi` about the final z).
pub fn euler_to_rot(rot: f64, tilt: f64, psi: f64) -> Rotation3<f64> {
    let (sa, ca) = rot.sin_cos();
    let (sb, cb) = tilt.sin_cos();
    let (sg, cg) = psi.sin_cos();
    let cc = cb * ca;
    let cs = cb * sa;
    let sc = sb * ca;
    let ss = sb * sa;
    Rotation3::from_matrix_unchecked(Matrix3::new(
        cg * cc - sg * sa,
        cg * cs + sg * ca,
        -cg * sb,
        -sg * cc - cg * sa,
        -sg * cs + cg * ca,
        sg * sb,
        sc,
        ss,
        cb,
    ))
}

/// Recovers `(rot, tilt, psi)` in radians from a rotation matrix.
///
/// When the tilt is numerically zero (or π) the first and last rotation
/// axes coincide; `rot` is then reported as zero and the full in-plane
/// rotation is folded into `psi`.
pub fn rot_to_euler(r: &Rotation3<f64>) -> (f64, f64, f64) {
    const EPSILON: f64 = 1e-15;
    let m = r.matrix();
    let abs_sb = (m[(0, 2)] * m[(0, 2)] + m[(1, 2)] * m[(1, 2)]).sqrt();
    if abs_sb > 16.0 * EPSILON {
        let psi = m[(1, 2)].atan2(-m[(0, 2)]);
        let rot = m[(2, 1)].atan2(m[(2, 0)]);
        let sign_sb = if psi.sin().abs() < EPSILON {
            (-m[(0, 2)] / psi.cos()).signum()
        } else if psi.sin() > 0.0 {
            m[(1, 2)].signum()
        } else {
            -m[(1, 2)].signum()
        };
        let tilt = (sign_sb * abs_sb).atan2(m[(2, 2)]);
        (rot, tilt, psi)
    } else if m[(2, 2)] > 0.0 {
        (0.0, 0.0, (-m[(1, 0)]).atan2(m[(0, 0)]))
    } else {
        (0.0, std::f64::consts::PI, m[(1, 0)].atan2(-m[(0, 0)]))
    }
}

/// The rotation carrying the +z axis onto the direction of `v`, built from
/// the spherical angles of `v` with zero in-plane rotation.
pub fn vec_to_rot(v: &Vector3<f64>) -> Rotation3<f64> {
    let norm = v.norm();
    let rot = v.y.atan2(v.x);
    let tilt = (v.z / norm).acos();
    euler_to_rot(rot, tilt, 0.0)
}
