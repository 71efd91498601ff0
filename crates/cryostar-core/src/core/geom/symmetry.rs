use nalgebra::{Rotation3, Unit, Vector3};
use std::f64::consts::PI;
use std::str::FromStr;
use thiserror::Error;

/// Tolerance for treating two rotation matrices as the same group element.
const MATRIX_EQ_TOLERANCE: f64 = 1e-6;

/// Axis targets are conventionally quoted to three decimals (the I1
/// three-fold is `[0.382, 0, 1]`), so coset matching has to absorb that
/// rounding. Distinct operators of the supported groups are separated by
/// far more than this.
const COSET_MATCH_TOLERANCE: f64 = 1e-3;

/// Golden ratio, fixing the icosahedral axis directions.
const PHI: f64 = 1.618033988749895;

#[derive(Debug, Error)]
pub enum SymmetryError {
    #[error("Unrecognized symmetry group '{0}'")]
    Unrecognized(String),
    #[error("Symmetry group '{0}' must have order of at least 1")]
    InvalidOrder(String),
}

/// The icosahedral axis conventions RELION distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcosahedralVariant {
    I1,
    I2,
    I3,
    I4,
}

/// A point-group symmetry in RELION's naming conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymmetryGroup {
    Cyclic(u32),
    Dihedral(u32),
    Tetrahedral,
    Octahedral,
    Icosahedral(IcosahedralVariant),
}

impl FromStr for SymmetryGroup {
    type Err = SymmetryError;

    /// Parses a RELION symmetry specifier: `C<n>`, `D<n>`, `T`, `O`,
    /// `I1`..`I4`, or bare `I` (RELION's default icosahedral setting, I2).
    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let spec = s.trim().to_ascii_uppercase();
        let order = |rest: &str| -> Result<u32, SymmetryError> {
            let n: u32 = rest
                .parse()
                .map_err(|_| SymmetryError::Unrecognized(s.to_string()))?;
            if n == 0 {
                return Err(SymmetryError::InvalidOrder(s.to_string()));
            }
            Ok(n)
        };
        match spec.as_str() {
            "T" => Ok(SymmetryGroup::Tetrahedral),
            "O" => Ok(SymmetryGroup::Octahedral),
            "I" | "I2" => Ok(SymmetryGroup::Icosahedral(IcosahedralVariant::I2)),
            "I1" => Ok(SymmetryGroup::Icosahedral(IcosahedralVariant::I1)),
            "I3" => Ok(SymmetryGroup::Icosahedral(IcosahedralVariant::I3)),
            "I4" => Ok(SymmetryGroup::Icosahedral(IcosahedralVariant::I4)),
            _ => {
                if let Some(rest) = spec.strip_prefix('C').filter(|r| !r.is_empty()) {
                    Ok(SymmetryGroup::Cyclic(order(rest)?))
                } else if let Some(rest) = spec.strip_prefix('D').filter(|r| !r.is_empty()) {
                    Ok(SymmetryGroup::Dihedral(order(rest)?))
                } else {
                    Err(SymmetryError::Unrecognized(s.to_string()))
                }
            }
        }
    }
}

impl SymmetryGroup {
    /// The number of rotation operators in the group.
    pub fn order(&self) -> usize {
        match self {
            SymmetryGroup::Cyclic(n) => *n as usize,
            SymmetryGroup::Dihedral(n) => 2 * *n as usize,
            SymmetryGroup::Tetrahedral => 12,
            SymmetryGroup::Octahedral => 24,
            SymmetryGroup::Icosahedral(_) => 60,
        }
    }

    /// Generates the full list of rotation operators, identity first for
    /// the cyclic and dihedral groups, and identity included (position
    /// unspecified) for the closed polyhedral groups.
    pub fn operators(&self) -> Vec<Rotation3<f64>> {
        let z = Vector3::z_axis();
        match self {
            SymmetryGroup::Cyclic(n) => (0..*n)
                .map(|k| Rotation3::from_axis_angle(&z, 2.0 * PI * k as f64 / *n as f64))
                .collect(),
            SymmetryGroup::Dihedral(n) => {
                let flip = Rotation3::from_axis_angle(&Vector3::x_axis(), PI);
                let cyclic = SymmetryGroup::Cyclic(*n).operators();
                cyclic
                    .iter()
                    .cloned()
                    .chain(cyclic.iter().map(|c| c * flip))
                    .collect()
            }
            SymmetryGroup::Tetrahedral => {
                let two_fold = Rotation3::from_axis_angle(&z, PI);
                let three_fold = Rotation3::from_axis_angle(
                    &Unit::new_normalize(Vector3::new(1.0, 1.0, 1.0)),
                    2.0 * PI / 3.0,
                );
                closure(&[two_fold, three_fold], self.order())
            }
            SymmetryGroup::Octahedral => {
                let four_fold = Rotation3::from_axis_angle(&z, PI / 2.0);
                let three_fold = Rotation3::from_axis_angle(
                    &Unit::new_normalize(Vector3::new(1.0, 1.0, 1.0)),
                    2.0 * PI / 3.0,
                );
                closure(&[four_fold, three_fold], self.order())
            }
            SymmetryGroup::Icosahedral(variant) => {
                // Base setting: a two-fold on z and a five-fold in the
                // yz-plane at the icosahedral dihedral angle.
                let five_fold_axis = Vector3::new(0.0, 1.0 / PHI, 1.0);
                let two_fold = Rotation3::from_axis_angle(&z, PI);
                let five_fold = Rotation3::from_axis_angle(
                    &Unit::new_normalize(five_fold_axis),
                    2.0 * PI / 5.0,
                );
                let base = closure(&[two_fold, five_fold], self.order());
                let conjugator = match variant {
                    IcosahedralVariant::I1 => Rotation3::identity(),
                    IcosahedralVariant::I2 => Rotation3::from_axis_angle(&z, PI / 2.0),
                    IcosahedralVariant::I3 => {
                        Rotation3::rotation_between(&five_fold_axis, &Vector3::z())
                            .unwrap_or_else(Rotation3::identity)
                    }
                    IcosahedralVariant::I4 => {
                        Rotation3::from_axis_angle(&Vector3::x_axis(), PI)
                            * Rotation3::rotation_between(&five_fold_axis, &Vector3::z())
                                .unwrap_or_else(Rotation3::identity)
                    }
                };
                base.into_iter()
                    .map(|op| conjugator * op * conjugator.inverse())
                    .collect()
            }
        }
    }
}

fn approx_eq(a: &Rotation3<f64>, b: &Rotation3<f64>) -> bool {
    (a.matrix() - b.matrix()).norm() < MATRIX_EQ_TOLERANCE
}

fn contains(ops: &[Rotation3<f64>], candidate: &Rotation3<f64>) -> bool {
    ops.iter().any(|op| approx_eq(op, candidate))
}

/// Closes a generator set under multiplication. `expected` bounds the work;
/// the polyhedral groups all close well below it.
fn closure(generators: &[Rotation3<f64>], expected: usize) -> Vec<Rotation3<f64>> {
    let mut ops = vec![Rotation3::identity()];
    let mut grew = true;
    while grew && ops.len() <= expected {
        grew = false;
        let snapshot = ops.clone();
        for g in generators {
            for op in &snapshot {
                let product = g * op;
                if !contains(&ops, &product) {
                    ops.push(product);
                    grew = true;
                }
            }
        }
    }
    ops
}

/// Selects one representative per coset of `subgroup` within `ops`,
/// preserving the order of `ops`. Two operators are redundant when they
/// differ only by a subgroup rotation applied in the frame the operators
/// map into, so the subgroup multiplies on the right.
pub fn find_subgroup_members(
    ops: &[Rotation3<f64>],
    subgroup: &[Rotation3<f64>],
) -> Vec<usize> {
    let mut kept: Vec<usize> = Vec::new();
    'candidates: for (i, op) in ops.iter().enumerate() {
        for &j in &kept {
            for s in subgroup {
                if ((ops[j] * s).matrix() - op.matrix()).norm() < COSET_MATCH_TOLERANCE {
                    continue 'candidates;
                }
            }
        }
        kept.push(i);
    }
    kept
}
