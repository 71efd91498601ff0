use cryostar::workflows::MatrixTransform;
use nalgebra::{Matrix3, Vector3};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("'{0}' is not a comma-separated list of three numbers (e.g. '120,120,90').")]
    InvalidTriple(String),

    #[error("'{0}' is not a color; expected three components in [0, 1] (e.g. '0,0.5,1').")]
    InvalidColor(String),

    #[error("'{0}' is not a transformation matrix; expected 3x3 or 3x4 rows in JSON.")]
    InvalidMatrix(String),
}

/// Parses a comma-separated `x,y,z` triple.
pub fn parse_triple(value: &str) -> Result<[f64; 3], ParseError> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|tok| tok.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| ParseError::InvalidTriple(value.to_string()))?;
    match parts.as_slice() {
        &[x, y, z] => Ok([x, y, z]),
        _ => Err(ParseError::InvalidTriple(value.to_string())),
    }
}

pub fn parse_vec3(value: &str) -> Result<Vector3<f64>, ParseError> {
    parse_triple(value).map(Vector3::from)
}

/// Parses an `r,g,b` color with components in `[0, 1]`.
pub fn parse_color(value: &str) -> Result<[f64; 3], ParseError> {
    let rgb = parse_triple(value).map_err(|_| ParseError::InvalidColor(value.to_string()))?;
    if rgb.iter().any(|c| !(0.0..=1.0).contains(c)) {
        return Err(ParseError::InvalidColor(value.to_string()));
    }
    Ok(rgb)
}

/// Parses a row-major 3x3 or 3x4 matrix from JSON. The fourth column,
/// when present, is a translation in Angstroms.
pub fn parse_matrix(value: &str) -> Result<MatrixTransform, ParseError> {
    let rows: Vec<Vec<f64>> = serde_json::from_str(value)
        .map_err(|_| ParseError::InvalidMatrix(value.to_string()))?;
    let width = match rows.as_slice() {
        [a, b, c] if a.len() == b.len() && b.len() == c.len() && (a.len() == 3 || a.len() == 4) => {
            a.len()
        }
        _ => return Err(ParseError::InvalidMatrix(value.to_string())),
    };

    let rotation = Matrix3::from_iterator(
        // from_iterator fills column-major; feed it transposed.
        (0..3).flat_map(|col| rows.iter().map(move |row| row[col])),
    );
    let translation = (width == 4).then(|| Vector3::new(rows[0][3], rows[1][3], rows[2][3]));
    Ok(MatrixTransform {
        rotation,
        translation,
    })
}
