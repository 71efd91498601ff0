use phf::{Map, phf_map};
use std::fmt;

/// A column label in a STAR metadata table.
///
/// The variants cover the RELION tags this toolkit reads or writes; every
/// other tag round-trips losslessly through [`Label::Other`], so a document
/// carrying labels the library has never heard of is still preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    ImageName,
    MicrographName,
    CoordinateX,
    CoordinateY,
    CoordinateZ,
    OriginX,
    OriginY,
    OriginZ,
    OriginXAngst,
    OriginYAngst,
    OriginZAngst,
    AngleRot,
    AngleTilt,
    AnglePsi,
    ClassNumber,
    DefocusU,
    DefocusV,
    DefocusAngle,
    PhaseShift,
    Voltage,
    SphericalAberration,
    AmplitudeContrast,
    Magnification,
    DetectorPixelSize,
    ImagePixelSize,
    ImageSize,
    OpticsGroup,
    OpticsGroupName,
    GroupNumber,
    RandomSubset,
    /// Any tag without a dedicated variant; stores the full tag text.
    Other(String),
}

#[rustfmt::skip]
static KNOWN_LABELS: Map<&'static str, Label> = phf_map! {
    "_rlnImageName"           => Label::ImageName,
    "_rlnMicrographName"      => Label::MicrographName,
    "_rlnCoordinateX"         => Label::CoordinateX,
    "_rlnCoordinateY"         => Label::CoordinateY,
    "_rlnCoordinateZ"         => Label::CoordinateZ,
    "_rlnOriginX"             => Label::OriginX,
    "_rlnOriginY"             => Label::OriginY,
    "_rlnOriginZ"             => Label::OriginZ,
    "_rlnOriginXAngst"        => Label::OriginXAngst,
    "_rlnOriginYAngst"        => Label::OriginYAngst,
    "_rlnOriginZAngst"        => Label::OriginZAngst,
    "_rlnAngleRot"            => Label::AngleRot,
    "_rlnAngleTilt"           => Label::AngleTilt,
    "_rlnAnglePsi"            => Label::AnglePsi,
    "_rlnClassNumber"         => Label::ClassNumber,
    "_rlnDefocusU"            => Label::DefocusU,
    "_rlnDefocusV"            => Label::DefocusV,
    "_rlnDefocusAngle"        => Label::DefocusAngle,
    "_rlnPhaseShift"          => Label::PhaseShift,
    "_rlnVoltage"             => Label::Voltage,
    "_rlnSphericalAberration" => Label::SphericalAberration,
    "_rlnAmplitudeContrast"   => Label::AmplitudeContrast,
    "_rlnMagnification"       => Label::Magnification,
    "_rlnDetectorPixelSize"   => Label::DetectorPixelSize,
    "_rlnImagePixelSize"      => Label::ImagePixelSize,
    "_rlnImageSize"           => Label::ImageSize,
    "_rlnOpticsGroup"         => Label::OpticsGroup,
    "_rlnOpticsGroupName"     => Label::OpticsGroupName,
    "_rlnGroupNumber"         => Label::GroupNumber,
    "_rlnRandomSubset"        => Label::RandomSubset,
};

impl Label {
    /// Resolves a STAR tag (e.g. `_rlnAngleRot`) to a label.
    ///
    /// Unknown tags are preserved verbatim as [`Label::Other`].
    pub fn parse(tag: &str) -> Label {
        KNOWN_LABELS
            .get(tag)
            .cloned()
            .unwrap_or_else(|| Label::Other(tag.to_string()))
    }

    /// Renders the label back to its STAR tag text.
    pub fn tag(&self) -> &str {
        match self {
            Label::ImageName => "_rlnImageName",
            Label::MicrographName => "_rlnMicrographName",
            Label::CoordinateX => "_rlnCoordinateX",
            Label::CoordinateY => "_rlnCoordinateY",
            Label::CoordinateZ => "_rlnCoordinateZ",
            Label::OriginX => "_rlnOriginX",
            Label::OriginY => "_rlnOriginY",
            Label::OriginZ => "_rlnOriginZ",
            Label::OriginXAngst => "_rlnOriginXAngst",
            Label::OriginYAngst => "_rlnOriginYAngst",
            Label::OriginZAngst => "_rlnOriginZAngst",
            Label::AngleRot => "_rlnAngleRot",
            Label::AngleTilt => "_rlnAngleTilt",
            Label::AnglePsi => "_rlnAnglePsi",
            Label::ClassNumber => "_rlnClassNumber",
            Label::DefocusU => "_rlnDefocusU",
            Label::DefocusV => "_rlnDefocusV",
            Label::DefocusAngle => "_rlnDefocusAngle",
            Label::PhaseShift => "_rlnPhaseShift",
            Label::Voltage => "_rlnVoltage",
            Label::SphericalAberration => "_rlnSphericalAberration",
            Label::AmplitudeContrast => "_rlnAmplitudeContrast",
            Label::Magnification => "_rlnMagnification",
            Label::DetectorPixelSize => "_rlnDetectorPixelSize",
            Label::ImagePixelSize => "_rlnImagePixelSize",
            Label::ImageSize => "_rlnImageSize",
            Label::OpticsGroup => "_rlnOpticsGroup",
            Label::OpticsGroupName => "_rlnOpticsGroupName",
            Label::GroupNumber => "_rlnGroupNumber",
            Label::RandomSubset => "_rlnRandomSubset",
            Label::Other(tag) => tag,
        }
    }

    /// The three per-particle Euler angle labels in RELION order.
    pub fn angles() -> [Label; 3] {
        [Label::AngleRot, Label::AngleTilt, Label::AnglePsi]
    }

    /// Pixel-unit origin labels for the in-plane axes.
    pub fn origins() -> [Label; 2] {
        [Label::OriginX, Label::OriginY]
    }

    /// Angstrom-unit origin labels for the in-plane axes.
    pub fn origins_angst() -> [Label; 2] {
        [Label::OriginXAngst, Label::OriginYAngst]
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
