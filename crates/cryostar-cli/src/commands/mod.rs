pub mod jobs;
pub mod normalize;
pub mod star;
pub mod star2bild;
pub mod subparticles;
