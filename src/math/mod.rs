//! Linear algebra conventions for the whole crate, stated once:
//! `glam` column-major matrices, right-handed view space (camera looks down
//! -Z), and OpenGL clip conventions (NDC z in [-1, 1]). The renderer converts
//! to wgpu's [0, 1] depth range at upload time; everything else in the crate
//! stays in GL conventions.

mod projection;

pub use projection::{frustum_rh_gl, inverse_checked, perspective_rh_gl};
