//! ckern deformers: lattice free-form deformation and curve path deformation.
//!
//! Both deformers are explicit sessions: `begin` captures everything a
//! deformation pass needs, the session is queried any number of times, and
//! `end` consumes it.

pub mod curve_deform;
pub mod lattice;

pub use curve_deform::{curve_deform_verts_or_skip, CurveDeform};
pub use lattice::{calc_lat_fudu, lattice_deform_verts_or_skip, Lattice, LatticeDeform};
