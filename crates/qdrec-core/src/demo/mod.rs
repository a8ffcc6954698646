//! Closed-form model dynamics that exercise the recording pipeline.
//!
//! None of these drivers integrate equations of motion. Each evolves an
//! analytically solvable model and streams every observable through a
//! [`Recorder`](crate::record::Recorder) at each step, exactly the way an
//! external propagation engine would. They double as reference producers:
//! the files they write carry the full dataset schemas with physically
//! consistent contents (conserved energies, unit traces, normalized
//! amplitudes).

pub mod exact;
pub mod heom;
pub mod tsh;
