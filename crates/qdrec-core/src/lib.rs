//! # qdrec Core Library
//!
//! A toolkit for recording and post-processing observables of quantum-dynamics
//! simulations: trajectory surface hopping (TSH), hierarchical equations of
//! motion (HEOM), and exact wavefunction propagation on grids.
//!
//! ## Architectural Philosophy
//!
//! The library is split into three independent layers so that each can be used
//! and tested on its own.
//!
//! - **[`record`]: The Container Layer.** A schema-driven recording facility
//!   built around the [`record::Recorder`] trait, with an HDF5-backed
//!   implementation for incremental per-timestep writes and an in-memory
//!   implementation for postponed, selective flushes. The per-flavor dataset
//!   schemas (TSH, HEOM, exact propagation) live in [`record::schema`].
//!
//! - **[`analysis`]: The Post-Processing Layer.** Pure numerical routines that
//!   consume either recorded files or flat text output of electronic-structure
//!   codes: projected densities of states with optional Gaussian broadening,
//!   Fermi-level search over discrete level spectra, and decoherence-rate
//!   estimates from vibronic Hamiltonians.
//!
//! - **[`demo`]: The Driver Layer.** Closed-form model trajectories (no
//!   propagation engine) whose only purpose is to exercise the complete
//!   recording schemas end to end, mirroring the shape of typical production
//!   drivers: configure, loop over steps, save.

pub mod analysis;
pub mod demo;
pub mod progress;
pub mod record;
pub mod units;
