//! Post-processing of simulation and electronic-structure output: projected
//! densities of states, Fermi-level search and decoherence timescales.

pub mod decoherence;
pub mod fermi;
pub mod pdos;
