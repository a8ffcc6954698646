pub mod inspect;
pub mod pdos;
pub mod rates;
pub mod run;
