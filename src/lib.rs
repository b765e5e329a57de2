pub mod constants;
pub mod cosmology;
pub mod emulator;
pub mod fluxpower_errors;
pub mod interpolation;
pub mod jobs;
pub mod p1d_data;
pub mod sim_params;
pub mod skewers;
pub mod thermal;
