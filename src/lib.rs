// src/lib.rs

pub mod config;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod interp;
pub mod pusher;
pub mod topology;
pub mod units;
pub mod vec3;

pub use error::{GridError, GridResult};
pub use grid::{CartesianGrid, GenericGrid, Grid, GridGeometry, GridShape};
pub use pusher::{ParticleBatch, Pusher};
