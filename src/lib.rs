pub mod discretization;
pub mod numerics;
pub mod objects;
pub mod particles;
pub mod physics;
pub mod processing;
pub mod simulation;
