pub mod linear;
pub mod timing;
