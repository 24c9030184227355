pub mod network;
pub mod npoint;
pub mod point;
pub mod relate;
pub mod srs;
pub mod tpoint;
