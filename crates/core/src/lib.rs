pub mod camera;
pub mod capture;
pub mod config;
pub mod detection;
pub mod overlay;
pub mod pipeline;
pub mod quality;
pub mod session;
pub mod shared;

#[cfg(test)]
mod test_support;
