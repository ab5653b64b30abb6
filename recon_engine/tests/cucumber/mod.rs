mod setups;
mod steps;
mod world;

pub use world::RewardsWorld;
