pub mod accounting;
pub mod activesources;
pub mod bodies;
pub mod income;
pub mod knapsack;
pub mod remotes;
pub mod system;
