pub mod floodfill;
pub mod mincut;
pub mod minheap;
