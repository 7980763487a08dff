pub mod costmatrix;
pub mod cursor;
pub mod route;
pub mod routecache;
pub mod search;
