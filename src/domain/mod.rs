mod expire_time;

pub use expire_time::*;
