pub mod buckets;
pub mod project;
pub mod recommend;
