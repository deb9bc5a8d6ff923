pub mod feed;
pub mod frame;
pub mod latest;
pub mod pipeline;
