mod test_ctx;

pub use test_ctx::*;
