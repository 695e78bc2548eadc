// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod column;
pub mod engine;
pub mod error;
pub mod filter;
pub mod model;
pub mod pagination;
pub mod selection;
pub mod sizing;
pub mod sort;
pub mod state;
pub mod value;

pub use column::*;
pub use engine::*;
pub use error::*;
pub use filter::*;
pub use model::*;
pub use pagination::*;
pub use selection::*;
pub use sizing::*;
pub use sort::*;
pub use state::*;
pub use value::*;
