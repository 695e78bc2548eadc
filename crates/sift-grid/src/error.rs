// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;

/// Only surfaced when the engine runs with strict references; otherwise
/// actions naming unknown ids are no-ops.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("unknown column {0:?}")]
    UnknownColumn(String),

    #[error("unknown row {0:?}")]
    UnknownRow(String),
}
