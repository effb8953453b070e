/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

use thiserror::Error;

/// Returned once, synchronously, when a pipeline cannot be started. No events are read.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("source must yield structured records")]
    UnstructuredSource,

    #[error("failed to start the pipeline worker: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Errors that stop a running pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error("failed to write to the sink: {0}")]
    Sink(#[from] std::io::Error),

    #[error("the pipeline worker panicked")]
    WorkerPanicked,
}
