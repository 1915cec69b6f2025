// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

pub mod command;
pub mod config;
pub mod error;
pub mod gcloud;
pub mod logging;

mod token;
pub use gcloud::GcloudWrapper;
pub use token::{TokenResponse, TOKEN_REFRESH_WINDOW_SECS};

#[cfg(test)]
mod unittest;
