// SPDX-License-Identifier: Apache-2.0

mod directory;
mod reader;

pub use directory::{LogFile, StreamDirectory, log_file_name};
pub use reader::LineReader;
