mod args;

pub use args::{CliArgs, Command, CompressionLevel, MergeArgs, OutputArgs, PackArgs};
