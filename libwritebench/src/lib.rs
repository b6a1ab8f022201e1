pub mod batch;
pub mod pool;
pub mod generate;
pub mod io;
pub mod error;
pub mod utils;
pub mod workbench;
pub mod harness;

#[cfg(not(target_pointer_width = "64"))]
compile_error!("Target architecture is not 64-bit - This software is only supported on 64-bit platforms");

#[cfg(not(unix))]
compile_error!("Positioned writes rely on std::os::unix::fs::FileExt - This software is only supported on unix platforms");
