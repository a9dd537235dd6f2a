// Library surface for headless/integration tests and reuse.
// The binary in main.rs only adds the CLI and terminal setup.
pub mod analysis;
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod corpus;
pub mod countdown;
pub mod history;
pub mod logging;
pub mod runtime;
pub mod scoring;
pub mod session;
pub mod ui;
pub mod util;
