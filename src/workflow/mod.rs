//! Command workflows over one project's `.context/` directory.
//!
//! Each command loads a [`ProjectContext`], does one thing and prints a short
//! report; the library modules stay free of terminal output.
mod baseline;
mod bundle;
mod compress;
mod config;
mod context;
mod init;
mod session;
mod status;

pub use baseline::run_baseline;
pub(crate) use baseline::modified_stamp;
pub use bundle::{run_bundle, run_expand};
pub(crate) use bundle::build_bundle;
pub use compress::run_compress;
pub(crate) use compress::compress_baseline;
pub use config::{run_config, run_pull_cross};
pub(crate) use context::ProjectContext;
pub use init::run_init;
pub use session::{
    run_save, run_session_end, run_show_task, run_start_session, run_stop_session,
    run_update_task,
};
pub use status::run_status;
