use anyhow::Result;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

const WORKSPACE_CRATES: &[&str] = &[
    "clock",
    "database",
    "fork_choice_store",
    "genesis",
    "leanode",
    "node",
    "pqsig",
    "transition_functions",
];

/// Console logging: `info` for workspace crates, overridable through
/// `LEANODE_LOG`.
pub fn initialize() -> Result<()> {
    let mut filter = EnvFilter::default().add_directive(LevelFilter::OFF.into());

    for module in WORKSPACE_CRATES {
        filter = filter.add_directive(format!("{module}=info").parse()?);
    }

    if let Ok(env_filter) = EnvFilter::try_from_env("LEANODE_LOG") {
        for directive in env_filter.to_string().split(',') {
            filter = filter.add_directive(directive.parse()?);
        }
    }

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .compact()
                .with_target(true)
                .with_line_number(true)
                .with_filter(filter),
        )
        .init();

    Ok(())
}
