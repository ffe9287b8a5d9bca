use colored::Colorize;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Set at build time by the release pipeline.
pub const BUILD_DATE: Option<&str> = option_env!("BELLATRIX_BUILD_DATE");

pub fn version() {
    println!("{}: {}", "Version".cyan(), VERSION);
    println!("{}: {}", "Build date".cyan(), BUILD_DATE.unwrap_or("unknown"));
}
