mod app;
mod config;
mod input;
mod render;
mod scheduler;
mod starfield;
mod surface;
mod theme;

use anyhow::Result;

fn main() -> Result<()> {
    app::run()
}
