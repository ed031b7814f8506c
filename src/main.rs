mod cli;
mod config;
mod logging;
mod runner;
mod scaffold;
mod script;
mod templates;
mod util;

fn main() -> anyhow::Result<()> {
    let app = cli::parse();
    logging::init(app.verbose);
    runner::run(app)
}
