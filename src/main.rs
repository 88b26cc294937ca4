use anyhow::Result;
use pactview::app::App;
use pactview::config::Config;
use pactview::terminal;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    config.validate()?;

    let mut term = terminal::setup()?;
    let mut app = App::new(&config);
    let result = app.run(&mut term).await;
    terminal::restore()?;
    result
}
