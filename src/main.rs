use anyhow::Result;
use feeder_env::config::Config;
use feeder_env::domain::Action;
use feeder_env::env::{Environment, FeederEnv, RenderMode};
use feeder_env::solver::SimulatedFeeder;
use feeder_env::telemetry::init_tracing;
use strum::IntoEnumIterator;
use tracing::info;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cfg = Config::load()?;
    let mut environment = FeederEnv::new(SimulatedFeeder::new(), &cfg)?;

    let actions: Vec<Action> = Action::iter().collect();
    let mut total_reward = 0.0;

    for episode in 0..cfg.driver.episodes {
        let initial = environment.reset()?;
        let action = actions[episode % actions.len()];
        let step = environment.step(action.index())?;
        environment.render(RenderMode::Human);

        total_reward += step.reward;
        info!(
            episode,
            %action,
            reward = step.reward,
            done = step.done,
            initial_min_pu = ?initial.min(),
            final_min_pu = ?step.observation.min(),
            "episode finished"
        );
    }

    info!(
        episodes = cfg.driver.episodes,
        total_reward,
        "run complete"
    );
    Ok(())
}
