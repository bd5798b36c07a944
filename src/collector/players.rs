//! Online-player collector.
//!
//! One scrape costs `1 + 3n` RCON round trips for `n` online players: `list`,
//! then position, dimension, and experience level per username. A player who
//! disconnects between `list` and the per-player queries makes the entity
//! lookup fail to parse; that aborts this collector for the scrape (its
//! series simply disappear) without touching sibling collectors.

use async_trait::async_trait;
use tracing::debug;

use super::{Collector, CollectorError, MetricDesc, MetricSample, require_data};
use crate::parse;
use crate::rcon::Transport;

const PLAYERS_ONLINE: MetricDesc = MetricDesc {
    name: "minecraft_players_online",
    help: "Minecraft players online.",
    labels: &["username", "dimension", "x", "y", "z", "experience"],
};

pub struct PlayersCollector;

#[async_trait]
impl Collector for PlayersCollector {
    async fn update(&self, transport: &dyn Transport) -> Result<Vec<MetricSample>, CollectorError> {
        let reply = require_data(transport.execute("list").await)?;
        let usernames = parse::parse_player_list(&reply)?;

        let mut samples = Vec::with_capacity(usernames.len());
        for username in usernames {
            debug!(%username, "player online");

            let [x, y, z] = query_position(transport, &username).await?;
            let dimension = query_dimension(transport, &username).await?;
            let experience = query_experience(transport, &username).await?;

            samples.push(MetricSample::new(
                PLAYERS_ONLINE,
                vec![username, dimension, x, y, z, experience],
                1.0,
            ));
        }

        Ok(samples)
    }
}

async fn query_position(
    transport: &dyn Transport,
    username: &str,
) -> Result<[String; 3], CollectorError> {
    let command = format!("data get entity @p[name={username}] Pos");
    let reply = require_data(transport.execute(&command).await)?;
    Ok(parse::parse_position(&reply)?)
}

async fn query_dimension(
    transport: &dyn Transport,
    username: &str,
) -> Result<String, CollectorError> {
    let command = format!("data get entity @p[name={username}] Dimension");
    let reply = require_data(transport.execute(&command).await)?;
    Ok(parse::parse_dimension(&reply)?)
}

async fn query_experience(
    transport: &dyn Transport,
    username: &str,
) -> Result<String, CollectorError> {
    let command = format!("data get entity @p[name={username}] XpLevel");
    let reply = require_data(transport.execute(&command).await)?;
    Ok(parse::parse_experience(&reply)?)
}
