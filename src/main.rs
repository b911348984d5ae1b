use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use owo_colors::OwoColorize;

use tracesim::client::{ListSort, SimulationClient, SortDirection};
use tracesim::listing::{SimulationListing, build_listing};
use tracesim::terminal::{PlayerConfig, run_player};

#[derive(Parser, Debug)]
#[command(
    name = "tracesim",
    version,
    about = "Browse and visualize beacon tracing simulations over REST"
)]
struct Cli {
    /// Base URL of the simulation service.
    #[arg(long, env = "TRACESIM_URL", default_value = "http://127.0.0.1:8080")]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the stored simulations.
    List {
        /// Metadata field the server should sort by.
        #[arg(long)]
        sort_property: Option<String>,
        /// Sort order; only honored together with --sort-property.
        #[arg(long, value_enum)]
        sort_direction: Option<SortDirectionArg>,
    },
    /// Delete a stored simulation after confirmation.
    Delete {
        simulation_id: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Play a simulation round by round in a live dashboard.
    Watch {
        simulation_id: String,
        /// Declared round count; read from the simulation metadata when omitted.
        #[arg(long)]
        rounds: Option<u32>,
        /// Playback speed in rounds per second.
        #[arg(long, default_value_t = 1.0)]
        speed: f64,
        /// Beacon id to highlight on the boards.
        #[arg(long)]
        beacon: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SortDirectionArg {
    Asc,
    Desc,
}

impl From<SortDirectionArg> for SortDirection {
    fn from(value: SortDirectionArg) -> Self {
        match value {
            SortDirectionArg::Asc => SortDirection::Ascending,
            SortDirectionArg::Desc => SortDirection::Descending,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let client = SimulationClient::new(&cli.base_url)?;

    match cli.command {
        Command::List {
            sort_property,
            sort_direction,
        } => {
            let sort = list_sort(sort_property, sort_direction);
            list_command(&client, sort.as_ref()).await?;
        }
        Command::Delete { simulation_id, yes } => {
            let confirmed = yes || confirm_deletion(&simulation_id)?;
            delete_command(&client, &simulation_id, confirmed).await?;
        }
        Command::Watch {
            simulation_id,
            rounds,
            speed,
            beacon,
        } => {
            let rounds_total = match rounds {
                Some(rounds) => rounds,
                None => client
                    .declared_rounds(&simulation_id)
                    .await
                    .context("failed to look up the simulation's round count")?
                    .with_context(|| {
                        format!(
                            "simulation {simulation_id} is not listed or has no round count; pass --rounds"
                        )
                    })?,
            };
            run_player(
                client,
                PlayerConfig {
                    simulation_id,
                    rounds_total,
                    speed,
                    beacon_of_interest: beacon,
                },
            )
            .await?;
        }
    }

    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn list_sort(
    property: Option<String>,
    direction: Option<SortDirectionArg>,
) -> Option<ListSort> {
    let property = property?;
    Some(ListSort {
        property,
        direction: direction.map(SortDirection::from).unwrap_or(SortDirection::Ascending),
    })
}

async fn list_command(client: &SimulationClient, sort: Option<&ListSort>) -> Result<()> {
    let simulations = client
        .list_simulations(sort)
        .await
        .context("failed to list simulations")?;

    // An empty mapping renders nothing: no header, no rows.
    let Some(listing) = build_listing(client.base(), &simulations) else {
        return Ok(());
    };

    print_listing(&listing);
    Ok(())
}

fn print_listing(listing: &SimulationListing) {
    let widths = column_widths(listing);

    print!("{:<width$} ", "ID".bold().cyan(), width = widths[0]);
    for (field, &width) in listing.header.iter().zip(&widths[1..]) {
        print!("{:<width$} ", field.bold().cyan());
    }
    println!("{}", "VISUALIZE".bold().cyan());

    for row in &listing.rows {
        print!("{:<width$} ", row.id.bold(), width = widths[0]);
        for (value, &width) in row.values.iter().zip(&widths[1..]) {
            print!("{value:<width$} ");
        }
        println!("{}", row.visualize_url.dimmed());
    }
}

fn column_widths(listing: &SimulationListing) -> Vec<usize> {
    let mut widths = Vec::with_capacity(listing.header.len() + 1);
    widths.push(
        listing
            .rows
            .iter()
            .map(|row| row.id.len())
            .chain(std::iter::once(2))
            .max()
            .unwrap_or(2),
    );
    for (index, field) in listing.header.iter().enumerate() {
        let cells = listing
            .rows
            .iter()
            .map(|row| row.values.get(index).map_or(0, String::len));
        widths.push(cells.chain(std::iter::once(field.len())).max().unwrap_or(0));
    }
    widths
}

async fn delete_command(
    client: &SimulationClient,
    simulation_id: &str,
    confirmed: bool,
) -> Result<()> {
    if !confirmed {
        // A cancelled confirmation makes no network call at all.
        println!("{}", "Deletion cancelled".yellow());
        return Ok(());
    }

    let message = client
        .delete_simulation(simulation_id)
        .await
        .context("failed to delete simulation")?;
    println!("{}", message.green().bold());

    // Show the remaining simulations right after a deletion.
    list_command(client, None).await
}

fn confirm_deletion(simulation_id: &str) -> Result<bool> {
    print!("Do you want to delete simulation {simulation_id}? [y/N] ");
    io::stdout().flush().context("failed to flush prompt")?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("failed to read confirmation")?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes" | "Yes" | "YES"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_direction_defaults_to_ascending() {
        let sort = list_sort(Some("roundsNum".into()), None).expect("sort");
        assert_eq!(sort.direction, SortDirection::Ascending);
        assert!(list_sort(None, Some(SortDirectionArg::Desc)).is_none());
    }

    #[tokio::test]
    async fn cancelled_deletion_makes_no_network_call() {
        // An unroutable service: any request attempt would fail loudly.
        let client = SimulationClient::new("http://192.0.2.1:1").expect("client");
        delete_command(&client, "sim-1", false)
            .await
            .expect("cancelled deletion must succeed without touching the network");
    }

    #[test]
    fn cli_parses_watch_flags() {
        let cli = Cli::parse_from([
            "tracesim", "watch", "sim-1", "--rounds", "25", "--speed", "2.5", "--beacon", "7",
        ]);
        match cli.command {
            Command::Watch {
                simulation_id,
                rounds,
                speed,
                beacon,
            } => {
                assert_eq!(simulation_id, "sim-1");
                assert_eq!(rounds, Some(25));
                assert_eq!(speed, 2.5);
                assert_eq!(beacon.as_deref(), Some("7"));
            }
            other => panic!("expected watch command, got {other:?}"),
        }
    }
}
