//! CLI module
//!
//! This module provides the command-line interface for browsing the directory.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;

use crate::{
    aggregator::{distinct_locations, service_tags, DEFAULT_TAG_COUNT},
    api::{
        client::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT},
        serve, AppState, ClientConfig, DirectoryApi, HttpClient, ServerConfig,
    },
    directory::{Directory, FetchOutcome},
    locations::{self, LocationPicker},
    models::{format_location, Provider, SearchParams},
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Base URL of the remote directory API
    #[arg(long, global = true, env = "ABILITY_NETWORK_API_URL", default_value = DEFAULT_BASE_URL)]
    api_url: String,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    timeout: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// List solution providers
    Providers {
        /// Match against provider and service names
        #[arg(short, long, default_value = "")]
        query: String,

        /// Exact location, e.g. "Pune, Maharashtra"
        #[arg(short, long, conflicts_with_all = ["city", "state"])]
        location: Option<String>,

        /// City of the location filter (requires --state)
        #[arg(long, requires = "state")]
        city: Option<String>,

        /// State of the location filter (requires --city)
        #[arg(long, requires = "city")]
        state: Option<String>,

        /// Ask the API to pre-filter by disability
        #[arg(long)]
        disability: Option<String>,
    },

    /// Show a provider's details
    Show {
        /// Provider id (organization__city__state) or organization name
        provider: String,
    },

    /// Suggest service names for a partial query
    Suggest { query: String },

    /// List locations to filter by
    Locations {
        /// Derive locations from the loaded providers instead of the catalog
        #[arg(long)]
        from_api: bool,

        /// Only list the cities of this state
        #[arg(long, conflicts_with = "from_api")]
        state: Option<String>,
    },

    /// List blog posts
    Blogs,

    /// List events
    Events,

    /// Serve the aggregated directory over HTTP
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 3000)]
        port: u16,
    },

    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Run the CLI application
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    match &cli.command {
        Commands::Providers {
            query,
            location,
            city,
            state,
            disability,
        } => {
            let client = create_client(&cli)?;
            let params = SearchParams {
                disabilities: disability.clone().unwrap_or_default(),
                ..Default::default()
            };
            let location = match (city, state) {
                (Some(city), Some(state)) => Some(format_location(city, state)),
                _ => location.clone(),
            };

            let mut directory = load_directory(&client, &params).await;
            directory.set_query(query.as_str());
            directory.set_location(location);

            print_providers(directory.filtered());
            Ok(())
        }

        Commands::Show { provider } => {
            let client = create_client(&cli)?;
            let directory = load_directory(&client, &SearchParams::default()).await;

            let matches: Vec<&Provider> = directory
                .providers()
                .iter()
                .filter(|p| p.id == *provider || p.name.eq_ignore_ascii_case(provider))
                .collect();

            if matches.is_empty() {
                println!("No provider found for \"{}\"", provider);
            }
            for found in matches {
                print_provider_details(found);
            }
            Ok(())
        }

        Commands::Suggest { query } => {
            let client = create_client(&cli)?;
            let mut directory = load_directory(&client, &SearchParams::default()).await;
            directory.set_query(query.as_str());

            if directory.suggestions().is_empty() {
                println!("No matching services");
            }
            for suggestion in directory.suggestions() {
                println!("  {}", suggestion);
            }
            Ok(())
        }

        Commands::Locations { from_api, state } => {
            if let Some(state) = state {
                let choices = state_locations(state);
                if choices.is_empty() {
                    println!("No cities listed for \"{}\"", state);
                }
                for location in choices {
                    println!("  {}", location);
                }
            } else if *from_api {
                let client = create_client(&cli)?;
                let directory = load_directory(&client, &SearchParams::default()).await;
                for location in distinct_locations(directory.providers()) {
                    println!("  {}", location);
                }
            } else {
                for entry in locations::catalog() {
                    println!("{}", entry.state.bold());
                    for city in entry.cities {
                        println!("  {}", format_location(&city, &entry.state));
                    }
                }
            }
            Ok(())
        }

        Commands::Blogs => {
            let client = create_client(&cli)?;
            let posts = client.blogs().await?;

            if posts.is_empty() {
                println!("No blog posts yet");
            }
            for post in posts {
                println!("{}", post.title.bold());
                println!("{}", post.date.dimmed());
                println!("{}\n", post.content);
            }
            Ok(())
        }

        Commands::Events => {
            let client = create_client(&cli)?;
            let events = client.events().await?;

            if events.is_empty() {
                println!("No upcoming events");
            }
            for event in events {
                println!("{}", event.title.bold());
                println!("{} · {}", event.location, event.date.dimmed());
                println!("{}\n", event.description);
            }
            Ok(())
        }

        Commands::Serve { port } => {
            let client = create_client(&cli)?;
            let state = AppState::new(Arc::new(client), SearchParams::default());

            println!("Loading providers from {}...", cli.api_url);
            if let FetchOutcome::Applied { providers } = state.refresh().await {
                println!("Loaded {} providers", providers);
            }

            let config = ServerConfig {
                address: ([127, 0, 0, 1], *port).into(),
            };
            println!("Starting directory server on port {}...", port);
            serve(state, config).await?;
            Ok(())
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, bin_name, &mut io::stdout());
            Ok(())
        }
    }
}

fn create_client(cli: &Cli) -> Result<HttpClient, Box<dyn std::error::Error>> {
    let config = ClientConfig {
        base_url: cli.api_url.clone(),
        timeout: Duration::from_secs(cli.timeout),
    };

    Ok(HttpClient::with_config(config)?)
}

/// Fetches once into a fresh directory. A failed fetch leaves it empty.
async fn load_directory<A: DirectoryApi + ?Sized>(api: &A, params: &SearchParams) -> Directory {
    let mut directory = Directory::new();
    directory.refresh(api, params).await;
    directory
}

/// The picker's city choices for one state
fn state_locations(state: &str) -> Vec<String> {
    let mut picker = LocationPicker::new();
    picker.select_state(state);
    picker.choices()
}

fn print_providers(providers: &[Provider]) {
    if providers.is_empty() {
        println!("No providers found matching your criteria.");
        return;
    }

    println!("{} providers found\n", providers.len());
    for provider in providers {
        let (shown, extra) = service_tags(&provider.services, DEFAULT_TAG_COUNT);
        let mut tags = shown
            .iter()
            .map(|service| format!("[{}]", service.name).cyan().to_string())
            .collect::<Vec<_>>()
            .join(" ");
        if extra > 0 {
            tags.push_str(&format!(" {}", format!("+{} more", extra).yellow()));
        }

        println!("{}", provider.name.bold());
        println!("  {}", provider.location.dimmed());
        println!("  {}", tags);
        println!("  id: {}\n", provider.id);
    }
}

fn print_provider_details(provider: &Provider) {
    println!("{}", provider.name.bold());
    println!("{}", provider.location.dimmed());

    println!("\n{}", "About".underline());
    println!("{}", provider.about_or_default());

    println!("\n{}", "Services Offered".underline());
    for service in &provider.services {
        println!("  • {}", service.name);
    }

    if !provider.contact_info.is_empty() {
        println!("\n{}", "Contacts".underline());
        for contact in &provider.contact_info {
            let name = contact.display_name();
            let mut line = if name.is_empty() {
                "  -".to_string()
            } else {
                format!("  {}", name)
            };
            if let Some(category) = &contact.category {
                line.push_str(&format!(" ({})", category));
            }
            for detail in [&contact.phone, &contact.email].into_iter().flatten() {
                line.push_str(&format!(", {}", detail));
            }
            println!("{}", line);
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locations_state_option() {
        let cli = Cli::try_parse_from(["ability-network", "locations", "--state", "Delhi"]).unwrap();
        match cli.command {
            Commands::Locations { from_api, state } => {
                assert!(!from_api);
                assert_eq!(state.as_deref(), Some("Delhi"));
            }
            _ => panic!("expected the locations command"),
        }

        assert!(Cli::try_parse_from([
            "ability-network",
            "locations",
            "--state",
            "Delhi",
            "--from-api"
        ])
        .is_err());
    }

    #[test]
    fn test_state_locations_lists_catalog_cities() {
        let delhi = state_locations("Delhi");
        assert_eq!(delhi.len(), 4);
        assert_eq!(delhi[0], "New Delhi, Delhi");
        assert!(state_locations("Atlantis").is_empty());
    }
}
