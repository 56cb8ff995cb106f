use std::path::Path;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Text};
use weather_core::{Config, Coordinates, WeatherClient, WeatherSource, config::DEFAULT_PROXY_URL, proxy};

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather proxy and lookup CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by the commands that query the proxy.
#[derive(Debug, Args)]
pub struct ProxyArgs {
    /// Proxy endpoint to query instead of the configured one.
    #[arg(long)]
    pub proxy: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the provider API key and proxy URL.
    Configure,

    /// Run the proxy endpoint.
    Serve {
        /// Address to bind, e.g. 0.0.0.0:8080.
        #[arg(long)]
        addr: Option<String>,
    },

    /// Show current weather and the hourly forecast for a city.
    Show {
        city: String,

        #[command(flatten)]
        target: ProxyArgs,

        /// Print normalized records as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show weather for a coordinate pair.
    Locate {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        #[command(flatten)]
        target: ProxyArgs,

        #[arg(long)]
        json: bool,
    },

    /// Suggest city names matching a partial query.
    Search {
        partial: String,

        #[command(flatten)]
        target: ProxyArgs,

        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => {
                // Environment overrides must not end up in the saved file, and a
                // broken file must not prevent rewriting it.
                let path = Config::config_file_path()?;
                configure(Config::load_for_edit(&path), &path)?;
            }
            Command::Serve { addr } => {
                let mut config = Config::load()?;
                if addr.is_some() {
                    config.listen_addr = addr;
                }
                proxy::serve(&config).await?;
            }
            Command::Show { city, target, json } => {
                let client = client(target)?;
                let bundle = client.fetch_weather_by_city(&city).await?;
                print_or_json(json, &bundle, || output::render_bundle(&bundle))?;
            }
            Command::Locate { lat, lon, target, json } => {
                let client = client(target)?;
                let bundle = client.fetch_weather_by_coords(Coordinates::new(lat, lon)).await?;
                print_or_json(json, &bundle, || output::render_bundle(&bundle))?;
            }
            Command::Search { partial, target, json } => {
                let client = client(target)?;
                let hits = client.fetch_autocomplete_weather_by_city(&partial).await?;
                print_or_json(json, &hits, || output::render_suggestions(&hits))?;
            }
        }

        Ok(())
    }
}

fn client(target: ProxyArgs) -> anyhow::Result<WeatherClient> {
    let mut config = Config::load()?;
    if let Some(proxy_url) = target.proxy {
        config.proxy_url = Some(proxy_url);
    }

    let client = WeatherClient::from_config(&config);
    tracing::debug!(proxy = client.proxy_url(), "using weather proxy");
    Ok(client)
}

fn configure(mut config: Config, path: &Path) -> anyhow::Result<()> {
    let api_key = Password::new("WeatherAPI.com key (leave empty to keep current):")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()
        .context("Failed to read API key")?;

    if !api_key.trim().is_empty() {
        config.set_api_key(api_key.trim().to_string());
    }

    let current_proxy = config.proxy_url.clone().unwrap_or_else(|| DEFAULT_PROXY_URL.to_string());
    let proxy_url = Text::new("Proxy URL:")
        .with_default(&current_proxy)
        .prompt()
        .context("Failed to read proxy URL")?;
    config.proxy_url = Some(proxy_url);

    config.save_to(path)?;
    println!("Saved configuration to {}", path.display());
    Ok(())
}

fn print_or_json<T, F>(json: bool, value: &T, render: F) -> anyhow::Result<()>
where
    T: serde::Serialize,
    F: FnOnce() -> String,
{
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", render());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn proxy_override_applies_to_lookups() {
        let cli =
            Cli::try_parse_from(["weather", "show", "London", "--proxy", "http://h/api/weather"])
                .unwrap();
        match cli.command {
            Command::Show { city, target, json } => {
                assert_eq!(city, "London");
                assert_eq!(target.proxy.as_deref(), Some("http://h/api/weather"));
                assert!(!json);
            }
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::try_parse_from([
            "weather", "locate", "--lat", "-33.9", "--lon", "18.4", "--proxy", "x",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Locate { lat, target: ProxyArgs { proxy: Some(_) }, .. } if lat < 0.0
        ));

        let cli = Cli::try_parse_from(["weather", "search", "Lon", "--json"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Search { target: ProxyArgs { proxy: None }, json: true, .. }
        ));
    }

    #[test]
    fn proxy_override_is_rejected_where_unused() {
        for args in [
            vec!["weather", "serve", "--proxy", "http://h/api/weather"],
            vec!["weather", "configure", "--proxy", "http://h/api/weather"],
            vec!["weather", "--proxy", "http://h/api/weather", "show", "London"],
        ] {
            let err = Cli::try_parse_from(args.iter().copied()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnknownArgument, "{args:?}");
        }
    }

    #[test]
    fn serve_accepts_bind_address() {
        let cli = Cli::try_parse_from(["weather", "serve", "--addr", "0.0.0.0:8080"]).unwrap();
        assert!(matches!(cli.command, Command::Serve { addr: Some(a) } if a == "0.0.0.0:8080"));
    }
}
