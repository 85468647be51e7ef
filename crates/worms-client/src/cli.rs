use worms_core::player_name_valid;

use crate::error::ClientError;

pub const USAGE: &str =
    "usage: worms-client game_server [-n player_name] [-p server_port=2021] [-i gui_host=localhost] [-r gui_port=20210]";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub game_server: String,
    pub server_port: u16,
    pub player_name: String,
    pub gui_host: String,
    pub gui_port: u16,
}

impl ClientConfig {
    /// Parses client CLI arguments (spec.md §4.5, §6): one positional
    /// `game_server` host plus four optional flags.
    pub fn parse(args: &[String]) -> Result<Self, ClientError> {
        let mut server_port: u16 = 2021;
        let mut player_name = String::new();
        let mut gui_host = "localhost".to_string();
        let mut gui_port: u16 = 20210;
        let mut positional = None;

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "-n" | "-p" | "-i" | "-r" => {
                    let value = iter.next().ok_or_else(|| {
                        ClientError::InvalidArgs(format!("missing value for {arg}"))
                    })?;
                    match arg.as_str() {
                        "-n" => {
                            if !player_name_valid(value.as_bytes()) {
                                return Err(ClientError::InvalidArgs(format!(
                                    "invalid player_name {value:?}"
                                )));
                            }
                            player_name = value.clone();
                        },
                        "-p" => server_port = parse_port(value)?,
                        "-i" => gui_host = value.clone(),
                        "-r" => gui_port = parse_port(value)?,
                        _ => unreachable!(),
                    }
                },
                other if other.starts_with('-') => {
                    return Err(ClientError::InvalidArgs(format!("unknown flag {other}")));
                },
                positional_arg => {
                    if positional.is_some() {
                        return Err(ClientError::InvalidArgs(
                            "only one game_server argument is accepted".to_string(),
                        ));
                    }
                    positional = Some(positional_arg.to_string());
                },
            }
        }

        let game_server = positional
            .ok_or_else(|| ClientError::InvalidArgs("missing game_server argument".to_string()))?;

        Ok(ClientConfig {
            game_server,
            server_port,
            player_name,
            gui_host,
            gui_port,
        })
    }
}

fn parse_port(value: &str) -> Result<u16, ClientError> {
    value
        .parse::<u16>()
        .filter(|&p| p >= 1)
        .ok_or_else(|| ClientError::InvalidArgs(format!("invalid port {value:?}")))
}
