use crate::engine::EngineParams;
use crate::error::ServerError;

pub const USAGE: &str = "usage: worms-server [-p port] [-s seed] [-t turning_speed] \
[-v rounds_per_sec] [-w width] [-h height]";

#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    pub port: u16,
    pub params: EngineParams,
}

impl ServerConfig {
    /// Parses server CLI flags (spec.md §6). Unlike the client's positional
    /// `game_server` argument, every server flag is optional and defaults
    /// match the reference implementation.
    pub fn parse(args: &[String], now_seed: u32) -> Result<Self, ServerError> {
        let mut port: u16 = 2021;
        let mut seed: u32 = now_seed;
        let mut turning_speed: u32 = 6;
        let mut rounds_per_sec: u32 = 50;
        let mut width: u32 = 640;
        let mut height: u32 = 480;

        let mut iter = args.iter();
        while let Some(flag) = iter.next() {
            let value = iter
                .next()
                .ok_or_else(|| ServerError::InvalidArgs(format!("missing value for {flag}")))?;
            match flag.as_str() {
                "-p" => port = parse_in_range(value, 1..=65535, "port")? as u16,
                "-s" => seed = parse_u32(value, "seed")?,
                "-t" => turning_speed = parse_in_range(value, *EngineParams::TURNING_SPEED_RANGE.start()..=*EngineParams::TURNING_SPEED_RANGE.end(), "turning_speed")?,
                "-v" => rounds_per_sec = parse_in_range(value, *EngineParams::ROUNDS_PER_SEC_RANGE.start()..=*EngineParams::ROUNDS_PER_SEC_RANGE.end(), "rounds_per_sec")?,
                "-w" => width = parse_in_range(value, *EngineParams::WIDTH_RANGE.start()..=*EngineParams::WIDTH_RANGE.end(), "width")?,
                "-h" => height = parse_in_range(value, *EngineParams::HEIGHT_RANGE.start()..=*EngineParams::HEIGHT_RANGE.end(), "height")?,
                other => return Err(ServerError::InvalidArgs(format!("unknown flag {other}"))),
            }
        }

        Ok(ServerConfig {
            port,
            params: EngineParams {
                turning_speed,
                rounds_per_sec,
                width,
                height,
                seed,
            },
        })
    }
}

fn parse_u32(value: &str, name: &str) -> Result<u32, ServerError> {
    value
        .parse::<u32>()
        .map_err(|_| ServerError::InvalidArgs(format!("{name} must be a non-negative integer, got {value:?}")))
}

fn parse_in_range(
    value: &str,
    range: std::ops::RangeInclusive<u32>,
    name: &str,
) -> Result<u32, ServerError> {
    let parsed = parse_u32(value, name)?;
    if range.contains(&parsed) {
        Ok(parsed)
    } else {
        Err(ServerError::InvalidArgs(format!(
            "{name} must be in [{}, {}], got {parsed}",
            range.start(),
            range.end()
        )))
    }
}
