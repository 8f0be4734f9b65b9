//! The line-oriented, `|`-delimited wire protocol.
//!
//! Every message is one line terminated by `\n`, split on `|`. Field 0 is a
//! single ASCII letter naming the message type; fields afterward are
//! positional. There is no escaping, so callers must reject values
//! containing `|` or `\n` before encoding (`encode` enforces this).

use crate::error::GameError;

const MAX_LINE_LENGTH: usize = 4096;

fn validate_field(field: &str) -> Result<(), GameError> {
    if field.contains('|') || field.contains('\n') {
        Err(GameError::Protocol(format!(
            "field contains a forbidden character: {field:?}"
        )))
    } else {
        Ok(())
    }
}

fn join(fields: &[&str]) -> Result<String, GameError> {
    for field in fields {
        validate_field(field)?;
    }
    Ok(fields.join("|"))
}

/// Messages a client may send to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// `J|name[|desc]`
    Join { name: String, descriptor: Option<String> },
    /// `S|target|x|y`
    Shoot { target: String, x: u32, y: u32 },
    /// `K|name`
    Skip { name: String },
    /// `T|hit|text` or `T|miss|text`
    Taunt { on_hit: bool, text: String },
    /// `M|to|text`
    Message { to: String, text: String },
    /// `P`
    Ping,
}

impl ClientMessage {
    pub fn encode(&self) -> Result<String, GameError> {
        let line = match self {
            ClientMessage::Join { name, descriptor } => match descriptor {
                Some(desc) => join(&["J", name, desc])?,
                None => join(&["J", name])?,
            },
            ClientMessage::Shoot { target, x, y } => {
                join(&["S", target, &x.to_string(), &y.to_string()])?
            }
            ClientMessage::Skip { name } => join(&["K", name])?,
            ClientMessage::Taunt { on_hit, text } => {
                join(&["T", if *on_hit { "hit" } else { "miss" }, text])?
            }
            ClientMessage::Message { to, text } => join(&["M", to, text])?,
            ClientMessage::Ping => "P".to_string(),
        };
        Ok(format!("{line}\n"))
    }

    pub fn decode(line: &str) -> Result<ClientMessage, GameError> {
        let fields = split_line(line)?;
        let msg_type = fields.first().copied().unwrap_or_default();
        match msg_type {
            "J" => {
                let name = field(&fields, 1)?.to_string();
                let descriptor = fields.get(2).map(|s| s.to_string());
                Ok(ClientMessage::Join { name, descriptor })
            }
            "S" => {
                let target = field(&fields, 1)?.to_string();
                let x = parse_u32(field(&fields, 2)?)?;
                let y = parse_u32(field(&fields, 3)?)?;
                Ok(ClientMessage::Shoot { target, x, y })
            }
            "K" => Ok(ClientMessage::Skip {
                name: field(&fields, 1)?.to_string(),
            }),
            "T" => {
                let which = field(&fields, 1)?;
                let on_hit = match which {
                    "hit" => true,
                    "miss" => false,
                    other => {
                        return Err(GameError::Protocol(format!(
                            "unknown taunt channel: {other}"
                        )))
                    }
                };
                let text = fields.get(2).copied().unwrap_or("").to_string();
                Ok(ClientMessage::Taunt { on_hit, text })
            }
            "M" => {
                let to = field(&fields, 1)?.to_string();
                let text = fields.get(2).copied().unwrap_or("").to_string();
                Ok(ClientMessage::Message { to, text })
            }
            "P" => Ok(ClientMessage::Ping),
            other => Err(GameError::Protocol(format!("unknown message type: {other}"))),
        }
    }
}

/// Messages the server may send to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// `G|version|title|min=|max=|joined=|goal=|width=|height=|boats=|boat=<ID><len>|...[|started]`
    GameInfo {
        version: String,
        title: String,
        min_players: u32,
        max_players: u32,
        joined: u32,
        point_goal: u32,
        width: u32,
        height: u32,
        boats: Vec<String>,
        started: bool,
    },
    /// `J|name`
    Joined { name: String },
    /// `Y|desc`
    YourBoard { descriptor: String },
    /// `L|name`
    Left { name: String },
    /// `B|name|status|desc|score|skips`
    Board {
        name: String,
        status: String,
        descriptor: String,
        score: u32,
        skips: u32,
    },
    /// `S|name1|name2|...`
    Started { order: Vec<String> },
    /// `N|name`
    Turn { name: String },
    /// `K|name[|reason]`
    Skipped { name: String, reason: Option<String> },
    /// `H|shooter|target|square`
    Hit {
        shooter: String,
        target: String,
        square: String,
    },
    /// `M|from|text|to`
    Message {
        from: String,
        text: String,
        to: String,
    },
    /// `F|status|turns|players` header; `players` carries the `R` record count
    Finish {
        status: String,
        turns: u32,
        players: u32,
    },
    /// `R|name|score|skips|turns|status`
    Result {
        name: String,
        score: u32,
        skips: u32,
        turns: u32,
        status: String,
    },
    /// `E|text`
    Error { text: String },
}

impl ServerMessage {
    pub fn encode(&self) -> Result<String, GameError> {
        let line = match self {
            ServerMessage::GameInfo {
                version,
                title,
                min_players,
                max_players,
                joined,
                point_goal,
                width,
                height,
                boats,
                started,
            } => {
                let mut fields = vec![
                    "G".to_string(),
                    version.clone(),
                    title.clone(),
                    format!("min={min_players}"),
                    format!("max={max_players}"),
                    format!("joined={joined}"),
                    format!("goal={point_goal}"),
                    format!("width={width}"),
                    format!("height={height}"),
                    format!("boats={}", boats.len()),
                ];
                for boat in boats {
                    fields.push(format!("boat={boat}"));
                }
                if *started {
                    fields.push("started".to_string());
                }
                join(&fields.iter().map(String::as_str).collect::<Vec<_>>())?
            }
            ServerMessage::Joined { name } => join(&["J", name])?,
            ServerMessage::YourBoard { descriptor } => join(&["Y", descriptor])?,
            ServerMessage::Left { name } => join(&["L", name])?,
            ServerMessage::Board {
                name,
                status,
                descriptor,
                score,
                skips,
            } => join(&[
                "B",
                name,
                status,
                descriptor,
                &score.to_string(),
                &skips.to_string(),
            ])?,
            ServerMessage::Started { order } => {
                let mut fields = vec!["S".to_string()];
                fields.extend(order.iter().cloned());
                join(&fields.iter().map(String::as_str).collect::<Vec<_>>())?
            }
            ServerMessage::Turn { name } => join(&["N", name])?,
            ServerMessage::Skipped { name, reason } => match reason {
                Some(reason) => join(&["K", name, reason])?,
                None => join(&["K", name])?,
            },
            ServerMessage::Hit {
                shooter,
                target,
                square,
            } => join(&["H", shooter, target, square])?,
            ServerMessage::Message { from, text, to } => join(&["M", from, text, to])?,
            ServerMessage::Finish {
                status,
                turns,
                players,
            } => join(&["F", status, &turns.to_string(), &players.to_string()])?,
            ServerMessage::Result {
                name,
                score,
                skips,
                turns,
                status,
            } => join(&[
                "R",
                name,
                &score.to_string(),
                &skips.to_string(),
                &turns.to_string(),
                status,
            ])?,
            ServerMessage::Error { text } => join(&["E", text])?,
        };
        Ok(format!("{line}\n"))
    }

    pub fn decode(line: &str) -> Result<ServerMessage, GameError> {
        let fields = split_line(line)?;
        let msg_type = fields.first().copied().unwrap_or_default();
        match msg_type {
            "G" => {
                let version = field(&fields, 1)?.to_string();
                let title = field(&fields, 2)?.to_string();
                let mut min_players = 0;
                let mut max_players = 0;
                let mut joined = 0;
                let mut point_goal = 0;
                let mut width = 0;
                let mut height = 0;
                let mut boats = Vec::new();
                let mut started = false;
                for raw in &fields[3..] {
                    if *raw == "started" {
                        started = true;
                    } else if let Some(v) = raw.strip_prefix("min=") {
                        min_players = parse_u32(v)?;
                    } else if let Some(v) = raw.strip_prefix("max=") {
                        max_players = parse_u32(v)?;
                    } else if let Some(v) = raw.strip_prefix("joined=") {
                        joined = parse_u32(v)?;
                    } else if let Some(v) = raw.strip_prefix("goal=") {
                        point_goal = parse_u32(v)?;
                    } else if let Some(v) = raw.strip_prefix("width=") {
                        width = parse_u32(v)?;
                    } else if let Some(v) = raw.strip_prefix("height=") {
                        height = parse_u32(v)?;
                    } else if raw.strip_prefix("boats=").is_some() {
                        // count field is redundant with `boats.len()`; ignored on decode
                    } else if let Some(v) = raw.strip_prefix("boat=") {
                        boats.push(v.to_string());
                    }
                }
                Ok(ServerMessage::GameInfo {
                    version,
                    title,
                    min_players,
                    max_players,
                    joined,
                    point_goal,
                    width,
                    height,
                    boats,
                    started,
                })
            }
            "J" => Ok(ServerMessage::Joined {
                name: field(&fields, 1)?.to_string(),
            }),
            "Y" => Ok(ServerMessage::YourBoard {
                descriptor: field(&fields, 1)?.to_string(),
            }),
            "L" => Ok(ServerMessage::Left {
                name: field(&fields, 1)?.to_string(),
            }),
            "B" => Ok(ServerMessage::Board {
                name: field(&fields, 1)?.to_string(),
                status: field(&fields, 2)?.to_string(),
                descriptor: field(&fields, 3)?.to_string(),
                score: parse_u32(field(&fields, 4)?)?,
                skips: parse_u32(field(&fields, 5)?)?,
            }),
            "S" => Ok(ServerMessage::Started {
                order: fields[1..].iter().map(|s| s.to_string()).collect(),
            }),
            "N" => Ok(ServerMessage::Turn {
                name: field(&fields, 1)?.to_string(),
            }),
            "K" => Ok(ServerMessage::Skipped {
                name: field(&fields, 1)?.to_string(),
                reason: fields.get(2).map(|s| s.to_string()),
            }),
            "H" => Ok(ServerMessage::Hit {
                shooter: field(&fields, 1)?.to_string(),
                target: field(&fields, 2)?.to_string(),
                square: field(&fields, 3)?.to_string(),
            }),
            "M" => Ok(ServerMessage::Message {
                from: field(&fields, 1)?.to_string(),
                text: field(&fields, 2)?.to_string(),
                to: field(&fields, 3)?.to_string(),
            }),
            "F" => Ok(ServerMessage::Finish {
                status: field(&fields, 1)?.to_string(),
                turns: parse_u32(field(&fields, 2)?)?,
                players: parse_u32(field(&fields, 3)?)?,
            }),
            "R" => Ok(ServerMessage::Result {
                name: field(&fields, 1)?.to_string(),
                score: parse_u32(field(&fields, 2)?)?,
                skips: parse_u32(field(&fields, 3)?)?,
                turns: parse_u32(field(&fields, 4)?)?,
                status: field(&fields, 5)?.to_string(),
            }),
            "E" => Ok(ServerMessage::Error {
                text: field(&fields, 1)?.to_string(),
            }),
            other => Err(GameError::Protocol(format!("unknown message type: {other}"))),
        }
    }
}

fn split_line(line: &str) -> Result<Vec<&str>, GameError> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    if line.len() > MAX_LINE_LENGTH {
        return Err(GameError::Protocol("line exceeds maximum length".to_string()));
    }
    if line.is_empty() {
        return Err(GameError::Protocol("empty line".to_string()));
    }
    Ok(line.split('|').collect())
}

fn field<'a>(fields: &[&'a str], index: usize) -> Result<&'a str, GameError> {
    fields
        .get(index)
        .copied()
        .ok_or_else(|| GameError::Protocol(format!("missing field at index {index}")))
}

fn parse_u32(s: &str) -> Result<u32, GameError> {
    s.parse()
        .map_err(|_| GameError::Protocol(format!("expected an integer, got {s:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_message_round_trips() {
        let msg = ClientMessage::Join {
            name: "alice".to_string(),
            descriptor: Some("...".to_string()),
        };
        let encoded = msg.encode().unwrap();
        assert_eq!(encoded, "J|alice|...\n");
        assert_eq!(ClientMessage::decode(&encoded).unwrap(), msg);
    }

    #[test]
    fn shoot_message_round_trips() {
        let msg = ClientMessage::Shoot {
            target: "bob".to_string(),
            x: 3,
            y: 4,
        };
        let encoded = msg.encode().unwrap();
        assert_eq!(ClientMessage::decode(&encoded).unwrap(), msg);
    }

    #[test]
    fn encode_rejects_pipe_in_field() {
        let msg = ClientMessage::Message {
            to: String::new(),
            text: "hello|world".to_string(),
        };
        assert!(msg.encode().is_err());
    }

    #[test]
    fn board_broadcast_round_trips() {
        let msg = ServerMessage::Board {
            name: "alice".to_string(),
            status: String::new(),
            descriptor: "aaaaa.....0...".to_string(),
            score: 5,
            skips: 0,
        };
        let encoded = msg.encode().unwrap();
        assert_eq!(ServerMessage::decode(&encoded).unwrap(), msg);
    }

    #[test]
    fn game_info_round_trips_with_boats() {
        let msg = ServerMessage::GameInfo {
            version: "1.0".to_string(),
            title: "friendly".to_string(),
            min_players: 2,
            max_players: 4,
            joined: 1,
            point_goal: 17,
            width: 10,
            height: 10,
            boats: vec!["A5".to_string(), "B4".to_string()],
            started: false,
        };
        let encoded = msg.encode().unwrap();
        assert_eq!(ServerMessage::decode(&encoded).unwrap(), msg);
    }

    #[test]
    fn finish_and_result_round_trip() {
        let finish = ServerMessage::Finish {
            status: "finished".to_string(),
            turns: 17,
            players: 2,
        };
        assert_eq!(
            ServerMessage::decode(&finish.encode().unwrap()).unwrap(),
            finish
        );

        let result = ServerMessage::Result {
            name: "alice".to_string(),
            score: 17,
            skips: 0,
            turns: 17,
            status: "first".to_string(),
        };
        assert_eq!(
            ServerMessage::decode(&result.encode().unwrap()).unwrap(),
            result
        );
    }

    #[test]
    fn decode_rejects_unknown_message_type() {
        assert!(ClientMessage::decode("Z|whatever\n").is_err());
    }

    #[test]
    fn decode_rejects_oversized_line() {
        let huge = "J|".to_string() + &"a".repeat(5000);
        assert!(ClientMessage::decode(&huge).is_err());
    }
}
