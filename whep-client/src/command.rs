use anyhow::{bail, Result};

#[derive(Debug, PartialEq, Eq)]
pub enum ServerTarget {
    Preset(usize),
    Url(String),
}

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Restart,
    Server(ServerTarget),
    Status,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            bail!("empty command");
        };
        let command = match name {
            "restart" => Self::Restart,
            "status" => Self::Status,
            "quit" | "exit" => Self::Quit,
            "server" => {
                let Some(arg) = words.next() else {
                    bail!("usage: server <preset number | url>");
                };
                // Presets are numbered from 1 on the command line.
                match arg.parse::<usize>() {
                    Ok(0) => bail!("presets are numbered from 1"),
                    Ok(n) => Self::Server(ServerTarget::Preset(n - 1)),
                    Err(_) => Self::Server(ServerTarget::Url(arg.to_owned())),
                }
            }
            _ => bail!("unknown command: {}", name),
        };
        if words.next().is_some() {
            bail!("too many arguments");
        }
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands() {
        assert_eq!(Command::parse("restart").unwrap(), Command::Restart);
        assert_eq!(Command::parse("  status ").unwrap(), Command::Status);
        assert_eq!(Command::parse("exit").unwrap(), Command::Quit);
        assert_eq!(
            Command::parse("server 2").unwrap(),
            Command::Server(ServerTarget::Preset(1))
        );
        assert_eq!(
            Command::parse("server http://windows.local:8200/mystream/whep").unwrap(),
            Command::Server(ServerTarget::Url(
                "http://windows.local:8200/mystream/whep".to_owned()
            ))
        );
    }

    #[test]
    fn invalid_commands() {
        assert!(Command::parse("").is_err());
        assert!(Command::parse("server").is_err());
        assert!(Command::parse("server 0").is_err());
        assert!(Command::parse("restart now").is_err());
        assert!(Command::parse("publish").is_err());
    }
}
